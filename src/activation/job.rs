use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::audio::LinkRequest;

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RETRY_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Side effects a job drives. `attempt` runs on every tick, `timed_out` once when the
/// budget is spent.
pub trait RetryAction {
    fn attempt(&mut self);
    fn timed_out(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Nothing was due.
    Idle,
    Attempted,
    /// Budget exhausted; the job is no longer running.
    TimedOut,
}

#[derive(Debug, Clone)]
struct Schedule {
    started_at: Instant,
    next_attempt_at: Instant,
    attempts: u32,
}

/// Repeats a hardware action on a fixed interval until cancelled or out of time.
///
/// The job owns no timer thread: it exposes its next deadline and is polled by the
/// owner on the same task that owns the engine, so cancelling is a plain state change
/// and nothing can fire after [`ActivationRetryJob::cancel`] returns.
#[derive(Debug)]
pub struct ActivationRetryJob {
    direction: LinkRequest,
    settings: RetrySettings,
    schedule: Option<Schedule>,
}

impl ActivationRetryJob {
    pub fn new(direction: LinkRequest, settings: RetrySettings) -> Self {
        Self {
            direction,
            settings,
            schedule: None,
        }
    }

    /// Schedules the first attempt at `now`. A job already running is replaced.
    pub fn execute(&mut self, now: Instant) {
        if self.schedule.is_some() {
            debug!("Replacing running {:?} link job", self.direction);
        }
        self.schedule = Some(Schedule {
            started_at: now,
            next_attempt_at: now,
            attempts: 0,
        });
        debug!("Scheduled {:?} link job", self.direction);
    }

    /// Stops the schedule. Safe to call when nothing is running.
    pub fn cancel(&mut self) -> bool {
        let was_running = self.schedule.take().is_some();
        if was_running {
            debug!("Cancelled {:?} link job", self.direction);
        }
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.schedule.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.schedule.as_ref().map(|s| s.next_attempt_at)
    }

    pub fn attempts(&self) -> u32 {
        self.schedule.as_ref().map_or(0, |s| s.attempts)
    }

    /// Runs the action if an attempt is due at `now`, or reports the timeout.
    pub fn poll<A: RetryAction>(&mut self, now: Instant, action: &mut A) -> JobOutcome {
        let Some(schedule) = self.schedule.as_mut() else {
            return JobOutcome::Idle;
        };
        if now < schedule.next_attempt_at {
            return JobOutcome::Idle;
        }

        let elapsed = now.saturating_duration_since(schedule.started_at);
        if elapsed >= self.settings.timeout {
            warn!(
                "{:?} link job timed out after {} attempts ({:?})",
                self.direction, schedule.attempts, elapsed
            );
            self.schedule = None;
            action.timed_out();
            return JobOutcome::TimedOut;
        }

        schedule.attempts += 1;
        schedule.next_attempt_at = now + self.settings.interval;
        debug!(
            "{:?} link attempt {} ({:?} elapsed)",
            self.direction, schedule.attempts, elapsed
        );
        action.attempt();
        JobOutcome::Attempted
    }
}
