//! Engine fixture wired to mocks: records notifications and drives the manual clock

#![allow(dead_code)]

use audio_route_switch::audio::AudioDevice;
use audio_route_switch::selection::{EngineSettings, SelectionEngine};
use audio_route_switch::system::{
    Clock, HardwareEvent, HardwareEventReceiver, ManualClock, MockGateway, hardware_event_channel,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type Notification = (Vec<AudioDevice>, Option<AudioDevice>);

pub struct EngineHarness {
    pub gateway: MockGateway,
    pub clock: ManualClock,
    pub engine: SelectionEngine<MockGateway, ManualClock>,
    events: HardwareEventReceiver,
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl EngineHarness {
    pub fn new(devices: Vec<AudioDevice>) -> Self {
        Self::with_settings(devices, EngineSettings::default())
    }

    pub fn with_settings(devices: Vec<AudioDevice>, settings: EngineSettings) -> Self {
        let gateway = MockGateway::with_devices(devices);
        let clock = ManualClock::new();
        let (tx, events) = hardware_event_channel();
        let engine =
            SelectionEngine::with_clock(gateway.clone(), clock.clone(), tx, &settings).unwrap();

        Self {
            gateway,
            clock,
            engine,
            events,
            notifications: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Harness already started with `devices`
    pub fn started(devices: Vec<AudioDevice>) -> Self {
        let mut harness = Self::new(devices);
        harness.start();
        harness
    }

    /// Started and activated
    pub fn activated(devices: Vec<AudioDevice>) -> Self {
        let mut harness = Self::started(devices);
        harness.engine.activate().unwrap();
        harness
    }

    pub fn start(&mut self) {
        let sink = self.notifications.clone();
        self.engine
            .start(Box::new(move |devices, selected| {
                sink.lock()
                    .unwrap()
                    .push((devices.to_vec(), selected.cloned()));
            }))
            .unwrap();
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }

    pub fn last_notification(&self) -> Option<Notification> {
        self.notifications.lock().unwrap().last().cloned()
    }

    pub fn selected(&self) -> Option<AudioDevice> {
        self.engine.selected_device().cloned()
    }

    /// Send `event` the way the platform would and let the engine process it
    pub fn emit(&mut self, event: HardwareEvent) {
        assert!(self.gateway.emit(event), "no listener registered");
        self.pump();
    }

    /// Apply every queued hardware event, returns how many were handled
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.engine.handle_event(event);
            handled += 1;
        }
        handled
    }

    pub fn advance(&mut self, by: Duration) {
        self.clock.advance(by);
        self.engine.run_due_jobs();
    }

    /// Jump from deadline to deadline until no job is pending, returns the time spent
    pub fn run_jobs_to_completion(&mut self) -> Duration {
        let started = self.clock.now();
        for _ in 0..1000 {
            let Some(deadline) = self.engine.next_job_deadline() else {
                return self.clock.now() - started;
            };
            let now = self.clock.now();
            if deadline > now {
                self.clock.advance(deadline - now);
            }
            self.engine.run_due_jobs();
        }
        panic!("retry jobs never finished");
    }
}
