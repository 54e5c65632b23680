use anyhow::Result;
use signal_hook::consts::signal::*;
use signal_hook_tokio::Signals;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{info, warn};

/// Signal types that can be received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalType {
    /// SIGTERM or SIGINT
    Shutdown,
    /// SIGHUP
    Reload,
}

/// Turns process signals into [`SignalType`] messages for the route service
#[derive(Clone)]
pub struct SignalHandler {
    signal_sender: mpsc::UnboundedSender<SignalType>,
}

impl SignalHandler {
    pub fn new(signal_sender: mpsc::UnboundedSender<SignalType>) -> Self {
        Self { signal_sender }
    }

    /// Handler plus the receiving end to hand to `RouteService::with_signals`
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SignalType>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Listen for SIGTERM/SIGINT/SIGHUP until a shutdown signal arrives
    pub async fn listen_for_signals(&self) -> Result<()> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGHUP])?;

        info!("Signal handler initialized, listening for SIGTERM, SIGINT, SIGHUP");

        while let Some(signal) = signals.next().await {
            match signal {
                SIGTERM | SIGINT => {
                    info!(
                        "Received shutdown signal ({}), initiating graceful shutdown",
                        signal
                    );
                    if self.signal_sender.send(SignalType::Shutdown).is_err() {
                        warn!("Route service already gone, nothing to shut down");
                    }
                    break;
                }
                SIGHUP => {
                    info!("Received SIGHUP signal, reloading configuration");
                    if let Err(e) = self.signal_sender.send(SignalType::Reload) {
                        warn!("Failed to send reload signal: {}", e);
                    }
                }
                _ => {
                    warn!("Received unexpected signal: {}", signal);
                }
            }
        }

        Ok(())
    }
}
