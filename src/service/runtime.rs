use anyhow::{Result, anyhow};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::signals::SignalType;
use crate::audio::{AudioDevice, DeviceKind};
use crate::config::ConfigLoader;
use crate::error::RouteResult;
use crate::selection::{DeviceChangeListener, EngineSettings, EngineState, HeadsetState, SelectionEngine};
use crate::system::{
    FileSystemInterface, HardwareEventReceiver, HardwareGateway, StandardFileSystem,
    hardware_event_channel,
};

/// Requests a [`RouteHandle`] forwards to the engine task
#[derive(Debug)]
pub enum RouteCommand {
    Activate,
    Deactivate,
    SelectDevice(Option<AudioDevice>),
    SetPreferredOrder(Vec<DeviceKind>),
    Status(oneshot::Sender<RouteStatus>),
    Stop,
}

/// Point-in-time view of the engine
#[derive(Debug, Clone, PartialEq)]
pub struct RouteStatus {
    pub state: EngineState,
    pub selected: Option<AudioDevice>,
    pub user_selected: Option<AudioDevice>,
    pub devices: Vec<AudioDevice>,
    pub headset: HeadsetState,
    pub order: Vec<DeviceKind>,
}

/// Cloneable front end for a running [`RouteService`]
#[derive(Clone)]
pub struct RouteHandle {
    commands: mpsc::UnboundedSender<RouteCommand>,
}

impl RouteHandle {
    fn send(&self, command: RouteCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("Route service is not running"))
    }

    pub fn activate(&self) -> Result<()> {
        self.send(RouteCommand::Activate)
    }

    pub fn deactivate(&self) -> Result<()> {
        self.send(RouteCommand::Deactivate)
    }

    pub fn select_device(&self, device: Option<AudioDevice>) -> Result<()> {
        self.send(RouteCommand::SelectDevice(device))
    }

    pub fn set_preferred_order(&self, kinds: Vec<DeviceKind>) -> Result<()> {
        self.send(RouteCommand::SetPreferredOrder(kinds))
    }

    pub fn stop(&self) -> Result<()> {
        self.send(RouteCommand::Stop)
    }

    pub async fn status(&self) -> Result<RouteStatus> {
        let (tx, rx) = oneshot::channel();
        self.send(RouteCommand::Status(tx))?;
        rx.await
            .map_err(|_| anyhow!("Route service stopped before answering"))
    }
}

/// Runs a [`SelectionEngine`] on one task: hardware events, caller commands, signals
/// and Bluetooth retry deadlines are all handled from the same loop.
pub struct RouteService<G: HardwareGateway, F: FileSystemInterface = StandardFileSystem> {
    engine: SelectionEngine<G>,
    events: HardwareEventReceiver,
    commands: mpsc::UnboundedReceiver<RouteCommand>,
    signals: Option<mpsc::UnboundedReceiver<SignalType>>,
    config_loader: Option<ConfigLoader<F>>,
}

impl<G: HardwareGateway> RouteService<G> {
    pub fn new(gateway: G, settings: &EngineSettings) -> RouteResult<(Self, RouteHandle)> {
        let (events_tx, events) = hardware_event_channel();
        let engine = SelectionEngine::new(gateway, events_tx, settings)?;
        let (commands_tx, commands) = mpsc::unbounded_channel();

        let service = Self {
            engine,
            events,
            commands,
            signals: None,
            config_loader: None,
        };
        Ok((service, RouteHandle { commands: commands_tx }))
    }
}

impl<G: HardwareGateway, F: FileSystemInterface> RouteService<G, F> {
    /// Stop on `Shutdown`, reload the preferred order on `Reload`
    pub fn with_signals(mut self, signals: mpsc::UnboundedReceiver<SignalType>) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Where `Reload` reads the configuration from
    pub fn with_config_loader<L: FileSystemInterface>(
        self,
        config_loader: ConfigLoader<L>,
    ) -> RouteService<G, L> {
        RouteService {
            engine: self.engine,
            events: self.events,
            commands: self.commands,
            signals: self.signals,
            config_loader: Some(config_loader),
        }
    }

    /// Start the engine and serve until stopped. The engine is stopped on the way out.
    pub async fn run(mut self, listener: DeviceChangeListener) -> RouteResult<()> {
        self.engine.start(listener)?;
        info!("Route service running");

        loop {
            let deadline = self.engine.next_job_deadline();
            tokio::select! {
                biased;

                Some(event) = self.events.recv() => {
                    debug!("Hardware event: {:?}", event);
                    self.engine.handle_event(event);
                }
                command = self.commands.recv() => match command {
                    Some(RouteCommand::Stop) => {
                        info!("Stop requested");
                        break;
                    }
                    Some(command) => apply_command(&mut self.engine, command),
                    None => {
                        info!("All route handles dropped, stopping");
                        break;
                    }
                },
                signal = next_signal(&mut self.signals) => match signal {
                    Some(SignalType::Shutdown) => {
                        info!("Shutdown signal received, stopping route service");
                        break;
                    }
                    Some(SignalType::Reload) => self.reload_config(),
                    None => {
                        warn!("Signal channel closed");
                        self.signals = None;
                    }
                },
                _ = sleep_until_deadline(deadline) => self.engine.run_due_jobs(),
            }
        }

        self.engine.stop();
        info!("Route service stopped");
        Ok(())
    }

    fn reload_config(&mut self) {
        let Some(loader) = &self.config_loader else {
            warn!("Reload requested but no configuration file is in use");
            return;
        };

        info!("Reloading configuration from {}", loader.get_config_path().display());
        match loader.reload_config() {
            Ok(config) => {
                match self
                    .engine
                    .set_preferred_order(&config.routing.preferred_device_order)
                {
                    Ok(()) => info!("Configuration reloaded"),
                    Err(e) => error!("Reloaded configuration rejected: {}", e),
                }
            }
            Err(e) => error!("Failed to reload configuration: {:#}", e),
        }
    }
}

fn apply_command<G: HardwareGateway>(engine: &mut SelectionEngine<G>, command: RouteCommand) {
    match command {
        RouteCommand::Activate => {
            if let Err(e) = engine.activate() {
                error!("Activation refused: {}", e);
            }
        }
        RouteCommand::Deactivate => engine.deactivate(),
        RouteCommand::SelectDevice(device) => engine.select_device(device),
        RouteCommand::SetPreferredOrder(kinds) => {
            if let Err(e) = engine.set_preferred_order(&kinds) {
                error!("Preferred order rejected: {}", e);
            }
        }
        RouteCommand::Status(reply) => {
            let status = RouteStatus {
                state: engine.state(),
                selected: engine.selected_device().cloned(),
                user_selected: engine.user_selected_device().cloned(),
                devices: engine.available_devices(),
                headset: engine.headset_state(),
                order: engine.preferred_order().kinds().to_vec(),
            };
            if reply.send(status).is_err() {
                debug!("Status requester went away");
            }
        }
        RouteCommand::Stop => {}
    }
}

async fn next_signal(signals: &mut Option<mpsc::UnboundedReceiver<SignalType>>) -> Option<SignalType> {
    match signals {
        Some(signals) => signals.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
