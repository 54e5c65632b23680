//! Scripted device sessions for the `simulate` command

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::audio::{AudioDevice, DeviceKind};
use crate::selection::{DeviceChangeListener, EngineSettings};
use crate::service::{RouteHandle, RouteService, RouteStatus};
use crate::system::{FileSystemInterface, ScriptedGateway};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_has_earpiece")]
    pub has_earpiece: bool,

    /// The Bluetooth link reports itself up after this many enable attempts. Unset means
    /// it never does, so activation times out.
    #[serde(default)]
    pub confirm_bluetooth_after_attempts: Option<u32>,

    /// Devices present when the engine starts
    #[serde(default)]
    pub devices: Vec<DeviceSpec>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_has_earpiece() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSpec {
    pub kind: DeviceKind,
    #[serde(default)]
    pub name: Option<String>,
}

impl DeviceSpec {
    pub fn device(&self) -> AudioDevice {
        match &self.name {
            Some(name) => AudioDevice::new(self.kind, name.clone()),
            None => AudioDevice::unnamed(self.kind),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Delay after the previous step
    #[serde(default)]
    pub after_ms: u64,

    #[serde(flatten)]
    pub action: StepAction,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    Connect {
        kind: DeviceKind,
        #[serde(default)]
        name: Option<String>,
    },
    Disconnect {
        kind: DeviceKind,
        #[serde(default)]
        name: Option<String>,
    },
    KindUnavailable {
        kind: DeviceKind,
    },
    BluetoothAudioConnected,
    BluetoothAudioDisconnected,
    Select {
        kind: DeviceKind,
        #[serde(default)]
        name: Option<String>,
    },
    ClearSelection,
    Activate,
    Deactivate,
    SetPreferredOrder {
        order: Vec<DeviceKind>,
    },
}

fn device(kind: DeviceKind, name: &Option<String>) -> AudioDevice {
    DeviceSpec {
        kind,
        name: name.clone(),
    }
    .device()
}

impl Scenario {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse scenario")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid scenario: {}", path.display()))
    }

    /// Replay the steps against a route service and return its final status.
    ///
    /// After the last step the run waits out one retry budget so pending Bluetooth
    /// activations either confirm or time out before the status is taken.
    pub async fn run(
        &self,
        settings: &EngineSettings,
        listener: DeviceChangeListener,
    ) -> Result<RouteStatus> {
        self.run_with(settings, listener, |service| service).await
    }

    /// Like [`Scenario::run`], with `wire` adding signals or a config loader to the service.
    pub async fn run_with<F, W>(
        &self,
        settings: &EngineSettings,
        listener: DeviceChangeListener,
        wire: W,
    ) -> Result<RouteStatus>
    where
        F: FileSystemInterface + Send + 'static,
        W: FnOnce(RouteService<ScriptedGateway>) -> RouteService<ScriptedGateway, F>,
    {
        let gateway =
            ScriptedGateway::new(self.has_earpiece, self.confirm_bluetooth_after_attempts);
        for spec in &self.devices {
            gateway.seed(spec.device())?;
        }

        let (service, handle) = RouteService::new(gateway.clone(), settings)?;
        let task = tokio::spawn(wire(service).run(listener));

        for (index, step) in self.steps.iter().enumerate() {
            tokio::time::sleep(Duration::from_millis(step.after_ms)).await;
            info!("Step {}: {:?}", index + 1, step.action);
            apply_step(&gateway, &handle, &step.action)?;
        }

        tokio::time::sleep(settings.retry.timeout + settings.retry.interval).await;
        let status = handle
            .status()
            .await
            .context("Simulation interrupted before it finished")?;
        handle.stop()?;
        task.await.context("Route service task failed")??;
        Ok(status)
    }
}

fn apply_step(gateway: &ScriptedGateway, handle: &RouteHandle, action: &StepAction) -> Result<()> {
    match action {
        StepAction::Connect { kind, name } => gateway.connect(device(*kind, name)),
        StepAction::Disconnect { kind, name } => gateway.disconnect(device(*kind, name)),
        StepAction::KindUnavailable { kind } => gateway.kind_unavailable(*kind),
        StepAction::BluetoothAudioConnected => gateway.bluetooth_audio_connected(),
        StepAction::BluetoothAudioDisconnected => gateway.bluetooth_audio_disconnected(),
        StepAction::Select { kind, name } => handle.select_device(Some(device(*kind, name))),
        StepAction::ClearSelection => handle.select_device(None),
        StepAction::Activate => handle.activate(),
        StepAction::Deactivate => handle.deactivate(),
        StepAction::SetPreferredOrder { order } => handle.set_preferred_order(order.clone()),
    }
}
