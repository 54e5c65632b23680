use anyhow::{Result, anyhow};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::audio::{AudioDevice, DeviceKind};
use crate::system::events::{HardwareEvent, HardwareEventSender};
use crate::system::traits::{Clock, FileSystemInterface, HardwareGateway};

/// Production implementation of FileSystemInterface using std::fs
pub struct StandardFileSystem;

impl FileSystemInterface for StandardFileSystem {
    fn read_config_file(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| anyhow!("Failed to read config file: {}", e))
    }

    fn write_config_file(&self, path: &Path, content: &str) -> Result<()> {
        std::fs::write(path, content).map_err(|e| anyhow!("Failed to write config file: {}", e))
    }

    fn config_file_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_config_dir(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)
            .map_err(|e| anyhow!("Failed to create config directory: {}", e))
    }

    fn get_config_modified_time(&self, path: &Path) -> Result<std::time::SystemTime> {
        let metadata =
            std::fs::metadata(path).map_err(|e| anyhow!("Failed to get file metadata: {}", e))?;
        metadata
            .modified()
            .map_err(|e| anyhow!("Failed to get modified time: {}", e))
    }
}

impl Default for StandardFileSystem {
    fn default() -> Self {
        Self
    }
}

/// Wall clock backed by tokio, so paused-time tests drive it too
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Default)]
struct ScriptedState {
    devices: Vec<AudioDevice>,
    has_earpiece: bool,
    sink: Option<HardwareEventSender>,
    confirm_bluetooth_after_attempts: Option<u32>,
    enable_attempts: u32,
    link_up: bool,
}

/// In-process audio stack driven by a scenario script.
///
/// Device changes are pushed through [`ScriptedGateway::connect`] and friends and
/// reach the engine as regular hardware events. Every routing primitive the engine
/// calls is logged. When configured, the Bluetooth link reports itself up after a
/// number of enable attempts, which lets a script exercise both the success and the
/// timeout path of activation.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedGateway {
    pub fn new(has_earpiece: bool, confirm_bluetooth_after_attempts: Option<u32>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptedState {
                has_earpiece,
                confirm_bluetooth_after_attempts,
                ..ScriptedState::default()
            })),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, ScriptedState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("Scripted gateway state lock poisoned"))
    }

    /// Device present before the engine starts
    pub fn seed(&self, device: AudioDevice) -> Result<()> {
        let mut state = self.state()?;
        if !state.devices.contains(&device) {
            state.devices.push(device);
        }
        Ok(())
    }

    pub fn connect(&self, device: AudioDevice) -> Result<()> {
        let mut state = self.state()?;
        if !state.devices.contains(&device) {
            state.devices.push(device.clone());
        }
        Self::send(&state, HardwareEvent::DeviceConnected(device));
        Ok(())
    }

    pub fn disconnect(&self, device: AudioDevice) -> Result<()> {
        let mut state = self.state()?;
        state.devices.retain(|d| d != &device);
        if device.is_kind(DeviceKind::BluetoothHeadset)
            && !state
                .devices
                .iter()
                .any(|d| d.is_kind(DeviceKind::BluetoothHeadset))
        {
            state.link_up = false;
            state.enable_attempts = 0;
        }
        Self::send(&state, HardwareEvent::DeviceDisconnected(device));
        Ok(())
    }

    pub fn kind_unavailable(&self, kind: DeviceKind) -> Result<()> {
        let mut state = self.state()?;
        state.devices.retain(|d| d.kind != kind);
        if kind == DeviceKind::BluetoothHeadset {
            state.link_up = false;
            state.enable_attempts = 0;
        }
        Self::send(&state, HardwareEvent::KindUnavailable(kind));
        Ok(())
    }

    pub fn bluetooth_audio_connected(&self) -> Result<()> {
        let mut state = self.state()?;
        state.link_up = true;
        Self::send(&state, HardwareEvent::BluetoothAudioConnected);
        Ok(())
    }

    pub fn bluetooth_audio_disconnected(&self) -> Result<()> {
        let mut state = self.state()?;
        state.link_up = false;
        state.enable_attempts = 0;
        Self::send(&state, HardwareEvent::BluetoothAudioDisconnected);
        Ok(())
    }

    fn send(state: &ScriptedState, event: HardwareEvent) {
        match &state.sink {
            Some(sink) => {
                if sink.send(event).is_err() {
                    warn!("Hardware event dropped, engine is gone");
                }
            }
            None => debug!("No listener registered, dropping {:?}", event),
        }
    }
}

impl HardwareGateway for ScriptedGateway {
    fn add_device_listener(&self, events: HardwareEventSender) -> Result<()> {
        info!("[hw] add_device_listener");
        self.state()?.sink = Some(events);
        Ok(())
    }

    fn remove_device_listener(&self) -> Result<()> {
        info!("[hw] remove_device_listener");
        self.state()?.sink = None;
        Ok(())
    }

    fn enumerate_devices(&self) -> Result<Vec<AudioDevice>> {
        Ok(self.state()?.devices.clone())
    }

    fn is_reachable(&self, device: &AudioDevice) -> bool {
        self.state
            .lock()
            .map(|state| match device.kind {
                DeviceKind::Speakerphone => true,
                DeviceKind::Earpiece => state.has_earpiece,
                _ => state.devices.contains(device),
            })
            .unwrap_or(false)
    }

    fn has_earpiece(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.has_earpiece)
            .unwrap_or(false)
    }

    fn enable_bluetooth_link(&self, enable: bool) -> Result<()> {
        info!("[hw] enable_bluetooth_link({})", enable);
        let mut state = self.state()?;
        if !enable {
            state.enable_attempts = 0;
            if state.link_up {
                state.link_up = false;
                Self::send(&state, HardwareEvent::BluetoothAudioDisconnected);
            }
            return Ok(());
        }

        state.enable_attempts += 1;
        let confirmed = state
            .confirm_bluetooth_after_attempts
            .is_some_and(|needed| state.enable_attempts >= needed);
        if confirmed && !state.link_up {
            state.link_up = true;
            Self::send(&state, HardwareEvent::BluetoothAudioConnected);
        }
        Ok(())
    }

    fn enable_speaker(&self, enable: bool) -> Result<()> {
        info!("[hw] enable_speaker({})", enable);
        Ok(())
    }

    fn set_focus(&self) -> Result<()> {
        info!("[hw] set_focus");
        Ok(())
    }

    fn mute(&self, mute: bool) -> Result<()> {
        info!("[hw] mute({})", mute);
        Ok(())
    }

    fn cache_state(&self) -> Result<()> {
        info!("[hw] cache_state");
        Ok(())
    }

    fn restore_state(&self) -> Result<()> {
        info!("[hw] restore_state");
        Ok(())
    }
}
