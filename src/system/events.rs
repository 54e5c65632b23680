use tokio::sync::mpsc;

use crate::audio::{AudioDevice, DeviceKind};

/// Hardware notifications, already classified into device values before they reach the
/// engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareEvent {
    DeviceConnected(AudioDevice),
    DeviceDisconnected(AudioDevice),
    /// A whole technology went away, e.g. the Bluetooth radio was switched off.
    KindUnavailable(DeviceKind),
    /// The Bluetooth audio link is carrying audio.
    BluetoothAudioConnected,
    /// The Bluetooth audio link dropped.
    BluetoothAudioDisconnected,
}

pub type HardwareEventSender = mpsc::UnboundedSender<HardwareEvent>;
pub type HardwareEventReceiver = mpsc::UnboundedReceiver<HardwareEvent>;

/// Channel used to marshal gateway callbacks onto the engine's task.
pub fn hardware_event_channel() -> (HardwareEventSender, HardwareEventReceiver) {
    mpsc::unbounded_channel()
}
