use std::fmt;
use tracing::debug;

use crate::audio::{AudioDevice, DeviceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadsetState {
    Disconnected,
    Connected,
    AudioActivating,
    AudioActivationError,
    AudioActivated,
}

impl fmt::Display for HeadsetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HeadsetState::Disconnected => "disconnected",
            HeadsetState::Connected => "connected",
            HeadsetState::AudioActivating => "audio activating",
            HeadsetState::AudioActivationError => "audio activation error",
            HeadsetState::AudioActivated => "audio activated",
        };
        write!(f, "{}", name)
    }
}

/// Bluetooth headset link state and the most recently connected headset.
///
/// The cached headset resolves events that arrive with the generic "Bluetooth" name
/// while the profile handshake has not yet produced the real one.
#[derive(Debug, Clone)]
pub struct HeadsetTracker {
    state: HeadsetState,
    last_known: Option<AudioDevice>,
}

impl HeadsetTracker {
    pub fn new() -> Self {
        Self {
            state: HeadsetState::Disconnected,
            last_known: None,
        }
    }

    pub fn state(&self) -> HeadsetState {
        self.state
    }

    pub fn set_state(&mut self, state: HeadsetState) {
        if self.state != state {
            debug!("Headset state changed: {} -> {}", self.state, state);
            self.state = state;
        }
    }

    pub fn last_known(&self) -> Option<&AudioDevice> {
        self.last_known.as_ref()
    }

    /// Record a newly connected headset. Clears a previous activation error.
    pub fn headset_connected(&mut self, headset: &AudioDevice) {
        self.last_known = Some(headset.clone());
        if matches!(
            self.state,
            HeadsetState::Disconnected | HeadsetState::AudioActivationError
        ) {
            self.set_state(HeadsetState::Connected);
        }
    }

    /// Drop `headset` from the cache if it is the one remembered.
    pub fn forget(&mut self, headset: &AudioDevice) {
        if self.last_known.as_ref() == Some(headset) {
            self.last_known = None;
        }
    }

    pub fn evict(&mut self) -> Option<AudioDevice> {
        self.last_known.take()
    }

    /// Map a generically named Bluetooth device onto the cached headset.
    pub fn resolve(&self, device: AudioDevice) -> AudioDevice {
        match &self.last_known {
            Some(known) if device.is_kind(DeviceKind::BluetoothHeadset) && device.has_generic_name() => {
                debug!("Resolved generic Bluetooth device to {}", known);
                known.clone()
            }
            _ => device,
        }
    }

    pub fn has_activation_error(&self) -> bool {
        self.state == HeadsetState::AudioActivationError
    }

    pub fn reset(&mut self) {
        self.set_state(HeadsetState::Disconnected);
        self.last_known = None;
    }
}

impl Default for HeadsetTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_name_resolves_to_last_known() {
        let mut tracker = HeadsetTracker::new();
        tracker.headset_connected(&AudioDevice::bluetooth_headset("Car Kit"));

        let resolved = tracker.resolve(AudioDevice::unnamed(DeviceKind::BluetoothHeadset));
        assert_eq!(resolved, AudioDevice::bluetooth_headset("Car Kit"));

        let named = tracker.resolve(AudioDevice::bluetooth_headset("Buds"));
        assert_eq!(named.name, "Buds");
    }

    #[test]
    fn test_connect_clears_activation_error() {
        let mut tracker = HeadsetTracker::new();
        tracker.set_state(HeadsetState::AudioActivationError);
        tracker.headset_connected(&AudioDevice::bluetooth_headset("Buds"));
        assert_eq!(tracker.state(), HeadsetState::Connected);
    }

    #[test]
    fn test_connect_keeps_active_link() {
        let mut tracker = HeadsetTracker::new();
        tracker.set_state(HeadsetState::AudioActivated);
        tracker.headset_connected(&AudioDevice::bluetooth_headset("Buds"));
        assert_eq!(tracker.state(), HeadsetState::AudioActivated);
    }

    #[test]
    fn test_evict_empties_cache() {
        let mut tracker = HeadsetTracker::new();
        tracker.headset_connected(&AudioDevice::bluetooth_headset("Buds"));
        assert!(tracker.evict().is_some());
        assert!(tracker.last_known().is_none());
        let generic = AudioDevice::unnamed(DeviceKind::BluetoothHeadset);
        assert_eq!(tracker.resolve(generic.clone()), generic);
    }
}
