use tracing::debug;

use super::device::{AudioDevice, DeviceKind};
use crate::priority::PriorityOrder;

/// The set of devices currently reported available.
///
/// Storage keeps first-seen order; [`DeviceCatalog::snapshot`] sorts on demand so a
/// priority change at runtime never leaves a stale ordering behind.
#[derive(Debug, Clone, Default)]
pub struct DeviceCatalog {
    devices: Vec<AudioDevice>,
}

impl DeviceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the device was not already present.
    pub fn add(&mut self, device: AudioDevice) -> bool {
        if self.devices.contains(&device) {
            return false;
        }
        debug!("Catalog add: {}", device);
        self.devices.push(device);
        true
    }

    /// Returns true if a device with the same identity was removed.
    pub fn remove(&mut self, device: &AudioDevice) -> bool {
        let before = self.devices.len();
        self.devices.retain(|d| d != device);
        let removed = self.devices.len() != before;
        if removed {
            debug!("Catalog remove: {}", device);
        }
        removed
    }

    /// Drops every device of `kind` regardless of name.
    pub fn remove_all_of_kind(&mut self, kind: DeviceKind) -> bool {
        let before = self.devices.len();
        self.devices.retain(|d| d.kind != kind);
        let removed = before - self.devices.len();
        if removed > 0 {
            debug!("Catalog removed {} {} device(s)", removed, kind);
        }
        removed > 0
    }

    pub fn contains(&self, device: &AudioDevice) -> bool {
        self.devices.contains(device)
    }

    pub fn contains_kind(&self, kind: DeviceKind) -> bool {
        self.devices.iter().any(|d| d.kind == kind)
    }

    /// Devices ordered by `order`; same-kind devices stay in first-seen order.
    pub fn snapshot(&self, order: &PriorityOrder) -> Vec<AudioDevice> {
        let mut devices = self.devices.clone();
        devices.sort_by(|a, b| order.compare(a, b));
        devices
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
