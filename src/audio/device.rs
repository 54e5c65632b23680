use serde::{Deserialize, Serialize};
use std::fmt;

/// The four kinds of route a call can be carried on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    BluetoothHeadset,
    WiredHeadset,
    Earpiece,
    Speakerphone,
}

/// What the hardware has to look like for audio to flow through a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePlan {
    pub speaker_enabled: bool,
    pub bluetooth_link: LinkRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRequest {
    Enable,
    Disable,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 4] = [
        DeviceKind::BluetoothHeadset,
        DeviceKind::WiredHeadset,
        DeviceKind::Earpiece,
        DeviceKind::Speakerphone,
    ];

    /// Name used when the platform reports a device without one.
    pub fn default_name(self) -> &'static str {
        match self {
            DeviceKind::BluetoothHeadset => "Bluetooth",
            DeviceKind::WiredHeadset => "Wired Headset",
            DeviceKind::Earpiece => "Earpiece",
            DeviceKind::Speakerphone => "Speakerphone",
        }
    }

    /// Activation lookup table.
    pub const fn route_plan(self) -> RoutePlan {
        match self {
            DeviceKind::BluetoothHeadset => RoutePlan {
                speaker_enabled: false,
                bluetooth_link: LinkRequest::Enable,
            },
            DeviceKind::WiredHeadset | DeviceKind::Earpiece => RoutePlan {
                speaker_enabled: false,
                bluetooth_link: LinkRequest::Disable,
            },
            DeviceKind::Speakerphone => RoutePlan {
                speaker_enabled: true,
                bluetooth_link: LinkRequest::Disable,
            },
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::BluetoothHeadset => write!(f, "BluetoothHeadset"),
            DeviceKind::WiredHeadset => write!(f, "WiredHeadset"),
            DeviceKind::Earpiece => write!(f, "Earpiece"),
            DeviceKind::Speakerphone => write!(f, "Speakerphone"),
        }
    }
}

/// An audio route, identified by `(kind, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioDevice {
    pub kind: DeviceKind,
    pub name: String,
}

impl AudioDevice {
    pub fn new(kind: DeviceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Device of `kind` carrying the platform's generic name.
    pub fn unnamed(kind: DeviceKind) -> Self {
        Self::new(kind, kind.default_name())
    }

    pub fn bluetooth_headset(name: impl Into<String>) -> Self {
        Self::new(DeviceKind::BluetoothHeadset, name)
    }

    pub fn wired_headset() -> Self {
        Self::unnamed(DeviceKind::WiredHeadset)
    }

    pub fn earpiece() -> Self {
        Self::unnamed(DeviceKind::Earpiece)
    }

    pub fn speakerphone() -> Self {
        Self::unnamed(DeviceKind::Speakerphone)
    }

    pub fn is_kind(&self, kind: DeviceKind) -> bool {
        self.kind == kind
    }

    /// True when the name is the generic placeholder and identity cannot be told apart.
    pub fn has_generic_name(&self) -> bool {
        self.name == self.kind.default_name()
    }
}

impl fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_generic_name() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}({})", self.kind, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_kind_and_name() {
        assert_eq!(
            AudioDevice::bluetooth_headset("Car Kit"),
            AudioDevice::bluetooth_headset("Car Kit")
        );
        assert_ne!(
            AudioDevice::bluetooth_headset("Car Kit"),
            AudioDevice::bluetooth_headset("Buds")
        );
        assert_ne!(
            AudioDevice::new(DeviceKind::WiredHeadset, "Jack"),
            AudioDevice::new(DeviceKind::Earpiece, "Jack")
        );
    }

    #[test]
    fn test_route_plan_table() {
        let bluetooth = DeviceKind::BluetoothHeadset.route_plan();
        assert!(!bluetooth.speaker_enabled);
        assert_eq!(bluetooth.bluetooth_link, LinkRequest::Enable);

        let speaker = DeviceKind::Speakerphone.route_plan();
        assert!(speaker.speaker_enabled);
        assert_eq!(speaker.bluetooth_link, LinkRequest::Disable);

        for kind in [DeviceKind::WiredHeadset, DeviceKind::Earpiece] {
            let plan = kind.route_plan();
            assert!(!plan.speaker_enabled);
            assert_eq!(plan.bluetooth_link, LinkRequest::Disable);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(AudioDevice::earpiece().to_string(), "Earpiece");
        assert_eq!(
            AudioDevice::bluetooth_headset("Car Kit").to_string(),
            "BluetoothHeadset(Car Kit)"
        );
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let kind: DeviceKind = toml::Value::String("wired_headset".into())
            .try_into()
            .unwrap();
        assert_eq!(kind, DeviceKind::WiredHeadset);
    }
}
