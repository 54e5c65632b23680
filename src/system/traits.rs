use anyhow::Result;
use std::path::Path;
use tokio::time::Instant;

use crate::audio::AudioDevice;
use crate::system::events::HardwareEventSender;

/// Trait for the platform audio stack - device discovery plus the low-level routing
/// primitives the selection engine drives.
pub trait HardwareGateway {
    /// Start delivering connect/disconnect events on `events`
    fn add_device_listener(&self, events: HardwareEventSender) -> Result<()>;

    /// Stop delivering events; the sender handed over earlier is dropped
    fn remove_device_listener(&self) -> Result<()>;

    /// Devices reachable right now, used to seed the catalog on start
    fn enumerate_devices(&self) -> Result<Vec<AudioDevice>>;

    /// Whether `device` can carry audio at this moment
    fn is_reachable(&self, device: &AudioDevice) -> bool;

    /// Whether the handset has a built-in earpiece
    fn has_earpiece(&self) -> bool;

    fn enable_bluetooth_link(&self, enable: bool) -> Result<()>;

    fn enable_speaker(&self, enable: bool) -> Result<()>;

    /// Acquire audio focus for the call
    fn set_focus(&self) -> Result<()>;

    fn mute(&self, mute: bool) -> Result<()>;

    /// Remember audio mode, mute and speaker state so they can be put back later
    fn cache_state(&self) -> Result<()>;

    /// Put back what `cache_state` saved and release audio focus
    fn restore_state(&self) -> Result<()>;
}

/// Trait for file system operations - abstracts std::fs for testability
pub trait FileSystemInterface {
    /// Read the entire contents of a configuration file
    fn read_config_file(&self, path: &Path) -> Result<String>;

    /// Write configuration content to a file
    fn write_config_file(&self, path: &Path, content: &str) -> Result<()>;

    /// Check if a configuration file exists
    fn config_file_exists(&self, path: &Path) -> bool;

    /// Create the directory structure for config files
    fn create_config_dir(&self, path: &Path) -> Result<()>;

    /// Get the last modified time of a config file (for watching changes)
    fn get_config_modified_time(&self, path: &Path) -> Result<std::time::SystemTime>;
}

/// Time source for retry scheduling
pub trait Clock {
    fn now(&self) -> Instant;
}
