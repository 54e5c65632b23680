//! Test utility builders for devices and configuration
//!
//! Individual helpers may not be used by all tests, so dead code warnings are suppressed.

#![allow(dead_code)]

use audio_route_switch::activation::RetrySettings;
use audio_route_switch::audio::{AudioDevice, DeviceKind};
use audio_route_switch::config::Config;
use audio_route_switch::selection::EngineSettings;
use std::time::Duration;

pub fn car_kit() -> AudioDevice {
    AudioDevice::bluetooth_headset("Car Kit")
}

pub fn buds() -> AudioDevice {
    AudioDevice::bluetooth_headset("Buds")
}

/// Builder for creating test Config instances
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.general.log_level = level.to_string();
        self
    }

    pub fn preferred(mut self, kinds: &[DeviceKind]) -> Self {
        self.config.routing.preferred_device_order = kinds.to_vec();
        self
    }

    pub fn without_focus(mut self) -> Self {
        self.config.routing.manage_audio_focus = false;
        self
    }

    pub fn retry(mut self, interval_ms: u64, timeout_ms: u64) -> Self {
        self.config.activation.retry_interval_ms = interval_ms;
        self.config.activation.timeout_ms = timeout_ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }

    pub fn to_toml(self) -> String {
        toml::to_string_pretty(&self.config).unwrap()
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test EngineSettings instances
pub struct SettingsBuilder {
    settings: EngineSettings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            settings: EngineSettings::default(),
        }
    }

    pub fn preferred(mut self, kinds: &[DeviceKind]) -> Self {
        self.settings.preferred_order = kinds.to_vec();
        self
    }

    pub fn without_focus(mut self) -> Self {
        self.settings.manage_audio_focus = false;
        self
    }

    pub fn retry(mut self, interval: Duration, timeout: Duration) -> Self {
        self.settings.retry = RetrySettings { interval, timeout };
        self
    }

    pub fn build(self) -> EngineSettings {
        self.settings
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
