use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::activation::RetrySettings;
use crate::audio::DeviceKind;
use crate::error::{RouteError, RouteResult};
use crate::priority::PriorityOrder;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub activation: ActivationConfig,

    #[serde(default)]
    pub logging: LogOutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Kinds moved ahead of the default order, most preferred first
    pub preferred_device_order: Vec<DeviceKind>,
    pub manage_audio_focus: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    pub retry_interval_ms: u64,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogOutputConfig {
    pub file_output: bool,
    pub json_format: bool,
    pub keep_days: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            preferred_device_order: Vec::new(),
            manage_audio_focus: true,
        }
    }
}

impl Default for ActivationConfig {
    fn default() -> Self {
        let defaults = RetrySettings::default();
        Self {
            retry_interval_ms: defaults.interval.as_millis() as u64,
            timeout_ms: defaults.timeout.as_millis() as u64,
        }
    }
}

impl Default for LogOutputConfig {
    fn default() -> Self {
        Self {
            file_output: false,
            json_format: false,
            keep_days: 7,
        }
    }
}

impl Config {
    /// Check everything the engine would reject before handing the config over
    pub fn validate(&self) -> RouteResult<()> {
        self.priority_order()?;

        if self.activation.retry_interval_ms == 0 {
            return Err(RouteError::InvalidConfiguration {
                reason: "activation.retry_interval_ms must be greater than zero".to_string(),
            });
        }
        if self.activation.timeout_ms == 0 {
            return Err(RouteError::InvalidConfiguration {
                reason: "activation.timeout_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn priority_order(&self) -> RouteResult<PriorityOrder> {
        PriorityOrder::new(&self.routing.preferred_device_order)
    }

    pub fn retry_settings(&self) -> RetrySettings {
        RetrySettings {
            interval: Duration::from_millis(self.activation.retry_interval_ms),
            timeout: Duration::from_millis(self.activation.timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.routing.manage_audio_focus);
        assert_eq!(config.retry_settings(), RetrySettings::default());
    }

    #[test]
    fn test_partial_sections_fill_in_defaults() {
        let config: Config = toml::from_str(
            r#"
[routing]
preferred_device_order = ["speakerphone", "bluetooth_headset"]

[activation]
timeout_ms = 3000
"#,
        )
        .unwrap();

        assert!(config.routing.manage_audio_focus);
        assert_eq!(config.activation.retry_interval_ms, 500);
        assert_eq!(config.retry_settings().timeout, Duration::from_millis(3000));
        assert_eq!(
            config.priority_order().unwrap().kinds(),
            &[
                DeviceKind::Speakerphone,
                DeviceKind::BluetoothHeadset,
                DeviceKind::WiredHeadset,
                DeviceKind::Earpiece
            ]
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_kinds() {
        let mut config = Config::default();
        config.routing.preferred_device_order =
            vec![DeviceKind::Earpiece, DeviceKind::Speakerphone, DeviceKind::Earpiece];

        let err = config.validate().unwrap_err();
        assert!(matches!(err, RouteError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.activation.retry_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_kind_fails_to_parse() {
        let result: Result<Config, _> = toml::from_str(
            r#"
[routing]
preferred_device_order = ["hdmi"]
"#,
        );
        assert!(result.is_err());
    }
}
