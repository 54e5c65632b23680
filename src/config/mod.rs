pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::{ActivationConfig, Config, GeneralConfig, LogOutputConfig, RoutingConfig};
