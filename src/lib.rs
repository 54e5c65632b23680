pub mod activation;
pub mod audio;
pub mod config;
pub mod error;
pub mod logging;
pub mod priority;
pub mod scenario;
pub mod selection;
pub mod service;
pub mod system;

pub use audio::{AudioDevice, DeviceKind};
pub use config::Config;
pub use error::{RouteError, RouteResult};
pub use selection::{EngineSettings, EngineState, SelectionEngine};
pub use service::{RouteHandle, RouteService};
