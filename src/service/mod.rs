pub mod runtime;
pub mod signals;

pub use runtime::{RouteCommand, RouteHandle, RouteService, RouteStatus};
pub use signals::{SignalHandler, SignalType};
