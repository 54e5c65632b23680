pub mod catalog;
pub mod device;

pub use catalog::DeviceCatalog;
pub use device::{AudioDevice, DeviceKind, LinkRequest, RoutePlan};
