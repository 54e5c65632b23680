pub mod engine;
pub mod headset;

pub use engine::{DeviceChangeListener, EngineSettings, EngineState, SelectionEngine};
pub use headset::{HeadsetState, HeadsetTracker};
