pub mod adapters;
pub mod events;
pub mod traits;

// Mock implementations for testing
#[cfg(any(test, feature = "test-mocks"))]
pub mod mocks;

pub use adapters::*;
pub use events::*;
pub use traits::*;

#[cfg(any(test, feature = "test-mocks"))]
pub use mocks::*;
