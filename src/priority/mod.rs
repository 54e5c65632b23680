pub mod order;

pub use order::{DEFAULT_ORDER, PriorityOrder};
