//! Error types for route selection

use thiserror::Error;

use crate::selection::EngineState;

/// Errors surfaced to callers of the selection engine.
///
/// Hardware flakiness (a Bluetooth link that never comes up) is not represented here;
/// it is absorbed by the engine and only shows up as a change of selected device.
#[derive(Error, Debug)]
pub enum RouteError {
    /// The preferred device order could not be used
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// An operation was called in a state that does not allow it
    #[error("Cannot {operation} while {state}")]
    IllegalState {
        operation: &'static str,
        state: EngineState,
    },

    /// The hardware gateway refused to register or enumerate
    #[error("Hardware gateway error: {0}")]
    Gateway(#[from] anyhow::Error),
}

pub type RouteResult<T> = std::result::Result<T, RouteError>;
