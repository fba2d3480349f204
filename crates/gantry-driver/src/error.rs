//! Error types for gantry-driver

use crate::driver::RunState;
use thiserror::Error;

/// Result type for gantry-driver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a job
#[derive(Debug, Error)]
pub enum Error {
    /// A run phase was called out of order
    ///
    /// The driver state is left untouched.
    #[error("cannot {operation} while the driver is {state}")]
    IllegalStateTransition {
        operation: &'static str,
        state: RunState,
    },

    /// Job setup steps called out of order
    #[error("job setup out of order: {0}")]
    Setup(String),

    /// The simulation engine reported a failure
    #[error("engine error: {0}")]
    Engine(String),

    #[error("core error: {0}")]
    Core(#[from] gantry_core::Error),

    #[error("geometry error: {0}")]
    Geometry(#[from] gantry_geometry::Error),
}

impl Error {
    pub fn engine(message: impl Into<String>) -> Self {
        Error::Engine(message.into())
    }
}

fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}
