//! Runtime error types.

use thiserror::Error;
use tokenring_core::RingError;

/// Errors that end a run.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Invalid command line or configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Fatal protocol error from the coordinator
    #[error("protocol error: {0}")]
    Ring(#[from] RingError),
}
