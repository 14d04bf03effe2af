//! Error types for the scheduler crate.

use thiserror::Error;

/// Errors that can occur during scheduling operations.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// A control program could not be run.
    #[error("Driver error: {0}")]
    Driver(#[from] vmctld_driver::DriverError),

    /// A named state with this name is already stored.
    #[error("State {0} already exists")]
    StateExists(String),

    /// No named state with this name is stored.
    #[error("State {0} does not exist")]
    StateNotFound(String),
}

impl SchedulerError {
    /// Returns true if the failure came from the outside world rather than
    /// from the request itself.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        matches!(self, Self::Driver(_))
    }
}

/// A specialized Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;
