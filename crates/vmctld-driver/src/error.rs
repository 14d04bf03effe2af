//! Error types for the driver crate.

use thiserror::Error;

/// Errors that can occur while talking to a control program.
///
/// A lifecycle command that runs but exits non-zero is not an error. Only
/// failures to run the program at all, or to read what it printed, surface
/// here.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The control program could not be spawned.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The control program printed something that could not be interpreted.
    #[error("unexpected output from {program}: {message}")]
    Output {
        /// Program whose output was rejected.
        program: String,
        /// What was wrong with it.
        message: String,
    },
}

impl DriverError {
    /// Name of the program involved in the failure.
    #[must_use]
    pub fn program(&self) -> &str {
        match self {
            Self::Spawn { program, .. } | Self::Output { program, .. } => program,
        }
    }
}

/// A specialized Result type for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;
