//! Error types for the control loop.
//!
//! Every error here is reported on the log and the loop moves on to the
//! next line; none of them stops the daemon.

use thiserror::Error;

/// A result type using `ControlError`.
pub type Result<T> = std::result::Result<T, ControlError>;

/// Errors that can occur while handling a control line.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The first word of the line is not a known command.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A command was given without its required argument.
    #[error("{command} requires a {argument}")]
    MissingArgument {
        /// The command word.
        command: &'static str,
        /// What was missing.
        argument: &'static str,
    },

    /// `list` was given a filter it does not know.
    #[error("Unknown list filter: {0}")]
    UnknownFilter(String),

    /// Scheduling, state store or driver failure.
    #[error(transparent)]
    Scheduler(#[from] vmctld_scheduler::SchedulerError),
}

impl ControlError {
    /// Returns true if the line itself was malformed.
    #[must_use]
    pub const fn is_syntax(&self) -> bool {
        matches!(
            self,
            Self::UnknownCommand(_) | Self::MissingArgument { .. } | Self::UnknownFilter(_)
        )
    }
}
