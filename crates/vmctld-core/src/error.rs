//! Common error types for vmctld.
//!
//! This module provides shared error types that are used across multiple crates.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur throughout the vmctld system.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A lifecycle command word was not recognized.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}
