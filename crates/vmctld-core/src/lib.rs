//! Core types and utilities for vmctld.
//!
//! This crate provides the foundational types used throughout the daemon:
//!
//! - **Identifiers**: [`UnitId`] and the [`UnitKind`] that governs a unit
//! - **Lifecycle vocabulary**: [`UnitStatus`] and [`UnitCommand`]
//! - **Configuration**: [`UnitConfig`] and its parsed [`StartupSpec`]
//! - **Error types**: Common error definitions shared across crates
//!
//! # Example
//!
//! ```
//! use vmctld_core::{StartOrder, UnitCommand, UnitConfig, UnitStatus};
//!
//! let command: UnitCommand = "hibernate".parse().unwrap();
//! assert_eq!(command, UnitCommand::Hibernate);
//!
//! assert_eq!(UnitStatus::from_token("paused"), UnitStatus::Paused);
//!
//! let config = UnitConfig::from_iter([("startup", "order=5,up=30")]);
//! assert_eq!(config.startup().order, Some(5));
//! assert!(StartOrder::declared(5) < StartOrder::UNDECLARED);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod types;

pub use error::{CoreError, Result};
pub use ids::{UnitId, UnitKind};
pub use types::{StartOrder, StartupSpec, UnitCommand, UnitConfig, UnitStatus};
