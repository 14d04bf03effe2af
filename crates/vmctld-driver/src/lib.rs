//! Control program drivers for vmctld.
//!
//! Every unit kind is governed by an external control program (`qm` for
//! virtual machines, `pct` for containers). This crate exposes that program
//! as a [`Driver`] capability trait:
//!
//! - lifecycle calls (`start`, `shutdown`, `resume`, `suspend`, `hibernate`,
//!   `stop`) that spawn the program and wait for it to exit
//! - introspection calls (`config`, `status`, `list`) that capture and parse
//!   its standard output
//!
//! [`ProgramDriver`] implements the trait by looking up the arguments for
//! each capability in a per-kind [`CommandTable`]. Kinds that cannot truly
//! suspend alias those capabilities in their table.
//!
//! # Example
//!
//! ```no_run
//! use vmctld_core::UnitId;
//! use vmctld_driver::{Driver, ProgramDriver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let qm = ProgramDriver::qm("qm");
//! for unit in qm.list().await?.units {
//!     println!("{} {} {}", unit.id, unit.name, unit.status);
//! }
//! qm.start(&UnitId::new("100")).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Testing
//!
//! Enable the `test-utils` feature to get an in-memory [`MockDriver`] that
//! records every call it receives.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod driver;
pub mod error;
pub mod parse;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use driver::{CommandTable, Driver, Invocation, ListFormat, ProgramDriver};
pub use error::{DriverError, Result};
pub use types::{DriverConfig, UnitListing, UnitList};

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{DriverCall, DriverOp, MockDriver};
