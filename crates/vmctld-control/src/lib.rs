//! Control loop for vmctld.
//!
//! Reads one command per line and turns it into scheduled unit actions,
//! saved states or listings.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     stdin (line protocol)                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ ControlCommand::parse
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ControlService                        │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │   Planner   │ │ StateStore  │ │     Scheduler       │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use vmctld_control::ControlService;
//! use vmctld_driver::DriverConfig;
//! use vmctld_scheduler::{Planner, Registry, Scheduler, SchedulerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let planner = Planner::new(Registry::from_config(&DriverConfig::default()));
//! let control = ControlService::new(planner, Scheduler::spawn(SchedulerConfig::default()));
//!
//! control.dispatch("save night").await?;
//! control.dispatch("shutdown").await?;
//! for line in control.dispatch("states").await? {
//!     println!("{line}");
//! }
//!
//! control.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod protocol;
pub mod server;
pub mod service;

pub use error::{ControlError, Result};
pub use protocol::{ControlCommand, ListFilter};
pub use server::serve;
pub use service::ControlService;
