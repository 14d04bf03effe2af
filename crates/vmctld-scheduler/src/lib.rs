//! Action scheduler for vmctld.
//!
//! This crate sequences lifecycle actions across units. It handles:
//!
//! - Enumerating units through their kind's [`Driver`](vmctld_driver::Driver)
//! - The per-unit state machine and its cached configuration
//! - Ordering a set of units by declared startup priority
//! - A coalescing FIFO of pending actions drained by a single worker
//! - Named snapshots of unit sets for later replay
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Control loop                              │
//! └─────────────────────────────────────────────────────────────────┘
//!            │ plan                          │ enqueue / try_cancel
//!            ▼                               ▼
//! ┌──────────────────────┐      ┌───────────────────────────────────┐
//! │       Planner        │      │            Scheduler              │
//! │  start ↑ / stop ↓    │      │  ┌─────────────┐   ┌───────────┐  │
//! └──────────┬───────────┘      │  │ ActionQueue │──▶│  Worker   │  │
//!            │                  │  │ (coalesce)  │   │ (+ delay) │  │
//!            ▼                  │  └─────────────┘   └─────┬─────┘  │
//! ┌──────────────────────┐      └──────────────────────────┼────────┘
//! │  Registry            │                                 │
//! │  (list / find)       │──────▶ VirtualUnit ◀────────────┘
//! └──────────┬───────────┘             │
//!            ▼                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Drivers (qm / pct control programs)              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use vmctld_core::UnitCommand;
//! use vmctld_driver::DriverConfig;
//! use vmctld_scheduler::{Action, Planner, Registry, Scheduler, SchedulerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let planner = Planner::new(Registry::from_config(&DriverConfig::default()));
//! let scheduler = Scheduler::spawn(SchedulerConfig::default());
//!
//! // Start every onboot unit in ascending startup order.
//! for unit in planner.prepare_start::<&str>(&[]).await? {
//!     scheduler.enqueue(Action::new(UnitCommand::Start, unit));
//! }
//!
//! scheduler.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod daemon;
pub mod error;
pub mod lifecycle;
pub mod planner;
pub mod queue;
pub mod registry;
pub mod state;
pub mod types;
pub mod unit;

pub use daemon::Scheduler;
pub use error::{Result, SchedulerError};
pub use planner::Planner;
pub use queue::{Action, ActionQueue, EnqueueOutcome};
pub use registry::Registry;
pub use state::{StateStore, StoredState};
pub use types::SchedulerConfig;
pub use unit::VirtualUnit;
