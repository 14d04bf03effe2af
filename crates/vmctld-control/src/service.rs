//! Dispatch of control commands onto the planner, scheduler and state
//! store.

use parking_lot::Mutex;
use tracing::{debug, info};

use vmctld_core::{UnitCommand, UnitId};
use vmctld_scheduler::{Action, EnqueueOutcome, Planner, Scheduler, SchedulerError, StateStore};

use crate::error::Result;
use crate::protocol::{ControlCommand, ListFilter};

/// Owns the daemon's scheduling state for the lifetime of the control loop.
pub struct ControlService {
    planner: Planner,
    scheduler: Scheduler,
    states: Mutex<StateStore>,
}

impl ControlService {
    /// Create a service around a running scheduler.
    #[must_use]
    pub fn new(planner: Planner, scheduler: Scheduler) -> Self {
        Self {
            planner,
            scheduler,
            states: Mutex::new(StateStore::new()),
        }
    }

    /// The scheduler actions are submitted to.
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Parse and run one control line.
    ///
    /// Returns the lines to print, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be parsed or the command fails.
    pub async fn dispatch(&self, line: &str) -> Result<Vec<String>> {
        let Some(command) = ControlCommand::parse(line)? else {
            return Ok(Vec::new());
        };
        debug!(?command, "Dispatching");

        match command {
            ControlCommand::Unit { command, ids } => {
                self.submit(command, &ids).await?;
                Ok(Vec::new())
            }
            ControlCommand::Save { name, ids } => {
                self.save(&name, &ids).await?;
                Ok(Vec::new())
            }
            ControlCommand::Load { name } => {
                self.load(&name).await?;
                Ok(Vec::new())
            }
            ControlCommand::List(filter) => self.list(filter).await,
            ControlCommand::States => Ok(self.states()),
            ControlCommand::Show { name } => self.show(&name),
        }
    }

    /// Plan `command` over `ids` and queue one action per unit.
    ///
    /// # Errors
    ///
    /// Returns an error if a control program cannot be run.
    pub async fn submit<S: AsRef<str>>(
        &self,
        command: UnitCommand,
        ids: &[S],
    ) -> Result<Vec<EnqueueOutcome>> {
        let units = self.planner.plan(command, ids).await?;
        Ok(units
            .into_iter()
            .map(|unit| self.scheduler.enqueue(Action::new(command, unit)))
            .collect())
    }

    /// Store the shutdown plan over `ids` under `name`.
    ///
    /// Returns the saved identifiers.
    ///
    /// # Errors
    ///
    /// Returns `StateExists` if `name` is taken, or an error if a control
    /// program cannot be run.
    pub async fn save<S: AsRef<str>>(&self, name: &str, ids: &[S]) -> Result<Vec<UnitId>> {
        if self.states.lock().contains(name) {
            return Err(SchedulerError::StateExists(name.to_string()).into());
        }

        let units: Vec<UnitId> = self
            .planner
            .prepare_shutdown(ids)
            .await?
            .iter()
            .map(|unit| unit.id().clone())
            .collect();

        let saved = self.states.lock().save(name, units)?.units.clone();
        info!(state = %name, units = saved.len(), "State saved");
        Ok(saved)
    }

    /// Queue a start of every unit in state `name`, then forget it.
    ///
    /// Units are ordered by their current startup order, not by the saved
    /// order. An empty state starts nothing. Returns the number of units
    /// planned.
    ///
    /// # Errors
    ///
    /// Returns `StateNotFound` if `name` is not stored, or an error if a
    /// control program cannot be run. The state is kept on error.
    pub async fn load(&self, name: &str) -> Result<usize> {
        let ids = self.states.lock().get(name)?.units.clone();

        let units = self.planner.prepare_start_exact(&ids).await?;
        let planned = units.len();
        for unit in units {
            self.scheduler.enqueue(Action::new(UnitCommand::Start, unit));
        }

        self.states.lock().remove(name);
        info!(state = %name, units = planned, "State loaded");
        Ok(planned)
    }

    /// `id, name` lines for the selected units.
    ///
    /// # Errors
    ///
    /// Returns an error if a control program cannot be run.
    pub async fn list(&self, filter: ListFilter) -> Result<Vec<String>> {
        let registry = self.planner.registry();
        let units = match filter {
            ListFilter::All => registry.all().await?,
            ListFilter::Running => registry.running().await?,
            ListFilter::Onboot => registry.onboot().await?,
        };
        Ok(units
            .iter()
            .map(|unit| format!("{}, {}", unit.id(), unit.name()))
            .collect())
    }

    /// One line per saved state: name, unit count and save time.
    #[must_use]
    pub fn states(&self) -> Vec<String> {
        let states = self.states.lock();
        states
            .names()
            .into_iter()
            .filter_map(|name| {
                let state = states.get(name).ok()?;
                Some(format!(
                    "{name}: {} units, saved {}",
                    state.units.len(),
                    state.saved_at.to_rfc3339()
                ))
            })
            .collect()
    }

    /// The saved identifiers of state `name`, one per line.
    ///
    /// # Errors
    ///
    /// Returns `StateNotFound` if `name` is not stored.
    pub fn show(&self, name: &str) -> Result<Vec<String>> {
        let states = self.states.lock();
        let state = states.get(name)?;
        Ok(state.units.iter().map(ToString::to_string).collect())
    }

    /// Stop the scheduler, dropping pending actions.
    pub async fn shutdown(self) {
        self.scheduler.shutdown().await;
    }
}
