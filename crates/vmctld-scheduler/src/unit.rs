//! The in-memory record of a single unit.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use vmctld_core::{StartOrder, UnitCommand, UnitConfig, UnitId, UnitKind, UnitStatus};
use vmctld_driver::Driver;

use crate::lifecycle;
use crate::Result;

/// A virtual machine or container, as last seen by the daemon.
///
/// Instances are built fresh by every enumeration. The status is the last
/// known one: it is not revalidated before a transition, and a transition
/// that ran updates it regardless of the control program's exit code.
pub struct VirtualUnit {
    driver: Arc<dyn Driver>,
    id: UnitId,
    name: String,
    status: UnitStatus,
    config: Option<UnitConfig>,
}

impl VirtualUnit {
    /// Create a unit governed by `driver`.
    #[must_use]
    pub fn new(
        driver: Arc<dyn Driver>,
        id: impl Into<UnitId>,
        name: impl Into<String>,
        status: UnitStatus,
    ) -> Self {
        Self {
            driver,
            id: id.into(),
            name: name.into(),
            status,
            config: None,
        }
    }

    /// The unit's identifier.
    #[must_use]
    pub const fn id(&self) -> &UnitId {
        &self.id
    }

    /// The unit's human label, possibly empty.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name if set, identifier otherwise.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }

    /// The kind of the governing driver.
    #[must_use]
    pub fn kind(&self) -> UnitKind {
        self.driver.kind()
    }

    /// Last known status.
    #[must_use]
    pub const fn status(&self) -> UnitStatus {
        self.status
    }

    /// Whether the unit is known to be running.
    #[must_use]
    pub fn running(&self) -> bool {
        self.status == UnitStatus::Running
    }

    /// Whether `id_or_name` refers to this unit.
    #[must_use]
    pub fn matches(&self, id_or_name: &str) -> bool {
        self.id == *id_or_name || self.name == id_or_name
    }

    /// The unit's configuration, fetched on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the control program cannot be run.
    pub async fn config(&mut self) -> Result<&UnitConfig> {
        if self.config.is_none() {
            let config = self.driver.config(&self.id).await?;
            self.config = Some(config);
        }
        Ok(self.config.get_or_insert_with(UnitConfig::default))
    }

    /// Re-fetch the configuration, replacing the cached copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the control program cannot be run.
    pub async fn refresh_config(&mut self) -> Result<&UnitConfig> {
        let config = self.driver.config(&self.id).await?;
        Ok(self.config.insert(config))
    }

    /// Whether the unit is flagged to start at boot.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be fetched.
    pub async fn onboot(&mut self) -> Result<bool> {
        Ok(self.config().await?.onboot())
    }

    /// Sort key from the declared startup order.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be fetched.
    pub async fn order(&mut self) -> Result<StartOrder> {
        Ok(self.config().await?.startup().order.into())
    }

    /// Declared pause after start-up, in seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be fetched.
    pub async fn delay_up(&mut self) -> Result<Option<u64>> {
        Ok(self.config().await?.startup().up)
    }

    /// Apply a lifecycle command.
    ///
    /// Returns `Ok(true)` if the control program was run. Commands that are
    /// no-ops for the current status, and every command in dry-run mode,
    /// return `Ok(false)` and leave the status unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the control program cannot be spawned; the
    /// status is left unchanged in that case.
    pub async fn apply(&mut self, command: UnitCommand, dry_run: bool) -> Result<bool> {
        let transition = lifecycle::transition_for(command);

        if transition.is_noop(self.status) {
            debug!(
                unit = %self.id,
                command = %command,
                status = %self.status,
                "Command is a no-op for current status"
            );
            return Ok(false);
        }

        if dry_run {
            info!(
                unit = %self.id,
                name = %self.label(),
                target = %transition.target,
                "Dry run, not executing {command}"
            );
            return Ok(false);
        }

        self.driver.execute(command, &self.id).await?;
        info!(
            unit = %self.id,
            name = %self.label(),
            command = %command,
            from = %self.status,
            to = %transition.target,
            "Unit transitioned"
        );
        self.status = transition.target;
        Ok(true)
    }
}

impl fmt::Debug for VirtualUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualUnit")
            .field("kind", &self.kind())
            .field("id", &self.id)
            .field("name", &self.name)
            .field("status", &self.status)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
