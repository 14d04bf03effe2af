//! Ordering of unit sets by declared startup priority.

use tracing::warn;

use vmctld_core::{StartOrder, UnitCommand};

use crate::registry::Registry;
use crate::unit::VirtualUnit;
use crate::Result;

/// Turns user-supplied identifiers into ordered lists of units.
#[derive(Clone)]
pub struct Planner {
    registry: Registry,
}

impl Planner {
    /// Create a planner resolving units through `registry`.
    #[must_use]
    pub const fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// The registry units are resolved through.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Units to bring up, lowest declared order first.
    ///
    /// With no identifiers every onboot unit is selected. Units without a
    /// declared order come last.
    ///
    /// # Errors
    ///
    /// Returns an error if a control program cannot be run.
    pub async fn prepare_start<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<VirtualUnit>> {
        let units = if ids.is_empty() {
            self.registry.onboot().await?
        } else {
            self.resolve(ids).await?
        };
        start_order(units).await
    }

    /// Like [`prepare_start`](Self::prepare_start), but only the units in
    /// `ids` are ever selected. An empty or unresolvable list plans nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if a control program cannot be run.
    pub async fn prepare_start_exact<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> Result<Vec<VirtualUnit>> {
        start_order(self.resolve(ids).await?).await
    }

    /// Units to bring down, highest declared order first.
    ///
    /// With no identifiers every running unit is selected. Units without a
    /// declared order come first; ties keep resolution order.
    ///
    /// # Errors
    ///
    /// Returns an error if a control program cannot be run.
    pub async fn prepare_shutdown<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<VirtualUnit>> {
        let units = if ids.is_empty() {
            self.registry.running().await?
        } else {
            self.resolve(ids).await?
        };

        let mut keyed = with_orders(units).await?;
        keyed.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(keyed.into_iter().map(|(_, unit)| unit).collect())
    }

    /// The plan for `command`: start ordering for bring-up commands,
    /// shutdown ordering for the rest.
    ///
    /// # Errors
    ///
    /// Returns an error if a control program cannot be run.
    pub async fn plan<S: AsRef<str>>(
        &self,
        command: UnitCommand,
        ids: &[S],
    ) -> Result<Vec<VirtualUnit>> {
        if command.is_bring_up() {
            self.prepare_start(ids).await
        } else {
            self.prepare_shutdown(ids).await
        }
    }

    async fn resolve<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<VirtualUnit>> {
        let mut units = Vec::with_capacity(ids.len());
        for id in ids {
            let id = id.as_ref();
            match self.registry.find(id).await? {
                Some(unit) => units.push(unit),
                None => warn!(unit = %id, "Unknown VM or container"),
            }
        }
        Ok(units)
    }
}

async fn start_order(units: Vec<VirtualUnit>) -> Result<Vec<VirtualUnit>> {
    let mut keyed = with_orders(units).await?;
    keyed.sort_by_key(|(order, _)| *order);
    Ok(keyed.into_iter().map(|(_, unit)| unit).collect())
}

async fn with_orders(units: Vec<VirtualUnit>) -> Result<Vec<(StartOrder, VirtualUnit)>> {
    let mut keyed = Vec::with_capacity(units.len());
    for mut unit in units {
        let order = unit.order().await?;
        keyed.push((order, unit));
    }
    Ok(keyed)
}
