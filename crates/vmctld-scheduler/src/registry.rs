//! Unit enumeration across drivers.
//!
//! The registry does not cache anything: every call asks the control
//! programs again and builds fresh [`VirtualUnit`]s.

use std::sync::Arc;

use tracing::warn;

use vmctld_driver::{Driver, DriverConfig, ProgramDriver, UnitListing};

use crate::unit::VirtualUnit;
use crate::Result;

/// Enumerates units over a list of drivers, in search order.
#[derive(Clone)]
pub struct Registry {
    drivers: Vec<Arc<dyn Driver>>,
}

impl Registry {
    /// Create a registry over `drivers`. Earlier drivers win name lookups.
    #[must_use]
    pub fn new(drivers: Vec<Arc<dyn Driver>>) -> Self {
        Self { drivers }
    }

    /// Containers first, then virtual machines.
    #[must_use]
    pub fn from_config(config: &DriverConfig) -> Self {
        let drivers: Vec<Arc<dyn Driver>> = vec![
            Arc::new(ProgramDriver::pct(config.pct_program.clone())),
            Arc::new(ProgramDriver::qm(config.qm_program.clone())),
        ];
        Self::new(drivers)
    }

    /// Every unit of every kind.
    ///
    /// # Errors
    ///
    /// Returns an error if a control program cannot be run.
    pub async fn all(&self) -> Result<Vec<VirtualUnit>> {
        let mut units = Vec::new();
        for driver in &self.drivers {
            for listing in list(driver).await? {
                units.push(build(driver, listing).await?);
            }
        }
        Ok(units)
    }

    /// Units flagged to start at boot.
    ///
    /// # Errors
    ///
    /// Returns an error if a control program cannot be run.
    pub async fn onboot(&self) -> Result<Vec<VirtualUnit>> {
        let mut units = Vec::new();
        for mut unit in self.all().await? {
            if unit.onboot().await? {
                units.push(unit);
            }
        }
        Ok(units)
    }

    /// Units currently running.
    ///
    /// # Errors
    ///
    /// Returns an error if a control program cannot be run.
    pub async fn running(&self) -> Result<Vec<VirtualUnit>> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .filter(VirtualUnit::running)
            .collect())
    }

    /// The first unit whose id or name equals `id_or_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if a control program cannot be run.
    pub async fn find(&self, id_or_name: &str) -> Result<Option<VirtualUnit>> {
        for driver in &self.drivers {
            let found = list(driver)
                .await?
                .into_iter()
                .find(|l| l.id == *id_or_name || l.name == id_or_name);
            if let Some(listing) = found {
                return Ok(Some(build(driver, listing).await?));
            }
        }
        Ok(None)
    }
}

async fn list(driver: &Arc<dyn Driver>) -> Result<Vec<UnitListing>> {
    let list = driver.list().await?;
    for row in &list.skipped {
        warn!(kind = %driver.kind(), row = %row, "Unable to parse line");
    }
    Ok(list.units)
}

async fn build(driver: &Arc<dyn Driver>, listing: UnitListing) -> Result<VirtualUnit> {
    let status = if driver.trusts_listed_status() {
        listing.status
    } else {
        driver.status(&listing.id).await?
    };
    Ok(VirtualUnit::new(
        Arc::clone(driver),
        listing.id,
        listing.name,
        status,
    ))
}
