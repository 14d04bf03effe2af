//! Types for the driver crate.

use serde::{Deserialize, Serialize};
use vmctld_core::{UnitId, UnitStatus};

/// One row of a control program's `list` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitListing {
    /// Unit identifier.
    pub id: UnitId,
    /// Human label, possibly empty.
    pub name: String,
    /// Status as printed in the listing.
    pub status: UnitStatus,
}

impl UnitListing {
    /// Create a listing row.
    #[must_use]
    pub fn new(id: impl Into<UnitId>, name: impl Into<String>, status: UnitStatus) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
        }
    }
}

/// Parsed `list` output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitList {
    /// Rows that parsed.
    pub units: Vec<UnitListing>,
    /// Raw rows that did not match the expected column layout.
    pub skipped: Vec<String>,
}

/// Locations of the control programs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Program governing virtual machines.
    pub qm_program: String,
    /// Program governing containers.
    pub pct_program: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            qm_program: "qm".to_string(),
            pct_program: "pct".to_string(),
        }
    }
}

impl DriverConfig {
    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `VMCTLD_QM_PROGRAM`: path of the VM control program
    /// - `VMCTLD_PCT_PROGRAM`: path of the container control program
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("VMCTLD_QM_PROGRAM") {
            config.qm_program = val;
        }
        if let Ok(val) = std::env::var("VMCTLD_PCT_PROGRAM") {
            config.pct_program = val;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_config_defaults() {
        let config = DriverConfig::default();
        assert_eq!(config.qm_program, "qm");
        assert_eq!(config.pct_program, "pct");
    }
}
