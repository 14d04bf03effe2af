//! Types for the scheduler crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the scheduler worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Log transitions instead of invoking control programs.
    pub dry_run: bool,
    /// Length of one `up` unit in a unit's startup configuration.
    pub delay_scale: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            delay_scale: Duration::from_secs(1),
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `VMCTLD_DRY_RUN`: `1`/`true` to log transitions without running them
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("VMCTLD_DRY_RUN") {
            config.dry_run = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        config
    }

    /// The pause after starting a unit that declares `up` seconds.
    #[must_use]
    pub fn startup_delay(&self, up: u64) -> Duration {
        self.delay_scale
            .saturating_mul(u32::try_from(up).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_config_defaults() {
        let config = SchedulerConfig::default();
        assert!(!config.dry_run);
        assert_eq!(config.delay_scale, Duration::from_secs(1));
    }

    #[test]
    fn startup_delay_scales() {
        let config = SchedulerConfig::default();
        assert_eq!(config.startup_delay(30), Duration::from_secs(30));
        assert_eq!(config.startup_delay(0), Duration::ZERO);

        let config = SchedulerConfig {
            delay_scale: Duration::from_millis(10),
            ..Default::default()
        };
        assert_eq!(config.startup_delay(30), Duration::from_millis(300));
    }
}
