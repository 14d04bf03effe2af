//! Lifecycle vocabulary shared by the driver, scheduler and control crates.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Last known lifecycle status of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// Status could not be determined.
    #[default]
    Unknown,
    /// Unit is not running.
    Stopped,
    /// Unit is running.
    Running,
    /// Unit is suspended in memory.
    Paused,
}

impl UnitStatus {
    /// Parse a status token as printed by a control program.
    ///
    /// Anything other than `stopped`, `running` or `paused` maps to
    /// [`UnitStatus::Unknown`].
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token {
            "stopped" => Self::Stopped,
            "running" => Self::Running,
            "paused" => Self::Paused,
            _ => Self::Unknown,
        }
    }

    /// The token used for this status on the wire and in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle command that can be applied to a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitCommand {
    /// Boot the unit.
    Start,
    /// Gracefully shut the unit down.
    Shutdown,
    /// Resume a suspended unit.
    Resume,
    /// Suspend the unit to memory.
    Suspend,
    /// Suspend the unit to disk.
    Hibernate,
    /// Forcefully stop the unit.
    Stop,
}

impl UnitCommand {
    /// All commands, in protocol order.
    pub const ALL: [Self; 6] = [
        Self::Start,
        Self::Shutdown,
        Self::Resume,
        Self::Suspend,
        Self::Hibernate,
        Self::Stop,
    ];

    /// The protocol word for this command.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Shutdown => "shutdown",
            Self::Resume => "resume",
            Self::Suspend => "suspend",
            Self::Hibernate => "hibernate",
            Self::Stop => "stop",
        }
    }

    /// Returns true for commands that bring units up.
    ///
    /// Bring-up commands are planned in ascending start order, tear-down
    /// commands in descending order.
    #[must_use]
    pub const fn is_bring_up(&self) -> bool {
        matches!(self, Self::Start | Self::Resume)
    }
}

impl fmt::Display for UnitCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitCommand {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.as_str() == s)
            .ok_or_else(|| CoreError::UnknownCommand(s.to_string()))
    }
}

/// Parsed `startup` configuration entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartupSpec {
    /// Declared start priority, lower starts first.
    pub order: Option<i64>,
    /// Seconds to wait after starting before the next action.
    pub up: Option<u64>,
}

impl StartupSpec {
    /// Parse a comma-separated `key=value` list such as `order=5,up=30`.
    ///
    /// Items without `=` and values that are not integers are ignored.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let mut spec = Self::default();
        for (key, val) in value.split(',').filter_map(|item| item.split_once('=')) {
            match key.trim() {
                "order" => spec.order = val.trim().parse().ok(),
                "up" => spec.up = val.trim().parse().ok(),
                _ => {}
            }
        }
        spec
    }
}

/// Sort key derived from a unit's declared startup order.
///
/// A declared order compares numerically; an undeclared order compares
/// greater than every declared one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StartOrder(Option<i64>);

impl StartOrder {
    /// The key for units without a declared order.
    pub const UNDECLARED: Self = Self(None);

    /// The key for a declared order.
    #[must_use]
    pub const fn declared(order: i64) -> Self {
        Self(Some(order))
    }
}

impl From<Option<i64>> for StartOrder {
    fn from(value: Option<i64>) -> Self {
        Self(value)
    }
}

impl Ord for StartOrder {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl PartialOrd for StartOrder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Configuration of a unit as reported by its control program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitConfig(BTreeMap<String, String>);

impl UnitConfig {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a raw value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the configuration has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the unit is flagged to start at boot (`onboot: 1`).
    #[must_use]
    pub fn onboot(&self) -> bool {
        self.get("onboot") == Some("1")
    }

    /// The parsed `startup` entry, or the default when the key is absent.
    #[must_use]
    pub fn startup(&self) -> StartupSpec {
        self.get("startup").map(StartupSpec::parse).unwrap_or_default()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for UnitConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
