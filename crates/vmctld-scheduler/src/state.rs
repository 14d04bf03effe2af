//! Named snapshots of unit sets.
//!
//! States live only in memory. Each one is the identifier list of a
//! shutdown plan, kept until it is loaded back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use vmctld_core::UnitId;

use crate::error::SchedulerError;
use crate::Result;

/// A saved set of units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredState {
    /// Unit identifiers in the order they were planned.
    pub units: Vec<UnitId>,
    /// When the state was saved.
    pub saved_at: DateTime<Utc>,
}

impl StoredState {
    /// Capture `units` now.
    #[must_use]
    pub fn new(units: Vec<UnitId>) -> Self {
        Self {
            units,
            saved_at: Utc::now(),
        }
    }
}

/// In-memory map of named states.
#[derive(Debug, Default)]
pub struct StateStore {
    states: HashMap<String, StoredState>,
}

impl StateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `units` under `name`.
    ///
    /// # Errors
    ///
    /// Returns `StateExists` if `name` is taken; the store is unchanged.
    pub fn save(&mut self, name: &str, units: Vec<UnitId>) -> Result<&StoredState> {
        if self.states.contains_key(name) {
            return Err(SchedulerError::StateExists(name.to_string()));
        }
        debug!(state = %name, units = units.len(), "Saving state");
        Ok(self
            .states
            .entry(name.to_string())
            .or_insert_with(|| StoredState::new(units)))
    }

    /// Look up a state.
    ///
    /// # Errors
    ///
    /// Returns `StateNotFound` if nothing is stored under `name`.
    pub fn get(&self, name: &str) -> Result<&StoredState> {
        self.states
            .get(name)
            .ok_or_else(|| SchedulerError::StateNotFound(name.to_string()))
    }

    /// Drop a state, returning it if it existed.
    pub fn remove(&mut self, name: &str) -> Option<StoredState> {
        self.states.remove(name)
    }

    /// Whether `name` is stored.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// Stored names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.states.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of stored states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<UnitId> {
        raw.iter().map(|s| UnitId::from(*s)).collect()
    }

    #[test]
    fn save_and_get() {
        let mut store = StateStore::new();
        store.save("night", ids(&["101", "100"])).unwrap();

        let state = store.get("night").unwrap();
        assert_eq!(state.units, ids(&["101", "100"]));
        assert!(store.contains("night"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicate_save_leaves_store_unchanged() {
        let mut store = StateStore::new();
        store.save("night", ids(&["100"])).unwrap();

        let err = store.save("night", ids(&["200"])).unwrap_err();
        assert!(matches!(err, SchedulerError::StateExists(ref n) if n == "night"));
        assert_eq!(store.get("night").unwrap().units, ids(&["100"]));
    }

    #[test]
    fn missing_state() {
        let store = StateStore::new();
        let err = store.get("x").unwrap_err();
        assert!(matches!(err, SchedulerError::StateNotFound(ref n) if n == "x"));
    }

    #[test]
    fn remove_and_names() {
        let mut store = StateStore::new();
        store.save("b", Vec::new()).unwrap();
        store.save("a", ids(&["1"])).unwrap();
        assert_eq!(store.names(), vec!["a", "b"]);

        assert!(store.remove("a").is_some());
        assert!(store.remove("a").is_none());
        assert_eq!(store.names(), vec!["b"]);
        assert!(!store.is_empty());
    }

    #[test]
    fn stored_state_serializes() {
        let state = StoredState::new(ids(&["100"]));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["units"], serde_json::json!(["100"]));
        assert!(json["saved_at"].is_string());
    }
}
