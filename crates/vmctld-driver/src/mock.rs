//! In-memory driver for tests.
//!
//! [`MockDriver`] keeps its units in memory, updates their status when a
//! lifecycle capability is invoked, and records every call with the tokio
//! clock so tests can assert on ordering and timing. A held mock blocks
//! every call after recording it, until released.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;

use vmctld_core::{UnitConfig, UnitId, UnitKind, UnitStatus};

use crate::driver::Driver;
use crate::types::{UnitList, UnitListing};
use crate::{DriverError, Result};

/// A capability invoked on the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverOp {
    /// `start`
    Start,
    /// `shutdown`
    Shutdown,
    /// `resume`
    Resume,
    /// `suspend`
    Suspend,
    /// `hibernate`
    Hibernate,
    /// `stop`
    Stop,
    /// `config`
    Config,
    /// `status`
    Status,
    /// `list`
    List,
}

impl DriverOp {
    /// Returns true for operations that change a unit's state.
    #[must_use]
    pub const fn is_lifecycle(&self) -> bool {
        !matches!(self, Self::Config | Self::Status | Self::List)
    }
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverCall {
    /// Operation performed.
    pub op: DriverOp,
    /// Target unit, `None` for `list`.
    pub id: Option<UnitId>,
    /// When the call was received.
    pub at: Instant,
}

struct MockUnit {
    id: UnitId,
    name: String,
    status: UnitStatus,
    listed_status: Option<UnitStatus>,
    config: UnitConfig,
}

/// A mock driver that stores units in memory.
pub struct MockDriver {
    kind: UnitKind,
    units: Mutex<Vec<MockUnit>>,
    calls: Mutex<Vec<DriverCall>>,
    broken: AtomicBool,
    held: watch::Sender<bool>,
}

impl MockDriver {
    /// Create an empty mock for the given kind.
    ///
    /// Container mocks trust their listed status and alias
    /// `resume`/`suspend`/`hibernate` to `start`/`shutdown`/`shutdown`.
    #[must_use]
    pub fn new(kind: UnitKind) -> Self {
        Self {
            kind,
            units: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            broken: AtomicBool::new(false),
            held: watch::channel(false).0,
        }
    }

    /// Empty VM mock.
    #[must_use]
    pub fn vm() -> Self {
        Self::new(UnitKind::Vm)
    }

    /// Empty container mock.
    #[must_use]
    pub fn container() -> Self {
        Self::new(UnitKind::Container)
    }

    /// Builder-style variant of [`MockDriver::add_unit`].
    #[must_use]
    pub fn with_unit<K, V>(
        self,
        id: &str,
        name: &str,
        status: UnitStatus,
        config: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.add_unit(id, name, status, config);
        self
    }

    /// Add a unit.
    pub fn add_unit<K, V>(
        &self,
        id: &str,
        name: &str,
        status: UnitStatus,
        config: impl IntoIterator<Item = (K, V)>,
    ) where
        K: Into<String>,
        V: Into<String>,
    {
        self.units.lock().push(MockUnit {
            id: UnitId::new(id),
            name: name.to_string(),
            status,
            listed_status: None,
            config: config.into_iter().collect(),
        });
    }

    /// Make `list` report `status` for a unit regardless of its real status.
    pub fn set_listed_status(&self, id: &str, status: UnitStatus) {
        if let Some(unit) = self.units.lock().iter_mut().find(|u| u.id == *id) {
            unit.listed_status = Some(status);
        }
    }

    /// Overwrite a unit's real status.
    pub fn set_status(&self, id: &str, status: UnitStatus) {
        if let Some(unit) = self.units.lock().iter_mut().find(|u| u.id == *id) {
            unit.status = status;
        }
    }

    /// Overwrite a configuration key.
    pub fn set_config(&self, id: &str, key: &str, value: &str) {
        if let Some(unit) = self.units.lock().iter_mut().find(|u| u.id == *id) {
            unit.config.insert(key, value);
        }
    }

    /// Make every call fail as if the program could not be spawned.
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }

    /// Block calls once they are recorded, until [`MockDriver::release`].
    pub fn hold(&self) {
        self.held.send_replace(true);
    }

    /// Let held and future calls complete.
    pub fn release(&self) {
        self.held.send_replace(false);
    }

    /// Current real status of a unit.
    #[must_use]
    pub fn status_of(&self, id: &str) -> Option<UnitStatus> {
        self.units
            .lock()
            .iter()
            .find(|u| u.id == *id)
            .map(|u| u.status)
    }

    /// All recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().clone()
    }

    /// Recorded lifecycle calls as `(op, id)` pairs, in order.
    #[must_use]
    pub fn lifecycle_calls(&self) -> Vec<(DriverOp, String)> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.op.is_lifecycle())
            .filter_map(|c| c.id.as_ref().map(|id| (c.op, id.to_string())))
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    async fn record(&self, op: DriverOp, id: Option<&UnitId>) -> Result<()> {
        self.calls.lock().push(DriverCall {
            op,
            id: id.cloned(),
            at: Instant::now(),
        });
        let mut held = self.held.subscribe();
        loop {
            let blocked = *held.borrow_and_update();
            if !blocked || held.changed().await.is_err() {
                break;
            }
        }
        if self.broken.load(Ordering::SeqCst) {
            return Err(DriverError::Spawn {
                program: format!("mock-{}", self.kind),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "mock driver is broken"),
            });
        }
        Ok(())
    }

    async fn transition(&self, op: DriverOp, id: &UnitId, status: UnitStatus) -> Result<()> {
        self.record(op, Some(id)).await?;
        if let Some(unit) = self.units.lock().iter_mut().find(|u| u.id == *id) {
            unit.status = status;
            unit.listed_status = None;
        }
        Ok(())
    }

    fn is_container(&self) -> bool {
        self.kind == UnitKind::Container
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn kind(&self) -> UnitKind {
        self.kind
    }

    fn trusts_listed_status(&self) -> bool {
        self.is_container()
    }

    async fn start(&self, id: &UnitId) -> Result<()> {
        self.transition(DriverOp::Start, id, UnitStatus::Running).await
    }

    async fn shutdown(&self, id: &UnitId) -> Result<()> {
        self.transition(DriverOp::Shutdown, id, UnitStatus::Stopped).await
    }

    async fn resume(&self, id: &UnitId) -> Result<()> {
        if self.is_container() {
            return self.start(id).await;
        }
        self.transition(DriverOp::Resume, id, UnitStatus::Running).await
    }

    async fn suspend(&self, id: &UnitId) -> Result<()> {
        if self.is_container() {
            return self.shutdown(id).await;
        }
        self.transition(DriverOp::Suspend, id, UnitStatus::Paused).await
    }

    async fn hibernate(&self, id: &UnitId) -> Result<()> {
        if self.is_container() {
            return self.shutdown(id).await;
        }
        self.transition(DriverOp::Hibernate, id, UnitStatus::Stopped).await
    }

    async fn stop(&self, id: &UnitId) -> Result<()> {
        self.transition(DriverOp::Stop, id, UnitStatus::Stopped).await
    }

    async fn config(&self, id: &UnitId) -> Result<UnitConfig> {
        self.record(DriverOp::Config, Some(id)).await?;
        Ok(self
            .units
            .lock()
            .iter()
            .find(|u| u.id == *id)
            .map(|u| u.config.clone())
            .unwrap_or_default())
    }

    async fn status(&self, id: &UnitId) -> Result<UnitStatus> {
        self.record(DriverOp::Status, Some(id)).await?;
        Ok(self.status_of(id.as_str()).unwrap_or_default())
    }

    async fn list(&self) -> Result<UnitList> {
        self.record(DriverOp::List, None).await?;
        let units = self
            .units
            .lock()
            .iter()
            .map(|u| UnitListing {
                id: u.id.clone(),
                name: u.name.clone(),
                status: u.listed_status.unwrap_or(u.status),
            })
            .collect();
        Ok(UnitList {
            units,
            skipped: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmctld_core::UnitCommand;

    #[tokio::test]
    async fn lifecycle_updates_status() {
        let mock = MockDriver::vm().with_unit("100", "web", UnitStatus::Stopped, [("onboot", "1")]);
        let id = UnitId::new("100");

        mock.execute(UnitCommand::Start, &id).await.unwrap();
        assert_eq!(mock.status_of("100"), Some(UnitStatus::Running));

        mock.execute(UnitCommand::Suspend, &id).await.unwrap();
        assert_eq!(mock.status_of("100"), Some(UnitStatus::Paused));

        assert_eq!(
            mock.lifecycle_calls(),
            vec![
                (DriverOp::Start, "100".to_string()),
                (DriverOp::Suspend, "100".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn container_aliases() {
        let mock = MockDriver::container().with_unit(
            "200",
            "dns",
            UnitStatus::Running,
            Vec::<(String, String)>::new(),
        );
        let id = UnitId::new("200");

        mock.suspend(&id).await.unwrap();
        mock.resume(&id).await.unwrap();
        mock.hibernate(&id).await.unwrap();

        assert_eq!(
            mock.lifecycle_calls(),
            vec![
                (DriverOp::Shutdown, "200".to_string()),
                (DriverOp::Start, "200".to_string()),
                (DriverOp::Shutdown, "200".to_string()),
            ]
        );
        assert_eq!(mock.status_of("200"), Some(UnitStatus::Stopped));
    }

    #[tokio::test]
    async fn listed_status_override() {
        let mock = MockDriver::vm().with_unit(
            "100",
            "web",
            UnitStatus::Paused,
            Vec::<(String, String)>::new(),
        );
        mock.set_listed_status("100", UnitStatus::Running);

        let list = mock.list().await.unwrap();
        assert_eq!(list.units[0].status, UnitStatus::Running);
        assert_eq!(
            mock.status(&UnitId::new("100")).await.unwrap(),
            UnitStatus::Paused
        );
        assert!(!mock.trusts_listed_status());
    }

    #[tokio::test(start_paused = true)]
    async fn held_calls_wait_for_release() {
        let mock = std::sync::Arc::new(MockDriver::vm().with_unit(
            "100",
            "web",
            UnitStatus::Stopped,
            Vec::<(String, String)>::new(),
        ));
        mock.hold();

        let task = tokio::spawn({
            let mock = mock.clone();
            async move { mock.start(&UnitId::new("100")).await }
        });
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        assert_eq!(mock.lifecycle_calls(), vec![(DriverOp::Start, "100".to_string())]);
        assert_eq!(mock.status_of("100"), Some(UnitStatus::Stopped));
        assert!(!task.is_finished());

        mock.release();
        task.await.unwrap().unwrap();
        assert_eq!(mock.status_of("100"), Some(UnitStatus::Running));
    }

    #[tokio::test]
    async fn broken_mock_fails_and_records() {
        let mock = MockDriver::vm();
        mock.set_broken(true);
        let err = mock.start(&UnitId::new("1")).await.unwrap_err();
        assert!(matches!(err, DriverError::Spawn { .. }));
        assert_eq!(mock.calls().len(), 1);
    }
}
