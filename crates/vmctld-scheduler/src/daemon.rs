//! The scheduler worker.
//!
//! A single tokio task drains the [`ActionQueue`] one action at a time.
//! Producers push through [`Scheduler::enqueue`] and the worker is woken
//! through a [`Notify`]. Shutdown is broadcast on a watch channel, which
//! wakes both an idle worker and a start-up delay in progress.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use vmctld_core::{UnitCommand, UnitId};

use crate::queue::{Action, ActionQueue, EnqueueOutcome};
use crate::types::SchedulerConfig;

struct Shared {
    queue: Mutex<ActionQueue>,
    available: Notify,
}

/// Handle to the running worker.
pub struct Scheduler {
    shared: Arc<Shared>,
    shutdown_tx: watch::Sender<bool>,
    worker: JoinHandle<()>,
}

impl Scheduler {
    /// Spawn the worker on the current tokio runtime.
    #[must_use]
    pub fn spawn(config: SchedulerConfig) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(ActionQueue::new()),
            available: Notify::new(),
        });
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(dry_run = config.dry_run, "Starting scheduler");
        let worker = tokio::spawn(work(Arc::clone(&shared), config, shutdown_rx));

        Self {
            shared,
            shutdown_tx,
            worker,
        }
    }

    /// Submit an action, applying the coalescing rule.
    pub fn enqueue(&self, action: Action) -> EnqueueOutcome {
        let outcome = self.shared.queue.lock().enqueue(action);
        if outcome == EnqueueOutcome::Queued {
            self.shared.available.notify_one();
        }
        outcome
    }

    /// Check for a pending action on the same unit, removing it if its
    /// command differs. The action being executed is never affected.
    pub fn try_cancel(&self, action: &Action) -> bool {
        self.shared.queue.lock().try_cancel(action)
    }

    /// Pending `(unit, command)` pairs in execution order.
    #[must_use]
    pub fn pending(&self) -> Vec<(UnitId, UnitCommand)> {
        self.shared.queue.lock().pending()
    }

    /// Number of pending actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.queue.lock().is_empty()
    }

    /// Stop the worker.
    ///
    /// Waits for an in-flight action to finish, interrupts a start-up delay
    /// and drops whatever is still pending.
    pub async fn shutdown(self) {
        info!("Stopping scheduler");
        // The worker may already be gone; nothing to signal then.
        let _ = self.shutdown_tx.send(true);
        self.shared.available.notify_one();

        if let Err(e) = self.worker.await {
            error!(error = %e, "Scheduler worker failed");
        }

        let mut queue = self.shared.queue.lock();
        if !queue.is_empty() {
            info!(dropped = queue.len(), "Dropping pending actions");
        }
        queue.clear();
    }
}

async fn work(shared: Arc<Shared>, config: SchedulerConfig, mut shutdown: watch::Receiver<bool>) {
    loop {
        let action = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            action = next(&shared) => action,
        };

        execute(action, &config, &mut shutdown).await;

        if *shutdown.borrow() {
            break;
        }
    }
    debug!("Scheduler worker exited");
}

async fn next(shared: &Shared) -> Action {
    loop {
        let next = shared.queue.lock().pop();
        if let Some(action) = next {
            return action;
        }
        shared.available.notified().await;
    }
}

async fn execute(action: Action, config: &SchedulerConfig, shutdown: &mut watch::Receiver<bool>) {
    let (command, mut unit) = action.into_parts();
    debug!(unit = %unit.id(), command = %command, "Executing action");

    if let Err(e) = unit.apply(command, config.dry_run).await {
        error!(
            unit = %unit.id(),
            command = %command,
            error = %e,
            "Failed to apply command"
        );
    }

    if command != UnitCommand::Start {
        return;
    }

    let up = match unit.delay_up().await {
        Ok(Some(up)) => up,
        Ok(None) => return,
        Err(e) => {
            warn!(unit = %unit.id(), error = %e, "Unable to read start-up delay");
            return;
        }
    };

    let delay = config.startup_delay(up);
    info!(unit = %unit.id(), up, "Waiting before next action");
    tokio::select! {
        () = tokio::time::sleep(delay) => {}
        _ = shutdown.changed() => {
            debug!(unit = %unit.id(), "Start-up delay interrupted");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::unit::VirtualUnit;
    use vmctld_core::UnitStatus;
    use vmctld_driver::{Driver, DriverOp, MockDriver};

    fn mock() -> Arc<MockDriver> {
        Arc::new(
            MockDriver::vm()
                .with_unit("100", "db", UnitStatus::Stopped, [("startup", "order=5,up=30")])
                .with_unit("101", "web", UnitStatus::Stopped, [("startup", "order=6")])
                .with_unit("102", "cache", UnitStatus::Running, [("onboot", "1")]),
        )
    }

    fn action(mock: &Arc<MockDriver>, command: UnitCommand, id: &str) -> Action {
        let status = mock.status_of(id).unwrap_or_default();
        action_from(mock, command, id, status)
    }

    fn action_from(
        mock: &Arc<MockDriver>,
        command: UnitCommand,
        id: &str,
        status: UnitStatus,
    ) -> Action {
        let driver: Arc<dyn Driver> = mock.clone();
        Action::new(command, VirtualUnit::new(driver, id, "", status))
    }

    async fn wait_for_calls(mock: &MockDriver, n: usize) {
        for _ in 0..10_000 {
            if mock.lifecycle_calls().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {n} lifecycle calls, got {:?}", mock.lifecycle_calls());
    }

    fn lifecycle_times(mock: &MockDriver) -> Vec<tokio::time::Instant> {
        mock.calls()
            .into_iter()
            .filter(|c| c.op.is_lifecycle())
            .map(|c| c.at)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn executes_in_fifo_order() {
        let mock = mock();
        let scheduler = Scheduler::spawn(SchedulerConfig::default());

        scheduler.enqueue(action(&mock, UnitCommand::Shutdown, "102"));
        scheduler.enqueue(action(&mock, UnitCommand::Start, "101"));
        wait_for_calls(&mock, 2).await;

        assert_eq!(
            mock.lifecycle_calls(),
            vec![
                (DriverOp::Shutdown, "102".to_string()),
                (DriverOp::Start, "101".to_string()),
            ]
        );
        assert_eq!(mock.status_of("102"), Some(UnitStatus::Stopped));
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_delay_holds_back_next_action() {
        let mock = mock();
        let scheduler = Scheduler::spawn(SchedulerConfig::default());

        scheduler.enqueue(action(&mock, UnitCommand::Start, "100"));
        scheduler.enqueue(action(&mock, UnitCommand::Start, "101"));
        wait_for_calls(&mock, 2).await;

        let times = lifecycle_times(&mock);
        assert!(times[1] - times[0] >= Duration::from_secs(30));
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn no_delay_without_up() {
        let mock = mock();
        let scheduler = Scheduler::spawn(SchedulerConfig::default());

        scheduler.enqueue(action(&mock, UnitCommand::Start, "101"));
        scheduler.enqueue(action(&mock, UnitCommand::Shutdown, "102"));
        wait_for_calls(&mock, 2).await;

        let times = lifecycle_times(&mock);
        assert!(times[1] - times[0] < Duration::from_secs(1));
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn delay_scale_applies() {
        let mock = mock();
        let scheduler = Scheduler::spawn(SchedulerConfig {
            delay_scale: Duration::from_millis(100),
            ..Default::default()
        });

        scheduler.enqueue(action(&mock, UnitCommand::Start, "100"));
        scheduler.enqueue(action(&mock, UnitCommand::Start, "101"));
        wait_for_calls(&mock, 2).await;

        let gap = {
            let times = lifecycle_times(&mock);
            times[1] - times[0]
        };
        assert!(gap >= Duration::from_secs(3));
        assert!(gap < Duration::from_secs(30));
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_delay() {
        let mock = Arc::new(MockDriver::vm().with_unit(
            "100",
            "db",
            UnitStatus::Stopped,
            [("startup", "up=3600")],
        ));
        mock.add_unit("101", "web", UnitStatus::Stopped, std::iter::empty::<(&str, &str)>());
        let scheduler = Scheduler::spawn(SchedulerConfig::default());

        scheduler.enqueue(action(&mock, UnitCommand::Start, "100"));
        wait_for_calls(&mock, 1).await;
        scheduler.enqueue(action(&mock, UnitCommand::Start, "101"));

        tokio::time::timeout(Duration::from_secs(5), scheduler.shutdown())
            .await
            .expect("shutdown should not wait for the start-up delay");

        assert_eq!(mock.status_of("101"), Some(UnitStatus::Stopped));
        assert_eq!(mock.lifecycle_calls().len(), 1);
    }

    #[tokio::test]
    async fn opposite_requests_cancel_before_execution() {
        let mock = mock();
        let scheduler = Scheduler::spawn(SchedulerConfig::default());

        // The worker cannot run until this task yields.
        assert_eq!(
            scheduler.enqueue(action(&mock, UnitCommand::Start, "101")),
            EnqueueOutcome::Queued
        );
        assert_eq!(
            scheduler.enqueue(action(&mock, UnitCommand::Start, "101")),
            EnqueueOutcome::Duplicate
        );
        assert_eq!(scheduler.len(), 1);
        assert_eq!(
            scheduler.enqueue(action(&mock, UnitCommand::Shutdown, "101")),
            EnqueueOutcome::Cancelled(UnitCommand::Start)
        );
        assert!(scheduler.is_empty());
        assert!(scheduler.pending().is_empty());

        scheduler.shutdown().await;
        assert!(mock.lifecycle_calls().is_empty());
    }

    #[tokio::test]
    async fn try_cancel_only_touches_pending() {
        let mock = mock();
        let scheduler = Scheduler::spawn(SchedulerConfig::default());

        scheduler.enqueue(action(&mock, UnitCommand::Start, "101"));
        assert!(scheduler.try_cancel(&action(&mock, UnitCommand::Stop, "101")));
        assert!(!scheduler.try_cancel(&action(&mock, UnitCommand::Stop, "101")));
        assert!(scheduler.is_empty());

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn executing_action_is_out_of_reach() {
        let mock = mock();
        mock.hold();
        let scheduler = Scheduler::spawn(SchedulerConfig::default());

        scheduler.enqueue(action(&mock, UnitCommand::Start, "101"));
        wait_for_calls(&mock, 1).await;
        assert!(scheduler.is_empty());

        // The start is in flight: nothing to cancel, so the opposite
        // request queues behind it.
        let shutdown = action_from(&mock, UnitCommand::Shutdown, "101", UnitStatus::Running);
        assert!(!scheduler.try_cancel(&shutdown));
        assert_eq!(scheduler.enqueue(shutdown), EnqueueOutcome::Queued);
        assert_eq!(scheduler.len(), 1);

        mock.release();
        wait_for_calls(&mock, 2).await;
        assert_eq!(
            mock.lifecycle_calls(),
            vec![
                (DriverOp::Start, "101".to_string()),
                (DriverOp::Shutdown, "101".to_string()),
            ]
        );
        assert_eq!(mock.status_of("101"), Some(UnitStatus::Stopped));
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_executing_action() {
        let mock = mock();
        mock.hold();
        let scheduler = Scheduler::spawn(SchedulerConfig::default());

        scheduler.enqueue(action(&mock, UnitCommand::Start, "101"));
        wait_for_calls(&mock, 1).await;

        let stopping = tokio::spawn(scheduler.shutdown());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!stopping.is_finished());
        assert_eq!(mock.status_of("101"), Some(UnitStatus::Stopped));

        mock.release();
        stopping.await.unwrap();
        assert_eq!(mock.status_of("101"), Some(UnitStatus::Running));
    }

    #[tokio::test(start_paused = true)]
    async fn dry_run_still_delays() {
        let mock = mock();
        let scheduler = Scheduler::spawn(SchedulerConfig {
            dry_run: true,
            ..Default::default()
        });

        scheduler.enqueue(action(&mock, UnitCommand::Start, "100"));
        scheduler.enqueue(action(&mock, UnitCommand::Start, "101"));

        let started = tokio::time::Instant::now();
        for _ in 0..10_000 {
            let configs = mock
                .calls()
                .iter()
                .filter(|c| c.op == DriverOp::Config)
                .count();
            if configs >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(started.elapsed() >= Duration::from_secs(30));
        assert!(mock.lifecycle_calls().is_empty());
        assert_eq!(mock.status_of("100"), Some(UnitStatus::Stopped));
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn worker_survives_driver_failure() {
        let mock = mock();
        mock.set_broken(true);
        let scheduler = Scheduler::spawn(SchedulerConfig::default());

        scheduler.enqueue(action(&mock, UnitCommand::Shutdown, "102"));
        wait_for_calls(&mock, 1).await;
        mock.set_broken(false);

        scheduler.enqueue(action(&mock, UnitCommand::Start, "101"));
        wait_for_calls(&mock, 2).await;
        assert_eq!(mock.status_of("101"), Some(UnitStatus::Running));
        scheduler.shutdown().await;
    }
}
