//! Pending actions and the coalescing rule.
//!
//! At most one action per unit is ever pending. A repeated request for a
//! unit is dropped; an opposite request cancels the pending one and is not
//! queued itself.

use std::collections::VecDeque;

use tracing::{debug, info};

use vmctld_core::{UnitCommand, UnitId};

use crate::unit::VirtualUnit;

/// A lifecycle command bound to the unit it targets.
#[derive(Debug)]
pub struct Action {
    command: UnitCommand,
    unit: VirtualUnit,
}

impl Action {
    /// Create an action.
    #[must_use]
    pub const fn new(command: UnitCommand, unit: VirtualUnit) -> Self {
        Self { command, unit }
    }

    /// The command to apply.
    #[must_use]
    pub const fn command(&self) -> UnitCommand {
        self.command
    }

    /// The target unit.
    #[must_use]
    pub const fn unit(&self) -> &VirtualUnit {
        &self.unit
    }

    /// Mutable access to the target unit.
    pub fn unit_mut(&mut self) -> &mut VirtualUnit {
        &mut self.unit
    }

    /// The target's identifier, which is the action's queue identity.
    #[must_use]
    pub const fn id(&self) -> &UnitId {
        self.unit.id()
    }

    /// Split into command and unit.
    #[must_use]
    pub fn into_parts(self) -> (UnitCommand, VirtualUnit) {
        (self.command, self.unit)
    }
}

/// What [`ActionQueue::enqueue`] did with an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Appended to the tail.
    Queued,
    /// The same command was already pending; nothing changed.
    Duplicate,
    /// A different command was pending and has been removed along with
    /// the new one.
    Cancelled(UnitCommand),
}

/// FIFO of pending actions.
#[derive(Debug, Default)]
pub struct ActionQueue {
    pending: VecDeque<Action>,
}

impl ActionQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `action`, applying the coalescing rule.
    pub fn enqueue(&mut self, action: Action) -> EnqueueOutcome {
        let Some(pos) = self.position(action.id()) else {
            debug!(unit = %action.id(), command = %action.command, "Action queued");
            self.pending.push_back(action);
            return EnqueueOutcome::Queued;
        };

        let previous = self.pending[pos].command;
        if previous == action.command {
            debug!(unit = %action.id(), command = %action.command, "Action already pending");
            return EnqueueOutcome::Duplicate;
        }

        self.remove_at(pos);
        EnqueueOutcome::Cancelled(previous)
    }

    /// Look for a pending action on the same unit as `action`.
    ///
    /// Returns true if one exists. A pending action with a different
    /// command is removed; one with the same command is left in place.
    pub fn try_cancel(&mut self, action: &Action) -> bool {
        let Some(pos) = self.position(action.id()) else {
            return false;
        };
        if self.pending[pos].command != action.command {
            self.remove_at(pos);
        }
        true
    }

    /// Take the head of the queue.
    pub fn pop(&mut self) -> Option<Action> {
        self.pending.pop_front()
    }

    /// Number of pending actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending action.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Snapshot of pending `(unit, command)` pairs in execution order.
    #[must_use]
    pub fn pending(&self) -> Vec<(UnitId, UnitCommand)> {
        self.pending
            .iter()
            .map(|a| (a.id().clone(), a.command))
            .collect()
    }

    fn position(&self, id: &UnitId) -> Option<usize> {
        self.pending.iter().position(|a| a.id() == id)
    }

    fn remove_at(&mut self, pos: usize) {
        if let Some(removed) = self.pending.remove(pos) {
            info!(
                unit = %removed.id(),
                "Abort {} on {}",
                removed.command,
                removed.unit.label()
            );
        }
    }
}
