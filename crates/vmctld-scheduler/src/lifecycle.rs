//! Unit lifecycle state machine.
//!
//! Every command has a set of statuses in which it is a no-op and a status
//! the unit is assumed to be in once the command has completed.
//!
//! # State Machine
//!
//! ```text
//!                 start / resume
//!      ┌──────────────────────────────────────┐
//!      │                                      ▼
//! ┌─────────┐   shutdown / stop /      ┌─────────┐
//! │ Stopped │◀─────────────────────────│ Running │
//! └─────────┘       hibernate          └─────────┘
//!      ▲                                 │    ▲
//!      │ shutdown / stop / hibernate     │    │ start / resume
//!      │                        suspend  ▼    │
//!      │                             ┌─────────┐
//!      └─────────────────────────────│ Paused  │
//!                                    └─────────┘
//! ```
//!
//! `Unknown` never changes on its own; the next completed command resolves it.

use vmctld_core::{UnitCommand, UnitStatus};

/// Guard and outcome of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Statuses in which the command does nothing.
    pub noop_from: &'static [UnitStatus],
    /// Status after the command completes.
    pub target: UnitStatus,
}

impl Transition {
    /// Whether the command is a no-op for a unit currently in `status`.
    #[must_use]
    pub fn is_noop(&self, status: UnitStatus) -> bool {
        self.noop_from.contains(&status)
    }
}

/// The transition for a command.
#[must_use]
pub const fn transition_for(command: UnitCommand) -> Transition {
    use UnitStatus::{Paused, Running, Stopped};

    match command {
        UnitCommand::Start | UnitCommand::Resume => Transition {
            noop_from: &[Running],
            target: Running,
        },
        UnitCommand::Suspend => Transition {
            noop_from: &[Stopped, Paused],
            target: Paused,
        },
        UnitCommand::Shutdown | UnitCommand::Hibernate | UnitCommand::Stop => Transition {
            noop_from: &[Stopped],
            target: Stopped,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_noop(status: UnitStatus, command: UnitCommand) -> bool {
        transition_for(command).is_noop(status)
    }

    #[test]
    fn noop_guards() {
        use UnitCommand::{Hibernate, Resume, Shutdown, Start, Stop, Suspend};
        use UnitStatus::{Paused, Running, Stopped};

        assert!(is_noop(Running, Start));
        assert!(is_noop(Running, Resume));
        assert!(is_noop(Stopped, Shutdown));
        assert!(is_noop(Stopped, Hibernate));
        assert!(is_noop(Stopped, Stop));
        assert!(is_noop(Stopped, Suspend));
        assert!(is_noop(Paused, Suspend));
    }

    #[test]
    fn effective_commands() {
        use UnitCommand::{Hibernate, Resume, Shutdown, Start, Stop, Suspend};
        use UnitStatus::{Paused, Running, Stopped};

        assert!(!is_noop(Stopped, Start));
        assert!(!is_noop(Paused, Resume));
        assert!(!is_noop(Paused, Shutdown));
        assert!(!is_noop(Running, Suspend));
        assert!(!is_noop(Running, Hibernate));
        assert!(!is_noop(Paused, Stop));
    }

    #[test]
    fn unknown_is_never_a_noop() {
        for command in UnitCommand::ALL {
            assert!(!is_noop(UnitStatus::Unknown, command));
        }
    }

    #[test]
    fn targets() {
        assert_eq!(transition_for(UnitCommand::Start).target, UnitStatus::Running);
        assert_eq!(transition_for(UnitCommand::Resume).target, UnitStatus::Running);
        assert_eq!(transition_for(UnitCommand::Suspend).target, UnitStatus::Paused);
        assert_eq!(transition_for(UnitCommand::Shutdown).target, UnitStatus::Stopped);
        assert_eq!(transition_for(UnitCommand::Hibernate).target, UnitStatus::Stopped);
        assert_eq!(transition_for(UnitCommand::Stop).target, UnitStatus::Stopped);
    }
}
