//! The line protocol.
//!
//! One command per line, whitespace-separated:
//!
//! ```text
//! start [id ...]        resume [id ...]       suspend [id ...]
//! shutdown [id ...]     hibernate [id ...]    stop [id ...]
//! save <name> [id ...]  load <name>           list [running|onboot]
//! states                show <name>
//! ```

use std::fmt;
use std::str::FromStr;

use vmctld_core::UnitCommand;

use crate::error::{ControlError, Result};

/// Which units `list` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListFilter {
    /// Every unit.
    #[default]
    All,
    /// Units currently running.
    Running,
    /// Units flagged to start at boot.
    Onboot,
}

impl fmt::Display for ListFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Running => "running",
            Self::Onboot => "onboot",
        })
    }
}

impl FromStr for ListFilter {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "running" => Ok(Self::Running),
            "onboot" => Ok(Self::Onboot),
            other => Err(ControlError::UnknownFilter(other.to_string())),
        }
    }
}

/// A parsed control line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// A lifecycle command over the given units, or the default selection.
    Unit {
        /// Command to apply.
        command: UnitCommand,
        /// Identifiers or names; empty selects the default set.
        ids: Vec<String>,
    },
    /// Capture a shutdown plan under a name.
    Save {
        /// State name.
        name: String,
        /// Identifiers or names; empty selects running units.
        ids: Vec<String>,
    },
    /// Start a saved state and forget it.
    Load {
        /// State name.
        name: String,
    },
    /// Print units.
    List(ListFilter),
    /// Print saved state names.
    States,
    /// Print the units of a saved state.
    Show {
        /// State name.
        name: String,
    },
}

impl ControlCommand {
    /// Parse a line. Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown command word, a missing state name
    /// or an unknown `list` filter.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Ok(None);
        };
        let mut rest = words.map(str::to_string);

        let command = match word {
            "save" => Self::Save {
                name: rest.next().ok_or(missing_name("save"))?,
                ids: rest.collect(),
            },
            "load" => Self::Load {
                name: rest.next().ok_or(missing_name("load"))?,
            },
            "show" => Self::Show {
                name: rest.next().ok_or(missing_name("show"))?,
            },
            "states" => Self::States,
            "list" => Self::List(match rest.next() {
                Some(filter) => filter.parse()?,
                None => ListFilter::All,
            }),
            other => Self::Unit {
                command: other
                    .parse()
                    .map_err(|_| ControlError::UnknownCommand(other.to_string()))?,
                ids: rest.collect(),
            },
        };
        Ok(Some(command))
    }
}

const fn missing_name(command: &'static str) -> ControlError {
    ControlError::MissingArgument {
        command,
        argument: "state name",
    }
}
