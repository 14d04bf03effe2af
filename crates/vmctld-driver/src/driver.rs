//! The `Driver` capability trait and its program-backed implementation.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use vmctld_core::{UnitCommand, UnitConfig, UnitId, UnitKind, UnitStatus};

use crate::parse;
use crate::types::UnitList;
use crate::{DriverError, Result};

/// The capability interface every unit kind provides.
///
/// Lifecycle methods block until the underlying command has completed and
/// never report its exit status. Introspection methods return parsed output.
#[async_trait]
pub trait Driver: Send + Sync {
    /// The kind of unit this driver governs.
    fn kind(&self) -> UnitKind;

    /// Whether `list` reports status reliably.
    ///
    /// When false, callers re-query [`Driver::status`] per unit.
    fn trusts_listed_status(&self) -> bool;

    /// Boot a unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the control program cannot be spawned.
    async fn start(&self, id: &UnitId) -> Result<()>;

    /// Gracefully shut a unit down.
    ///
    /// # Errors
    ///
    /// Returns an error if the control program cannot be spawned.
    async fn shutdown(&self, id: &UnitId) -> Result<()>;

    /// Resume a suspended unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the control program cannot be spawned.
    async fn resume(&self, id: &UnitId) -> Result<()>;

    /// Suspend a unit to memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the control program cannot be spawned.
    async fn suspend(&self, id: &UnitId) -> Result<()>;

    /// Suspend a unit to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the control program cannot be spawned.
    async fn hibernate(&self, id: &UnitId) -> Result<()>;

    /// Forcefully stop a unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the control program cannot be spawned.
    async fn stop(&self, id: &UnitId) -> Result<()>;

    /// Fetch a unit's configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the control program cannot be spawned.
    async fn config(&self, id: &UnitId) -> Result<UnitConfig>;

    /// Query a single unit's current status.
    ///
    /// # Errors
    ///
    /// Returns an error if the control program cannot be spawned.
    async fn status(&self, id: &UnitId) -> Result<UnitStatus>;

    /// List every unit of this kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the control program cannot be spawned.
    async fn list(&self) -> Result<UnitList>;

    /// Run the lifecycle capability matching `command`.
    ///
    /// # Errors
    ///
    /// Returns an error if the control program cannot be spawned.
    async fn execute(&self, command: UnitCommand, id: &UnitId) -> Result<()> {
        match command {
            UnitCommand::Start => self.start(id).await,
            UnitCommand::Shutdown => self.shutdown(id).await,
            UnitCommand::Resume => self.resume(id).await,
            UnitCommand::Suspend => self.suspend(id).await,
            UnitCommand::Hibernate => self.hibernate(id).await,
            UnitCommand::Stop => self.stop(id).await,
        }
    }
}

/// Arguments for one control program call: `<program> <subcommand> <id> <extra...>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    /// Subcommand placed before the unit id.
    pub subcommand: &'static str,
    /// Arguments placed after the unit id.
    pub extra: &'static [&'static str],
}

impl Invocation {
    const fn plain(subcommand: &'static str) -> Self {
        Self {
            subcommand,
            extra: &[],
        }
    }
}

/// Layout of a kind's `list` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    /// `id name status mem disk pid`
    Vm,
    /// `id status [lock] name`
    Container,
}

/// Per-kind mapping from capabilities to control program invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTable {
    /// Kind governed by this table.
    pub kind: UnitKind,
    /// `start` capability.
    pub start: Invocation,
    /// `shutdown` capability.
    pub shutdown: Invocation,
    /// `resume` capability.
    pub resume: Invocation,
    /// `suspend` capability.
    pub suspend: Invocation,
    /// `hibernate` capability.
    pub hibernate: Invocation,
    /// `stop` capability.
    pub stop: Invocation,
    /// Output layout of `list`.
    pub list_format: ListFormat,
    /// Whether `list` reports paused units correctly.
    pub trusts_listed_status: bool,
}

impl CommandTable {
    /// Virtual machines (`qm`). Its `list` shows paused VMs as running.
    pub const QM: Self = Self {
        kind: UnitKind::Vm,
        start: Invocation::plain("start"),
        shutdown: Invocation::plain("shutdown"),
        resume: Invocation::plain("resume"),
        suspend: Invocation::plain("suspend"),
        hibernate: Invocation {
            subcommand: "suspend",
            extra: &["--todisk", "1"],
        },
        stop: Invocation::plain("stop"),
        list_format: ListFormat::Vm,
        trusts_listed_status: false,
    };

    /// Containers (`pct`). Containers cannot suspend, so resume maps to
    /// start and suspend/hibernate map to shutdown.
    pub const PCT: Self = Self {
        kind: UnitKind::Container,
        start: Invocation::plain("start"),
        shutdown: Invocation::plain("shutdown"),
        resume: Invocation::plain("start"),
        suspend: Invocation::plain("shutdown"),
        hibernate: Invocation::plain("shutdown"),
        stop: Invocation::plain("stop"),
        list_format: ListFormat::Container,
        trusts_listed_status: true,
    };

    /// The invocation for a lifecycle command.
    #[must_use]
    pub const fn invocation(&self, command: UnitCommand) -> Invocation {
        match command {
            UnitCommand::Start => self.start,
            UnitCommand::Shutdown => self.shutdown,
            UnitCommand::Resume => self.resume,
            UnitCommand::Suspend => self.suspend,
            UnitCommand::Hibernate => self.hibernate,
            UnitCommand::Stop => self.stop,
        }
    }
}

/// A driver that shells out to a control program.
#[derive(Debug, Clone)]
pub struct ProgramDriver {
    program: String,
    table: CommandTable,
}

impl ProgramDriver {
    /// Create a driver for `program` using the given command table.
    #[must_use]
    pub fn new(program: impl Into<String>, table: CommandTable) -> Self {
        Self {
            program: program.into(),
            table,
        }
    }

    /// Driver for virtual machines.
    #[must_use]
    pub fn qm(program: impl Into<String>) -> Self {
        Self::new(program, CommandTable::QM)
    }

    /// Driver for containers.
    #[must_use]
    pub fn pct(program: impl Into<String>) -> Self {
        Self::new(program, CommandTable::PCT)
    }

    /// Spawn a lifecycle invocation and wait for it to exit.
    async fn run(&self, invocation: Invocation, id: &UnitId) -> Result<()> {
        let status = Command::new(&self.program)
            .arg(invocation.subcommand)
            .arg(id.as_str())
            .args(invocation.extra)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|source| DriverError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if status.success() {
            debug!(program = %self.program, unit = %id, subcommand = invocation.subcommand, "Command completed");
        } else {
            debug!(
                program = %self.program,
                unit = %id,
                subcommand = invocation.subcommand,
                status = %status,
                "Command exited unsuccessfully, ignoring"
            );
        }
        Ok(())
    }

    /// Spawn an introspection call and capture its standard output.
    async fn capture(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .await
            .map_err(|source| DriverError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        String::from_utf8(output.stdout).map_err(|e| DriverError::Output {
            program: self.program.clone(),
            message: format!("output is not UTF-8: {e}"),
        })
    }
}

#[async_trait]
impl Driver for ProgramDriver {
    fn kind(&self) -> UnitKind {
        self.table.kind
    }

    fn trusts_listed_status(&self) -> bool {
        self.table.trusts_listed_status
    }

    async fn start(&self, id: &UnitId) -> Result<()> {
        self.run(self.table.start, id).await
    }

    async fn shutdown(&self, id: &UnitId) -> Result<()> {
        self.run(self.table.shutdown, id).await
    }

    async fn resume(&self, id: &UnitId) -> Result<()> {
        self.run(self.table.resume, id).await
    }

    async fn suspend(&self, id: &UnitId) -> Result<()> {
        self.run(self.table.suspend, id).await
    }

    async fn hibernate(&self, id: &UnitId) -> Result<()> {
        self.run(self.table.hibernate, id).await
    }

    async fn stop(&self, id: &UnitId) -> Result<()> {
        self.run(self.table.stop, id).await
    }

    async fn config(&self, id: &UnitId) -> Result<UnitConfig> {
        let output = self.capture(&["config", id.as_str()]).await?;
        let (config, skipped) = parse::parse_config(&output);
        for line in skipped {
            warn!(program = %self.program, unit = %id, line = %line, "Unable to parse config line");
        }
        Ok(config)
    }

    async fn status(&self, id: &UnitId) -> Result<UnitStatus> {
        let output = self.capture(&["status", id.as_str()]).await?;
        Ok(parse::parse_status(&output))
    }

    async fn list(&self) -> Result<UnitList> {
        let output = self.capture(&["list"]).await?;
        Ok(match self.table.list_format {
            ListFormat::Vm => parse::parse_vm_list(&output),
            ListFormat::Container => parse::parse_container_list(&output),
        })
    }
}
