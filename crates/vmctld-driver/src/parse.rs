//! Parsers for control program output.
//!
//! All outputs start with a header line that is discarded.

use vmctld_core::{UnitConfig, UnitStatus};

use crate::types::{UnitList, UnitListing};

/// Parse `config` output: a header line followed by `key: value` lines.
///
/// Returns the configuration and the lines that had no `": "` separator.
#[must_use]
pub fn parse_config(output: &str) -> (UnitConfig, Vec<String>) {
    let mut config = UnitConfig::new();
    let mut skipped = Vec::new();

    for line in output.lines().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split_once(": ") {
            Some((key, value)) => config.insert(key, value),
            None => skipped.push(line.to_string()),
        }
    }

    (config, skipped)
}

/// Parse `status` output, which reads `status: <token>`.
#[must_use]
pub fn parse_status(output: &str) -> UnitStatus {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("status:"))
        .map_or(UnitStatus::Unknown, |token| UnitStatus::from_token(token.trim()))
}

/// Parse VM `list` output.
///
/// Rows carry at least six columns (`id name status mem disk pid`); columns
/// past the third are ignored.
#[must_use]
pub fn parse_vm_list(output: &str) -> UnitList {
    parse_rows(output, |cols| match cols {
        [id, name, status, _, _, _, ..] => Some(UnitListing::new(
            *id,
            *name,
            UnitStatus::from_token(status),
        )),
        _ => None,
    })
}

/// Parse container `list` output.
///
/// Rows are `id status name`, or `id status lock name` when a lock is held.
#[must_use]
pub fn parse_container_list(output: &str) -> UnitList {
    parse_rows(output, |cols| match cols {
        [id, status, name] | [id, status, _, name] => Some(UnitListing::new(
            *id,
            *name,
            UnitStatus::from_token(status),
        )),
        _ => None,
    })
}

fn parse_rows(output: &str, row: impl Fn(&[&str]) -> Option<UnitListing>) -> UnitList {
    let mut list = UnitList::default();

    for line in output.lines().skip(1) {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.is_empty() {
            continue;
        }
        match row(&cols) {
            Some(unit) => list.units.push(unit),
            None => list.skipped.push(line.trim().to_string()),
        }
    }

    list
}
