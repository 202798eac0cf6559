//! The systemd collaborator: unit listing and per-unit liveness probes.
//!
//! Everything the agent knows about the host's services flows through the
//! [`UnitSource`] trait, so snapshot construction is testable without a
//! running systemd. The production implementation shells out to
//! `systemctl`: one listing call per snapshot, plus one `is-active` call
//! per unit in exit-code mode.

use crate::config::StatusMode;
use crate::error::{Error, Result};
use regex::Regex;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

/// Path of the systemctl binary; a fixed absolute path because snmpd runs
/// the agent with a minimal environment.
const SYSTEMCTL: &str = "/bin/systemctl";

/// Unit-file listing-line regex compiled once
static UNIT_FILES_REGEX: OnceLock<Regex> = OnceLock::new();

fn unit_files_regex() -> &'static Regex {
    UNIT_FILES_REGEX.get_or_init(|| {
        Regex::new(r"^(?P<name>\S+)\.service\s+(?P<state>\S+)")
            .expect("static regex pattern is valid")
    })
}

/// One service line from a listing: the unit name with its `.service`
/// suffix stripped, plus a state word. Which word depends on the listing
/// flavor: the enablement state (`enabled`, `static`, ...) from
/// `list-unit-files`, or the SUB state (`running`, `exited`, `dead`, ...)
/// from `list-units`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitEntry {
    pub name: String,
    pub state: String,
}

/// Seam between the snapshot builder and the host service manager.
pub trait UnitSource {
    /// Lists all real (non-template) service units.
    ///
    /// Must fail loudly when the listing command fails: an empty result is
    /// indistinguishable from "no services installed" and would be served
    /// to snmpd as a truthful answer.
    fn list_units(&self) -> Result<Vec<UnitEntry>>;

    /// Liveness probe for one unit; the process-style exit code verbatim
    /// (0 = active, non-zero = the manager's reason for not-active).
    fn liveness(&self, unit: &str) -> Result<i32>;
}

/// Parses one `systemctl list-unit-files` output line.
///
/// Returns `None` for blank lines, lines that are not service unit files,
/// and template definitions (a `@.` in the unit file name); templates are
/// not addressable running units.
pub fn parse_unit_files_line(line: &str) -> Option<UnitEntry> {
    if line.trim().is_empty() || line.contains("@.") {
        return None;
    }
    let captures = unit_files_regex().captures(line)?;
    Some(UnitEntry {
        name: captures["name"].to_string(),
        state: captures["state"].to_string(),
    })
}

/// Parses one `systemctl list-units --plain` output line.
///
/// Columns are UNIT LOAD ACTIVE SUB DESCRIPTION; the SUB word is the state
/// carried in the entry. Template lines and non-service units are skipped
/// as in [`parse_unit_files_line`].
pub fn parse_units_line(line: &str) -> Option<UnitEntry> {
    if line.contains("@.") {
        return None;
    }
    let mut tokens = line.split_whitespace();
    let unit = tokens.next()?;
    let name = unit.strip_suffix(".service")?;
    let _load = tokens.next()?;
    let _active = tokens.next()?;
    let sub = tokens.next()?;
    Some(UnitEntry {
        name: name.to_string(),
        state: sub.to_string(),
    })
}

/// Production [`UnitSource`] backed by `/bin/systemctl`.
///
/// The listing flavor follows the status mode: exit-code mode lists unit
/// files (the per-unit probe supplies the status), state-text mode lists
/// live units so the SUB state word is available from the listing alone.
pub struct SystemctlSource {
    mode: StatusMode,
}

impl SystemctlSource {
    pub fn for_mode(mode: StatusMode) -> Self {
        Self { mode }
    }
}

impl UnitSource for SystemctlSource {
    fn list_units(&self) -> Result<Vec<UnitEntry>> {
        let args: &[&str] = match self.mode {
            StatusMode::ExitCode => &["list-unit-files", "-t", "service", "--no-legend"],
            StatusMode::StateText => &[
                "list-units",
                "-t",
                "service",
                "--all",
                "--plain",
                "--no-legend",
            ],
        };

        let output = Command::new(SYSTEMCTL)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::Listing(format!("failed to run {}: {}", SYSTEMCTL, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Listing(format!(
                "systemctl {} exited with {}: {}",
                args[0],
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let parse = match self.mode {
            StatusMode::ExitCode => parse_unit_files_line,
            StatusMode::StateText => parse_units_line,
        };
        Ok(stdout.lines().filter_map(parse).collect())
    }

    fn liveness(&self, unit: &str) -> Result<i32> {
        let status = Command::new(SYSTEMCTL)
            .args(["is-active", unit])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| Error::Listing(format!("failed to run {}: {}", SYSTEMCTL, e)))?;

        status.code().ok_or_else(|| {
            Error::Listing(format!("systemctl is-active {} terminated by signal", unit))
        })
    }
}
