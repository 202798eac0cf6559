//! Agent configuration.
//!
//! Defaults match the deployed script generation of this agent: prefix
//! `1.3.9950.1`, state files under `/var/lib/snmp/`, a 240 second cache
//! lifetime, exit-code status mode. All fields can come from an optional
//! YAML file and be overridden per-flag on the command line.

use crate::error::{Error, Result};
use crate::oid::Oid;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// How a unit's status code is obtained during a snapshot build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusMode {
    /// One `systemctl is-active` round trip per unit; the exit code is the
    /// status verbatim, preserving manager-specific non-zero reasons.
    /// Dominant latency source of a build, accepted by design.
    ExitCode,
    /// Binary status from the listing's state word: 0 iff `running`.
    /// No per-unit round trip.
    StateText,
}

impl FromStr for StatusMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "exit-code" => Ok(StatusMode::ExitCode),
            "state-text" => Ok(StatusMode::StateText),
            other => Err(Error::Config(format!(
                "unknown status mode '{}' (expected 'exit-code' or 'state-text')",
                other
            ))),
        }
    }
}

impl fmt::Display for StatusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMode::ExitCode => write!(f, "exit-code"),
            StatusMode::StateText => write!(f, "state-text"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// OID prefix all service OIDs hang off.
    #[serde(default = "default_oid_prefix")]
    pub oid_prefix: String,

    /// Snapshot cache file (stateless one-shot mode only).
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,

    /// Persisted walk index file (stateless one-shot mode only).
    #[serde(default = "default_index_file")]
    pub index_file: PathBuf,

    /// Cache staleness window, e.g. "240", "240s", "4m".
    #[serde(default = "default_cache_lifetime")]
    pub cache_lifetime: String,

    /// Status acquisition mode.
    #[serde(default = "default_status_mode")]
    pub status_mode: StatusMode,
}

fn default_oid_prefix() -> String {
    "1.3.9950.1".to_string()
}

fn default_cache_file() -> PathBuf {
    PathBuf::from("/var/lib/snmp/systemd-service-status.cache")
}

fn default_index_file() -> PathBuf {
    PathBuf::from("/var/lib/snmp/systemd-service-status.index")
}

fn default_cache_lifetime() -> String {
    "240s".to_string()
}

fn default_status_mode() -> StatusMode {
    StatusMode::ExitCode
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            oid_prefix: default_oid_prefix(),
            cache_file: default_cache_file(),
            index_file: default_index_file(),
            cache_lifetime: default_cache_lifetime(),
            status_mode: default_status_mode(),
        }
    }
}

impl AgentConfig {
    /// Load config from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    /// Parse config from a YAML string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: AgentConfig = serde_yaml::from_str(content)
            .map_err(|e| Error::Parse(format!("Failed to parse YAML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.prefix()?;
        self.lifetime()?;
        if self.cache_file == self.index_file {
            return Err(Error::Config(
                "cache_file and index_file must be distinct paths".to_string(),
            ));
        }
        Ok(())
    }

    /// The OID prefix, parsed.
    pub fn prefix(&self) -> Result<Oid> {
        self.oid_prefix
            .parse()
            .map_err(|_| Error::Config(format!("invalid oid_prefix '{}'", self.oid_prefix)))
    }

    /// The staleness window, parsed.
    pub fn lifetime(&self) -> Result<Duration> {
        parse_duration_string(&self.cache_lifetime).ok_or_else(|| {
            Error::Config(format!(
                "invalid cache_lifetime '{}' (expected e.g. \"240\", \"240s\", \"4m\")",
                self.cache_lifetime
            ))
        })
    }
}

/// Parse a duration string like "240", "30s", "4m", "500ms".
///
/// No suffix assumes seconds. Returns `None` if the string cannot be
/// parsed.
pub fn parse_duration_string(s: &str) -> Option<Duration> {
    let s = s.trim();

    if s.is_empty() {
        return None;
    }

    if s.ends_with("ms") {
        s.trim_end_matches("ms")
            .parse::<u64>()
            .ok()
            .map(Duration::from_millis)
    } else if s.ends_with('s') {
        s.trim_end_matches('s')
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    } else if s.ends_with('m') {
        s.trim_end_matches('m')
            .parse::<u64>()
            .ok()
            .map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
