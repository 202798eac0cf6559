use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// snmpd invokes this binary two ways: with no operation flag as a
/// long-lived `pass_persist` handler, or via `pass` as a one-shot
/// `-g`/`-n`/`-s` call. At most one operation flag is accepted.
#[derive(Parser)]
#[command(name = "sdagent")]
#[command(about = "SNMP pass/pass_persist sub-agent reporting systemd service status")]
#[command(group(ArgGroup::new("operation").args(["get", "getnext", "set"])))]
pub struct Cli {
    /// Config file path (YAML; built-in defaults when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// OID prefix override
    #[arg(long, value_name = "OID")]
    pub prefix: Option<String>,

    /// Snapshot cache file override (one-shot mode)
    #[arg(long, value_name = "PATH")]
    pub cache_file: Option<PathBuf>,

    /// Walk index file override (one-shot mode)
    #[arg(long, value_name = "PATH")]
    pub index_file: Option<PathBuf>,

    /// Cache staleness window override, e.g. "240", "240s", "4m"
    #[arg(long, value_name = "DURATION")]
    pub cache_lifetime: Option<String>,

    /// Status acquisition mode override.
    /// - exit-code: one `systemctl is-active` per unit, exit code verbatim
    /// - state-text: binary status from the listing state word, no per-unit calls
    #[arg(long, value_name = "MODE")]
    pub mode: Option<String>,

    /// One-shot get for OID against the cache
    #[arg(short = 'g', long = "get", value_name = "OID")]
    pub get: Option<String>,

    /// One-shot getnext: the OID is accepted for protocol compatibility
    /// but the persisted walk index decides what is served
    #[arg(short = 'n', long = "getnext", value_name = "OID")]
    pub getnext: Option<String>,

    /// One-shot set request; always answered not-writable
    #[arg(
        short = 's',
        long = "set",
        num_args = 3,
        value_names = ["OID", "TYPE", "VALUE"]
    )]
    pub set: Option<Vec<String>>,
}

/// The selected operation, normalized out of the flag soup.
pub enum Operation {
    Get(String),
    GetNext,
    Set,
    Persist,
}

impl Cli {
    pub fn operation(&self) -> Operation {
        if let Some(oid) = &self.get {
            Operation::Get(oid.clone())
        } else if self.getnext.is_some() {
            Operation::GetNext
        } else if self.set.is_some() {
            Operation::Set
        } else {
            Operation::Persist
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_operation_means_persist_loop() {
        let cli = Cli::parse_from(["sdagent"]);
        assert!(matches!(cli.operation(), Operation::Persist));
    }

    #[test]
    fn short_get_flag() {
        let cli = Cli::parse_from(["sdagent", "-g", ".1.3.9950.1.99"]);
        match cli.operation() {
            Operation::Get(oid) => assert_eq!(oid, ".1.3.9950.1.99"),
            _ => panic!("expected get"),
        }
    }

    #[test]
    fn set_takes_three_values() {
        let cli = Cli::parse_from(["sdagent", "-s", ".1.3.9950.1.99", "integer", "1"]);
        assert!(matches!(cli.operation(), Operation::Set));
    }

    #[test]
    fn operations_are_mutually_exclusive() {
        assert!(Cli::try_parse_from(["sdagent", "-g", ".1.3", "-n", ".1.3"]).is_err());
    }

    #[test]
    fn overrides_parse() {
        let cli = Cli::parse_from([
            "sdagent",
            "--prefix",
            "1.3.42",
            "--cache-lifetime",
            "4m",
            "--mode",
            "state-text",
            "-n",
            ".1.3.42",
        ]);
        assert_eq!(cli.prefix.as_deref(), Some("1.3.42"));
        assert_eq!(cli.cache_lifetime.as_deref(), Some("4m"));
        assert!(matches!(cli.operation(), Operation::GetNext));
    }
}
