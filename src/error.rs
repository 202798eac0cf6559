use miette::Diagnostic;
use std::io;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(sdagent::config::error),
        help("Check the agent config file and command-line overrides")
    )]
    Config(String),

    #[error("Unit listing failed: {0}")]
    #[diagnostic(
        code(sdagent::listing::failed),
        help("Check that systemctl is on PATH and `systemctl list-unit-files` works")
    )]
    Listing(String),

    #[error("No such OID: {0}")]
    #[diagnostic(code(sdagent::oid::not_found))]
    NotFound(String),

    #[error("Invalid OID '{input}': {reason}")]
    #[diagnostic(
        code(sdagent::oid::parse),
        help("OIDs are dot-separated decimal components, e.g. .1.3.9950.1")
    )]
    OidParse { input: String, reason: String },

    #[error("Protocol violation: {0}")]
    #[diagnostic(code(sdagent::protocol::violation))]
    Protocol(String),

    #[error("Cache file error at '{path}': {reason}")]
    #[diagnostic(
        code(sdagent::cache::error),
        help("The cache is rebuilt automatically; check permissions on the state directory")
    )]
    Persistence { path: String, reason: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::Listing(msg) => Some(format!(
                "The unit listing command failed ({}). Verify that this host runs systemd \
                 and that the agent user may invoke `systemctl list-unit-files`.",
                msg
            )),
            Error::Persistence { path, .. } => Some(format!(
                "Check ownership and permissions on '{}'. The agent treats an unreadable \
                 cache as a miss and rebuilds it, so deleting the file is always safe.",
                path
            )),
            Error::Config(_) => Some(
                "Validate the config file against the documented fields: oid_prefix, \
                 cache_file, index_file, cache_lifetime, status_mode."
                    .to_string(),
            ),
            Error::OidParse { .. } => Some(
                "snmpd passes OIDs with or without a leading dot; both are accepted. \
                 Anything else in the OID position is a framing bug on the caller side."
                    .to_string(),
            ),
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}
