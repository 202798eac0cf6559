//! # systemd-snmp-agent
//!
//! An SNMP pass/pass_persist sub-agent that reports the run state of every
//! systemd-managed service to snmpd. Each unit name is encoded into an OID
//! under a fixed prefix (one decimal component per character), and a
//! point-in-time snapshot of unit status is served through the two
//! primitives a walking monitor needs: `get` and `getnext` over a total,
//! component-wise-numeric OID order.
//!
//! One binary covers both snmpd integration styles:
//!
//! - **pass_persist**: long-lived loop on stdin/stdout with an in-memory
//!   snapshot for the process lifetime.
//! - **pass**: one-shot `-g`/`-n`/`-s` invocations backed by a cache file
//!   with a staleness window and a persisted walk index.
//!
//! ## Quick start
//!
//! ```no_run
//! use systemd_snmp_agent::{AgentConfig, ProtocolHandler, Snapshot, SystemctlSource};
//!
//! # fn example() -> systemd_snmp_agent::Result<()> {
//! let config = AgentConfig::default();
//! let source = SystemctlSource::for_mode(config.status_mode);
//! let snapshot = Snapshot::build(&config.prefix()?, config.status_mode, &source)?;
//!
//! let stdin = std::io::stdin();
//! let stdout = std::io::stdout();
//! ProtocolHandler::new(&snapshot).serve(stdin.lock(), stdout.lock())?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod cursor;
pub mod error;
pub mod oid;
pub mod protocol;
pub mod snapshot;
pub mod store;
pub mod systemd;

// Re-export commonly used types
pub use config::{AgentConfig, StatusMode};
pub use cursor::{IndexFile, Step, WalkCursor};
pub use error::{Error, Result};
pub use oid::Oid;
pub use protocol::ProtocolHandler;
pub use snapshot::{Record, Snapshot, TYPE_INTEGER};
pub use store::CacheStore;
pub use systemd::{SystemctlSource, UnitSource};
