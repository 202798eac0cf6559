//! One-shot and loop entry points behind the CLI.

use systemd_snmp_agent::{
    AgentConfig, CacheStore, IndexFile, Oid, ProtocolHandler, Result, Snapshot, Step,
    SystemctlSource, WalkCursor, TYPE_INTEGER,
};

/// Loads the cached snapshot, rebuilding it when stale (and the walk is at
/// its start) or unreadable.
fn cached_snapshot(config: &AgentConfig, walk_at_start: bool) -> Result<Snapshot> {
    let store = CacheStore::new(config.cache_file.clone(), config.lifetime()?);
    let prefix = config.prefix()?;
    let mode = config.status_mode;
    store.open_or_refresh(walk_at_start, || {
        let source = SystemctlSource::for_mode(mode);
        Snapshot::build(&prefix, mode, &source)
    })
}

/// `pass -g`: exact lookup. A hit prints the three response lines; a miss
/// prints nothing and snmpd reports noSuchName.
pub fn run_get(config: &AgentConfig, oid_arg: &str) -> Result<()> {
    let oid: Oid = oid_arg.parse()?;
    let index = IndexFile::new(config.index_file.clone());
    let cursor = WalkCursor::resume_at(index.load());
    let snapshot = cached_snapshot(config, cursor.at_start())?;

    match snapshot.get(&oid) {
        Some(record) => {
            println!("{}", record.oid);
            println!("{}", TYPE_INTEGER);
            println!("{}", record.status);
        }
        None => {
            tracing::debug!(oid = %oid, "get miss");
        }
    }
    Ok(())
}

/// `pass -n`: serves the persisted walk position and advances it. The end
/// of a pass prints nothing and resets the index, so the next call starts
/// the walk over.
pub fn run_getnext(config: &AgentConfig) -> Result<()> {
    let index = IndexFile::new(config.index_file.clone());
    let mut cursor = WalkCursor::resume_at(index.load());
    let snapshot = cached_snapshot(config, cursor.at_start())?;

    match cursor.step(&snapshot) {
        Step::Record(record) => {
            println!("{}", record.oid.prefixed());
            println!("{}", TYPE_INTEGER);
            println!("{}", record.status);
        }
        Step::EndOfWalk => {
            tracing::debug!("end of walk, index reset");
        }
    }
    index.store(cursor.position())?;
    Ok(())
}

/// `pass -s`: nothing this agent serves is writable.
pub fn run_set() {
    println!("not-writable");
}

/// The pass_persist loop: one snapshot for the process lifetime, commands
/// on stdin, replies on stdout.
pub fn run_persist(config: &AgentConfig) -> Result<()> {
    let prefix = config.prefix()?;
    let source = SystemctlSource::for_mode(config.status_mode);
    let snapshot = Snapshot::build(&prefix, config.status_mode, &source)?;
    tracing::info!(units = snapshot.len(), "entering pass_persist loop");

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    ProtocolHandler::new(&snapshot).serve(stdin.lock(), stdout.lock())
}
