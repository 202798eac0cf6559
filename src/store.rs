//! Cache-file-backed snapshot store for the stateless one-shot variant.
//!
//! On disk, one line per record in walk order:
//!
//! ```text
//! .<oid> integer <status> <name>
//! ```
//!
//! Staleness only invalidates the cache when the persisted walk cursor is
//! back at its start position, because a walk in progress must see a
//! stable snapshot even across the staleness boundary. The flip side is a known
//! liveness caveat carried over from the previous generation of this
//! agent: if snmpd abandons a walk mid-pass and never completes one, the
//! cache is pinned stale indefinitely.
//!
//! Writes go to a sibling temp file renamed into place, so two concurrent
//! refreshes are a benign race: either result is a complete cache.

use crate::error::{Error, Result};
use crate::snapshot::{Record, Snapshot, TYPE_INTEGER};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    lifetime: Duration,
}

impl CacheStore {
    pub fn new(path: PathBuf, lifetime: Duration) -> Self {
        Self { path, lifetime }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current snapshot, rebuilding the cache when needed.
    ///
    /// `walk_at_start` is the persisted cursor's `at_start()`; staleness
    /// never fires mid-walk. `build` runs only on a miss and its failure
    /// propagates; a failed build must not leave an empty cache behind.
    pub fn open_or_refresh(
        &self,
        walk_at_start: bool,
        build: impl FnOnce() -> Result<Snapshot>,
    ) -> Result<Snapshot> {
        if self.path.exists() {
            if self.is_stale() && walk_at_start {
                tracing::info!(path = %self.path.display(), "cache stale, rebuilding");
                if let Err(e) = fs::remove_file(&self.path) {
                    tracing::warn!(error = %e, "could not remove stale cache");
                }
            } else {
                match self.load() {
                    Ok(snapshot) => return Ok(snapshot),
                    Err(e) => {
                        tracing::warn!(error = %e, "unreadable cache, rebuilding");
                    }
                }
            }
        }

        let snapshot = build()?;
        if let Err(e) = self.write(&snapshot) {
            // Serving the freshly built snapshot still works; only the
            // next invocation pays for the failed write.
            tracing::warn!(error = %e, "could not persist cache");
        }
        Ok(snapshot)
    }

    fn is_stale(&self) -> bool {
        let age = fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|mtime| mtime.elapsed().ok());
        match age {
            Some(age) => age > self.lifetime,
            // Unknown mtime: treat as fresh and let the parser decide.
            None => false,
        }
    }

    /// Parses the cache file back into a snapshot.
    pub fn load(&self) -> Result<Snapshot> {
        let content = fs::read_to_string(&self.path).map_err(|e| Error::Persistence {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut records = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            records.push(self.parse_line(line)?);
        }
        Ok(Snapshot::from_records(records))
    }

    fn parse_line(&self, line: &str) -> Result<Record> {
        let malformed = |reason: &str| Error::Persistence {
            path: self.path.display().to_string(),
            reason: format!("malformed cache line '{}': {}", line, reason),
        };

        let mut fields = line.splitn(4, ' ');
        let oid_field = fields.next().ok_or_else(|| malformed("missing OID"))?;
        let type_tag = fields.next().ok_or_else(|| malformed("missing type tag"))?;
        let status_field = fields.next().ok_or_else(|| malformed("missing status"))?;
        let name = fields.next().ok_or_else(|| malformed("missing name"))?;

        if type_tag != TYPE_INTEGER {
            return Err(malformed("unknown type tag"));
        }
        let oid = oid_field
            .parse()
            .map_err(|_| malformed("unparseable OID"))?;
        let status = status_field
            .parse::<i32>()
            .map_err(|_| malformed("unparseable status"))?;

        Ok(Record {
            oid,
            name: name.trim().to_string(),
            status,
        })
    }

    /// Writes the snapshot to a sibling temp file and renames it into
    /// place (whole-file replace, last writer wins).
    pub fn write(&self, snapshot: &Snapshot) -> Result<()> {
        let mut content = String::new();
        for record in snapshot.iter() {
            content.push_str(&format!(
                "{} {} {} {}\n",
                record.oid.prefixed(),
                TYPE_INTEGER,
                record.status,
                record.name
            ));
        }

        let tmp = self.path.with_extension("tmp");
        let persist_err = |e: std::io::Error| Error::Persistence {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        };
        fs::write(&tmp, content).map_err(persist_err)?;
        fs::rename(&tmp, &self.path).map_err(persist_err)?;
        Ok(())
    }
}
