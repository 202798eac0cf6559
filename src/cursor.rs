//! Walk position tracking.
//!
//! [`WalkCursor`] serves sequential access over a snapshot: one record per
//! step, end-of-walk past the last record, and an automatic reset so the
//! following step opens a new pass. [`IndexFile`] persists the cursor
//! between independent one-shot invocations; a missing or unreadable file
//! falls back to the start position rather than failing.

use crate::error::{Error, Result};
use crate::snapshot::{Record, Snapshot};
use std::fs;
use std::path::PathBuf;

/// First walk position. Positions are 1-based line numbers, matching the
/// on-disk cache file layout.
pub const START_POSITION: usize = 1;

/// Outcome of one cursor step.
#[derive(Debug, PartialEq, Eq)]
pub enum Step<'a> {
    Record(&'a Record),
    /// The pass is complete. The cursor has already been reset, so the
    /// next step starts over from the first record: a walk wraps, it
    /// never errors out.
    EndOfWalk,
}

#[derive(Debug)]
pub struct WalkCursor {
    position: usize,
}

impl WalkCursor {
    pub fn new() -> Self {
        Self {
            position: START_POSITION,
        }
    }

    /// Resume from a persisted position. Out-of-range values are kept:
    /// the first step degrades them to an end-of-walk plus reset.
    pub fn resume_at(position: usize) -> Self {
        Self {
            position: position.max(START_POSITION),
        }
    }

    /// Next 1-based position this cursor will serve.
    pub fn position(&self) -> usize {
        self.position
    }

    /// True when the cursor points at the first record, i.e. no walk is in
    /// progress. Gates cache invalidation in the persisted store.
    pub fn at_start(&self) -> bool {
        self.position == START_POSITION
    }

    /// Serves the record at the current position and advances by one.
    pub fn step<'a>(&mut self, snapshot: &'a Snapshot) -> Step<'a> {
        match snapshot.at(self.position - 1) {
            Some(record) => {
                self.position += 1;
                Step::Record(record)
            }
            None => {
                self.position = START_POSITION;
                Step::EndOfWalk
            }
        }
    }
}

impl Default for WalkCursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Durable 1-based cursor position, one integer in a whole-file-replace
/// state file shared by successive one-shot invocations.
#[derive(Debug)]
pub struct IndexFile {
    path: PathBuf,
}

impl IndexFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Reads the persisted position. Missing file means no walk has
    /// started; a malformed file is treated the same way.
    pub fn load(&self) -> usize {
        match fs::read_to_string(&self.path) {
            Ok(content) => match content.trim().parse::<usize>() {
                Ok(position) if position >= START_POSITION => position,
                _ => {
                    tracing::warn!(
                        path = %self.path.display(),
                        "malformed index file, restarting walk from position 1"
                    );
                    START_POSITION
                }
            },
            Err(_) => START_POSITION,
        }
    }

    /// Persists the position for the next invocation.
    pub fn store(&self, position: usize) -> Result<()> {
        fs::write(&self.path, format!("{}\n", position)).map_err(|e| Error::Persistence {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_of(names: &[&str]) -> Snapshot {
        let prefix: crate::oid::Oid = "1.3.9950.1".parse().unwrap();
        Snapshot::from_records(
            names
                .iter()
                .map(|name| Record {
                    oid: prefix.encode_name(name),
                    name: name.to_string(),
                    status: 0,
                })
                .collect(),
        )
    }

    #[test]
    fn full_pass_visits_each_record_once_then_wraps() {
        let snapshot = snapshot_of(&["cron", "sshd", "nginx"]);
        let mut cursor = WalkCursor::new();

        let mut seen = Vec::new();
        loop {
            match cursor.step(&snapshot) {
                Step::Record(record) => seen.push(record.name.clone()),
                Step::EndOfWalk => break,
            }
        }
        assert_eq!(seen.len(), 3);
        seen.sort();
        assert_eq!(seen, ["cron", "nginx", "sshd"]);

        // End-of-walk reset the cursor: the next step restarts the pass.
        assert!(cursor.at_start());
        match cursor.step(&snapshot) {
            Step::Record(record) => assert_eq!(record.oid, snapshot.first().unwrap().oid),
            Step::EndOfWalk => panic!("walk must wrap, not stay exhausted"),
        }
    }

    #[test]
    fn empty_snapshot_ends_immediately() {
        let snapshot = snapshot_of(&[]);
        let mut cursor = WalkCursor::new();
        assert_eq!(cursor.step(&snapshot), Step::EndOfWalk);
        assert!(cursor.at_start());
    }

    #[test]
    fn resume_past_end_degrades_to_end_of_walk() {
        let snapshot = snapshot_of(&["cron"]);
        let mut cursor = WalkCursor::resume_at(17);
        assert_eq!(cursor.step(&snapshot), Step::EndOfWalk);
        assert!(cursor.at_start());
    }

    #[test]
    fn index_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let index = IndexFile::new(dir.path().join("walk.index"));

        assert_eq!(index.load(), START_POSITION);
        index.store(5).unwrap();
        assert_eq!(index.load(), 5);
    }

    #[test]
    fn index_file_corruption_falls_back_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("walk.index");
        std::fs::write(&path, "three\n").unwrap();
        assert_eq!(IndexFile::new(path.clone()).load(), START_POSITION);

        std::fs::write(&path, "0\n").unwrap();
        assert_eq!(IndexFile::new(path).load(), START_POSITION);
    }
}
