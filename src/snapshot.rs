//! Point-in-time snapshot of unit status, keyed and ordered by OID.
//!
//! A snapshot is immutable by construction: the OID→record map and the
//! sorted OID sequence are built together by [`Snapshot::build`] (or
//! [`Snapshot::from_records`] when loading a cache file) and never patched
//! afterwards. Anything that changes rebuilds a whole new snapshot, which
//! is what keeps an in-progress walk consistent.

use crate::config::StatusMode;
use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::systemd::UnitSource;
use std::collections::HashMap;

/// SNMP type tag for every value this agent serves.
pub const TYPE_INTEGER: &str = "integer";

/// The SUB state word that maps to status 0 in state-text mode.
const RUNNING_STATE: &str = "running";

/// One monitored unit: its OID, canonical name, and status code
/// (0 = running/active, non-zero passed through from the manager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub oid: Oid,
    pub name: String,
    pub status: i32,
}

#[derive(Debug)]
pub struct Snapshot {
    records: HashMap<Oid, Record>,
    order: Vec<Oid>,
}

impl Snapshot {
    /// Captures the current status of every listed unit.
    ///
    /// Propagates listing failure instead of returning an empty snapshot:
    /// an empty snapshot reads as "no services installed" and would
    /// corrupt the walk.
    pub fn build(prefix: &Oid, mode: StatusMode, source: &dyn UnitSource) -> Result<Self> {
        let entries = source.list_units()?;

        let mut records = HashMap::new();
        let mut order = Vec::with_capacity(entries.len());

        for entry in entries {
            if entry.name.is_empty() {
                // An empty name would encode to the bare prefix.
                tracing::warn!("skipping listing entry with empty unit name");
                continue;
            }
            let status = match mode {
                StatusMode::ExitCode => source.liveness(&entry.name)?,
                StatusMode::StateText => i32::from(entry.state != RUNNING_STATE),
            };
            let oid = prefix.encode_name(&entry.name);
            if records.contains_key(&oid) {
                tracing::debug!(unit = %entry.name, "duplicate listing entry, keeping first");
                continue;
            }
            order.push(oid.clone());
            records.insert(
                oid.clone(),
                Record {
                    oid,
                    name: entry.name,
                    status,
                },
            );
        }

        order.sort();
        tracing::debug!(units = order.len(), "snapshot built");
        Ok(Self { records, order })
    }

    /// Rebuilds a snapshot from already-encoded records (cache file load).
    pub fn from_records(list: Vec<Record>) -> Self {
        let mut records = HashMap::new();
        let mut order = Vec::with_capacity(list.len());
        for record in list {
            if records.contains_key(&record.oid) {
                continue;
            }
            order.push(record.oid.clone());
            records.insert(record.oid.clone(), record);
        }
        order.sort();
        Self { records, order }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Exact lookup.
    pub fn get(&self, oid: &Oid) -> Option<&Record> {
        self.records.get(oid)
    }

    pub fn first(&self) -> Option<&Record> {
        self.order.first().map(|oid| &self.records[oid])
    }

    /// Record at a 0-based position in walk order.
    pub fn at(&self, index: usize) -> Option<&Record> {
        self.order.get(index).map(|oid| &self.records[oid])
    }

    /// The `getnext` primitive over the sorted order.
    ///
    /// Three cases:
    /// - `oid` below the first entry (typically the bare prefix opening a
    ///   walk): the first record.
    /// - `oid` present in the snapshot: its strict successor, or `None`
    ///   at the end of the walk.
    /// - `oid` anywhere else: the walker asked to continue from an OID
    ///   this snapshot never served, a caller-side protocol violation,
    ///   reported as [`Error::NotFound`] rather than a guessed position.
    pub fn next_after(&self, oid: &Oid) -> Result<Option<&Record>> {
        let Some(first) = self.order.first() else {
            return Ok(None);
        };
        if oid < first {
            return Ok(self.records.get(first));
        }
        match self.order.binary_search(oid) {
            Ok(position) => Ok(self
                .order
                .get(position + 1)
                .map(|next| &self.records[next])),
            Err(_) => Err(Error::NotFound(oid.to_string())),
        }
    }

    /// Records in walk order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.order.iter().map(move |oid| &self.records[oid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systemd::UnitEntry;
    use std::cell::RefCell;

    struct FakeSource {
        units: Vec<(&'static str, &'static str, i32)>,
        probes: RefCell<Vec<String>>,
        fail_listing: bool,
    }

    impl FakeSource {
        fn new(units: Vec<(&'static str, &'static str, i32)>) -> Self {
            Self {
                units,
                probes: RefCell::new(Vec::new()),
                fail_listing: false,
            }
        }
    }

    impl UnitSource for FakeSource {
        fn list_units(&self) -> Result<Vec<UnitEntry>> {
            if self.fail_listing {
                return Err(Error::Listing("boom".to_string()));
            }
            Ok(self
                .units
                .iter()
                .map(|(name, state, _)| UnitEntry {
                    name: name.to_string(),
                    state: state.to_string(),
                })
                .collect())
        }

        fn liveness(&self, unit: &str) -> Result<i32> {
            self.probes.borrow_mut().push(unit.to_string());
            self.units
                .iter()
                .find(|(name, _, _)| *name == unit)
                .map(|(_, _, code)| *code)
                .ok_or_else(|| Error::Listing(format!("unknown unit {}", unit)))
        }
    }

    fn prefix() -> Oid {
        "1.3.9950.1".parse().unwrap()
    }

    #[test]
    fn exit_code_mode_probes_every_unit() {
        let source = FakeSource::new(vec![
            ("cron", "enabled", 0),
            ("sshd", "enabled", 0),
            ("nginx", "enabled", 3),
        ]);
        let snapshot = Snapshot::build(&prefix(), StatusMode::ExitCode, &source).unwrap();

        assert_eq!(snapshot.len(), 3);
        assert_eq!(source.probes.borrow().len(), 3);
        let nginx = snapshot.get(&prefix().encode_name("nginx")).unwrap();
        assert_eq!(nginx.status, 3);
        assert_eq!(nginx.name, "nginx");
    }

    #[test]
    fn state_text_mode_is_binary_and_probe_free() {
        let source = FakeSource::new(vec![
            ("cron", "running", 99),
            ("nginx", "failed", 99),
            ("polkit", "dead", 99),
        ]);
        let snapshot = Snapshot::build(&prefix(), StatusMode::StateText, &source).unwrap();

        assert!(source.probes.borrow().is_empty());
        assert_eq!(snapshot.get(&prefix().encode_name("cron")).unwrap().status, 0);
        assert_eq!(snapshot.get(&prefix().encode_name("nginx")).unwrap().status, 1);
        assert_eq!(snapshot.get(&prefix().encode_name("polkit")).unwrap().status, 1);
    }

    #[test]
    fn listing_failure_propagates() {
        let mut source = FakeSource::new(vec![]);
        source.fail_listing = true;
        let err = Snapshot::build(&prefix(), StatusMode::StateText, &source).unwrap_err();
        assert!(matches!(err, Error::Listing(_)));
    }

    #[test]
    fn empty_names_are_skipped() {
        let source = FakeSource::new(vec![("", "running", 0), ("cron", "running", 0)]);
        let snapshot = Snapshot::build(&prefix(), StatusMode::StateText, &source).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get(&prefix()).is_none());
    }

    #[test]
    fn order_is_component_wise_numeric() {
        // OIDs ending in components 9 and 10: as strings "...10" sorts
        // before "...9", numerically it is the other way around.
        let nine = Record {
            oid: "1.3.9".parse().unwrap(),
            name: "nine".to_string(),
            status: 0,
        };
        let ten = Record {
            oid: "1.3.10".parse().unwrap(),
            name: "ten".to_string(),
            status: 0,
        };
        let snapshot = Snapshot::from_records(vec![ten.clone(), nine.clone()]);
        let walked: Vec<&str> = snapshot.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(walked, ["nine", "ten"]);
    }

    #[test]
    fn next_after_walks_and_terminates() {
        let source = FakeSource::new(vec![
            ("cron", "running", 0),
            ("sshd", "running", 0),
        ]);
        let snapshot = Snapshot::build(&prefix(), StatusMode::StateText, &source).unwrap();

        let first = snapshot.next_after(&prefix()).unwrap().unwrap();
        let second = snapshot.next_after(&first.oid).unwrap().unwrap();
        assert_ne!(first.oid, second.oid);
        assert!(snapshot.next_after(&second.oid).unwrap().is_none());
    }

    #[test]
    fn next_after_unknown_mid_range_oid_is_not_found() {
        let source = FakeSource::new(vec![("cron", "running", 0), ("sshd", "running", 0)]);
        let snapshot = Snapshot::build(&prefix(), StatusMode::StateText, &source).unwrap();

        let bogus = prefix().encode_name("dbus");
        assert!(matches!(
            snapshot.next_after(&bogus),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn next_after_on_empty_snapshot_ends_immediately() {
        let snapshot = Snapshot::from_records(vec![]);
        assert!(snapshot.next_after(&prefix()).unwrap().is_none());
    }
}
