//! OID value type and the service-name encoding.
//!
//! Every monitored unit is addressed by an OID formed by appending the
//! Unicode code point of each character of the unit name, as one decimal
//! component per character, after the configured prefix. The encoding is
//! injective for non-empty names: two distinct names always differ in some
//! component position, so no two units collide under the same prefix.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A dot-separated sequence of non-negative integer components.
///
/// Ordering is component-wise numeric (`1.3.10` sorts after `1.3.9`), with
/// a shorter OID sorting before any of its extensions. This is the walk
/// order snmpd expects; sorting the textual form would put `10` before `9`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid(Vec<u64>);

impl Oid {
    /// Builds an OID from raw components. Rejects the empty sequence,
    /// which is not a valid OID and would break walk ordering.
    pub fn new(components: Vec<u64>) -> Result<Self> {
        if components.is_empty() {
            return Err(Error::OidParse {
                input: String::new(),
                reason: "an OID needs at least one component".to_string(),
            });
        }
        Ok(Self(components))
    }

    pub fn components(&self) -> &[u64] {
        &self.0
    }

    /// Appends each character of `name` as one component after `self`.
    ///
    /// Deterministic and pure. An empty name returns the bare prefix;
    /// callers that register records must skip empty names (the snapshot
    /// builder does) so the prefix itself never aliases a unit.
    pub fn encode_name(&self, name: &str) -> Oid {
        let mut components = self.0.clone();
        components.extend(name.chars().map(|c| c as u64));
        Oid(components)
    }

    /// The textual form snmpd uses in `getnext` responses: a leading dot
    /// before the first component.
    pub fn prefixed(&self) -> String {
        format!(".{}", self)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.0 {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", component)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Oid {
    type Err = Error;

    /// Parses both forms snmpd emits: `1.3.9950.1` and `.1.3.9950.1`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('.').unwrap_or(trimmed);
        if body.is_empty() {
            return Err(Error::OidParse {
                input: s.to_string(),
                reason: "empty OID".to_string(),
            });
        }
        let components = body
            .split('.')
            .map(|part| {
                part.parse::<u64>().map_err(|_| Error::OidParse {
                    input: s.to_string(),
                    reason: format!("component '{}' is not a non-negative integer", part),
                })
            })
            .collect::<Result<Vec<u64>>>()?;
        Self::new(components)
    }
}
