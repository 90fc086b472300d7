//! Object identifier: dotted arcs plus a display name.
//!
//! Identity is the arc sequence alone. The name travels with the value for
//! logging and inspection but never takes part in equality, ordering or
//! hashing, so `1.3.6.1 'sysDescr'` and `1.3.6.1` are the same key.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Display name carried by identifiers that were never given one.
pub const UNNAMED: &str = "<nodef>";

/// Failure to parse dotted identifier text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid object identifier '{input}': {reason}")]
pub struct ParseOidError {
    pub input: String,
    pub reason: String,
}

/// An immutable object identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "OidRepr", try_from = "OidRepr")]
pub struct ObjectId {
    arcs: Vec<u32>,
    name: String,
}

impl ObjectId {
    /// Build an unnamed identifier from arcs.
    pub fn from_arcs(arcs: &[u32]) -> Self {
        ObjectId {
            arcs: arcs.to_vec(),
            name: UNNAMED.to_string(),
        }
    }

    /// Build a named identifier from arcs.
    pub fn new(arcs: Vec<u32>, name: impl Into<String>) -> Self {
        ObjectId {
            arcs,
            name: name.into(),
        }
    }

    /// Parse dotted text such as `1.3.6.1.2` (a leading `.` is accepted).
    ///
    /// The empty string parses to the empty identifier.
    pub fn parse(input: &str) -> Result<Self, ParseOidError> {
        let trimmed = input.trim();
        let body = trimmed.strip_prefix('.').unwrap_or(trimmed);
        if body.is_empty() {
            return Ok(ObjectId::from_arcs(&[]));
        }
        let mut arcs = Vec::new();
        for part in body.split('.') {
            if part.is_empty() {
                return Err(ParseOidError {
                    input: input.to_string(),
                    reason: "empty arc".to_string(),
                });
            }
            let arc = part.parse::<u32>().map_err(|e| ParseOidError {
                input: input.to_string(),
                reason: format!("arc '{}': {}", part, e),
            })?;
            arcs.push(arc);
        }
        Ok(ObjectId::from_arcs(&arcs))
    }

    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_name(&self) -> bool {
        self.name != UNNAMED
    }

    /// Same arcs, different display name.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        ObjectId {
            arcs: self.arcs.clone(),
            name: name.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// This identifier extended by one arc (unnamed).
    pub fn child(&self, arc: u32) -> Self {
        let mut arcs = self.arcs.clone();
        arcs.push(arc);
        ObjectId::from_arcs(&arcs)
    }

    /// This identifier extended by all arcs of `other` (unnamed).
    pub fn append(&self, other: &ObjectId) -> Self {
        let mut arcs = self.arcs.clone();
        arcs.extend_from_slice(&other.arcs);
        ObjectId::from_arcs(&arcs)
    }

    /// True if `prefix` is a (not necessarily proper) prefix of this identifier.
    pub fn starts_with(&self, prefix: &ObjectId) -> bool {
        self.arcs.starts_with(&prefix.arcs)
    }

    /// The arcs following `prefix`, or `None` if `prefix` does not match.
    pub fn suffix_after(&self, prefix: &ObjectId) -> Option<ObjectId> {
        if self.starts_with(prefix) {
            Some(ObjectId::from_arcs(&self.arcs[prefix.arcs.len()..]))
        } else {
            None
        }
    }

    /// The next sibling key: first arc incremented, every remaining arc reset
    /// to 1. The empty identifier yields `1`.
    ///
    /// Returns `None` only when the first arc is already `u32::MAX`.
    pub fn next(&self) -> Option<ObjectId> {
        let Some((first, rest)) = self.arcs.split_first() else {
            return Some(ObjectId::from_arcs(&[1]));
        };
        let bumped = first.checked_add(1)?;
        let mut arcs = Vec::with_capacity(self.arcs.len());
        arcs.push(bumped);
        arcs.extend(rest.iter().map(|_| 1));
        Some(ObjectId::from_arcs(&arcs))
    }

    /// The greater of two identifiers; ties return `a`.
    pub fn max<'a>(a: &'a ObjectId, b: &'a ObjectId) -> &'a ObjectId {
        if b > a {
            b
        } else {
            a
        }
    }

    /// Dotted arcs followed by the name in quotes, for log lines.
    pub fn labelled(&self) -> String {
        if self.has_name() {
            format!("{} '{}'", self, self.name)
        } else {
            self.to_string()
        }
    }
}

impl PartialEq for ObjectId {
    fn eq(&self, other: &Self) -> bool {
        self.arcs == other.arcs
    }
}

impl Eq for ObjectId {}

impl Hash for ObjectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.arcs.hash(state);
    }
}

impl PartialOrd for ObjectId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ObjectId {
    fn cmp(&self, other: &Self) -> Ordering {
        // Vec ordering is lexicographic with a proper prefix sorting first.
        self.arcs.cmp(&other.arcs)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arc) in self.arcs.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", arc)?;
        }
        Ok(())
    }
}

impl FromStr for ObjectId {
    type Err = ParseOidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse(s)
    }
}

impl From<&[u32]> for ObjectId {
    fn from(arcs: &[u32]) -> Self {
        ObjectId::from_arcs(arcs)
    }
}

// ---------------------------------------------------------------------------
// Serialized form: {"oid": "1.3.6", "name": "..."} with the name optional
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct OidRepr {
    oid: String,
    #[serde(default = "unnamed", skip_serializing_if = "is_unnamed")]
    name: String,
}

fn unnamed() -> String {
    UNNAMED.to_string()
}

fn is_unnamed(name: &String) -> bool {
    name == UNNAMED
}

impl From<ObjectId> for OidRepr {
    fn from(id: ObjectId) -> Self {
        OidRepr {
            oid: id.to_string(),
            name: id.name,
        }
    }
}

impl TryFrom<OidRepr> for ObjectId {
    type Error = ParseOidError;

    fn try_from(repr: OidRepr) -> Result<Self, Self::Error> {
        Ok(ObjectId::parse(&repr.oid)?.with_name(repr.name))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
