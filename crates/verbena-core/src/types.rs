//! Core types for Verbena

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for an RSVP record
///
/// Uses ULID for time-ordered unique identifiers that sort lexicographically,
/// so the stored collection stays in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RsvpId(pub Ulid);

impl RsvpId {
    /// Create a new RsvpId with current timestamp
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Create an RsvpId from a ULID
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Get the underlying ULID
    pub fn as_ulid(&self) -> &Ulid {
        &self.0
    }

    /// Parse from string representation
    pub fn from_string(s: &str) -> Result<Self, ulid::DecodeError> {
        let ulid = Ulid::from_string(s)?;
        Ok(Self(ulid))
    }
}

impl Default for RsvpId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RsvpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rsvp_{}", self.0)
    }
}

/// A single RSVP confirmation
///
/// Records are append-only: once persisted they are never mutated or deleted
/// by the engine. `date` and `time` are display strings derived from the
/// local time of submission; `timestamp` is the authoritative instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsvpRecord {
    /// Unique, time-ordered identifier
    pub id: RsvpId,
    /// Guest name, trimmed and non-empty
    pub name: String,
    /// Submission instant (ISO-8601 on the wire)
    pub timestamp: DateTime<Utc>,
    /// Local date of submission, `D/M/YYYY`
    pub date: String,
    /// Local time of submission, `HH:MM:SS`
    pub time: String,
}

impl RsvpRecord {
    /// Create a new record for `name` stamped with the current time.
    ///
    /// The caller is expected to pass an already-trimmed, non-empty name;
    /// the store re-validates before persisting.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        let local = now.with_timezone(&Local);
        Self {
            id: RsvpId::new(),
            name: name.into(),
            timestamp: now,
            date: local.format("%-d/%-m/%Y").to_string(),
            time: local.format("%H:%M:%S").to_string(),
        }
    }
}
