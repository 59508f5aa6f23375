//! Audit log entry model.
//!
//! # Invariants
//! - Entries are append-only; nothing in core updates or deletes them.
//! - Snapshots are opaque to the recorder.

use crate::model::entity::{ActorId, EpochMs, RecordId};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Kind of state change recorded by one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    Create,
    Update,
    SoftDelete,
    Delete,
    Restore,
}

impl AuditAction {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::SoftDelete => "SOFT_DELETE",
            Self::Delete => "DELETE",
            Self::Restore => "RESTORE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CREATE" => Some(Self::Create),
            "UPDATE" => Some(Self::Update),
            "SOFT_DELETE" => Some(Self::SoftDelete),
            "DELETE" => Some(Self::Delete),
            "RESTORE" => Some(Self::Restore),
            _ => None,
        }
    }
}

impl Display for AuditAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// Serialized full state of a record at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(String);

impl Snapshot {
    /// Snapshot of a record that does not exist on this side of the change.
    pub fn absent() -> Self {
        Self("null".to_string())
    }

    pub fn of<T: Serialize>(record: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_string(record).map(Self)
    }

    pub fn from_raw(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_absent(&self) -> bool {
        self.0 == "null"
    }
}

/// One persisted audit log row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogEntry {
    pub id: i64,
    pub date: EpochMs,
    pub action: AuditAction,
    pub actor_id: ActorId,
    pub entity_name: String,
    pub record_id: RecordId,
    pub entries_old: Snapshot,
    pub entries_new: Snapshot,
}
