//! Append-only persistence of audit log entries.
//!
//! # Invariants
//! - This module only inserts and reads; the schema rejects updates/deletes.
//! - Listing is newest first (`id DESC`).

use crate::db::{DbError, DbResult};
use crate::model::audit::{AuditAction, AuditLogEntry, Snapshot};
use crate::model::entity::{ActorId, EntityKind, EpochMs, RecordId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

const AUDIT_DEFAULT_LIMIT: u32 = 50;
const AUDIT_LIMIT_MAX: u32 = 500;

/// Entry content before storage assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry<'a> {
    pub date: EpochMs,
    pub action: AuditAction,
    pub actor_id: ActorId,
    pub entity: EntityKind,
    pub record_id: RecordId,
    pub entries_old: &'a Snapshot,
    pub entries_new: &'a Snapshot,
}

/// Filters for audit reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditQuery {
    pub entity: Option<EntityKind>,
    pub record_id: Option<RecordId>,
    /// Maximum rows to return. Defaults to 50 and clamps to 500.
    pub limit: Option<u32>,
}

impl AuditQuery {
    pub fn for_record(entity: EntityKind, record_id: RecordId) -> Self {
        Self {
            entity: Some(entity),
            record_id: Some(record_id),
            limit: None,
        }
    }
}

pub fn insert_entry(conn: &Connection, entry: &NewAuditEntry<'_>) -> DbResult<i64> {
    conn.execute(
        "INSERT INTO action_log (
            date, action, actor_id, entity, record_id, entries_old, entries_new
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            entry.date,
            entry.action.as_db_str(),
            entry.actor_id,
            entry.entity.entity_name(),
            entry.record_id,
            entry.entries_old.as_str(),
            entry.entries_new.as_str(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Lists matching entries, newest first.
pub fn list_entries(conn: &Connection, query: &AuditQuery) -> DbResult<Vec<AuditLogEntry>> {
    let (filter, mut bind_values) = audit_filter(query);
    let sql = format!(
        "SELECT id, date, action, actor_id, entity, record_id, entries_old, entries_new
         FROM action_log{filter}
         ORDER BY id DESC
         LIMIT ?;"
    );
    bind_values.push(Value::Integer(i64::from(normalize_audit_limit(query.limit))));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        let action_text: String = row.get("action")?;
        let action = AuditAction::parse(&action_text).ok_or_else(|| {
            DbError::InvalidData(format!("unknown audit action `{action_text}`"))
        })?;
        entries.push(AuditLogEntry {
            id: row.get("id")?,
            date: row.get("date")?,
            action,
            actor_id: row.get("actor_id")?,
            entity_name: row.get("entity")?,
            record_id: row.get("record_id")?,
            entries_old: Snapshot::from_raw(row.get("entries_old")?),
            entries_new: Snapshot::from_raw(row.get("entries_new")?),
        });
    }
    Ok(entries)
}

/// Counts matching entries, ignoring `limit`.
pub fn count_entries(conn: &Connection, query: &AuditQuery) -> DbResult<u64> {
    let (filter, bind_values) = audit_filter(query);
    let sql = format!("SELECT COUNT(*) FROM action_log{filter};");
    let count = conn.query_row(&sql, params_from_iter(bind_values), |row| {
        row.get::<_, i64>(0)
    })?;
    Ok(u64::try_from(count).unwrap_or(0))
}

fn audit_filter(query: &AuditQuery) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut bind_values = Vec::new();
    if let Some(entity) = query.entity {
        clauses.push("entity = ?");
        bind_values.push(Value::Text(entity.entity_name().to_string()));
    }
    if let Some(record_id) = query.record_id {
        clauses.push("record_id = ?");
        bind_values.push(Value::Integer(record_id));
    }

    if clauses.is_empty() {
        (String::new(), bind_values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), bind_values)
    }
}

fn normalize_audit_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => AUDIT_DEFAULT_LIMIT,
        Some(value) => value.min(AUDIT_LIMIT_MAX),
    }
}
