//! Conditional writes on record lock fields.
//!
//! # Invariants
//! - Every write is a single conditional `UPDATE`; the affected-row count is
//!   the only success signal.
//! - A lock is active iff both fields are set and `locked_until > now`.

use crate::db::DbResult;
use crate::model::entity::{ActorId, EntityKind, EpochMs, RecordId};
use rusqlite::{params, Connection, OptionalExtension};

/// Raw `(locked_by, locked_until)` pair as stored.
pub type LockFields = (Option<ActorId>, Option<EpochMs>);

/// Sets the lock when it is absent, expired or already owned by `actor`.
/// A half-populated pair counts as absent, matching `LockState::from_fields`.
pub fn try_acquire(
    conn: &Connection,
    kind: EntityKind,
    id: RecordId,
    actor: ActorId,
    now_ms: EpochMs,
    expires_at: EpochMs,
) -> DbResult<usize> {
    let sql = format!(
        "UPDATE {}
         SET locked_by = ?1, locked_until = ?2
         WHERE id = ?3
           AND (
                locked_by IS NULL
                OR locked_until IS NULL
                OR locked_until <= ?4
                OR locked_by = ?1
           );",
        kind.table()
    );
    let changed = conn.execute(&sql, params![actor, expires_at, id, now_ms])?;
    Ok(changed)
}

/// Clears the lock only when `actor` holds it actively.
pub fn try_release(
    conn: &Connection,
    kind: EntityKind,
    id: RecordId,
    actor: ActorId,
    now_ms: EpochMs,
) -> DbResult<usize> {
    let sql = format!(
        "UPDATE {}
         SET locked_by = NULL, locked_until = NULL
         WHERE id = ?1
           AND locked_by = ?2
           AND locked_until > ?3;",
        kind.table()
    );
    let changed = conn.execute(&sql, params![id, actor, now_ms])?;
    Ok(changed)
}

/// Clears stale fields left behind by an expired or half-populated lock.
pub fn clear_expired(
    conn: &Connection,
    kind: EntityKind,
    id: RecordId,
    now_ms: EpochMs,
) -> DbResult<usize> {
    let sql = format!(
        "UPDATE {}
         SET locked_by = NULL, locked_until = NULL
         WHERE id = ?1
           AND (locked_by IS NOT NULL OR locked_until IS NOT NULL)
           AND (locked_by IS NULL OR locked_until IS NULL OR locked_until <= ?2);",
        kind.table()
    );
    let changed = conn.execute(&sql, params![id, now_ms])?;
    Ok(changed)
}

/// Loads the stored lock pair; `None` when the record does not exist.
pub fn load_lock_fields(
    conn: &Connection,
    kind: EntityKind,
    id: RecordId,
) -> DbResult<Option<LockFields>> {
    let sql = format!(
        "SELECT locked_by, locked_until FROM {} WHERE id = ?1;",
        kind.table()
    );
    let fields = conn
        .query_row(&sql, [id], |row| Ok((row.get(0)?, row.get(1)?)))
        .optional()?;
    Ok(fields)
}
