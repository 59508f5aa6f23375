//! Generic record persistence contract and shared row helpers.
//!
//! # Responsibility
//! - Provide find/list/insert/update for every lockable record kind,
//!   including join-table relations owned by a record.
//! - Provide kind-generic tombstone and hard-delete writes.
//!
//! # Invariants
//! - Table names are only ever taken from `EntityKind::table()`.
//! - Write helpers return the affected-row count; callers decide whether a
//!   count other than one is an error.
//! - `find`/`list` exclude tombstoned rows unless asked otherwise.

use crate::db::DbResult;
use crate::model::entity::{EntityKind, EpochMs, RecordId};
use crate::model::interval::Interval;
use crate::model::record::Record;
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const LIST_DEFAULT_LIMIT: u32 = 25;
const LIST_LIMIT_MAX: u32 = 100;

/// Offset/limit pagination for list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    /// Number of rows to skip.
    pub offset: u32,
    /// Maximum rows to return. Defaults to 25 and clamps to 100.
    pub limit: Option<u32>,
}

impl Page {
    pub fn new(offset: u32, limit: u32) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }

    /// Effective limit after applying default and clamp.
    pub fn applied_limit(&self) -> u32 {
        match self.limit {
            Some(0) | None => LIST_DEFAULT_LIMIT,
            Some(limit) => limit.min(LIST_LIMIT_MAX),
        }
    }
}

/// SQLite persistence for one record kind.
pub trait RecordStore: Record {
    /// Comma-separated column list consumed by `from_row`.
    const COLUMNS: &'static str;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Inserts a new row and returns the storage-assigned id.
    fn insert(conn: &Connection, record: &Self, now_ms: EpochMs) -> DbResult<RecordId>;

    /// Overwrites all record fields of a live row.
    fn update_row(conn: &Connection, record: &Self, now_ms: EpochMs) -> DbResult<usize>;

    /// Fills fields backed by join tables after `from_row`.
    fn load_relations(&mut self, _conn: &Connection) -> DbResult<()> {
        Ok(())
    }

    /// Rewrites join-table rows of a saved record. Called inside the mutation
    /// transaction right after `insert`/`update_row`.
    fn save_relations(_conn: &Connection, _record: &Self) -> DbResult<()> {
        Ok(())
    }

    fn find(conn: &Connection, id: RecordId, include_deleted: bool) -> DbResult<Option<Self>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?1 AND (?2 OR is_deleted = 0);",
            Self::COLUMNS,
            Self::KIND.table()
        );
        let found = conn
            .query_row(&sql, params![id, include_deleted], Self::from_row)
            .optional()?;
        match found {
            Some(mut record) => {
                record.load_relations(conn)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Lists live rows ordered by id.
    fn list(conn: &Connection, page: &Page) -> DbResult<Vec<Self>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE is_deleted = 0 ORDER BY id ASC LIMIT ?1 OFFSET ?2;",
            Self::COLUMNS,
            Self::KIND.table()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![i64::from(page.applied_limit()), i64::from(page.offset)],
            Self::from_row,
        )?;
        let mut records = Vec::new();
        for row in rows {
            let mut record = row?;
            record.load_relations(conn)?;
            records.push(record);
        }
        Ok(records)
    }
}

/// Flips the tombstone flag; only rows currently in the opposite state change.
pub fn set_deleted(
    conn: &Connection,
    kind: EntityKind,
    id: RecordId,
    deleted: bool,
    now_ms: EpochMs,
) -> DbResult<usize> {
    let sql = format!(
        "UPDATE {}
         SET is_deleted = ?1, updated_at = ?2
         WHERE id = ?3 AND is_deleted = ?4;",
        kind.table()
    );
    let changed = conn.execute(&sql, params![deleted, now_ms, id, !deleted])?;
    Ok(changed)
}

/// Removes the row permanently, lock fields included.
pub fn delete_row(conn: &Connection, kind: EntityKind, id: RecordId) -> DbResult<usize> {
    let sql = format!("DELETE FROM {} WHERE id = ?1;", kind.table());
    let changed = conn.execute(&sql, [id])?;
    Ok(changed)
}

/// True when a row with `id` exists, tombstoned or not.
pub fn record_exists(conn: &Connection, kind: EntityKind, id: RecordId) -> DbResult<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);", kind.table());
    let exists = conn.query_row(&sql, [id], |row| row.get::<_, bool>(0))?;
    Ok(exists)
}

pub(crate) fn interval_from_row(
    row: &Row<'_>,
    start_column: &str,
    end_column: &str,
) -> rusqlite::Result<Interval> {
    let start: NaiveDate = row.get(start_column)?;
    let end: Option<NaiveDate> = row.get(end_column)?;
    Interval::new(start, end).map_err(|err| conversion_failure(row, start_column, err))
}

pub(crate) fn conversion_failure(
    row: &Row<'_>,
    column: &str,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    let index = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, err.into())
}

#[cfg(test)]
mod tests {
    use super::Page;

    #[test]
    fn page_limit_defaults_and_clamps() {
        assert_eq!(Page::default().applied_limit(), 25);
        assert_eq!(Page::new(0, 0).applied_limit(), 25);
        assert_eq!(Page::new(0, 10).applied_limit(), 10);
        assert_eq!(Page::new(0, 1_000).applied_limit(), 100);
    }
}
