//! SQLite mapping of people and contact information.
//!
//! # Invariants
//! - `(first_name, name)` uniqueness is enforced by the `people` table; a
//!   duplicate surfaces as a constraint violation.
//! - Lock fields are never written here.

use crate::db::DbResult;
use crate::model::contact::{ContactInformation, Person};
use crate::model::entity::{EpochMs, RecordId};
use crate::repo::record_repo::RecordStore;
use rusqlite::{params, Connection, Row};

impl RecordStore for Person {
    const COLUMNS: &'static str = "id, first_name, name, is_deleted";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            first_name: row.get("first_name")?,
            name: row.get("name")?,
            is_deleted: row.get("is_deleted")?,
        })
    }

    fn insert(conn: &Connection, record: &Self, now_ms: EpochMs) -> DbResult<RecordId> {
        conn.execute(
            "INSERT INTO people (first_name, name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3);",
            params![record.first_name, record.name, now_ms],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_row(conn: &Connection, record: &Self, now_ms: EpochMs) -> DbResult<usize> {
        let changed = conn.execute(
            "UPDATE people
             SET first_name = ?2, name = ?3, updated_at = ?4
             WHERE id = ?1
               AND is_deleted = 0;",
            params![record.id, record.first_name, record.name, now_ms],
        )?;
        Ok(changed)
    }
}

impl RecordStore for ContactInformation {
    const COLUMNS: &'static str = "id, person_id, phone, phone2, email, email2, note, is_deleted";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            person_id: row.get("person_id")?,
            phone: row.get("phone")?,
            phone2: row.get("phone2")?,
            email: row.get("email")?,
            email2: row.get("email2")?,
            note: row.get("note")?,
            is_deleted: row.get("is_deleted")?,
        })
    }

    fn insert(conn: &Connection, record: &Self, now_ms: EpochMs) -> DbResult<RecordId> {
        conn.execute(
            "INSERT INTO contact_information (
                person_id, phone, phone2, email, email2, note, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7);",
            params![
                record.person_id,
                record.phone,
                record.phone2,
                record.email,
                record.email2,
                record.note,
                now_ms,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_row(conn: &Connection, record: &Self, now_ms: EpochMs) -> DbResult<usize> {
        let changed = conn.execute(
            "UPDATE contact_information
             SET
                person_id = ?2,
                phone = ?3,
                phone2 = ?4,
                email = ?5,
                email2 = ?6,
                note = ?7,
                updated_at = ?8
             WHERE id = ?1
               AND is_deleted = 0;",
            params![
                record.id,
                record.person_id,
                record.phone,
                record.phone2,
                record.email,
                record.email2,
                record.note,
                now_ms,
            ],
        )?;
        Ok(changed)
    }
}

/// Live contact entries of one person, oldest first.
pub fn contact_information_by_person(
    conn: &Connection,
    person_id: RecordId,
) -> DbResult<Vec<ContactInformation>> {
    let sql = format!(
        "SELECT {} FROM contact_information
         WHERE person_id = ?1
           AND is_deleted = 0
         ORDER BY id ASC;",
        <ContactInformation as RecordStore>::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([person_id], ContactInformation::from_row)?;
    let mut contacts = Vec::new();
    for row in rows {
        contacts.push(row?);
    }
    Ok(contacts)
}
