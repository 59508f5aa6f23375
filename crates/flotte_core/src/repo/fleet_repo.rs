//! SQLite mapping of fleet records and engagement scheduling queries.
//!
//! # Responsibility
//! - Map each fleet record kind to its table.
//! - Provide the sibling lookups the temporal checks need.
//! - Provide engagement read queries by participant, cargo bike and date.
//! - Keep participant workshop membership in `participant_workshops`.
//!
//! # Invariants
//! - Scheduling queries only ever return live (non-tombstoned) engagements.
//! - Lock fields are never written here.

use crate::db::DbResult;
use crate::model::entity::{EpochMs, RecordId};
use crate::model::fleet::{
    CargoBike, Engagement, EngagementType, Group, Participant, Workshop, WorkshopType,
};
use crate::repo::record_repo::{conversion_failure, interval_from_row, Page, RecordStore};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Params, Row};

impl RecordStore for CargoBike {
    const COLUMNS: &'static str = "id, name, bike_group, model_name, number_of_wheels, \
         for_cargo, for_children, note, is_deleted";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let group_text: String = row.get("bike_group")?;
        let group = Group::parse(&group_text).ok_or_else(|| {
            conversion_failure(row, "bike_group", format!("unknown bike group `{group_text}`"))
        })?;
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            group,
            model_name: row.get("model_name")?,
            number_of_wheels: row.get("number_of_wheels")?,
            for_cargo: row.get("for_cargo")?,
            for_children: row.get("for_children")?,
            note: row.get("note")?,
            is_deleted: row.get("is_deleted")?,
        })
    }

    fn insert(conn: &Connection, record: &Self, now_ms: EpochMs) -> DbResult<RecordId> {
        conn.execute(
            "INSERT INTO cargo_bikes (
                name, bike_group, model_name, number_of_wheels,
                for_cargo, for_children, note, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8);",
            params![
                record.name,
                record.group.as_db_str(),
                record.model_name,
                record.number_of_wheels,
                record.for_cargo,
                record.for_children,
                record.note,
                now_ms,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_row(conn: &Connection, record: &Self, now_ms: EpochMs) -> DbResult<usize> {
        let changed = conn.execute(
            "UPDATE cargo_bikes
             SET
                name = ?2,
                bike_group = ?3,
                model_name = ?4,
                number_of_wheels = ?5,
                for_cargo = ?6,
                for_children = ?7,
                note = ?8,
                updated_at = ?9
             WHERE id = ?1
               AND is_deleted = 0;",
            params![
                record.id,
                record.name,
                record.group.as_db_str(),
                record.model_name,
                record.number_of_wheels,
                record.for_cargo,
                record.for_children,
                record.note,
                now_ms,
            ],
        )?;
        Ok(changed)
    }
}

impl RecordStore for Participant {
    const COLUMNS: &'static str = "id, start_date, end_date, contact_information_id, \
         username_slack, member_adfc, member_core_team, is_deleted";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            interval: interval_from_row(row, "start_date", "end_date")?,
            contact_information_id: row.get("contact_information_id")?,
            username_slack: row.get("username_slack")?,
            member_adfc: row.get("member_adfc")?,
            member_core_team: row.get("member_core_team")?,
            workshop_ids: Vec::new(),
            is_deleted: row.get("is_deleted")?,
        })
    }

    fn insert(conn: &Connection, record: &Self, now_ms: EpochMs) -> DbResult<RecordId> {
        conn.execute(
            "INSERT INTO participants (
                start_date, end_date, contact_information_id, username_slack,
                member_adfc, member_core_team, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7);",
            params![
                record.interval.start(),
                record.interval.end(),
                record.contact_information_id,
                record.username_slack,
                record.member_adfc,
                record.member_core_team,
                now_ms,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_row(conn: &Connection, record: &Self, now_ms: EpochMs) -> DbResult<usize> {
        let changed = conn.execute(
            "UPDATE participants
             SET
                start_date = ?2,
                end_date = ?3,
                contact_information_id = ?4,
                username_slack = ?5,
                member_adfc = ?6,
                member_core_team = ?7,
                updated_at = ?8
             WHERE id = ?1
               AND is_deleted = 0;",
            params![
                record.id,
                record.interval.start(),
                record.interval.end(),
                record.contact_information_id,
                record.username_slack,
                record.member_adfc,
                record.member_core_team,
                now_ms,
            ],
        )?;
        Ok(changed)
    }

    fn load_relations(&mut self, conn: &Connection) -> DbResult<()> {
        let mut stmt = conn.prepare(
            "SELECT workshop_id
             FROM participant_workshops
             WHERE participant_id = ?1
             ORDER BY workshop_id ASC;",
        )?;
        let rows = stmt.query_map([self.id], |row| row.get::<_, RecordId>(0))?;
        let mut workshop_ids = Vec::new();
        for row in rows {
            workshop_ids.push(row?);
        }
        self.workshop_ids = workshop_ids;
        Ok(())
    }

    fn save_relations(conn: &Connection, record: &Self) -> DbResult<()> {
        conn.execute(
            "DELETE FROM participant_workshops WHERE participant_id = ?1;",
            [record.id],
        )?;
        let mut stmt = conn.prepare(
            "INSERT INTO participant_workshops (participant_id, workshop_id) VALUES (?1, ?2);",
        )?;
        for workshop_id in &record.workshop_ids {
            stmt.execute(params![record.id, workshop_id])?;
        }
        Ok(())
    }
}

impl RecordStore for EngagementType {
    const COLUMNS: &'static str = "id, name, description, is_deleted";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            is_deleted: row.get("is_deleted")?,
        })
    }

    fn insert(conn: &Connection, record: &Self, now_ms: EpochMs) -> DbResult<RecordId> {
        conn.execute(
            "INSERT INTO engagement_types (name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3);",
            params![record.name, record.description, now_ms],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_row(conn: &Connection, record: &Self, now_ms: EpochMs) -> DbResult<usize> {
        let changed = conn.execute(
            "UPDATE engagement_types
             SET name = ?2, description = ?3, updated_at = ?4
             WHERE id = ?1
               AND is_deleted = 0;",
            params![record.id, record.name, record.description, now_ms],
        )?;
        Ok(changed)
    }
}

impl RecordStore for Engagement {
    const COLUMNS: &'static str = "id, engagement_type_id, participant_id, cargo_bike_id, \
         start_date, end_date, role_coordinator, role_mentor, role_bringer, is_deleted";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            engagement_type_id: row.get("engagement_type_id")?,
            participant_id: row.get("participant_id")?,
            cargo_bike_id: row.get("cargo_bike_id")?,
            interval: interval_from_row(row, "start_date", "end_date")?,
            role_coordinator: row.get("role_coordinator")?,
            role_mentor: row.get("role_mentor")?,
            role_bringer: row.get("role_bringer")?,
            is_deleted: row.get("is_deleted")?,
        })
    }

    fn insert(conn: &Connection, record: &Self, now_ms: EpochMs) -> DbResult<RecordId> {
        conn.execute(
            "INSERT INTO engagements (
                engagement_type_id, participant_id, cargo_bike_id, start_date, end_date,
                role_coordinator, role_mentor, role_bringer, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9);",
            params![
                record.engagement_type_id,
                record.participant_id,
                record.cargo_bike_id,
                record.interval.start(),
                record.interval.end(),
                record.role_coordinator,
                record.role_mentor,
                record.role_bringer,
                now_ms,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_row(conn: &Connection, record: &Self, now_ms: EpochMs) -> DbResult<usize> {
        let changed = conn.execute(
            "UPDATE engagements
             SET
                engagement_type_id = ?2,
                participant_id = ?3,
                cargo_bike_id = ?4,
                start_date = ?5,
                end_date = ?6,
                role_coordinator = ?7,
                role_mentor = ?8,
                role_bringer = ?9,
                updated_at = ?10
             WHERE id = ?1
               AND is_deleted = 0;",
            params![
                record.id,
                record.engagement_type_id,
                record.participant_id,
                record.cargo_bike_id,
                record.interval.start(),
                record.interval.end(),
                record.role_coordinator,
                record.role_mentor,
                record.role_bringer,
                now_ms,
            ],
        )?;
        Ok(changed)
    }
}

impl RecordStore for WorkshopType {
    const COLUMNS: &'static str = "id, name, is_deleted";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            is_deleted: row.get("is_deleted")?,
        })
    }

    fn insert(conn: &Connection, record: &Self, now_ms: EpochMs) -> DbResult<RecordId> {
        conn.execute(
            "INSERT INTO workshop_types (name, created_at, updated_at) VALUES (?1, ?2, ?2);",
            params![record.name, now_ms],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_row(conn: &Connection, record: &Self, now_ms: EpochMs) -> DbResult<usize> {
        let changed = conn.execute(
            "UPDATE workshop_types
             SET name = ?2, updated_at = ?3
             WHERE id = ?1
               AND is_deleted = 0;",
            params![record.id, record.name, now_ms],
        )?;
        Ok(changed)
    }
}

impl RecordStore for Workshop {
    const COLUMNS: &'static str = "id, title, description, date, workshop_type_id, \
         trainer1_id, trainer2_id, is_deleted";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            date: row.get("date")?,
            workshop_type_id: row.get("workshop_type_id")?,
            trainer1_id: row.get("trainer1_id")?,
            trainer2_id: row.get("trainer2_id")?,
            is_deleted: row.get("is_deleted")?,
        })
    }

    fn insert(conn: &Connection, record: &Self, now_ms: EpochMs) -> DbResult<RecordId> {
        conn.execute(
            "INSERT INTO workshops (
                title, description, date, workshop_type_id, trainer1_id, trainer2_id,
                created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7);",
            params![
                record.title,
                record.description,
                record.date,
                record.workshop_type_id,
                record.trainer1_id,
                record.trainer2_id,
                now_ms,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_row(conn: &Connection, record: &Self, now_ms: EpochMs) -> DbResult<usize> {
        let changed = conn.execute(
            "UPDATE workshops
             SET
                title = ?2,
                description = ?3,
                date = ?4,
                workshop_type_id = ?5,
                trainer1_id = ?6,
                trainer2_id = ?7,
                updated_at = ?8
             WHERE id = ?1
               AND is_deleted = 0;",
            params![
                record.id,
                record.title,
                record.description,
                record.date,
                record.workshop_type_id,
                record.trainer1_id,
                record.trainer2_id,
                now_ms,
            ],
        )?;
        Ok(changed)
    }
}

/// Live engagements sharing a cargo bike and engagement type, except `exclude_id`.
pub fn engagement_siblings(
    conn: &Connection,
    cargo_bike_id: RecordId,
    engagement_type_id: RecordId,
    exclude_id: RecordId,
) -> DbResult<Vec<Engagement>> {
    query_engagements(
        conn,
        "WHERE cargo_bike_id = ?1
           AND engagement_type_id = ?2
           AND id <> ?3
           AND is_deleted = 0
         ORDER BY start_date ASC, id ASC",
        params![cargo_bike_id, engagement_type_id, exclude_id],
    )
}

/// Live engagements of one participant, oldest first.
pub fn engagements_by_participant(
    conn: &Connection,
    participant_id: RecordId,
) -> DbResult<Vec<Engagement>> {
    query_engagements(
        conn,
        "WHERE participant_id = ?1
           AND is_deleted = 0
         ORDER BY start_date ASC, id ASC",
        params![participant_id],
    )
}

/// Live engagements of one cargo bike, newest interval first.
pub fn engagements_by_cargo_bike(
    conn: &Connection,
    cargo_bike_id: RecordId,
    page: &Page,
) -> DbResult<Vec<Engagement>> {
    query_engagements(
        conn,
        "WHERE cargo_bike_id = ?1
           AND is_deleted = 0
         ORDER BY start_date DESC, id DESC
         LIMIT ?2 OFFSET ?3",
        params![
            cargo_bike_id,
            i64::from(page.applied_limit()),
            i64::from(page.offset)
        ],
    )
}

/// Live engagements of one cargo bike whose interval covers `date`.
pub fn engagements_active_on(
    conn: &Connection,
    cargo_bike_id: RecordId,
    date: NaiveDate,
) -> DbResult<Vec<Engagement>> {
    let candidates = query_engagements(
        conn,
        "WHERE cargo_bike_id = ?1
           AND is_deleted = 0
           AND start_date <= ?2
         ORDER BY start_date ASC, id ASC",
        params![cargo_bike_id, date],
    )?;
    Ok(candidates
        .into_iter()
        .filter(|engagement| engagement.interval.contains_date(date))
        .collect())
}

/// Live workshops a participant attends, ordered by date.
pub fn workshops_by_participant(
    conn: &Connection,
    participant_id: RecordId,
) -> DbResult<Vec<Workshop>> {
    let sql = format!(
        "SELECT {}
         FROM workshops
         WHERE is_deleted = 0
           AND id IN (
               SELECT workshop_id FROM participant_workshops WHERE participant_id = ?1
           )
         ORDER BY date ASC, id ASC;",
        <Workshop as RecordStore>::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([participant_id], Workshop::from_row)?;
    let mut workshops = Vec::new();
    for row in rows {
        workshops.push(row?);
    }
    Ok(workshops)
}

fn query_engagements<P: Params>(
    conn: &Connection,
    filter: &str,
    params: P,
) -> DbResult<Vec<Engagement>> {
    let sql = format!(
        "SELECT {} FROM engagements {filter};",
        <Engagement as RecordStore>::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params, Engagement::from_row)?;
    let mut engagements = Vec::new();
    for row in rows {
        engagements.push(row?);
    }
    Ok(engagements)
}
