#![allow(dead_code)]

use chrono::NaiveDate;
use flotte_core::{
    ActorId, CargoBike, CargoBikeInput, Clock, CoreResult, Engagement, EngagementInput,
    EngagementType, EngagementTypeInput, Group, Participant, ParticipantInput, RawInterval,
    UpdateCoordinator,
};
use rusqlite::Connection;

pub const ALICE: ActorId = 1;
pub const BOB: ActorId = 2;

pub fn d(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).expect("valid test date")
}

pub fn raw(start: NaiveDate, end: Option<NaiveDate>) -> RawInterval {
    RawInterval::new(Some(start), end)
}

pub fn bike_input(name: &str) -> CargoBikeInput {
    CargoBikeInput {
        name: name.to_string(),
        group: Group::Kl,
        model_name: "Bakfiets Cargotrike".to_string(),
        number_of_wheels: 3,
        for_cargo: true,
        for_children: true,
        note: None,
    }
}

pub fn create_bike(conn: &mut Connection, clock: &dyn Clock, name: &str) -> CargoBike {
    UpdateCoordinator::new(clock)
        .create::<CargoBike>(conn, ALICE, bike_input(name))
        .expect("create cargo bike")
}

pub fn create_engagement_type(
    conn: &mut Connection,
    clock: &dyn Clock,
    name: &str,
) -> EngagementType {
    UpdateCoordinator::new(clock)
        .create::<EngagementType>(
            conn,
            ALICE,
            EngagementTypeInput {
                name: name.to_string(),
                description: String::new(),
            },
        )
        .expect("create engagement type")
}

pub fn create_participant(
    conn: &mut Connection,
    clock: &dyn Clock,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> Participant {
    UpdateCoordinator::new(clock)
        .create::<Participant>(
            conn,
            ALICE,
            ParticipantInput {
                interval: raw(start, end),
                ..ParticipantInput::default()
            },
        )
        .expect("create participant")
}

pub fn engagement_input(
    participant: &Participant,
    bike: &CargoBike,
    engagement_type: &EngagementType,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> EngagementInput {
    EngagementInput {
        engagement_type_id: engagement_type.id,
        participant_id: participant.id,
        cargo_bike_id: bike.id,
        interval: raw(start, end),
        role_coordinator: false,
        role_mentor: false,
        role_bringer: true,
    }
}

pub fn try_create_engagement(
    conn: &mut Connection,
    clock: &dyn Clock,
    input: EngagementInput,
) -> CoreResult<Engagement> {
    UpdateCoordinator::new(clock).create::<Engagement>(conn, ALICE, input)
}

pub fn audit_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM action_log;", [], |row| row.get(0))
        .expect("count audit entries")
}
