//! Scheduling invariants over engagements and participants.
//!
//! # Responsibility
//! - No-overlap: live engagements sharing `(cargo_bike_id, engagement_type_id)`
//!   are pairwise non-overlapping.
//! - Containment: every live engagement lies inside its participant's interval,
//!   checked from both sides (engagement write, participant write).
//!
//! # Invariants
//! - Checks read through the caller's connection; the coordinator runs them
//!   inside its `BEGIN IMMEDIATE` transaction so sibling rows cannot change
//!   between check and write.
//! - Overlap and containment are only ever decided by `Interval`.
//! - Tombstoned engagements take no part in either check.

use crate::error::{CoreError, CoreResult};
use crate::model::entity::RecordId;
use crate::model::fleet::{Engagement, Participant};
use crate::model::record::TemporalSubject;
use crate::repo::fleet_repo::{engagement_siblings, engagements_by_participant};
use crate::repo::record_repo::RecordStore;
use log::warn;
use rusqlite::Connection;

/// Runs whichever checks apply to the proposed post-image.
pub fn check(conn: &Connection, subject: TemporalSubject<'_>) -> CoreResult<()> {
    match subject {
        TemporalSubject::Unscheduled => Ok(()),
        TemporalSubject::Engagement(engagement) => check_engagement(conn, engagement),
        TemporalSubject::Participant(participant) => check_participant(conn, participant),
    }
}

/// Checks a proposed engagement against its siblings and its participant.
pub fn check_engagement(conn: &Connection, engagement: &Engagement) -> CoreResult<()> {
    if engagement.is_deleted {
        return Ok(());
    }

    let conflicts: Vec<RecordId> = engagement_siblings(
        conn,
        engagement.cargo_bike_id,
        engagement.engagement_type_id,
        engagement.id,
    )?
    .into_iter()
    .filter(|sibling| sibling.interval.overlaps(&engagement.interval))
    .map(|sibling| sibling.id)
    .collect();
    if !conflicts.is_empty() {
        return Err(reject(
            "overlap",
            format!(
                "engagement interval {} overlaps engagements {:?} of type {} on cargo bike {}",
                engagement.interval,
                conflicts,
                engagement.engagement_type_id,
                engagement.cargo_bike_id
            ),
            conflicts,
        ));
    }

    let Some(participant) = Participant::find(conn, engagement.participant_id, false)? else {
        return Err(reject(
            "missing_participant",
            format!("participant {} does not exist", engagement.participant_id),
            vec![engagement.participant_id],
        ));
    };
    if !participant.interval.contains(&engagement.interval) {
        return Err(reject(
            "containment",
            format!(
                "engagement interval {} lies outside participant {} interval {}",
                engagement.interval, participant.id, participant.interval
            ),
            vec![participant.id],
        ));
    }

    Ok(())
}

/// Checks that a proposed participant interval still covers every engagement.
pub fn check_participant(conn: &Connection, participant: &Participant) -> CoreResult<()> {
    if participant.is_deleted {
        return Ok(());
    }

    let outside: Vec<RecordId> = engagements_by_participant(conn, participant.id)?
        .into_iter()
        .filter(|engagement| !participant.interval.contains(&engagement.interval))
        .map(|engagement| engagement.id)
        .collect();
    if !outside.is_empty() {
        return Err(reject(
            "containment",
            format!(
                "participant {} interval {} no longer covers engagements {:?}",
                participant.id, participant.interval, outside
            ),
            outside,
        ));
    }

    Ok(())
}

fn reject(rule: &str, reason: String, record_ids: Vec<RecordId>) -> CoreError {
    warn!(
        "event=temporal_reject module=temporal status=rejected rule={} record_ids={:?}",
        rule, record_ids
    );
    CoreError::validation(reason, record_ids)
}
