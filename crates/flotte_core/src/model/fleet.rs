//! Fleet records: cargo bikes, participants, engagements and workshops.
//!
//! # Responsibility
//! - Define the record values persisted by the fleet store and serialized as
//!   audit snapshots.
//! - Define per-kind create inputs and update patches.
//!
//! # Invariants
//! - Unsaved records carry id `0`; ids are assigned by storage.
//! - Patches replace an interval wholesale; partial interval edits are not
//!   representable.

use crate::model::entity::{EntityKind, RecordId};
use crate::model::interval::{Interval, RawInterval};
use crate::model::record::{
    require_not_blank, Record, RecordValidationError, TemporalSubject,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Minimum wheel count of a cargo bike.
pub const MIN_NUMBER_OF_WHEELS: u8 = 2;

/// Location group a cargo bike belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Group {
    Kl,
    Li,
    Sp,
    Fk,
    Mh,
    Sz,
    Ts,
    Tk,
}

impl Group {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Kl => "KL",
            Self::Li => "LI",
            Self::Sp => "SP",
            Self::Fk => "FK",
            Self::Mh => "MH",
            Self::Sz => "SZ",
            Self::Ts => "TS",
            Self::Tk => "TK",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "KL" => Some(Self::Kl),
            "LI" => Some(Self::Li),
            "SP" => Some(Self::Sp),
            "FK" => Some(Self::Fk),
            "MH" => Some(Self::Mh),
            "SZ" => Some(Self::Sz),
            "TS" => Some(Self::Ts),
            "TK" => Some(Self::Tk),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CargoBike {
    pub id: RecordId,
    pub name: String,
    pub group: Group,
    pub model_name: String,
    pub number_of_wheels: u8,
    pub for_cargo: bool,
    pub for_children: bool,
    pub note: Option<String>,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CargoBikeInput {
    pub name: String,
    pub group: Group,
    pub model_name: String,
    pub number_of_wheels: u8,
    pub for_cargo: bool,
    pub for_children: bool,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CargoBikePatch {
    pub name: Option<String>,
    pub group: Option<Group>,
    pub model_name: Option<String>,
    pub number_of_wheels: Option<u8>,
    pub for_cargo: Option<bool>,
    pub for_children: Option<bool>,
    /// `Some(None)` clears the note.
    pub note: Option<Option<String>>,
}

impl Record for CargoBike {
    const KIND: EntityKind = EntityKind::CargoBike;
    type Input = CargoBikeInput;
    type Patch = CargoBikePatch;

    fn id(&self) -> RecordId {
        self.id
    }

    fn with_id(self, id: RecordId) -> Self {
        Self { id, ..self }
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn with_deleted(self, is_deleted: bool) -> Self {
        Self { is_deleted, ..self }
    }

    fn from_input(input: CargoBikeInput, _today: NaiveDate) -> Result<Self, RecordValidationError> {
        Ok(Self {
            id: 0,
            name: input.name,
            group: input.group,
            model_name: input.model_name,
            number_of_wheels: input.number_of_wheels,
            for_cargo: input.for_cargo,
            for_children: input.for_children,
            note: input.note,
            is_deleted: false,
        })
    }

    fn apply_patch(
        &self,
        patch: CargoBikePatch,
        _today: NaiveDate,
    ) -> Result<Self, RecordValidationError> {
        let current = self.clone();
        Ok(Self {
            name: patch.name.unwrap_or(current.name),
            group: patch.group.unwrap_or(current.group),
            model_name: patch.model_name.unwrap_or(current.model_name),
            number_of_wheels: patch.number_of_wheels.unwrap_or(current.number_of_wheels),
            for_cargo: patch.for_cargo.unwrap_or(current.for_cargo),
            for_children: patch.for_children.unwrap_or(current.for_children),
            note: patch.note.unwrap_or(current.note),
            ..current
        })
    }

    fn validate(&self) -> Result<(), RecordValidationError> {
        require_not_blank("name", &self.name)?;
        require_not_blank("modelName", &self.model_name)?;
        if self.number_of_wheels < MIN_NUMBER_OF_WHEELS {
            return Err(RecordValidationError::TooFewWheels {
                minimum: MIN_NUMBER_OF_WHEELS,
                found: self.number_of_wheels,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: RecordId,
    pub interval: Interval,
    pub contact_information_id: Option<RecordId>,
    pub username_slack: Option<String>,
    pub member_adfc: bool,
    pub member_core_team: bool,
    /// Workshops attended, ascending and without duplicates.
    pub workshop_ids: Vec<RecordId>,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantInput {
    pub interval: RawInterval,
    pub contact_information_id: Option<RecordId>,
    pub username_slack: Option<String>,
    pub member_adfc: bool,
    pub member_core_team: bool,
    pub workshop_ids: Vec<RecordId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantPatch {
    pub interval: Option<RawInterval>,
    pub contact_information_id: Option<Option<RecordId>>,
    pub username_slack: Option<Option<String>>,
    pub member_adfc: Option<bool>,
    pub member_core_team: Option<bool>,
    /// Replaces the whole membership set.
    pub workshop_ids: Option<Vec<RecordId>>,
}

impl Record for Participant {
    const KIND: EntityKind = EntityKind::Participant;
    type Input = ParticipantInput;
    type Patch = ParticipantPatch;

    fn id(&self) -> RecordId {
        self.id
    }

    fn with_id(self, id: RecordId) -> Self {
        Self { id, ..self }
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn with_deleted(self, is_deleted: bool) -> Self {
        Self { is_deleted, ..self }
    }

    fn from_input(
        input: ParticipantInput,
        today: NaiveDate,
    ) -> Result<Self, RecordValidationError> {
        Ok(Self {
            id: 0,
            interval: Interval::normalize(input.interval, today)?,
            contact_information_id: input.contact_information_id,
            username_slack: input.username_slack,
            member_adfc: input.member_adfc,
            member_core_team: input.member_core_team,
            workshop_ids: normalize_ids(input.workshop_ids),
            is_deleted: false,
        })
    }

    fn apply_patch(
        &self,
        patch: ParticipantPatch,
        today: NaiveDate,
    ) -> Result<Self, RecordValidationError> {
        let current = self.clone();
        let interval = match patch.interval {
            Some(raw) => Interval::normalize(raw, today)?,
            None => current.interval,
        };
        Ok(Self {
            interval,
            contact_information_id: patch
                .contact_information_id
                .unwrap_or(current.contact_information_id),
            username_slack: patch.username_slack.unwrap_or(current.username_slack),
            member_adfc: patch.member_adfc.unwrap_or(current.member_adfc),
            member_core_team: patch.member_core_team.unwrap_or(current.member_core_team),
            workshop_ids: patch
                .workshop_ids
                .map_or(current.workshop_ids, normalize_ids),
            ..current
        })
    }

    fn temporal_subject(&self) -> TemporalSubject<'_> {
        TemporalSubject::Participant(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementType {
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngagementTypeInput {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngagementTypePatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Record for EngagementType {
    const KIND: EntityKind = EntityKind::EngagementType;
    type Input = EngagementTypeInput;
    type Patch = EngagementTypePatch;

    fn id(&self) -> RecordId {
        self.id
    }

    fn with_id(self, id: RecordId) -> Self {
        Self { id, ..self }
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn with_deleted(self, is_deleted: bool) -> Self {
        Self { is_deleted, ..self }
    }

    fn from_input(
        input: EngagementTypeInput,
        _today: NaiveDate,
    ) -> Result<Self, RecordValidationError> {
        Ok(Self {
            id: 0,
            name: input.name,
            description: input.description,
            is_deleted: false,
        })
    }

    fn apply_patch(
        &self,
        patch: EngagementTypePatch,
        _today: NaiveDate,
    ) -> Result<Self, RecordValidationError> {
        let current = self.clone();
        Ok(Self {
            name: patch.name.unwrap_or(current.name),
            description: patch.description.unwrap_or(current.description),
            ..current
        })
    }

    fn validate(&self) -> Result<(), RecordValidationError> {
        require_not_blank("name", &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub id: RecordId,
    pub engagement_type_id: RecordId,
    pub participant_id: RecordId,
    pub cargo_bike_id: RecordId,
    pub interval: Interval,
    pub role_coordinator: bool,
    pub role_mentor: bool,
    pub role_bringer: bool,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngagementInput {
    pub engagement_type_id: RecordId,
    pub participant_id: RecordId,
    pub cargo_bike_id: RecordId,
    pub interval: RawInterval,
    pub role_coordinator: bool,
    pub role_mentor: bool,
    pub role_bringer: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngagementPatch {
    pub engagement_type_id: Option<RecordId>,
    pub participant_id: Option<RecordId>,
    pub cargo_bike_id: Option<RecordId>,
    pub interval: Option<RawInterval>,
    pub role_coordinator: Option<bool>,
    pub role_mentor: Option<bool>,
    pub role_bringer: Option<bool>,
}

impl Record for Engagement {
    const KIND: EntityKind = EntityKind::Engagement;
    type Input = EngagementInput;
    type Patch = EngagementPatch;

    fn id(&self) -> RecordId {
        self.id
    }

    fn with_id(self, id: RecordId) -> Self {
        Self { id, ..self }
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn with_deleted(self, is_deleted: bool) -> Self {
        Self { is_deleted, ..self }
    }

    fn from_input(input: EngagementInput, today: NaiveDate) -> Result<Self, RecordValidationError> {
        Ok(Self {
            id: 0,
            engagement_type_id: input.engagement_type_id,
            participant_id: input.participant_id,
            cargo_bike_id: input.cargo_bike_id,
            interval: Interval::normalize(input.interval, today)?,
            role_coordinator: input.role_coordinator,
            role_mentor: input.role_mentor,
            role_bringer: input.role_bringer,
            is_deleted: false,
        })
    }

    fn apply_patch(
        &self,
        patch: EngagementPatch,
        today: NaiveDate,
    ) -> Result<Self, RecordValidationError> {
        let current = self.clone();
        let interval = match patch.interval {
            Some(raw) => Interval::normalize(raw, today)?,
            None => current.interval,
        };
        Ok(Self {
            engagement_type_id: patch.engagement_type_id.unwrap_or(current.engagement_type_id),
            participant_id: patch.participant_id.unwrap_or(current.participant_id),
            cargo_bike_id: patch.cargo_bike_id.unwrap_or(current.cargo_bike_id),
            interval,
            role_coordinator: patch.role_coordinator.unwrap_or(current.role_coordinator),
            role_mentor: patch.role_mentor.unwrap_or(current.role_mentor),
            role_bringer: patch.role_bringer.unwrap_or(current.role_bringer),
            ..current
        })
    }

    fn temporal_subject(&self) -> TemporalSubject<'_> {
        TemporalSubject::Engagement(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopType {
    pub id: RecordId,
    pub name: String,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkshopTypeInput {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkshopTypePatch {
    pub name: Option<String>,
}

impl Record for WorkshopType {
    const KIND: EntityKind = EntityKind::WorkshopType;
    type Input = WorkshopTypeInput;
    type Patch = WorkshopTypePatch;

    fn id(&self) -> RecordId {
        self.id
    }

    fn with_id(self, id: RecordId) -> Self {
        Self { id, ..self }
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn with_deleted(self, is_deleted: bool) -> Self {
        Self { is_deleted, ..self }
    }

    fn from_input(
        input: WorkshopTypeInput,
        _today: NaiveDate,
    ) -> Result<Self, RecordValidationError> {
        Ok(Self {
            id: 0,
            name: input.name,
            is_deleted: false,
        })
    }

    fn apply_patch(
        &self,
        patch: WorkshopTypePatch,
        _today: NaiveDate,
    ) -> Result<Self, RecordValidationError> {
        let current = self.clone();
        Ok(Self {
            name: patch.name.unwrap_or(current.name),
            ..current
        })
    }

    fn validate(&self) -> Result<(), RecordValidationError> {
        require_not_blank("name", &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workshop {
    pub id: RecordId,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub workshop_type_id: RecordId,
    pub trainer1_id: Option<RecordId>,
    pub trainer2_id: Option<RecordId>,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkshopInput {
    pub title: String,
    pub description: Option<String>,
    /// Defaults to today when absent.
    pub date: Option<NaiveDate>,
    pub workshop_type_id: RecordId,
    pub trainer1_id: Option<RecordId>,
    pub trainer2_id: Option<RecordId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkshopPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub date: Option<NaiveDate>,
    pub workshop_type_id: Option<RecordId>,
    pub trainer1_id: Option<Option<RecordId>>,
    pub trainer2_id: Option<Option<RecordId>>,
}

impl Record for Workshop {
    const KIND: EntityKind = EntityKind::Workshop;
    type Input = WorkshopInput;
    type Patch = WorkshopPatch;

    fn id(&self) -> RecordId {
        self.id
    }

    fn with_id(self, id: RecordId) -> Self {
        Self { id, ..self }
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn with_deleted(self, is_deleted: bool) -> Self {
        Self { is_deleted, ..self }
    }

    fn from_input(input: WorkshopInput, today: NaiveDate) -> Result<Self, RecordValidationError> {
        Ok(Self {
            id: 0,
            title: input.title,
            description: input.description,
            date: input.date.unwrap_or(today),
            workshop_type_id: input.workshop_type_id,
            trainer1_id: input.trainer1_id,
            trainer2_id: input.trainer2_id,
            is_deleted: false,
        })
    }

    fn apply_patch(
        &self,
        patch: WorkshopPatch,
        _today: NaiveDate,
    ) -> Result<Self, RecordValidationError> {
        let current = self.clone();
        Ok(Self {
            title: patch.title.unwrap_or(current.title),
            description: patch.description.unwrap_or(current.description),
            date: patch.date.unwrap_or(current.date),
            workshop_type_id: patch.workshop_type_id.unwrap_or(current.workshop_type_id),
            trainer1_id: patch.trainer1_id.unwrap_or(current.trainer1_id),
            trainer2_id: patch.trainer2_id.unwrap_or(current.trainer2_id),
            ..current
        })
    }

    fn validate(&self) -> Result<(), RecordValidationError> {
        require_not_blank("title", &self.title)
    }
}

fn normalize_ids(mut ids: Vec<RecordId>) -> Vec<RecordId> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).expect("valid test date")
    }

    fn bike() -> CargoBike {
        CargoBike::from_input(
            CargoBikeInput {
                name: "Lastenrad Lotte".to_string(),
                group: Group::Kl,
                model_name: "Bakfiets".to_string(),
                number_of_wheels: 2,
                for_cargo: true,
                for_children: false,
                note: None,
            },
            d(1, 1),
        )
        .unwrap()
    }

    #[test]
    fn group_db_names_round_trip() {
        for group in [
            Group::Kl,
            Group::Li,
            Group::Sp,
            Group::Fk,
            Group::Mh,
            Group::Sz,
            Group::Ts,
            Group::Tk,
        ] {
            assert_eq!(Group::parse(group.as_db_str()), Some(group));
        }
        assert_eq!(Group::parse("kl"), None);
    }

    #[test]
    fn cargo_bike_requires_two_wheels_and_a_name() {
        let mut candidate = bike();
        assert!(candidate.validate().is_ok());

        candidate.number_of_wheels = 1;
        assert_eq!(
            candidate.validate(),
            Err(RecordValidationError::TooFewWheels {
                minimum: 2,
                found: 1
            })
        );

        let blank = bike().apply_patch(
            CargoBikePatch {
                name: Some("   ".to_string()),
                ..CargoBikePatch::default()
            },
            d(1, 1),
        );
        assert_eq!(
            blank.unwrap().validate(),
            Err(RecordValidationError::BlankField { field: "name" })
        );
    }

    #[test]
    fn patch_keeps_untouched_fields_and_clears_nullable_ones() {
        let mut original = bike();
        original.note = Some("needs new brakes".to_string());
        let patched = original
            .apply_patch(
                CargoBikePatch {
                    note: Some(None),
                    for_children: Some(true),
                    ..CargoBikePatch::default()
                },
                d(1, 1),
            )
            .unwrap();
        assert_eq!(patched.note, None);
        assert!(patched.for_children);
        assert_eq!(patched.name, original.name);
    }

    #[test]
    fn participant_input_defaults_start_to_today() {
        let participant = Participant::from_input(ParticipantInput::default(), d(4, 1)).unwrap();
        assert_eq!(participant.interval.start(), d(4, 1));
        assert!(participant.interval.is_open_ended());
    }

    #[test]
    fn participant_workshops_are_sorted_and_deduplicated() {
        let participant = Participant::from_input(
            ParticipantInput {
                workshop_ids: vec![5, 2, 5, 9],
                ..ParticipantInput::default()
            },
            d(4, 1),
        )
        .unwrap();
        assert_eq!(participant.workshop_ids, vec![2, 5, 9]);

        let untouched = participant
            .apply_patch(ParticipantPatch::default(), d(4, 1))
            .unwrap();
        assert_eq!(untouched.workshop_ids, vec![2, 5, 9]);

        let replaced = participant
            .apply_patch(
                ParticipantPatch {
                    workshop_ids: Some(vec![7, 7]),
                    contact_information_id: Some(Some(3)),
                    ..ParticipantPatch::default()
                },
                d(4, 1),
            )
            .unwrap();
        assert_eq!(replaced.workshop_ids, vec![7]);
        assert_eq!(replaced.contact_information_id, Some(3));
    }

    #[test]
    fn engagement_patch_replaces_interval_wholesale() {
        let engagement = Engagement::from_input(
            EngagementInput {
                interval: RawInterval::new(Some(d(1, 1)), Some(d(1, 10))),
                ..EngagementInput::default()
            },
            d(1, 1),
        )
        .unwrap();
        let patched = engagement
            .apply_patch(
                EngagementPatch {
                    interval: Some(RawInterval::new(Some(d(2, 1)), None)),
                    ..EngagementPatch::default()
                },
                d(6, 1),
            )
            .unwrap();
        assert_eq!(patched.interval, Interval::open_ended(d(2, 1)));
    }

    #[test]
    fn patch_with_inverted_interval_is_rejected() {
        let participant = Participant::from_input(ParticipantInput::default(), d(4, 1)).unwrap();
        let err = participant
            .apply_patch(
                ParticipantPatch {
                    interval: Some(RawInterval::new(Some(d(5, 1)), Some(d(4, 1)))),
                    ..ParticipantPatch::default()
                },
                d(4, 1),
            )
            .unwrap_err();
        assert!(matches!(err, RecordValidationError::Interval(_)));
    }

    #[test]
    fn snapshots_use_camel_case_fields() {
        let json = serde_json::to_string(&bike()).unwrap();
        assert!(json.contains("\"numberOfWheels\":2"));
        assert!(json.contains("\"group\":\"KL\""));
        assert!(!json.contains("locked"));
    }
}
