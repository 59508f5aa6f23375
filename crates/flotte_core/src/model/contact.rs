//! People and their contact details.
//!
//! # Invariants
//! - A person is identified for humans by the `(first_name, name)` pair, which
//!   storage keeps unique.
//! - Contact information always belongs to exactly one person.

use crate::model::entity::{EntityKind, RecordId};
use crate::model::record::{require_not_blank, Record, RecordValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: RecordId,
    pub first_name: String,
    pub name: String,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonInput {
    pub first_name: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonPatch {
    pub first_name: Option<String>,
    pub name: Option<String>,
}

impl Record for Person {
    const KIND: EntityKind = EntityKind::Person;
    type Input = PersonInput;
    type Patch = PersonPatch;

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

    fn from_input(input: PersonInput, _today: NaiveDate) -> Result<Self, RecordValidationError> {
        Ok(Self {
            id: 0,
            first_name: input.first_name.trim().to_string(),
            name: input.name.trim().to_string(),
            is_deleted: false,
        })
    }

    fn apply_patch(
        &self,
        patch: PersonPatch,
        _today: NaiveDate,
    ) -> Result<Self, RecordValidationError> {
        let current = self.clone();
        Ok(Self {
            first_name: patch
                .first_name
                .map_or(current.first_name, |value| value.trim().to_string()),
            name: patch
                .name
                .map_or(current.name, |value| value.trim().to_string()),
            ..current
        })
    }

    fn validate(&self) -> Result<(), RecordValidationError> {
        require_not_blank("firstName", &self.first_name)?;
        require_not_blank("name", &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInformation {
    pub id: RecordId,
    pub person_id: RecordId,
    pub phone: Option<String>,
    pub phone2: Option<String>,
    pub email: Option<String>,
    pub email2: Option<String>,
    pub note: Option<String>,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInformationInput {
    pub person_id: RecordId,
    pub phone: Option<String>,
    pub phone2: Option<String>,
    pub email: Option<String>,
    pub email2: Option<String>,
    pub note: Option<String>,
}

/// `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInformationPatch {
    pub person_id: Option<RecordId>,
    pub phone: Option<Option<String>>,
    pub phone2: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub email2: Option<Option<String>>,
    pub note: Option<Option<String>>,
}

impl Record for ContactInformation {
    const KIND: EntityKind = EntityKind::ContactInformation;
    type Input = ContactInformationInput;
    type Patch = ContactInformationPatch;

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
        input: ContactInformationInput,
        _today: NaiveDate,
    ) -> Result<Self, RecordValidationError> {
        Ok(Self {
            id: 0,
            person_id: input.person_id,
            phone: input.phone,
            phone2: input.phone2,
            email: input.email,
            email2: input.email2,
            note: input.note,
            is_deleted: false,
        })
    }

    fn apply_patch(
        &self,
        patch: ContactInformationPatch,
        _today: NaiveDate,
    ) -> Result<Self, RecordValidationError> {
        let current = self.clone();
        Ok(Self {
            person_id: patch.person_id.unwrap_or(current.person_id),
            phone: patch.phone.unwrap_or(current.phone),
            phone2: patch.phone2.unwrap_or(current.phone2),
            email: patch.email.unwrap_or(current.email),
            email2: patch.email2.unwrap_or(current.email2),
            note: patch.note.unwrap_or(current.note),
            ..current
        })
    }
}
