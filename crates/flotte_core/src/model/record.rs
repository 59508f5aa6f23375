//! Shared contract for lockable fleet records.
//!
//! # Responsibility
//! - Describe how a create input or update patch becomes a normalized
//!   post-image of a record.
//! - Expose structural validation and the record's role in scheduling checks.
//!
//! # Invariants
//! - Every interval-bearing field passes through `Interval::normalize` inside
//!   `from_input`/`apply_patch`; no other path builds a record interval from
//!   caller data.
//! - Lock fields are not part of a record value.

use crate::model::entity::{EntityKind, RecordId};
use crate::model::fleet::{Engagement, Participant};
use crate::model::interval::IntervalError;
use chrono::NaiveDate;
use serde::Serialize;

/// Record structural validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordValidationError {
    #[error("field `{field}` must not be blank")]
    BlankField { field: &'static str },

    #[error("a cargo bike needs at least {minimum} wheels, got {found}")]
    TooFewWheels { minimum: u8, found: u8 },

    #[error(transparent)]
    Interval(#[from] IntervalError),
}

/// Role a record plays in cross-record scheduling checks.
#[derive(Debug, Clone, Copy)]
pub enum TemporalSubject<'a> {
    /// No scheduling invariant involves this record.
    Unscheduled,
    Engagement(&'a Engagement),
    Participant(&'a Participant),
}

/// Mutable, lockable, audited fleet record.
pub trait Record: Serialize + Clone + Sized {
    const KIND: EntityKind;

    /// Create payload; interval fields are raw.
    type Input: Clone;
    /// Update payload; every field optional.
    type Patch: Clone;

    fn id(&self) -> RecordId;

    fn with_id(self, id: RecordId) -> Self;

    fn is_deleted(&self) -> bool;

    fn with_deleted(self, deleted: bool) -> Self;

    /// Builds an unsaved record (id `0`) from a create payload.
    fn from_input(input: Self::Input, today: NaiveDate) -> Result<Self, RecordValidationError>;

    /// Builds the proposed post-image of `self` after applying `patch`.
    fn apply_patch(&self, patch: Self::Patch, today: NaiveDate)
        -> Result<Self, RecordValidationError>;

    /// Entity-specific structural checks without scheduling semantics.
    fn validate(&self) -> Result<(), RecordValidationError> {
        Ok(())
    }

    fn temporal_subject(&self) -> TemporalSubject<'_> {
        TemporalSubject::Unscheduled
    }
}

pub(crate) fn require_not_blank(
    field: &'static str,
    value: &str,
) -> Result<(), RecordValidationError> {
    if value.trim().is_empty() {
        return Err(RecordValidationError::BlankField { field });
    }
    Ok(())
}
