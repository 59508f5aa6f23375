//! Error taxonomy surfaced by the consistency core.
//!
//! # Invariants
//! - `ValidationFailed` is never retried automatically.
//! - Only transient `StoreFailure`s trigger a coordinator retry.

use crate::db::DbError;
use crate::model::entity::{EntityKind, RecordId};
use crate::model::record::RecordValidationError;

pub type CoreResult<T> = Result<T, CoreError>;

/// Typed failure returned to mutation callers.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The record is actively locked by a different actor.
    #[error("{kind} {id} is locked by another actor")]
    ResourceLocked { kind: EntityKind, id: RecordId },

    /// A structural or scheduling invariant is violated.
    #[error("validation failed: {reason}")]
    ValidationFailed {
        reason: String,
        record_ids: Vec<RecordId>,
    },

    /// The target record does not exist or was removed concurrently.
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: RecordId },

    /// The backing transaction could not complete.
    #[error("store failure: {0}")]
    StoreFailure(#[source] DbError),

    /// The request token did not resolve to an actor.
    #[error("unauthenticated request")]
    Unauthenticated,
}

impl CoreError {
    pub fn validation(reason: impl Into<String>, record_ids: Vec<RecordId>) -> Self {
        Self::ValidationFailed {
            reason: reason.into(),
            record_ids,
        }
    }

    /// Maps a record-level validation failure, naming the record it concerns.
    pub fn invalid_record(err: RecordValidationError, record_id: Option<RecordId>) -> Self {
        Self::validation(err.to_string(), record_id.into_iter().collect())
    }

    /// True when the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ResourceLocked { .. } => true,
            Self::StoreFailure(err) => err.is_transient(),
            Self::ValidationFailed { .. } | Self::NotFound { .. } | Self::Unauthenticated => false,
        }
    }

    pub(crate) fn is_transient_store_failure(&self) -> bool {
        matches!(self, Self::StoreFailure(err) if err.is_transient())
    }
}

impl From<DbError> for CoreError {
    fn from(value: DbError) -> Self {
        Self::StoreFailure(value)
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::StoreFailure(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::StoreFailure(DbError::InvalidData(format!(
            "snapshot serialization failed: {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::CoreError;
    use crate::db::DbError;
    use crate::model::entity::EntityKind;

    fn sqlite_failure(code: rusqlite::ffi::ErrorCode) -> CoreError {
        CoreError::from(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code,
                extended_code: 0,
            },
            None,
        ))
    }

    #[test]
    fn busy_store_failure_is_retryable() {
        let err = sqlite_failure(rusqlite::ffi::ErrorCode::DatabaseBusy);
        assert!(err.is_retryable());
        assert!(err.is_transient_store_failure());
    }

    #[test]
    fn constraint_store_failure_is_not_retryable() {
        let err = sqlite_failure(rusqlite::ffi::ErrorCode::ConstraintViolation);
        assert!(!err.is_retryable());
    }

    #[test]
    fn locked_is_retryable_but_validation_is_not() {
        let locked = CoreError::ResourceLocked {
            kind: EntityKind::CargoBike,
            id: 7,
        };
        assert!(locked.is_retryable());
        assert!(!locked.is_transient_store_failure());
        assert!(!CoreError::validation("overlap", vec![1, 2]).is_retryable());
        assert!(!CoreError::from(DbError::InvalidData("bad".to_string())).is_retryable());
    }

    #[test]
    fn messages_name_the_record() {
        let err = CoreError::NotFound {
            kind: EntityKind::Engagement,
            id: 12,
        };
        assert_eq!(err.to_string(), "Engagement 12 not found");
    }
}
