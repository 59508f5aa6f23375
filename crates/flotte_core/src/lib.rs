//! Concurrency and consistency core of the fleet record store.
//! Every mutation of a fleet record goes through this crate: lock check,
//! scheduling validation, audit entry and write commit as one unit.

pub mod api;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use api::{FleetApi, Mutation, MutationRequest, RecordInput, RecordPatch, RecordSnapshot};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CoreConfig;
pub use db::{open_db, open_db_in_memory, open_db_with_options, DbError, DbResult, OpenOptions};
pub use error::{CoreError, CoreResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::audit::{AuditAction, AuditLogEntry, Snapshot};
pub use model::contact::{
    ContactInformation, ContactInformationInput, ContactInformationPatch, Person, PersonInput,
    PersonPatch,
};
pub use model::entity::{ActorId, EntityKind, EpochMs, RecordId};
pub use model::fleet::{
    CargoBike, CargoBikeInput, CargoBikePatch, Engagement, EngagementInput, EngagementPatch,
    EngagementType, EngagementTypeInput, EngagementTypePatch, Group, Participant,
    ParticipantInput, ParticipantPatch, Workshop, WorkshopInput, WorkshopPatch, WorkshopType,
    WorkshopTypeInput, WorkshopTypePatch,
};
pub use model::interval::{Interval, IntervalError, RawInterval};
pub use model::lock::{AcquireOutcome, LockState, LockStatus, ReleaseOutcome, LOCK_TTL, LOCK_TTL_MS};
pub use model::record::{Record, RecordValidationError};
pub use repo::audit_repo::AuditQuery;
pub use repo::record_repo::{Page, RecordStore};
pub use service::coordinator::UpdateCoordinator;
pub use service::identity::{ActorResolver, DevelopResolver, TokenTable};
pub use service::lock_manager::LockManager;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
