//! Per-request facade consumed by mutation handlers.
//!
//! # Responsibility
//! - Resolve the request token to an actor exactly once per call.
//! - Expose the lock operations and the single `mutate` entry point.
//! - Dispatch kind-erased payloads to the typed coordinator operations.
//!
//! # Invariants
//! - Every write goes through `UpdateCoordinator`; this facade never touches
//!   record tables directly.

use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::db::open_db_with_options;
use crate::error::CoreResult;
use crate::model::audit::AuditLogEntry;
use crate::model::contact::{
    ContactInformation, ContactInformationInput, ContactInformationPatch, Person, PersonInput,
    PersonPatch,
};
use crate::model::entity::{ActorId, EntityKind, RecordId};
use crate::model::fleet::{
    CargoBike, CargoBikeInput, CargoBikePatch, Engagement, EngagementInput, EngagementPatch,
    EngagementType, EngagementTypeInput, EngagementTypePatch, Participant, ParticipantInput,
    ParticipantPatch, Workshop, WorkshopInput, WorkshopPatch, WorkshopType, WorkshopTypeInput,
    WorkshopTypePatch,
};
use crate::model::lock::{AcquireOutcome, LockState, LockStatus, ReleaseOutcome};
use crate::model::record::Record;
use crate::repo::audit_repo::AuditQuery;
use crate::repo::{contact_repo, fleet_repo};
use crate::repo::record_repo::{Page, RecordStore};
use crate::service::audit_recorder::AuditRecorder;
use crate::service::coordinator::{UpdateCoordinator, DEFAULT_STORE_RETRY_ATTEMPTS};
use crate::service::identity::ActorResolver;
use crate::service::lock_manager::LockManager;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;

/// Create payload of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordInput {
    CargoBike(CargoBikeInput),
    Participant(ParticipantInput),
    EngagementType(EngagementTypeInput),
    Engagement(EngagementInput),
    WorkshopType(WorkshopTypeInput),
    Workshop(WorkshopInput),
    Person(PersonInput),
    ContactInformation(ContactInformationInput),
}

/// Update payload of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPatch {
    CargoBike(CargoBikePatch),
    Participant(ParticipantPatch),
    EngagementType(EngagementTypePatch),
    Engagement(EngagementPatch),
    WorkshopType(WorkshopTypePatch),
    Workshop(WorkshopPatch),
    Person(PersonPatch),
    ContactInformation(ContactInformationPatch),
}

/// Record returned to callers, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "record")]
pub enum RecordSnapshot {
    CargoBike(CargoBike),
    Participant(Participant),
    EngagementType(EngagementType),
    Engagement(Engagement),
    WorkshopType(WorkshopType),
    Workshop(Workshop),
    Person(Person),
    ContactInformation(ContactInformation),
}

impl RecordSnapshot {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::CargoBike(_) => EntityKind::CargoBike,
            Self::Participant(_) => EntityKind::Participant,
            Self::EngagementType(_) => EntityKind::EngagementType,
            Self::Engagement(_) => EntityKind::Engagement,
            Self::WorkshopType(_) => EntityKind::WorkshopType,
            Self::Workshop(_) => EntityKind::Workshop,
            Self::Person(_) => EntityKind::Person,
            Self::ContactInformation(_) => EntityKind::ContactInformation,
        }
    }

    pub fn id(&self) -> RecordId {
        match self {
            Self::CargoBike(record) => record.id(),
            Self::Participant(record) => record.id(),
            Self::EngagementType(record) => record.id(),
            Self::Engagement(record) => record.id(),
            Self::WorkshopType(record) => record.id(),
            Self::Workshop(record) => record.id(),
            Self::Person(record) => record.id(),
            Self::ContactInformation(record) => record.id(),
        }
    }
}

impl From<CargoBike> for RecordSnapshot {
    fn from(value: CargoBike) -> Self {
        Self::CargoBike(value)
    }
}

impl From<Participant> for RecordSnapshot {
    fn from(value: Participant) -> Self {
        Self::Participant(value)
    }
}

impl From<EngagementType> for RecordSnapshot {
    fn from(value: EngagementType) -> Self {
        Self::EngagementType(value)
    }
}

impl From<Engagement> for RecordSnapshot {
    fn from(value: Engagement) -> Self {
        Self::Engagement(value)
    }
}

impl From<WorkshopType> for RecordSnapshot {
    fn from(value: WorkshopType) -> Self {
        Self::WorkshopType(value)
    }
}

impl From<Workshop> for RecordSnapshot {
    fn from(value: Workshop) -> Self {
        Self::Workshop(value)
    }
}

impl From<Person> for RecordSnapshot {
    fn from(value: Person) -> Self {
        Self::Person(value)
    }
}

impl From<ContactInformation> for RecordSnapshot {
    fn from(value: ContactInformation) -> Self {
        Self::ContactInformation(value)
    }
}

/// Requested state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Create(RecordInput),
    Update { id: RecordId, patch: RecordPatch },
    SoftDelete { kind: EntityKind, id: RecordId },
    Restore { kind: EntityKind, id: RecordId },
    /// Permanent removal; answered with `None`.
    Delete { kind: EntityKind, id: RecordId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRequest {
    pub mutation: Mutation,
    /// Keep the caller's lock after a successful mutation.
    pub keep_lock: bool,
}

impl MutationRequest {
    pub fn new(mutation: Mutation) -> Self {
        Self {
            mutation,
            keep_lock: false,
        }
    }

    pub fn create(input: RecordInput) -> Self {
        Self::new(Mutation::Create(input))
    }

    pub fn update(id: RecordId, patch: RecordPatch) -> Self {
        Self::new(Mutation::Update { id, patch })
    }

    pub fn keeping_lock(mut self) -> Self {
        self.keep_lock = true;
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum Lifecycle {
    SoftDelete,
    Restore,
    Delete,
}

/// Fleet record store bound to one connection.
pub struct FleetApi {
    conn: Connection,
    clock: Arc<dyn Clock>,
    resolver: Arc<dyn ActorResolver>,
    store_retry_attempts: u32,
}

impl FleetApi {
    /// Wraps a migrated connection.
    pub fn new(conn: Connection, clock: Arc<dyn Clock>, resolver: Arc<dyn ActorResolver>) -> Self {
        Self {
            conn,
            clock,
            resolver,
            store_retry_attempts: DEFAULT_STORE_RETRY_ATTEMPTS,
        }
    }

    /// Opens `config.db_path` with the configured busy timeout and retry budget.
    pub fn open(
        config: &CoreConfig,
        clock: Arc<dyn Clock>,
        resolver: Arc<dyn ActorResolver>,
    ) -> CoreResult<Self> {
        let conn = open_db_with_options(&config.db_path, config.open_options())?;
        Ok(Self::new(conn, clock, resolver).with_store_retry_attempts(config.store_retry_attempts))
    }

    pub fn with_store_retry_attempts(mut self, attempts: u32) -> Self {
        self.store_retry_attempts = attempts;
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn acquire_lock(
        &self,
        token: &str,
        kind: EntityKind,
        id: RecordId,
    ) -> CoreResult<AcquireOutcome> {
        let actor = self.resolver.resolve_actor(token)?;
        self.locks().acquire(&self.conn, kind, id, actor)
    }

    pub fn release_lock(
        &self,
        token: &str,
        kind: EntityKind,
        id: RecordId,
    ) -> CoreResult<ReleaseOutcome> {
        let actor = self.resolver.resolve_actor(token)?;
        self.locks().release(&self.conn, kind, id, actor)
    }

    /// True iff another actor holds an active lock on the record.
    pub fn is_locked(&self, token: &str, kind: EntityKind, id: RecordId) -> CoreResult<bool> {
        let actor = self.resolver.resolve_actor(token)?;
        let status = self.locks().status(&self.conn, kind, id, actor)?;
        Ok(status == LockStatus::LockedByOther)
    }

    pub fn lock_state(&self, kind: EntityKind, id: RecordId) -> CoreResult<LockState> {
        self.locks().inspect(&self.conn, kind, id)
    }

    /// Applies one mutation for the token's actor.
    ///
    /// Returns the resulting record, or `None` after a hard delete.
    pub fn mutate(
        &mut self,
        token: &str,
        request: MutationRequest,
    ) -> CoreResult<Option<RecordSnapshot>> {
        let actor = self.resolver.resolve_actor(token)?;
        let coordinator = UpdateCoordinator::new(self.clock.as_ref())
            .with_store_retry_attempts(self.store_retry_attempts);
        let conn = &mut self.conn;
        let keep_lock = request.keep_lock;

        match request.mutation {
            Mutation::Create(input) => create(&coordinator, conn, actor, input).map(Some),
            Mutation::Update { id, patch } => {
                update(&coordinator, conn, actor, id, patch, keep_lock).map(Some)
            }
            Mutation::SoftDelete { kind, id } => {
                lifecycle(&coordinator, conn, actor, kind, id, Lifecycle::SoftDelete, keep_lock)
            }
            Mutation::Restore { kind, id } => {
                lifecycle(&coordinator, conn, actor, kind, id, Lifecycle::Restore, keep_lock)
            }
            Mutation::Delete { kind, id } => {
                lifecycle(&coordinator, conn, actor, kind, id, Lifecycle::Delete, keep_lock)
            }
        }
    }

    /// Reads one record; tombstoned rows only when `include_deleted`.
    pub fn find(
        &self,
        kind: EntityKind,
        id: RecordId,
        include_deleted: bool,
    ) -> CoreResult<Option<RecordSnapshot>> {
        let conn = &self.conn;
        let found = match kind {
            EntityKind::CargoBike => find_as::<CargoBike>(conn, id, include_deleted)?,
            EntityKind::Participant => find_as::<Participant>(conn, id, include_deleted)?,
            EntityKind::EngagementType => find_as::<EngagementType>(conn, id, include_deleted)?,
            EntityKind::Engagement => find_as::<Engagement>(conn, id, include_deleted)?,
            EntityKind::WorkshopType => find_as::<WorkshopType>(conn, id, include_deleted)?,
            EntityKind::Workshop => find_as::<Workshop>(conn, id, include_deleted)?,
            EntityKind::Person => find_as::<Person>(conn, id, include_deleted)?,
            EntityKind::ContactInformation => {
                find_as::<ContactInformation>(conn, id, include_deleted)?
            }
        };
        Ok(found)
    }

    /// Live records of one kind ordered by id.
    pub fn list(&self, kind: EntityKind, page: &Page) -> CoreResult<Vec<RecordSnapshot>> {
        let conn = &self.conn;
        match kind {
            EntityKind::CargoBike => list_as::<CargoBike>(conn, page),
            EntityKind::Participant => list_as::<Participant>(conn, page),
            EntityKind::EngagementType => list_as::<EngagementType>(conn, page),
            EntityKind::Engagement => list_as::<Engagement>(conn, page),
            EntityKind::WorkshopType => list_as::<WorkshopType>(conn, page),
            EntityKind::Workshop => list_as::<Workshop>(conn, page),
            EntityKind::Person => list_as::<Person>(conn, page),
            EntityKind::ContactInformation => list_as::<ContactInformation>(conn, page),
        }
    }

    pub fn engagements_of_participant(
        &self,
        participant_id: RecordId,
    ) -> CoreResult<Vec<Engagement>> {
        Ok(fleet_repo::engagements_by_participant(
            &self.conn,
            participant_id,
        )?)
    }

    /// Engagements of a cargo bike, newest interval first.
    pub fn engagements_of_cargo_bike(
        &self,
        cargo_bike_id: RecordId,
        page: &Page,
    ) -> CoreResult<Vec<Engagement>> {
        Ok(fleet_repo::engagements_by_cargo_bike(
            &self.conn,
            cargo_bike_id,
            page,
        )?)
    }

    /// Engagements of a cargo bike whose interval covers `date`.
    pub fn engagements_active_on(
        &self,
        cargo_bike_id: RecordId,
        date: NaiveDate,
    ) -> CoreResult<Vec<Engagement>> {
        Ok(fleet_repo::engagements_active_on(
            &self.conn,
            cargo_bike_id,
            date,
        )?)
    }

    /// Live workshops the participant attends, ordered by date.
    pub fn workshops_of_participant(&self, participant_id: RecordId) -> CoreResult<Vec<Workshop>> {
        Ok(fleet_repo::workshops_by_participant(
            &self.conn,
            participant_id,
        )?)
    }

    pub fn contact_information_of_person(
        &self,
        person_id: RecordId,
    ) -> CoreResult<Vec<ContactInformation>> {
        Ok(contact_repo::contact_information_by_person(
            &self.conn, person_id,
        )?)
    }

    pub fn audit_entries(&self, query: &AuditQuery) -> CoreResult<Vec<AuditLogEntry>> {
        AuditRecorder::new(self.clock.as_ref()).list_entries(&self.conn, query)
    }

    fn locks(&self) -> LockManager<'_> {
        LockManager::new(self.clock.as_ref())
    }
}

fn find_as<R>(
    conn: &Connection,
    id: RecordId,
    include_deleted: bool,
) -> CoreResult<Option<RecordSnapshot>>
where
    R: RecordStore + Into<RecordSnapshot>,
{
    Ok(R::find(conn, id, include_deleted)?.map(Into::into))
}

fn list_as<R>(conn: &Connection, page: &Page) -> CoreResult<Vec<RecordSnapshot>>
where
    R: RecordStore + Into<RecordSnapshot>,
{
    Ok(R::list(conn, page)?.into_iter().map(Into::into).collect())
}

fn create(
    coordinator: &UpdateCoordinator<'_>,
    conn: &mut Connection,
    actor: ActorId,
    input: RecordInput,
) -> CoreResult<RecordSnapshot> {
    match input {
        RecordInput::CargoBike(input) => coordinator
            .create::<CargoBike>(conn, actor, input)
            .map(RecordSnapshot::from),
        RecordInput::Participant(input) => coordinator
            .create::<Participant>(conn, actor, input)
            .map(RecordSnapshot::from),
        RecordInput::EngagementType(input) => coordinator
            .create::<EngagementType>(conn, actor, input)
            .map(RecordSnapshot::from),
        RecordInput::Engagement(input) => coordinator
            .create::<Engagement>(conn, actor, input)
            .map(RecordSnapshot::from),
        RecordInput::WorkshopType(input) => coordinator
            .create::<WorkshopType>(conn, actor, input)
            .map(RecordSnapshot::from),
        RecordInput::Workshop(input) => coordinator
            .create::<Workshop>(conn, actor, input)
            .map(RecordSnapshot::from),
        RecordInput::Person(input) => coordinator
            .create::<Person>(conn, actor, input)
            .map(RecordSnapshot::from),
        RecordInput::ContactInformation(input) => coordinator
            .create::<ContactInformation>(conn, actor, input)
            .map(RecordSnapshot::from),
    }
}

fn update(
    coordinator: &UpdateCoordinator<'_>,
    conn: &mut Connection,
    actor: ActorId,
    id: RecordId,
    patch: RecordPatch,
    keep_lock: bool,
) -> CoreResult<RecordSnapshot> {
    match patch {
        RecordPatch::CargoBike(patch) => coordinator
            .update::<CargoBike>(conn, actor, id, patch, keep_lock)
            .map(RecordSnapshot::from),
        RecordPatch::Participant(patch) => coordinator
            .update::<Participant>(conn, actor, id, patch, keep_lock)
            .map(RecordSnapshot::from),
        RecordPatch::EngagementType(patch) => coordinator
            .update::<EngagementType>(conn, actor, id, patch, keep_lock)
            .map(RecordSnapshot::from),
        RecordPatch::Engagement(patch) => coordinator
            .update::<Engagement>(conn, actor, id, patch, keep_lock)
            .map(RecordSnapshot::from),
        RecordPatch::WorkshopType(patch) => coordinator
            .update::<WorkshopType>(conn, actor, id, patch, keep_lock)
            .map(RecordSnapshot::from),
        RecordPatch::Workshop(patch) => coordinator
            .update::<Workshop>(conn, actor, id, patch, keep_lock)
            .map(RecordSnapshot::from),
        RecordPatch::Person(patch) => coordinator
            .update::<Person>(conn, actor, id, patch, keep_lock)
            .map(RecordSnapshot::from),
        RecordPatch::ContactInformation(patch) => coordinator
            .update::<ContactInformation>(conn, actor, id, patch, keep_lock)
            .map(RecordSnapshot::from),
    }
}

fn lifecycle(
    coordinator: &UpdateCoordinator<'_>,
    conn: &mut Connection,
    actor: ActorId,
    kind: EntityKind,
    id: RecordId,
    op: Lifecycle,
    keep_lock: bool,
) -> CoreResult<Option<RecordSnapshot>> {
    match kind {
        EntityKind::CargoBike => {
            lifecycle_of::<CargoBike>(coordinator, conn, actor, id, op, keep_lock)
        }
        EntityKind::Participant => {
            lifecycle_of::<Participant>(coordinator, conn, actor, id, op, keep_lock)
        }
        EntityKind::EngagementType => {
            lifecycle_of::<EngagementType>(coordinator, conn, actor, id, op, keep_lock)
        }
        EntityKind::Engagement => {
            lifecycle_of::<Engagement>(coordinator, conn, actor, id, op, keep_lock)
        }
        EntityKind::WorkshopType => {
            lifecycle_of::<WorkshopType>(coordinator, conn, actor, id, op, keep_lock)
        }
        EntityKind::Workshop => {
            lifecycle_of::<Workshop>(coordinator, conn, actor, id, op, keep_lock)
        }
        EntityKind::Person => lifecycle_of::<Person>(coordinator, conn, actor, id, op, keep_lock),
        EntityKind::ContactInformation => {
            lifecycle_of::<ContactInformation>(coordinator, conn, actor, id, op, keep_lock)
        }
    }
}

fn lifecycle_of<R>(
    coordinator: &UpdateCoordinator<'_>,
    conn: &mut Connection,
    actor: ActorId,
    id: RecordId,
    op: Lifecycle,
    keep_lock: bool,
) -> CoreResult<Option<RecordSnapshot>>
where
    R: RecordStore + Into<RecordSnapshot>,
{
    match op {
        Lifecycle::SoftDelete => coordinator
            .soft_delete::<R>(conn, actor, id, keep_lock)
            .map(|record| Some(record.into())),
        Lifecycle::Restore => coordinator
            .restore::<R>(conn, actor, id, keep_lock)
            .map(|record| Some(record.into())),
        Lifecycle::Delete => coordinator.delete::<R>(conn, actor, id).map(|()| None),
    }
}
