//! Update coordinator: the single mutation path for every lockable record.
//!
//! # Responsibility
//! - Run LockCheck -> Normalize -> Validate -> Audit -> Apply as one
//!   all-or-nothing store transaction.
//! - Release the caller's lock afterwards in a separate, best-effort step.
//!
//! # Invariants
//! - The primary transaction begins with `BEGIN IMMEDIATE`; concurrent
//!   writers serialize and temporal checks see a stable snapshot.
//! - Any failure before commit rolls back everything, the audit entry included.
//! - Apply must touch exactly one row, otherwise the mutation is `NotFound`.
//! - Join-table relations are rewritten in the same transaction as the row.
//! - Only transient store failures are retried, and each retry re-runs every
//!   step against fresh state.
//! - An unlock failure never reverts a committed mutation.

use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::model::audit::{AuditAction, Snapshot};
use crate::model::entity::{ActorId, EntityKind, RecordId};
use crate::model::lock::LockStatus;
use crate::model::record::Record;
use crate::repo::record_repo::{self, RecordStore};
use crate::service::audit_recorder::AuditRecorder;
use crate::service::lock_manager::LockManager;
use crate::service::temporal;
use log::{debug, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Default number of extra attempts after a transient store failure.
pub const DEFAULT_STORE_RETRY_ATTEMPTS: u32 = 3;

/// Orchestrates mutations over a borrowed clock.
pub struct UpdateCoordinator<'a> {
    clock: &'a dyn Clock,
    store_retry_attempts: u32,
}

impl<'a> UpdateCoordinator<'a> {
    pub fn new(clock: &'a dyn Clock) -> Self {
        Self {
            clock,
            store_retry_attempts: DEFAULT_STORE_RETRY_ATTEMPTS,
        }
    }

    pub fn with_store_retry_attempts(mut self, attempts: u32) -> Self {
        self.store_retry_attempts = attempts;
        self
    }

    pub fn lock_manager(&self) -> LockManager<'a> {
        LockManager::new(self.clock)
    }

    pub fn audit_recorder(&self) -> AuditRecorder<'a> {
        AuditRecorder::new(self.clock)
    }

    /// Creates a record. There is no prior row, hence no lock to check or
    /// release.
    ///
    /// The audit entry is written right after the insert, inside the same
    /// transaction, because its `record_id` is assigned by the store.
    pub fn create<R: RecordStore>(
        &self,
        conn: &mut Connection,
        actor: ActorId,
        input: R::Input,
    ) -> CoreResult<R> {
        let kind = R::KIND;
        let result = self
            .in_transaction(conn, |tx| {
                let proposed = R::from_input(input.clone(), self.clock.today())
                    .map_err(|err| CoreError::invalid_record(err, None))?;
                self.validate(tx, &proposed)?;

                let id = R::insert(tx, &proposed, self.clock.now_ms())?;
                let created = proposed.with_id(id);
                R::save_relations(tx, &created)?;
                self.audit_recorder().record(
                    tx,
                    kind,
                    id,
                    actor,
                    Snapshot::absent(),
                    Snapshot::of(&created)?,
                    AuditAction::Create,
                )?;
                Ok(id)
            })
            .map_err(|err| constraint_as_validation(err, None));
        log_mutation("create", kind, result.as_ref().ok().copied(), actor, &result);

        let id = result?;
        read_back::<R>(conn, id, false)
    }

    /// Applies `patch` to a live record.
    pub fn update<R: RecordStore>(
        &self,
        conn: &mut Connection,
        actor: ActorId,
        id: RecordId,
        patch: R::Patch,
        keep_lock: bool,
    ) -> CoreResult<R> {
        let kind = R::KIND;
        let result = self
            .in_transaction(conn, |tx| {
                self.check_lock(tx, kind, id, actor)?;
                let current = R::find(tx, id, false)?.ok_or(CoreError::NotFound { kind, id })?;
                let proposed = current
                    .apply_patch(patch.clone(), self.clock.today())
                    .map_err(|err| CoreError::invalid_record(err, Some(id)))?;
                self.validate(tx, &proposed)?;
                self.audit_recorder().record(
                    tx,
                    kind,
                    id,
                    actor,
                    Snapshot::of(&current)?,
                    Snapshot::of(&proposed)?,
                    AuditAction::Update,
                )?;
                let changed = R::update_row(tx, &proposed, self.clock.now_ms())?;
                expect_single_row(changed, kind, id)?;
                R::save_relations(tx, &proposed)?;
                Ok(())
            })
            .map_err(|err| constraint_as_validation(err, Some(id)));
        self.finish(conn, "update", kind, id, actor, keep_lock, result)?;
        read_back::<R>(conn, id, false)
    }

    /// Tombstones a live record.
    pub fn soft_delete<R: RecordStore>(
        &self,
        conn: &mut Connection,
        actor: ActorId,
        id: RecordId,
        keep_lock: bool,
    ) -> CoreResult<R> {
        let kind = R::KIND;
        let result = self
            .in_transaction(conn, |tx| {
                self.check_lock(tx, kind, id, actor)?;
                let current = R::find(tx, id, false)?.ok_or(CoreError::NotFound { kind, id })?;
                let proposed = current.clone().with_deleted(true);
                self.audit_recorder().record(
                    tx,
                    kind,
                    id,
                    actor,
                    Snapshot::of(&current)?,
                    Snapshot::of(&proposed)?,
                    AuditAction::SoftDelete,
                )?;
                let changed = record_repo::set_deleted(tx, kind, id, true, self.clock.now_ms())?;
                expect_single_row(changed, kind, id)
            })
            .map_err(|err| constraint_as_validation(err, Some(id)));
        self.finish(conn, "soft_delete", kind, id, actor, keep_lock, result)?;
        read_back::<R>(conn, id, true)
    }

    /// Brings a tombstoned record back, re-running every validation on it.
    pub fn restore<R: RecordStore>(
        &self,
        conn: &mut Connection,
        actor: ActorId,
        id: RecordId,
        keep_lock: bool,
    ) -> CoreResult<R> {
        let kind = R::KIND;
        let result = self
            .in_transaction(conn, |tx| {
                self.check_lock(tx, kind, id, actor)?;
                let current = R::find(tx, id, true)?
                    .filter(|record| record.is_deleted())
                    .ok_or(CoreError::NotFound { kind, id })?;
                let proposed = current.clone().with_deleted(false);
                self.validate(tx, &proposed)?;
                self.audit_recorder().record(
                    tx,
                    kind,
                    id,
                    actor,
                    Snapshot::of(&current)?,
                    Snapshot::of(&proposed)?,
                    AuditAction::Restore,
                )?;
                let changed = record_repo::set_deleted(tx, kind, id, false, self.clock.now_ms())?;
                expect_single_row(changed, kind, id)
            })
            .map_err(|err| constraint_as_validation(err, Some(id)));
        self.finish(conn, "restore", kind, id, actor, keep_lock, result)?;
        read_back::<R>(conn, id, false)
    }

    /// Removes a record permanently. Its lock disappears with the row.
    pub fn delete<R: RecordStore>(
        &self,
        conn: &mut Connection,
        actor: ActorId,
        id: RecordId,
    ) -> CoreResult<()> {
        let kind = R::KIND;
        let result = self
            .in_transaction(conn, |tx| {
                self.check_lock(tx, kind, id, actor)?;
                let current = R::find(tx, id, true)?.ok_or(CoreError::NotFound { kind, id })?;
                self.audit_recorder().record(
                    tx,
                    kind,
                    id,
                    actor,
                    Snapshot::of(&current)?,
                    Snapshot::absent(),
                    AuditAction::Delete,
                )?;
                let changed = record_repo::delete_row(tx, kind, id)?;
                expect_single_row(changed, kind, id)
            })
            .map_err(|err| constraint_as_validation(err, Some(id)));
        log_mutation("delete", kind, Some(id), actor, &result);
        result
    }

    fn check_lock(
        &self,
        tx: &Transaction<'_>,
        kind: EntityKind,
        id: RecordId,
        actor: ActorId,
    ) -> CoreResult<()> {
        match self.lock_manager().status(tx, kind, id, actor)? {
            LockStatus::LockedByOther => Err(CoreError::ResourceLocked { kind, id }),
            LockStatus::FreeOrMine => Ok(()),
        }
    }

    fn validate<R: Record>(&self, tx: &Transaction<'_>, record: &R) -> CoreResult<()> {
        let record_id = Some(record.id()).filter(|id| *id != 0);
        record
            .validate()
            .map_err(|err| CoreError::invalid_record(err, record_id))?;
        temporal::check(tx, record.temporal_subject())
    }

    /// Runs `step` inside an immediate transaction, retrying transient store
    /// failures with a fresh transaction each time.
    fn in_transaction<T>(
        &self,
        conn: &mut Connection,
        mut step: impl FnMut(&Transaction<'_>) -> CoreResult<T>,
    ) -> CoreResult<T> {
        let max_attempts = self.store_retry_attempts.saturating_add(1);
        let mut attempt = 1;
        loop {
            let result = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(CoreError::from)
                .and_then(|tx| {
                    let value = step(&tx)?;
                    tx.commit()?;
                    Ok(value)
                });
            match result {
                Err(err) if err.is_transient_store_failure() && attempt < max_attempts => {
                    warn!(
                        "event=mutation module=coordinator status=retry attempt={} max_attempts={} error={}",
                        attempt, max_attempts, err
                    );
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Logs the primary outcome and, on success, runs the unlock step.
    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        conn: &Connection,
        op: &str,
        kind: EntityKind,
        id: RecordId,
        actor: ActorId,
        keep_lock: bool,
        result: CoreResult<()>,
    ) -> CoreResult<()> {
        log_mutation(op, kind, Some(id), actor, &result);
        result?;
        if !keep_lock {
            self.release_after_commit(conn, kind, id, actor);
        }
        Ok(())
    }

    /// Unlock step. Runs in its own autocommit statement after the primary
    /// transaction; a failure leaves the lock to expire on its own.
    fn release_after_commit(
        &self,
        conn: &Connection,
        kind: EntityKind,
        id: RecordId,
        actor: ActorId,
    ) {
        match self.lock_manager().release(conn, kind, id, actor) {
            Ok(outcome) => debug!(
                "event=mutation module=coordinator status=unlocked entity={} record_id={} outcome={:?}",
                kind, id, outcome
            ),
            Err(err) => warn!(
                "event=unlock_deferred_failure module=coordinator status=error entity={} record_id={} actor_id={} error={}",
                kind, id, actor, err
            ),
        }
    }
}

fn expect_single_row(changed: usize, kind: EntityKind, id: RecordId) -> CoreResult<()> {
    if changed == 1 {
        Ok(())
    } else {
        Err(CoreError::NotFound { kind, id })
    }
}

/// Storage constraint rejections (foreign keys, checks) are caller errors.
fn constraint_as_validation(err: CoreError, id: Option<RecordId>) -> CoreError {
    match err {
        CoreError::StoreFailure(db_err) if db_err.is_constraint_violation() => {
            CoreError::validation(
                format!("storage constraint violated: {db_err}"),
                id.into_iter().collect(),
            )
        }
        other => other,
    }
}

fn read_back<R: RecordStore>(
    conn: &Connection,
    id: RecordId,
    include_deleted: bool,
) -> CoreResult<R> {
    R::find(conn, id, include_deleted)?.ok_or(CoreError::NotFound { kind: R::KIND, id })
}

fn log_mutation<T>(
    op: &str,
    kind: EntityKind,
    id: Option<RecordId>,
    actor: ActorId,
    result: &CoreResult<T>,
) {
    let record_id = id.map_or_else(|| "none".to_string(), |id| id.to_string());
    match result {
        Ok(_) => info!(
            "event=mutation module=coordinator status=ok op={} entity={} record_id={} actor_id={}",
            op, kind, record_id, actor
        ),
        Err(err @ CoreError::StoreFailure(_)) => warn!(
            "event=mutation module=coordinator status=error op={} entity={} record_id={} actor_id={} error={}",
            op, kind, record_id, actor, err
        ),
        Err(err) => info!(
            "event=mutation module=coordinator status=rejected op={} entity={} record_id={} actor_id={} error={}",
            op, kind, record_id, actor, err
        ),
    }
}
