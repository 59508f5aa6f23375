//! Time-boxed exclusive record locks.
//!
//! # Responsibility
//! - Grant, release and inspect per-record locks for any `EntityKind`.
//!
//! # Invariants
//! - `acquire` is one conditional `UPDATE`; there is no read-then-write window
//!   between two concurrent acquirers.
//! - Lock state is always derived with an expiry comparison against the clock;
//!   a stale non-null `locked_by` never counts as held.
//! - Lock TTL is fixed (`LOCK_TTL_MS`); re-acquiring by the owner refreshes it.

use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::model::entity::{ActorId, EntityKind, RecordId};
use crate::model::lock::{AcquireOutcome, LockState, LockStatus, ReleaseOutcome, LOCK_TTL_MS};
use crate::repo::lock_repo;
use crate::repo::record_repo::record_exists;
use log::{debug, info};
use rusqlite::Connection;

/// Lock protocol over a borrowed clock.
///
/// Every method accepts any connection, including an open transaction, so the
/// coordinator can run the lock guard inside its mutation unit.
#[derive(Clone, Copy)]
pub struct LockManager<'a> {
    clock: &'a dyn Clock,
}

impl<'a> LockManager<'a> {
    pub fn new(clock: &'a dyn Clock) -> Self {
        Self { clock }
    }

    /// Attempts to take the lock for `actor`.
    ///
    /// # Errors
    /// - `NotFound` when the record does not exist.
    pub fn acquire(
        &self,
        conn: &Connection,
        kind: EntityKind,
        id: RecordId,
        actor: ActorId,
    ) -> CoreResult<AcquireOutcome> {
        let now = self.clock.now_ms();
        let expires_at = now + LOCK_TTL_MS;
        if lock_repo::try_acquire(conn, kind, id, actor, now, expires_at)? == 1 {
            info!(
                "event=lock_acquire module=lock status=ok entity={} record_id={} actor_id={} expires_at={}",
                kind, id, actor, expires_at
            );
            return Ok(AcquireOutcome::Acquired { expires_at });
        }

        if !record_exists(conn, kind, id)? {
            return Err(CoreError::NotFound { kind, id });
        }
        info!(
            "event=lock_acquire module=lock status=rejected entity={} record_id={} actor_id={}",
            kind, id, actor
        );
        Ok(AcquireOutcome::AlreadyLocked)
    }

    /// Releases the lock if `actor` holds it. Releasing a free lock, or a
    /// lock on a record that no longer exists, is `AlreadyFree`.
    pub fn release(
        &self,
        conn: &Connection,
        kind: EntityKind,
        id: RecordId,
        actor: ActorId,
    ) -> CoreResult<ReleaseOutcome> {
        let now = self.clock.now_ms();
        if lock_repo::try_release(conn, kind, id, actor, now)? == 1 {
            info!(
                "event=lock_release module=lock status=ok entity={} record_id={} actor_id={}",
                kind, id, actor
            );
            return Ok(ReleaseOutcome::Released);
        }

        let Some((locked_by, locked_until)) = lock_repo::load_lock_fields(conn, kind, id)? else {
            return Ok(ReleaseOutcome::AlreadyFree);
        };
        let state = LockState::from_fields(locked_by, locked_until, now);
        if state.is_held_by_other(actor) {
            info!(
                "event=lock_release module=lock status=rejected entity={} record_id={} actor_id={}",
                kind, id, actor
            );
            return Ok(ReleaseOutcome::NotOwner);
        }

        if lock_repo::clear_expired(conn, kind, id, now)? > 0 {
            debug!(
                "event=lock_release module=lock status=expired_cleared entity={} record_id={}",
                kind, id
            );
        }
        Ok(ReleaseOutcome::AlreadyFree)
    }

    /// Current effective lock state.
    ///
    /// # Errors
    /// - `NotFound` when the record does not exist.
    pub fn inspect(
        &self,
        conn: &Connection,
        kind: EntityKind,
        id: RecordId,
    ) -> CoreResult<LockState> {
        let (locked_by, locked_until) = lock_repo::load_lock_fields(conn, kind, id)?
            .ok_or(CoreError::NotFound { kind, id })?;
        Ok(LockState::from_fields(
            locked_by,
            locked_until,
            self.clock.now_ms(),
        ))
    }

    /// Guard predicate run before every update/delete.
    pub fn status(
        &self,
        conn: &Connection,
        kind: EntityKind,
        id: RecordId,
        actor: ActorId,
    ) -> CoreResult<LockStatus> {
        let state = self.inspect(conn, kind, id)?;
        Ok(LockStatus::for_actor(state, actor))
    }
}
