//! Record lock model.
//!
//! # Responsibility
//! - Derive the effective lock state from the stored `(locked_by,
//!   locked_until)` pair.
//! - Define the outcome types of the lock protocol.
//!
//! # Invariants
//! - A stored lock whose `locked_until` is not in the future is `Free`,
//!   regardless of `locked_by` (lazy expiry).
//! - A half-populated pair (one field null) is `Free`.

use crate::model::entity::{ActorId, EpochMs};
use std::time::Duration;

/// Fixed lifetime of an acquired lock.
pub const LOCK_TTL: Duration = Duration::from_secs(10 * 60);

/// `LOCK_TTL` in epoch milliseconds.
pub const LOCK_TTL_MS: EpochMs = 10 * 60 * 1000;

/// Effective lock state at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Free,
    Held { owner: ActorId, expires_at: EpochMs },
}

impl LockState {
    /// Derives the state from stored fields, comparing expiry against `now`.
    pub fn from_fields(
        locked_by: Option<ActorId>,
        locked_until: Option<EpochMs>,
        now: EpochMs,
    ) -> Self {
        match (locked_by, locked_until) {
            (Some(owner), Some(expires_at)) if expires_at > now => Self::Held { owner, expires_at },
            _ => Self::Free,
        }
    }

    pub fn is_held_by_other(&self, actor: ActorId) -> bool {
        matches!(self, Self::Held { owner, .. } if *owner != actor)
    }
}

/// Result of a lock acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The caller now holds the lock until `expires_at`.
    Acquired { expires_at: EpochMs },
    /// Another actor holds an active lock; nothing changed.
    AlreadyLocked,
}

/// Result of a lock release attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    /// Another actor holds an active lock; nothing changed.
    NotOwner,
    /// No active lock existed.
    AlreadyFree,
}

/// Guard answer used before every update/delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    LockedByOther,
    FreeOrMine,
}

impl LockStatus {
    pub fn for_actor(state: LockState, actor: ActorId) -> Self {
        if state.is_held_by_other(actor) {
            Self::LockedByOther
        } else {
            Self::FreeOrMine
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LockState, LockStatus, LOCK_TTL, LOCK_TTL_MS};

    #[test]
    fn ttl_constants_agree() {
        assert_eq!(LOCK_TTL.as_millis() as i64, LOCK_TTL_MS);
    }

    #[test]
    fn future_expiry_is_held() {
        let state = LockState::from_fields(Some(7), Some(2_000), 1_000);
        assert_eq!(
            state,
            LockState::Held {
                owner: 7,
                expires_at: 2_000
            }
        );
        assert!(state.is_held_by_other(8));
        assert!(!state.is_held_by_other(7));
    }

    #[test]
    fn expiry_at_or_before_now_is_free() {
        assert_eq!(LockState::from_fields(Some(7), Some(1_000), 1_000), LockState::Free);
        assert_eq!(LockState::from_fields(Some(7), Some(999), 1_000), LockState::Free);
    }

    #[test]
    fn half_populated_fields_are_free() {
        assert_eq!(LockState::from_fields(None, Some(5_000), 1_000), LockState::Free);
        assert_eq!(LockState::from_fields(Some(3), None, 1_000), LockState::Free);
    }

    #[test]
    fn status_for_owner_and_stranger() {
        let held = LockState::Held {
            owner: 1,
            expires_at: 10,
        };
        assert_eq!(LockStatus::for_actor(held, 1), LockStatus::FreeOrMine);
        assert_eq!(LockStatus::for_actor(held, 2), LockStatus::LockedByOther);
        assert_eq!(LockStatus::for_actor(LockState::Free, 2), LockStatus::FreeOrMine);
    }
}
