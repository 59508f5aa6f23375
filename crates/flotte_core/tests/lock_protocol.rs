mod common;

use common::{create_bike, ALICE, BOB};
use flotte_core::db::open_db_in_memory;
use flotte_core::{
    AcquireOutcome, Clock, CoreError, EntityKind, LockManager, LockState, LockStatus,
    ManualClock, ReleaseOutcome, LOCK_TTL_MS,
};
use rusqlite::Connection;

fn stored_lock(conn: &Connection, id: i64) -> (Option<i64>, Option<i64>) {
    conn.query_row(
        "SELECT locked_by, locked_until FROM cargo_bikes WHERE id = ?1;",
        [id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .unwrap()
}

#[test]
fn acquire_on_free_record_grants_lock_with_fixed_ttl() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = ManualClock::at_date(common::d(1, 1));
    let bike = create_bike(&mut conn, &clock, "Lastenlotte");
    let locks = LockManager::new(&clock);

    let outcome = locks
        .acquire(&conn, EntityKind::CargoBike, bike.id, ALICE)
        .unwrap();

    let expires_at = clock.now_ms() + LOCK_TTL_MS;
    assert_eq!(outcome, AcquireOutcome::Acquired { expires_at });
    assert_eq!(stored_lock(&conn, bike.id), (Some(ALICE), Some(expires_at)));
    assert_eq!(
        locks.inspect(&conn, EntityKind::CargoBike, bike.id).unwrap(),
        LockState::Held {
            owner: ALICE,
            expires_at
        }
    );
}

#[test]
fn second_actor_is_rejected_and_fields_stay_untouched() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = ManualClock::at_date(common::d(1, 1));
    let bike = create_bike(&mut conn, &clock, "Lastenlotte");
    let locks = LockManager::new(&clock);

    locks
        .acquire(&conn, EntityKind::CargoBike, bike.id, ALICE)
        .unwrap();
    let before = stored_lock(&conn, bike.id);

    clock.advance_ms(1_000);
    let outcome = locks
        .acquire(&conn, EntityKind::CargoBike, bike.id, BOB)
        .unwrap();

    assert_eq!(outcome, AcquireOutcome::AlreadyLocked);
    assert_eq!(stored_lock(&conn, bike.id), before);
}

#[test]
fn owner_reacquire_refreshes_expiry() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = ManualClock::at_date(common::d(1, 1));
    let bike = create_bike(&mut conn, &clock, "Lastenlotte");
    let locks = LockManager::new(&clock);

    locks
        .acquire(&conn, EntityKind::CargoBike, bike.id, ALICE)
        .unwrap();
    clock.advance_ms(5 * 60 * 1000);
    let outcome = locks
        .acquire(&conn, EntityKind::CargoBike, bike.id, ALICE)
        .unwrap();

    assert_eq!(
        outcome,
        AcquireOutcome::Acquired {
            expires_at: clock.now_ms() + LOCK_TTL_MS
        }
    );
}

#[test]
fn expired_lock_counts_as_free_for_everyone() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = ManualClock::at_date(common::d(1, 1));
    let bike = create_bike(&mut conn, &clock, "Lastenlotte");
    let locks = LockManager::new(&clock);

    locks
        .acquire(&conn, EntityKind::CargoBike, bike.id, ALICE)
        .unwrap();

    clock.advance_ms(LOCK_TTL_MS - 1);
    assert_eq!(
        locks
            .status(&conn, EntityKind::CargoBike, bike.id, BOB)
            .unwrap(),
        LockStatus::LockedByOther
    );

    // Expiry instant itself is no longer held.
    clock.advance_ms(1);
    assert_eq!(
        locks.inspect(&conn, EntityKind::CargoBike, bike.id).unwrap(),
        LockState::Free
    );
    assert_eq!(
        locks
            .status(&conn, EntityKind::CargoBike, bike.id, BOB)
            .unwrap(),
        LockStatus::FreeOrMine
    );

    let outcome = locks
        .acquire(&conn, EntityKind::CargoBike, bike.id, BOB)
        .unwrap();
    assert!(matches!(outcome, AcquireOutcome::Acquired { .. }));
    assert_eq!(stored_lock(&conn, bike.id).0, Some(BOB));
}

#[test]
fn status_is_free_or_mine_for_the_owner() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = ManualClock::at_date(common::d(1, 1));
    let bike = create_bike(&mut conn, &clock, "Lastenlotte");
    let locks = LockManager::new(&clock);

    assert_eq!(
        locks
            .status(&conn, EntityKind::CargoBike, bike.id, ALICE)
            .unwrap(),
        LockStatus::FreeOrMine
    );
    locks
        .acquire(&conn, EntityKind::CargoBike, bike.id, ALICE)
        .unwrap();
    assert_eq!(
        locks
            .status(&conn, EntityKind::CargoBike, bike.id, ALICE)
            .unwrap(),
        LockStatus::FreeOrMine
    );
    assert_eq!(
        locks
            .status(&conn, EntityKind::CargoBike, bike.id, BOB)
            .unwrap(),
        LockStatus::LockedByOther
    );
}

#[test]
fn release_is_idempotent() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = ManualClock::at_date(common::d(1, 1));
    let bike = create_bike(&mut conn, &clock, "Lastenlotte");
    let locks = LockManager::new(&clock);

    locks
        .acquire(&conn, EntityKind::CargoBike, bike.id, ALICE)
        .unwrap();

    assert_eq!(
        locks
            .release(&conn, EntityKind::CargoBike, bike.id, ALICE)
            .unwrap(),
        ReleaseOutcome::Released
    );
    assert_eq!(
        locks
            .release(&conn, EntityKind::CargoBike, bike.id, ALICE)
            .unwrap(),
        ReleaseOutcome::AlreadyFree
    );
    assert_eq!(stored_lock(&conn, bike.id), (None, None));
}

#[test]
fn release_by_non_owner_keeps_the_lock() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = ManualClock::at_date(common::d(1, 1));
    let bike = create_bike(&mut conn, &clock, "Lastenlotte");
    let locks = LockManager::new(&clock);

    locks
        .acquire(&conn, EntityKind::CargoBike, bike.id, ALICE)
        .unwrap();
    let before = stored_lock(&conn, bike.id);

    assert_eq!(
        locks
            .release(&conn, EntityKind::CargoBike, bike.id, BOB)
            .unwrap(),
        ReleaseOutcome::NotOwner
    );
    assert_eq!(stored_lock(&conn, bike.id), before);
}

#[test]
fn release_of_expired_lock_clears_stale_fields() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = ManualClock::at_date(common::d(1, 1));
    let bike = create_bike(&mut conn, &clock, "Lastenlotte");
    let locks = LockManager::new(&clock);

    locks
        .acquire(&conn, EntityKind::CargoBike, bike.id, ALICE)
        .unwrap();
    clock.advance_ms(LOCK_TTL_MS + 1);

    assert_eq!(
        locks
            .release(&conn, EntityKind::CargoBike, bike.id, BOB)
            .unwrap(),
        ReleaseOutcome::AlreadyFree
    );
    assert_eq!(stored_lock(&conn, bike.id), (None, None));
}

#[test]
fn half_populated_lock_fields_are_free_for_status_and_acquire() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = ManualClock::at_date(common::d(1, 1));
    let bike = create_bike(&mut conn, &clock, "Lastenlotte");
    let locks = LockManager::new(&clock);
    let future = clock.now_ms() + LOCK_TTL_MS;

    for (locked_by, locked_until) in [(None, Some(future)), (Some(ALICE), None)] {
        conn.execute(
            "UPDATE cargo_bikes SET locked_by = ?1, locked_until = ?2 WHERE id = ?3;",
            rusqlite::params![locked_by, locked_until, bike.id],
        )
        .unwrap();
        assert_eq!(
            locks
                .status(&conn, EntityKind::CargoBike, bike.id, BOB)
                .unwrap(),
            LockStatus::FreeOrMine
        );
        assert_eq!(
            locks
                .acquire(&conn, EntityKind::CargoBike, bike.id, BOB)
                .unwrap(),
            AcquireOutcome::Acquired {
                expires_at: clock.now_ms() + LOCK_TTL_MS
            }
        );
        assert_eq!(
            stored_lock(&conn, bike.id),
            (Some(BOB), Some(clock.now_ms() + LOCK_TTL_MS))
        );
    }

    conn.execute(
        "UPDATE cargo_bikes SET locked_by = NULL, locked_until = ?1 WHERE id = ?2;",
        rusqlite::params![future, bike.id],
    )
    .unwrap();
    assert_eq!(
        locks
            .release(&conn, EntityKind::CargoBike, bike.id, ALICE)
            .unwrap(),
        ReleaseOutcome::AlreadyFree
    );
    assert_eq!(stored_lock(&conn, bike.id), (None, None));
}

#[test]
fn missing_record_paths() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::at_date(common::d(1, 1));
    let locks = LockManager::new(&clock);

    let err = locks
        .acquire(&conn, EntityKind::Participant, 404, ALICE)
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::NotFound {
            kind: EntityKind::Participant,
            id: 404
        }
    ));

    let err = locks
        .status(&conn, EntityKind::Participant, 404, ALICE)
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));

    assert_eq!(
        locks
            .release(&conn, EntityKind::Participant, 404, ALICE)
            .unwrap(),
        ReleaseOutcome::AlreadyFree
    );
}

#[test]
fn locks_are_scoped_per_kind() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = ManualClock::at_date(common::d(1, 1));
    let bike = create_bike(&mut conn, &clock, "Lastenlotte");
    let engagement_type = common::create_engagement_type(&mut conn, &clock, "driver");
    assert_eq!(bike.id, engagement_type.id);
    let locks = LockManager::new(&clock);

    locks
        .acquire(&conn, EntityKind::CargoBike, bike.id, ALICE)
        .unwrap();
    let outcome = locks
        .acquire(&conn, EntityKind::EngagementType, engagement_type.id, BOB)
        .unwrap();
    assert!(matches!(outcome, AcquireOutcome::Acquired { .. }));
}
