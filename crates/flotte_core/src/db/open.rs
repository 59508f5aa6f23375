//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by the lock and audit protocol.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections wait up to `busy_timeout` for competing writers
//!   instead of failing immediately.
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info, warn};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection tuning applied during bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    /// How long a connection waits on a competing write transaction.
    pub busy_timeout: Duration,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

/// Opens a SQLite database file with default options and applies all pending
/// migrations.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with_options(path, OpenOptions::default())
}

/// Opens a SQLite database file and applies all pending migrations.
///
/// File databases run in WAL journal mode so readers on other connections are
/// not blocked by the single active writer. When SQLite refuses WAL the open
/// still succeeds and a `status=degraded` event is logged.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db_with_options(path: impl AsRef<Path>, options: OpenOptions) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=file");

    let result = Connection::open(path)
        .map_err(DbError::from)
        .and_then(|mut conn| -> DbResult<Connection> {
            configure_connection(&conn, options)?;
            enable_wal(&conn)?;
            apply_migrations(&mut conn)?;
            Ok(conn)
        });
    log_open_result("file", started_at, result)
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=memory");

    let result = Connection::open_in_memory()
        .map_err(DbError::from)
        .and_then(|mut conn| -> DbResult<Connection> {
            configure_connection(&conn, OpenOptions::default())?;
            apply_migrations(&mut conn)?;
            Ok(conn)
        });
    log_open_result("memory", started_at, result)
}

fn log_open_result(
    mode: &str,
    started_at: Instant,
    result: DbResult<Connection>,
) -> DbResult<Connection> {
    match &result {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode={} duration_ms={}",
            mode,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={} duration_ms={} error={}",
            mode,
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

fn configure_connection(conn: &Connection, options: OpenOptions) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(options.busy_timeout)?;
    Ok(())
}

/// Switches to WAL and reports whether SQLite accepted it. A refusal keeps the
/// connection usable in its previous journal mode.
fn enable_wal(conn: &Connection) -> DbResult<bool> {
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    let enabled = mode.eq_ignore_ascii_case("wal");
    if !enabled {
        warn!(
            "event=db_open module=db status=degraded journal_mode={} expected=wal",
            mode
        );
    }
    Ok(enabled)
}

#[cfg(test)]
mod tests {
    use super::{configure_connection, enable_wal, OpenOptions};
    use rusqlite::Connection;
    use std::time::Duration;

    #[test]
    fn file_connection_switches_to_wal() {
        let dir = tempfile::tempdir().expect("temp dir");
        let conn = Connection::open(dir.path().join("wal.db")).expect("open file db");
        assert!(enable_wal(&conn).expect("journal mode pragma"));
    }

    #[test]
    fn memory_connection_reports_degraded_journal_mode() {
        let conn = Connection::open_in_memory().expect("open memory db");
        assert!(!enable_wal(&conn).expect("journal mode pragma"));
    }

    #[test]
    fn configured_connection_enforces_foreign_keys_and_busy_timeout() {
        let conn = Connection::open_in_memory().expect("open memory db");
        configure_connection(
            &conn,
            OpenOptions {
                busy_timeout: Duration::from_millis(1_250),
            },
        )
        .expect("configure connection");

        let foreign_keys: i64 = conn
            .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
            .expect("foreign_keys pragma");
        let busy_timeout: i64 = conn
            .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))
            .expect("busy_timeout pragma");
        assert_eq!(foreign_keys, 1);
        assert_eq!(busy_timeout, 1_250);
    }
}
