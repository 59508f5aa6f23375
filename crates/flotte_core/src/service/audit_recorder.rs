//! Audit log writer.
//!
//! # Invariants
//! - `record` only writes through the caller's connection; when that is an
//!   open transaction the entry commits or rolls back with the mutation.
//! - Snapshots are stored as given and never interpreted.

use crate::clock::Clock;
use crate::error::CoreResult;
use crate::model::audit::{AuditAction, AuditLogEntry, Snapshot};
use crate::model::entity::{ActorId, EntityKind, RecordId};
use crate::repo::audit_repo::{self, AuditQuery, NewAuditEntry};
use log::{error, info};
use rusqlite::Connection;

#[derive(Clone, Copy)]
pub struct AuditRecorder<'a> {
    clock: &'a dyn Clock,
}

impl<'a> AuditRecorder<'a> {
    pub fn new(clock: &'a dyn Clock) -> Self {
        Self { clock }
    }

    /// Appends one entry describing a state change of `kind`/`record_id`.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &self,
        conn: &Connection,
        kind: EntityKind,
        record_id: RecordId,
        actor_id: ActorId,
        entries_old: Snapshot,
        entries_new: Snapshot,
        action: AuditAction,
    ) -> CoreResult<AuditLogEntry> {
        let date = self.clock.now_ms();
        let new_entry = NewAuditEntry {
            date,
            action,
            actor_id,
            entity: kind,
            record_id,
            entries_old: &entries_old,
            entries_new: &entries_new,
        };

        match audit_repo::insert_entry(conn, &new_entry) {
            Ok(id) => {
                info!(
                    "event=audit_record module=audit status=ok action={} entity={} record_id={} actor_id={}",
                    action, kind, record_id, actor_id
                );
                Ok(AuditLogEntry {
                    id,
                    date,
                    action,
                    actor_id,
                    entity_name: kind.entity_name().to_string(),
                    record_id,
                    entries_old,
                    entries_new,
                })
            }
            Err(err) => {
                error!(
                    "event=audit_record module=audit status=error action={} entity={} record_id={} error={}",
                    action, kind, record_id, err
                );
                Err(err.into())
            }
        }
    }

    /// Entries matching `query`, newest first.
    pub fn list_entries(
        &self,
        conn: &Connection,
        query: &AuditQuery,
    ) -> CoreResult<Vec<AuditLogEntry>> {
        Ok(audit_repo::list_entries(conn, query)?)
    }

    pub fn count_entries(&self, conn: &Connection, query: &AuditQuery) -> CoreResult<u64> {
        Ok(audit_repo::count_entries(conn, query)?)
    }
}
