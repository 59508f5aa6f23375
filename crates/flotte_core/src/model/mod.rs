//! Domain model for the fleet record store.
//!
//! # Responsibility
//! - Define value types (intervals, lock state, audit entries) used by the
//!   concurrency core.
//! - Define the lockable fleet records, people and contact details with
//!   their create/update payloads.
//!
//! # Invariants
//! - Every record is identified by a storage-assigned `RecordId`.
//! - Deletion is a soft-delete tombstone unless a hard delete is requested.

pub mod audit;
pub mod contact;
pub mod entity;
pub mod fleet;
pub mod interval;
pub mod lock;
pub mod record;
