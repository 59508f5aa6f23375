//! Repository layer: SQL access to fleet records, lock fields and the audit log.
//!
//! # Responsibility
//! - Isolate SQLite query details from the lock/temporal/coordinator services.
//! - Accept any `&Connection`, so the same calls run inside a caller-owned
//!   transaction (`Transaction` derefs to `Connection`).
//!
//! # Invariants
//! - Repository functions never open or commit transactions themselves.
//! - Writes report affected-row counts instead of interpreting them.

pub mod audit_repo;
pub mod contact_repo;
pub mod fleet_repo;
pub mod lock_repo;
pub mod record_repo;
