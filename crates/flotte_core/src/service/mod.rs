//! Core services: lock protocol, audit recording, scheduling checks and the
//! update coordinator that ties them into one transactional unit.
//!
//! # Responsibility
//! - Orchestrate repository calls into the mutation state machine.
//! - Keep request surfaces decoupled from storage details.

pub mod audit_recorder;
pub mod coordinator;
pub mod identity;
pub mod lock_manager;
pub mod temporal;
