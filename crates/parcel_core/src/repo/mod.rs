//! Repository layer for parcel persistence.
//!
//! # Responsibility
//! - Define the parcel data-access contract.
//! - Isolate SQLite statement details from service orchestration.
//!
//! # Invariants
//! - Address edits and deletion only apply to `registered` parcels.
//! - Store failures are returned, never logged or retried here.

pub mod parcel_repo;
