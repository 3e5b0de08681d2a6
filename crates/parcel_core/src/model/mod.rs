//! Parcel domain model.
//!
//! # Responsibility
//! - Define the parcel record shared by repository, service and CLI layers.
//!
//! # Invariants
//! - A parcel is identified by its store-assigned `number`.
//! - Only the `registered` status gates address edits and deletion.

pub mod parcel;
