//! Core data access for parcel tracking.
//! This crate owns the `parcel` table and the registered-only edit rule.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::parcel::{
    next_status, now_timestamp, ClientId, Parcel, ParcelNumber, STATUS_DELIVERED,
    STATUS_REGISTERED, STATUS_SENT,
};
pub use repo::parcel_repo::{
    ParcelRepository, RepoError, RepoResult, SqliteParcelRepository, WriteTarget,
};
pub use service::parcel_service::ParcelService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
