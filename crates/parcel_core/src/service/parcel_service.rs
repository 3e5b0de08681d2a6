//! Parcel lifecycle service.
//!
//! # Responsibility
//! - Register parcels, advance their status, edit and remove them.
//! - Report mutations through the logging facade.
//!
//! # Invariants
//! - Service APIs never bypass repository rules.
//! - Service layer remains storage-agnostic.

use crate::model::parcel::{next_status, now_timestamp, ClientId, Parcel, ParcelNumber};
use crate::repo::parcel_repo::{ParcelRepository, RepoResult};
use log::{info, warn};

/// Use-case wrapper over any parcel repository.
pub struct ParcelService<R: ParcelRepository> {
    repo: R,
}

impl<R: ParcelRepository> ParcelService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new parcel stamped with the current time.
    ///
    /// Returns the stored parcel including its assigned number.
    pub fn register(&self, client: ClientId, address: impl Into<String>) -> RepoResult<Parcel> {
        let mut parcel = Parcel::new(client, address, now_timestamp());
        parcel.number = log_outcome("parcel_register", client, self.repo.add(&parcel))?;
        info!(
            "event=parcel_register module=service status=ok client={} number={}",
            client, parcel.number
        );
        Ok(parcel)
    }

    /// Reads one parcel.
    pub fn get(&self, number: ParcelNumber) -> RepoResult<Parcel> {
        self.repo.get(number)
    }

    /// Lists a client's parcels in store order.
    pub fn client_parcels(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        self.repo.get_by_client(client)
    }

    /// Overwrites the status without lifecycle checks.
    pub fn set_status(&self, number: ParcelNumber, status: &str) -> RepoResult<()> {
        log_outcome("parcel_set_status", number, self.repo.set_status(number, status))?;
        info!("event=parcel_set_status module=service status=ok number={number} to={status}");
        Ok(())
    }

    /// Moves a parcel one step along `registered -> sent -> delivered`.
    ///
    /// # Contract
    /// - `delivered` and unknown statuses are left untouched.
    /// - Returns the status the parcel has after the call.
    pub fn next_status(&self, number: ParcelNumber) -> RepoResult<String> {
        let current = self.repo.get(number)?;
        let Some(next) = next_status(&current.status) else {
            info!(
                "event=parcel_next_status module=service status=skipped number={number} current={}",
                current.status
            );
            return Ok(current.status);
        };

        log_outcome("parcel_next_status", number, self.repo.set_status(number, next))?;
        info!(
            "event=parcel_next_status module=service status=ok number={number} from={} to={next}",
            current.status
        );
        Ok(next.to_string())
    }

    /// Changes the delivery address of a registered parcel.
    pub fn change_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()> {
        log_outcome(
            "parcel_change_address",
            number,
            self.repo.set_address(number, address),
        )?;
        info!("event=parcel_change_address module=service status=ok number={number}");
        Ok(())
    }

    /// Deletes a registered parcel; other statuses are kept silently.
    pub fn delete(&self, number: ParcelNumber) -> RepoResult<()> {
        log_outcome("parcel_delete", number, self.repo.delete(number))?;
        info!("event=parcel_delete module=service status=ok number={number}");
        Ok(())
    }
}

fn log_outcome<T>(event: &str, subject: i64, result: RepoResult<T>) -> RepoResult<T> {
    if let Err(err) = &result {
        warn!("event={event} module=service status=error subject={subject} error={err}");
    }
    result
}
