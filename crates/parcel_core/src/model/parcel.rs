//! Parcel record and status vocabulary.
//!
//! # Responsibility
//! - Define the canonical in-memory shape of a `parcel` row.
//! - Name the status values the core understands.
//!
//! # Invariants
//! - `number` is assigned by the store on insert and never reused.
//! - `client` and `created_at` are fixed at creation.
//! - `address` may only change while `status == STATUS_REGISTERED`.

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Store-generated parcel identifier.
pub type ParcelNumber = i64;

/// Identifier of the client owning a parcel.
pub type ClientId = i64;

/// Initial status. The only value that permits address edits and deletion.
pub const STATUS_REGISTERED: &str = "registered";
/// Parcel handed to the carrier.
pub const STATUS_SENT: &str = "sent";
/// Parcel reached its destination.
pub const STATUS_DELIVERED: &str = "delivered";

/// Tracked shipment record.
///
/// `status` is kept as free text: values other than the known constants are
/// stored and returned unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// Assigned by the store. Ignored on insert.
    pub number: ParcelNumber,
    pub client: ClientId,
    pub status: String,
    pub address: String,
    /// Caller-supplied creation timestamp, stored verbatim.
    pub created_at: String,
}

impl Parcel {
    /// Creates an unsaved parcel in `registered` state.
    ///
    /// `number` stays `0` until the repository assigns one.
    pub fn new(
        client: ClientId,
        address: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            number: 0,
            client,
            status: STATUS_REGISTERED.to_string(),
            address: address.into(),
            created_at: created_at.into(),
        }
    }

    /// Returns whether address edits and deletion are still allowed.
    pub fn is_registered(&self) -> bool {
        self.status == STATUS_REGISTERED
    }
}

/// Returns the next status in the forward lifecycle.
///
/// `registered -> sent -> delivered`. Returns `None` for `delivered` and for
/// statuses outside the known vocabulary.
pub fn next_status(current: &str) -> Option<&'static str> {
    match current {
        STATUS_REGISTERED => Some(STATUS_SENT),
        STATUS_SENT => Some(STATUS_DELIVERED),
        _ => None,
    }
}

/// Current UTC time as an RFC 3339 string, suitable for `created_at`.
pub fn now_timestamp() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::{next_status, now_timestamp, Parcel, STATUS_DELIVERED, STATUS_SENT};

    #[test]
    fn new_parcel_starts_registered_without_number() {
        let parcel = Parcel::new(7, "Main st. 1", "2024-01-01T00:00:00Z");
        assert_eq!(parcel.number, 0);
        assert!(parcel.is_registered());
    }

    #[test]
    fn next_status_walks_forward_and_stops_at_delivered() {
        assert_eq!(next_status("registered"), Some(STATUS_SENT));
        assert_eq!(next_status("sent"), Some(STATUS_DELIVERED));
        assert_eq!(next_status("delivered"), None);
        assert_eq!(next_status("lost"), None);
    }

    #[test]
    fn parcel_serializes_with_column_names() {
        let parcel = Parcel::new(7, "A", "2024-01-01T00:00:00Z");
        let value = serde_json::to_value(&parcel).unwrap();
        assert_eq!(value["client"], 7);
        assert_eq!(value["status"], "registered");
        assert_eq!(value["created_at"], "2024-01-01T00:00:00Z");

        let back: Parcel = serde_json::from_value(value).unwrap();
        assert_eq!(back, parcel);
    }

    #[test]
    fn now_timestamp_is_rfc3339_utc() {
        let stamp = now_timestamp();
        assert!(stamp.contains('T'));
        assert!(stamp.ends_with('Z'));
    }
}
