//! Domain rules checked before any write reaches the store.
//!
//! - [`guard`] keeps venues and events from being deleted while rows depend on them.
//! - [`conflict`] keeps a venue to one event per calendar day.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::AppError;
use crate::models::{NewEvent, Venue, VenueId};
use crate::store::Store;

pub mod conflict;
pub mod guard;

pub use conflict::{
    check_booking_write, check_event_reschedule, is_conflict, BookingWrite, ConflictKey,
};
pub use guard::{can_delete_event, can_delete_venue};

pub const VENUE_NOT_FOUND: &str = "Selected venue not found.";

/// Conflict comparison key: the date with time-of-day discarded.
pub fn truncated_date(at: NaiveDateTime) -> NaiveDate {
    at.date()
}

/// An event may only be written against a venue that exists.
pub async fn check_event_write(store: &dyn Store, event: &NewEvent) -> Result<Venue, AppError> {
    require_venue(store, event.venue_id).await
}

pub(crate) async fn require_venue(store: &dyn Store, venue_id: VenueId) -> Result<Venue, AppError> {
    store
        .find_venue_by_id(venue_id)
        .await?
        .ok_or_else(|| AppError::NotFound(VENUE_NOT_FOUND.to_string()))
}
