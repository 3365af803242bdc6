//! Persistence contract the handlers and rules are written against.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{
    Booking, BookingDetails, BookingId, Event, EventDetails, EventId, NewBooking, NewEvent,
    NewVenue, Venue, VenueId,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Reads return `None` for missing rows. `update_*` and `remove_*` return
/// whether the row existed.
///
/// `insert_booking` and `update_booking` are serialized per venue and repeat
/// the conflict check under that serialization, failing with
/// [`StoreError::BookingConflict`]. `update_event` does the same for every
/// venue the event's bookings name when the event moves to another day.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_venue_by_id(&self, venue_id: VenueId) -> Result<Option<Venue>, StoreError>;
    async fn find_event_by_id(&self, event_id: EventId) -> Result<Option<Event>, StoreError>;
    async fn find_event_details(&self, event_id: EventId) -> Result<Option<EventDetails>, StoreError>;
    async fn find_booking_by_id(&self, booking_id: BookingId) -> Result<Option<Booking>, StoreError>;
    async fn find_booking_details(
        &self,
        booking_id: BookingId,
    ) -> Result<Option<BookingDetails>, StoreError>;

    async fn list_venues(&self, search: Option<&str>) -> Result<Vec<Venue>, StoreError>;
    async fn list_events(&self, search: Option<&str>) -> Result<Vec<EventDetails>, StoreError>;
    async fn list_bookings(&self, search: Option<&str>) -> Result<Vec<BookingDetails>, StoreError>;

    async fn list_bookings_by_venue(&self, venue_id: VenueId) -> Result<Vec<BookingDetails>, StoreError>;
    async fn list_bookings_by_event(&self, event_id: EventId) -> Result<Vec<Booking>, StoreError>;
    async fn list_events_by_venue(&self, venue_id: VenueId) -> Result<Vec<Event>, StoreError>;

    async fn insert_venue(&self, venue: &NewVenue) -> Result<Venue, StoreError>;
    async fn update_venue(&self, venue: &Venue) -> Result<bool, StoreError>;
    async fn remove_venue(&self, venue_id: VenueId) -> Result<bool, StoreError>;

    async fn insert_event(&self, event: &NewEvent) -> Result<Event, StoreError>;
    async fn update_event(&self, event: &Event) -> Result<bool, StoreError>;
    async fn remove_event(&self, event_id: EventId) -> Result<bool, StoreError>;

    async fn insert_booking(&self, booking: &NewBooking) -> Result<Booking, StoreError>;
    async fn update_booking(&self, booking: &Booking) -> Result<bool, StoreError>;
    async fn remove_booking(&self, booking_id: BookingId) -> Result<bool, StoreError>;
}

/// Trimmed search text, or `None` when there is nothing to filter on.
pub fn normalize_search(search: Option<&str>) -> Option<&str> {
    search.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_search_means_no_filter() {
        assert_eq!(normalize_search(None), None);
        assert_eq!(normalize_search(Some("")), None);
        assert_eq!(normalize_search(Some("   ")), None);
        assert_eq!(normalize_search(Some(" hall ")), Some("hall"));
    }
}
