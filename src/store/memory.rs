use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{normalize_search, Store};
use crate::error::StoreError;
use crate::models::{
    Booking, BookingDetails, BookingId, Event, EventDetails, EventId, NewBooking, NewEvent,
    NewVenue, Venue, VenueId,
};
use crate::rules::{is_conflict, BookingWrite, ConflictKey};

#[derive(Debug, Default)]
struct Tables {
    venues: BTreeMap<VenueId, Venue>,
    events: BTreeMap<EventId, Event>,
    bookings: BTreeMap<BookingId, Booking>,
    last_venue_id: i64,
    last_event_id: i64,
    last_booking_id: i64,
}

impl Tables {
    fn event_details(&self, event: &Event) -> Option<EventDetails> {
        let venue = self.venues.get(&event.venue_id)?;
        Some(EventDetails {
            event_id: event.event_id,
            event_name: event.event_name.clone(),
            event_date: event.event_date,
            event_description: event.event_description.clone(),
            venue_id: event.venue_id,
            venue_name: venue.venue_name.clone(),
        })
    }

    fn booking_details(&self, booking: &Booking) -> Option<BookingDetails> {
        let event = self.events.get(&booking.event_id)?;
        let venue = self.venues.get(&booking.venue_id)?;
        Some(BookingDetails {
            booking_id: booking.booking_id,
            event_id: booking.event_id,
            venue_id: booking.venue_id,
            booking_date: booking.booking_date,
            event_name: event.event_name.clone(),
            event_date: event.event_date,
            venue_name: venue.venue_name.clone(),
        })
    }

    /// Mirrors the foreign keys and the locked conflict recheck of the Postgres schema.
    fn admit_booking(&self, booking: &NewBooking, write: BookingWrite) -> Result<(), StoreError> {
        let event = self
            .events
            .get(&booking.event_id)
            .ok_or(StoreError::ForeignKey)?;
        if !self.venues.contains_key(&booking.venue_id) {
            return Err(StoreError::ForeignKey);
        }

        let key = ConflictKey::new(booking, event);
        let clash = self
            .bookings
            .values()
            .filter_map(|b| self.booking_details(b))
            .any(|existing| is_conflict(&existing, &key, write));
        if clash {
            return Err(StoreError::BookingConflict);
        }
        Ok(())
    }

    /// A new day for `event` must leave every venue its bookings name free of
    /// other events on that day.
    fn admit_reschedule(&self, event: &Event) -> Result<(), StoreError> {
        let day = event.event_day();
        let unchanged = self
            .events
            .get(&event.event_id)
            .is_some_and(|current| current.event_day() == day);
        if unchanged {
            return Ok(());
        }

        let clash = self
            .bookings
            .values()
            .filter(|mine| mine.event_id == event.event_id)
            .any(|mine| {
                let key = ConflictKey {
                    venue_id: mine.venue_id,
                    event_id: event.event_id,
                    day,
                };
                self.bookings
                    .values()
                    .filter_map(|b| self.booking_details(b))
                    .any(|existing| is_conflict(&existing, &key, BookingWrite::Create))
            });
        if clash {
            return Err(StoreError::BookingConflict);
        }
        Ok(())
    }
}

fn matches(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

/// In-process store with the same constraints as the Postgres schema. A single
/// write lock serializes every write, event reschedules included.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_venue_by_id(&self, venue_id: VenueId) -> Result<Option<Venue>, StoreError> {
        Ok(self.tables.read().await.venues.get(&venue_id).cloned())
    }

    async fn find_event_by_id(&self, event_id: EventId) -> Result<Option<Event>, StoreError> {
        Ok(self.tables.read().await.events.get(&event_id).cloned())
    }

    async fn find_event_details(&self, event_id: EventId) -> Result<Option<EventDetails>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .events
            .get(&event_id)
            .and_then(|e| tables.event_details(e)))
    }

    async fn find_booking_by_id(&self, booking_id: BookingId) -> Result<Option<Booking>, StoreError> {
        Ok(self.tables.read().await.bookings.get(&booking_id).cloned())
    }

    async fn find_booking_details(
        &self,
        booking_id: BookingId,
    ) -> Result<Option<BookingDetails>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .get(&booking_id)
            .and_then(|b| tables.booking_details(b)))
    }

    async fn list_venues(&self, search: Option<&str>) -> Result<Vec<Venue>, StoreError> {
        let search = normalize_search(search);
        let tables = self.tables.read().await;
        Ok(tables
            .venues
            .values()
            .filter(|v| matches(&v.venue_name, search))
            .cloned()
            .collect())
    }

    async fn list_events(&self, search: Option<&str>) -> Result<Vec<EventDetails>, StoreError> {
        let search = normalize_search(search);
        let tables = self.tables.read().await;
        Ok(tables
            .events
            .values()
            .filter_map(|e| tables.event_details(e))
            .filter(|e| matches(&e.event_name, search) || matches(&e.venue_name, search))
            .collect())
    }

    async fn list_bookings(&self, search: Option<&str>) -> Result<Vec<BookingDetails>, StoreError> {
        let search = normalize_search(search);
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .values()
            .filter_map(|b| tables.booking_details(b))
            .filter(|b| matches(&b.venue_name, search) || matches(&b.event_name, search))
            .collect())
    }

    async fn list_bookings_by_venue(&self, venue_id: VenueId) -> Result<Vec<BookingDetails>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .values()
            .filter(|b| b.venue_id == venue_id)
            .filter_map(|b| tables.booking_details(b))
            .collect())
    }

    async fn list_bookings_by_event(&self, event_id: EventId) -> Result<Vec<Booking>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .values()
            .filter(|b| b.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn list_events_by_venue(&self, venue_id: VenueId) -> Result<Vec<Event>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .events
            .values()
            .filter(|e| e.venue_id == venue_id)
            .cloned()
            .collect())
    }

    async fn insert_venue(&self, venue: &NewVenue) -> Result<Venue, StoreError> {
        let mut tables = self.tables.write().await;
        tables.last_venue_id += 1;
        let venue = venue.clone().with_id(VenueId(tables.last_venue_id));
        tables.venues.insert(venue.venue_id, venue.clone());
        Ok(venue)
    }

    async fn update_venue(&self, venue: &Venue) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.venues.get_mut(&venue.venue_id) {
            Some(row) => {
                *row = venue.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_venue(&self, venue_id: VenueId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let referenced = tables.events.values().any(|e| e.venue_id == venue_id)
            || tables.bookings.values().any(|b| b.venue_id == venue_id);
        if referenced {
            return Err(StoreError::ForeignKey);
        }
        Ok(tables.venues.remove(&venue_id).is_some())
    }

    async fn insert_event(&self, event: &NewEvent) -> Result<Event, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.venues.contains_key(&event.venue_id) {
            return Err(StoreError::ForeignKey);
        }
        tables.last_event_id += 1;
        let event = event.clone().with_id(EventId(tables.last_event_id));
        tables.events.insert(event.event_id, event.clone());
        Ok(event)
    }

    async fn update_event(&self, event: &Event) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.events.contains_key(&event.event_id) {
            return Ok(false);
        }
        if !tables.venues.contains_key(&event.venue_id) {
            return Err(StoreError::ForeignKey);
        }
        tables.admit_reschedule(event)?;
        tables.events.insert(event.event_id, event.clone());
        Ok(true)
    }

    async fn remove_event(&self, event_id: EventId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.bookings.values().any(|b| b.event_id == event_id) {
            return Err(StoreError::ForeignKey);
        }
        Ok(tables.events.remove(&event_id).is_some())
    }

    async fn insert_booking(&self, booking: &NewBooking) -> Result<Booking, StoreError> {
        let mut tables = self.tables.write().await;
        tables.admit_booking(booking, BookingWrite::Create)?;
        tables.last_booking_id += 1;
        let booking = booking.clone().with_id(BookingId(tables.last_booking_id));
        tables.bookings.insert(booking.booking_id, booking.clone());
        Ok(booking)
    }

    async fn update_booking(&self, booking: &Booking) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.bookings.contains_key(&booking.booking_id) {
            return Ok(false);
        }
        let draft = NewBooking {
            event_id: booking.event_id,
            venue_id: booking.venue_id,
            booking_date: booking.booking_date,
        };
        tables.admit_booking(&draft, BookingWrite::Edit(booking.booking_id))?;
        tables.bookings.insert(booking.booking_id, booking.clone());
        Ok(true)
    }

    async fn remove_booking(&self, booking_id: BookingId) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.bookings.remove(&booking_id).is_some())
    }
}
