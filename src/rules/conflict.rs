//! One venue, one event per calendar day.
//!
//! A booking write moves through `Submitted -> EventResolved -> ConflictChecked`
//! and ends either accepted (the caller persists it) or rejected with an
//! [`AppError`] (nothing is persisted). The scan here runs outside any lock;
//! the store repeats [`is_conflict`] while holding a per-venue lock so two
//! racing writers cannot both commit.
//!
//! Editing an event's date moves its bookings with it, so a reschedule is
//! checked against the same rule for every venue those bookings name.

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::{require_venue, truncated_date};
use crate::error::AppError;
use crate::models::{BookingDetails, BookingId, Event, EventId, NewBooking, NewEvent, VenueId};
use crate::store::Store;

pub const EVENT_NOT_FOUND: &str = "Selected event not found.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingWrite {
    Create,
    /// Editing the booking with this id; it never conflicts with itself.
    Edit(BookingId),
}

/// What an incoming booking is compared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictKey {
    pub venue_id: VenueId,
    pub event_id: EventId,
    pub day: NaiveDate,
}

impl ConflictKey {
    pub fn new(booking: &NewBooking, event: &Event) -> Self {
        Self {
            venue_id: booking.venue_id,
            event_id: booking.event_id,
            day: event.event_day(),
        }
    }
}

/// Same venue, same day, different event. Bookings under the same event
/// share the day freely.
pub fn is_conflict(existing: &BookingDetails, key: &ConflictKey, write: BookingWrite) -> bool {
    let same_slot = existing.venue_id == key.venue_id
        && existing.event_day() == key.day
        && existing.event_id != key.event_id;

    match write {
        BookingWrite::Create => same_slot,
        BookingWrite::Edit(booking_id) => same_slot && existing.booking_id != booking_id,
    }
}

/// Resolves the booking's event and checks the venue for a same-day booking
/// under a different event. Returns the resolved event when the write may go ahead.
pub async fn check_booking_write(
    store: &dyn Store,
    booking: &NewBooking,
    write: BookingWrite,
) -> Result<Event, AppError> {
    let event = store
        .find_event_by_id(booking.event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(EVENT_NOT_FOUND.to_string()))?;

    require_venue(store, booking.venue_id).await?;

    let key = ConflictKey::new(booking, &event);
    let existing = store.list_bookings_by_venue(booking.venue_id).await?;

    if let Some(clash) = existing.iter().find(|b| is_conflict(b, &key, write)) {
        warn!(
            venue_id = %key.venue_id,
            day = %key.day,
            clashing_booking = %clash.booking_id,
            "booking rejected: venue already booked"
        );
        return Err(AppError::BookingConflict);
    }

    debug!(venue_id = %key.venue_id, day = %key.day, ?write, "booking accepted");
    Ok(event)
}

/// Moving an event to another day carries its bookings along. Every venue
/// those bookings name must be free of other events on the new day.
pub async fn check_event_reschedule(
    store: &dyn Store,
    event_id: EventId,
    event: &NewEvent,
) -> Result<(), AppError> {
    let current = store
        .find_event_by_id(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found.".to_string()))?;

    let day = truncated_date(event.event_date);
    if current.event_day() == day {
        return Ok(());
    }

    let mut venues: Vec<VenueId> = store
        .list_bookings_by_event(event_id)
        .await?
        .into_iter()
        .map(|b| b.venue_id)
        .collect();
    venues.sort();
    venues.dedup();

    for venue_id in venues {
        let key = ConflictKey { venue_id, event_id, day };
        let existing = store.list_bookings_by_venue(venue_id).await?;
        if let Some(clash) = existing.iter().find(|b| is_conflict(b, &key, BookingWrite::Create)) {
            warn!(
                %event_id,
                %venue_id,
                %day,
                clashing_booking = %clash.booking_id,
                "event reschedule rejected: venue already booked"
            );
            return Err(AppError::BookingConflict);
        }
    }

    debug!(%event_id, from = %current.event_day(), to = %day, "event rescheduled");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use proptest::prelude::*;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn existing(booking_id: i64, event_id: i64, venue_id: i64, event_date: NaiveDateTime) -> BookingDetails {
        BookingDetails {
            booking_id: BookingId(booking_id),
            event_id: EventId(event_id),
            venue_id: VenueId(venue_id),
            booking_date: at(1, 9, 0),
            event_name: format!("event {event_id}"),
            event_date,
            venue_name: format!("venue {venue_id}"),
        }
    }

    fn key(event_id: i64, venue_id: i64, day: u32) -> ConflictKey {
        ConflictKey {
            venue_id: VenueId(venue_id),
            event_id: EventId(event_id),
            day: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
        }
    }

    #[test]
    fn other_venue_never_conflicts() {
        let a = existing(1, 1, 5, at(10, 18, 0));
        assert!(!is_conflict(&a, &key(2, 6, 10), BookingWrite::Create));
    }

    #[test]
    fn other_day_never_conflicts() {
        let a = existing(1, 1, 5, at(10, 23, 59));
        assert!(!is_conflict(&a, &key(2, 5, 11), BookingWrite::Create));
    }

    #[test]
    fn edit_skips_own_row_only() {
        let a = existing(1, 1, 5, at(10, 18, 0));
        // Moving booking 1 onto event 2 on the same day: still itself.
        assert!(!is_conflict(&a, &key(2, 5, 10), BookingWrite::Edit(BookingId(1))));
        // Booking 7 moving onto event 2 the same day clashes with booking 1.
        assert!(is_conflict(&a, &key(2, 5, 10), BookingWrite::Edit(BookingId(7))));
    }

    proptest! {
        #[test]
        fn time_of_day_is_ignored(h1 in 0u32..24, m1 in 0u32..60, h2 in 0u32..24, m2 in 0u32..60) {
            let a = existing(1, 1, 5, at(10, h1, m1));
            let incoming = ConflictKey {
                venue_id: VenueId(5),
                event_id: EventId(2),
                day: truncated_date(at(10, h2, m2)),
            };
            prop_assert!(is_conflict(&a, &incoming, BookingWrite::Create));
        }

        #[test]
        fn same_event_is_exempt(h in 0u32..24, m in 0u32..60, venue in 1i64..50) {
            let a = existing(1, 1, venue, at(10, h, m));
            prop_assert!(!is_conflict(&a, &key(1, venue, 10), BookingWrite::Create));
        }
    }
}
