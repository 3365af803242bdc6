use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::{EventId, VenueId};
use crate::store::Store;

pub const VENUE_HAS_BOOKINGS: &str = "Cannot delete venue. It has existing bookings.";
pub const VENUE_HAS_EVENTS: &str = "Cannot delete venue. It is linked to an event.";
pub const EVENT_HAS_BOOKINGS: &str = "Cannot delete event. It has existing bookings.";

/// Permits deletion only when no booking and no event references the venue.
/// Bookings are reported ahead of events.
pub async fn can_delete_venue(store: &dyn Store, venue_id: VenueId) -> Result<(), AppError> {
    if store.find_venue_by_id(venue_id).await?.is_none() {
        return Err(AppError::NotFound("Venue not found.".to_string()));
    }

    let bookings = store.list_bookings_by_venue(venue_id).await?;
    if !bookings.is_empty() {
        warn!(%venue_id, bookings = bookings.len(), "venue deletion blocked by bookings");
        return Err(AppError::ReferentialConflict(VENUE_HAS_BOOKINGS.to_string()));
    }

    let events = store.list_events_by_venue(venue_id).await?;
    if !events.is_empty() {
        warn!(%venue_id, events = events.len(), "venue deletion blocked by events");
        return Err(AppError::ReferentialConflict(VENUE_HAS_EVENTS.to_string()));
    }

    debug!(%venue_id, "venue may be deleted");
    Ok(())
}

/// Reason to report when the store refused a venue delete the guard had
/// allowed: a dependent row arrived in between, so the guard is asked again.
pub async fn venue_delete_refusal(store: &dyn Store, venue_id: VenueId) -> AppError {
    match can_delete_venue(store, venue_id).await {
        Err(reason) => reason,
        Ok(()) => AppError::ReferentialConflict(VENUE_HAS_EVENTS.to_string()),
    }
}

pub async fn can_delete_event(store: &dyn Store, event_id: EventId) -> Result<(), AppError> {
    if store.find_event_by_id(event_id).await?.is_none() {
        return Err(AppError::NotFound("Event not found.".to_string()));
    }

    let bookings = store.list_bookings_by_event(event_id).await?;
    if !bookings.is_empty() {
        warn!(%event_id, bookings = bookings.len(), "event deletion blocked by bookings");
        return Err(AppError::ReferentialConflict(EVENT_HAS_BOOKINGS.to_string()));
    }

    debug!(%event_id, "event may be deleted");
    Ok(())
}
