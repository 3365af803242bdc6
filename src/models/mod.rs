pub mod ids;
pub mod venue;
pub mod event;
pub mod booking;

pub use ids::{BookingId, EventId, VenueId};
pub use venue::{NewVenue, Venue, VenueForm};
pub use event::{Event, EventDetails, EventForm, NewEvent};
pub use booking::{Booking, BookingDetails, BookingForm, NewBooking};

/// Collapses blank form input to `None` so `required` validation catches it.
pub(crate) fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
