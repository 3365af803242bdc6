use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{BookingId, EventId, VenueId};
use crate::error::AppError;
use crate::rules::truncated_date;

/// A booking row. `venue_id` is stored on its own and is not tied to the
/// event's venue.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: BookingId,
    pub event_id: EventId,
    pub venue_id: VenueId,
    pub booking_date: NaiveDateTime,
}

/// A booking resolved with its event and venue.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct BookingDetails {
    pub booking_id: BookingId,
    pub event_id: EventId,
    pub venue_id: VenueId,
    pub booking_date: NaiveDateTime,
    pub event_name: String,
    pub event_date: NaiveDateTime,
    pub venue_name: String,
}

impl BookingDetails {
    pub fn event_day(&self) -> NaiveDate {
        truncated_date(self.event_date)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub event_id: EventId,
    pub venue_id: VenueId,
    pub booking_date: NaiveDateTime,
}

impl NewBooking {
    pub fn with_id(self, booking_id: BookingId) -> Booking {
        Booking {
            booking_id,
            event_id: self.event_id,
            venue_id: self.venue_id,
            booking_date: self.booking_date,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct BookingForm {
    pub booking_id: Option<BookingId>,
    #[validate(required(message = "Event is required"))]
    pub event_id: Option<EventId>,
    #[validate(required(message = "Venue is required"))]
    pub venue_id: Option<VenueId>,
    pub booking_date: Option<NaiveDateTime>,
}

impl BookingForm {
    /// Record date falls back to the current UTC time when not submitted.
    pub fn validated(&self) -> Result<NewBooking, AppError> {
        self.validate()?;

        match (self.event_id, self.venue_id) {
            (Some(event_id), Some(venue_id)) => Ok(NewBooking {
                event_id,
                venue_id,
                booking_date: self
                    .booking_date
                    .unwrap_or_else(|| Utc::now().naive_utc()),
            }),
            _ => Err(AppError::ValidationFailed(
                "Please correct the errors and try again.".to_string(),
            )),
        }
    }
}
