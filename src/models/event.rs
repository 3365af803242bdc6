use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{non_blank, EventId, VenueId};
use crate::error::AppError;
use crate::rules::truncated_date;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub event_name: String,
    pub event_date: NaiveDateTime,
    pub event_description: String,
    pub venue_id: VenueId,
}

impl Event {
    pub fn event_day(&self) -> NaiveDate {
        truncated_date(self.event_date)
    }
}

/// An event row joined with the name of its venue, for list and detail views.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct EventDetails {
    pub event_id: EventId,
    pub event_name: String,
    pub event_date: NaiveDateTime,
    pub event_description: String,
    pub venue_id: VenueId,
    pub venue_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub event_name: String,
    pub event_date: NaiveDateTime,
    pub event_description: String,
    pub venue_id: VenueId,
}

impl NewEvent {
    pub fn with_id(self, event_id: EventId) -> Event {
        Event {
            event_id,
            event_name: self.event_name,
            event_date: self.event_date,
            event_description: self.event_description,
            venue_id: self.venue_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct EventForm {
    pub event_id: Option<EventId>,
    #[validate(required(message = "Event name is required"))]
    pub event_name: Option<String>,
    #[validate(required(message = "Event date is required"))]
    pub event_date: Option<NaiveDateTime>,
    #[validate(required(message = "Event description is required"))]
    pub event_description: Option<String>,
    #[validate(required(message = "Venue ID is required"))]
    pub venue_id: Option<VenueId>,
}

impl EventForm {
    pub fn validated(&self) -> Result<NewEvent, AppError> {
        let normalized = Self {
            event_name: non_blank(&self.event_name),
            event_description: non_blank(&self.event_description),
            ..self.clone()
        };
        normalized.validate()?;

        match normalized {
            Self {
                event_name: Some(event_name),
                event_date: Some(event_date),
                event_description: Some(event_description),
                venue_id: Some(venue_id),
                ..
            } => Ok(NewEvent {
                event_name,
                event_date,
                event_description,
                venue_id,
            }),
            _ => Err(AppError::ValidationFailed(
                "Please correct the errors and try again.".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_report_every_message() {
        let err = EventForm::default().validated().unwrap_err();
        let AppError::ValidationFailed(message) = err else {
            panic!("expected validation failure, got {err:?}");
        };
        for expected in [
            "Event name is required",
            "Event date is required",
            "Event description is required",
            "Venue ID is required",
        ] {
            assert!(message.contains(expected), "{message}");
        }
    }
}
