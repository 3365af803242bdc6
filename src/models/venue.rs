use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{non_blank, VenueId};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Venue {
    pub venue_id: VenueId,
    pub venue_name: String,
    pub venue_location: String,
    pub venue_capacity: i32,
    pub image_url: Option<String>,
}

/// A venue that passed form validation but has no key yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVenue {
    pub venue_name: String,
    pub venue_location: String,
    pub venue_capacity: i32,
    pub image_url: Option<String>,
}

impl NewVenue {
    pub fn with_id(self, venue_id: VenueId) -> Venue {
        Venue {
            venue_id,
            venue_name: self.venue_name,
            venue_location: self.venue_location,
            venue_capacity: self.venue_capacity,
            image_url: self.image_url,
        }
    }
}

/// Venue create/edit input exactly as submitted. Echoed back on rejection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct VenueForm {
    pub venue_id: Option<VenueId>,
    #[validate(required(message = "Venue name is required"))]
    pub venue_name: Option<String>,
    #[validate(required(message = "Venue location is required"))]
    pub venue_location: Option<String>,
    #[validate(
        required(message = "Venue capacity is required"),
        range(min = 1, message = "Venue capacity must be at least 1")
    )]
    pub venue_capacity: Option<i32>,
    pub image_url: Option<String>,
}

impl VenueForm {
    pub fn validated(&self) -> Result<NewVenue, AppError> {
        let normalized = Self {
            venue_name: non_blank(&self.venue_name),
            venue_location: non_blank(&self.venue_location),
            image_url: non_blank(&self.image_url),
            ..self.clone()
        };
        normalized.validate()?;

        match normalized {
            Self {
                venue_name: Some(venue_name),
                venue_location: Some(venue_location),
                venue_capacity: Some(venue_capacity),
                image_url,
                ..
            } => Ok(NewVenue {
                venue_name,
                venue_location,
                venue_capacity,
                image_url,
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

    fn form() -> VenueForm {
        VenueForm {
            venue_id: None,
            venue_name: Some("Town Hall".to_string()),
            venue_location: Some("Cape Town".to_string()),
            venue_capacity: Some(300),
            image_url: None,
        }
    }

    #[test]
    fn accepts_complete_form() {
        let venue = form().validated().unwrap();
        assert_eq!(venue.venue_name, "Town Hall");
        assert_eq!(venue.venue_capacity, 300);
        assert_eq!(venue.image_url, None);
    }

    #[test]
    fn blank_name_is_required() {
        let err = VenueForm {
            venue_name: Some("   ".to_string()),
            ..form()
        }
        .validated()
        .unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(ref m) if m.contains("Venue name is required")));
    }

    #[test]
    fn capacity_must_be_positive() {
        for capacity in [None, Some(0), Some(-5)] {
            let err = VenueForm {
                venue_capacity: capacity,
                ..form()
            }
            .validated()
            .unwrap_err();
            assert!(matches!(err, AppError::ValidationFailed(_)));
        }
    }
}
