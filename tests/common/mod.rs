#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::{Arc, Mutex};

use venue_bookings::config::Config;
use venue_bookings::models::{Booking, Event, EventId, NewBooking, NewEvent, NewVenue, Venue, VenueId};
use venue_bookings::store::{MemoryStore, Store};
use venue_bookings::upload::{ImageUploader, UploadError};
use venue_bookings::AppState;

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub async fn venue(store: &dyn Store, name: &str) -> Venue {
    store
        .insert_venue(&NewVenue {
            venue_name: name.to_string(),
            venue_location: "Cape Town".to_string(),
            venue_capacity: 250,
            image_url: None,
        })
        .await
        .unwrap()
}

pub async fn event(store: &dyn Store, venue_id: VenueId, name: &str, date: NaiveDateTime) -> Event {
    store
        .insert_event(&NewEvent {
            event_name: name.to_string(),
            event_date: date,
            event_description: format!("{name} description"),
            venue_id,
        })
        .await
        .unwrap()
}

pub async fn booking(store: &dyn Store, event_id: EventId, venue_id: VenueId) -> Booking {
    store
        .insert_booking(&draft(event_id, venue_id))
        .await
        .unwrap()
}

pub fn draft(event_id: EventId, venue_id: VenueId) -> NewBooking {
    NewBooking {
        event_id,
        venue_id,
        booking_date: at(2024, 1, 15, 9, 0),
    }
}

/// Records uploads and hands back a predictable URL, or fails every call.
#[derive(Default)]
pub struct StubUploader {
    pub fail: bool,
    pub uploads: Mutex<Vec<(usize, String, String)>>,
}

#[async_trait]
impl ImageUploader for StubUploader {
    async fn upload_image(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        filename_hint: &str,
    ) -> Result<String, UploadError> {
        if self.fail {
            return Err(UploadError::Rejected(reqwest::StatusCode::FORBIDDEN));
        }
        self.uploads.lock().unwrap().push((
            bytes.len(),
            content_type.to_string(),
            filename_hint.to_string(),
        ));
        Ok(format!("https://blobs.test/venue-images/{filename_hint}"))
    }
}

pub fn state_with(store: Arc<MemoryStore>, uploader: Arc<StubUploader>) -> Arc<AppState> {
    let config = Config::from_lookup(|_| None).unwrap();
    AppState::with_parts(store, uploader, config)
}
