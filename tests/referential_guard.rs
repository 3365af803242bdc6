mod common;

use proptest::prelude::*;

use common::{at, booking, event, venue};
use venue_bookings::error::{AppError, StoreError};
use venue_bookings::models::{EventId, VenueId};
use venue_bookings::rules::{can_delete_event, can_delete_venue, guard};
use venue_bookings::store::{MemoryStore, Store};

#[tokio::test]
async fn empty_venue_may_be_deleted() {
    let store = MemoryStore::new();
    let hall = venue(&store, "Town Hall").await;

    can_delete_venue(&store, hall.venue_id).await.unwrap();
    assert!(store.remove_venue(hall.venue_id).await.unwrap());
}

#[tokio::test]
async fn venue_with_bookings_reports_bookings_first() {
    let store = MemoryStore::new();
    let hall = venue(&store, "Town Hall").await;
    let gala = event(&store, hall.venue_id, "Gala", at(2024, 3, 10, 18, 0)).await;
    booking(&store, gala.event_id, hall.venue_id).await;

    let err = can_delete_venue(&store, hall.venue_id).await.unwrap_err();
    assert!(matches!(err, AppError::ReferentialConflict(ref m) if m == guard::VENUE_HAS_BOOKINGS));
}

#[tokio::test]
async fn booking_alone_blocks_venue_deletion() {
    let store = MemoryStore::new();
    let hall = venue(&store, "Town Hall").await;
    let annex = venue(&store, "Annex").await;
    // The event belongs to the hall; the booking names the annex.
    let gala = event(&store, hall.venue_id, "Gala", at(2024, 3, 10, 18, 0)).await;
    booking(&store, gala.event_id, annex.venue_id).await;

    let err = can_delete_venue(&store, annex.venue_id).await.unwrap_err();
    assert!(matches!(err, AppError::ReferentialConflict(ref m) if m == guard::VENUE_HAS_BOOKINGS));
}

#[tokio::test]
async fn venue_with_only_events_is_linked() {
    let store = MemoryStore::new();
    let hall = venue(&store, "Town Hall").await;
    event(&store, hall.venue_id, "Gala", at(2024, 3, 10, 18, 0)).await;

    let err = can_delete_venue(&store, hall.venue_id).await.unwrap_err();
    assert!(matches!(err, AppError::ReferentialConflict(ref m) if m == guard::VENUE_HAS_EVENTS));
}

#[tokio::test]
async fn event_with_bookings_is_kept() {
    let store = MemoryStore::new();
    let hall = venue(&store, "Town Hall").await;
    let gala = event(&store, hall.venue_id, "Gala", at(2024, 3, 10, 18, 0)).await;
    let quiet = event(&store, hall.venue_id, "Quiet night", at(2024, 3, 11, 18, 0)).await;
    booking(&store, gala.event_id, hall.venue_id).await;

    let err = can_delete_event(&store, gala.event_id).await.unwrap_err();
    assert!(matches!(err, AppError::ReferentialConflict(ref m) if m == guard::EVENT_HAS_BOOKINGS));
    can_delete_event(&store, quiet.event_id).await.unwrap();
}

#[tokio::test]
async fn missing_rows_are_not_found() {
    let store = MemoryStore::new();

    let err = can_delete_venue(&store, VenueId(404)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = can_delete_event(&store, EventId(404)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn venue_verdict_follows_dependents_and_is_stable(events in 0u32..4, bookings in 0usize..4) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (first, second) = runtime.block_on(async {
            let store = MemoryStore::new();
            let hall = venue(&store, "Town Hall").await;
            let annex = venue(&store, "Annex").await;
            let elsewhere = event(&store, annex.venue_id, "Elsewhere", at(2024, 3, 1, 18, 0)).await;
            for day in 0..events {
                event(&store, hall.venue_id, "Show", at(2024, 3, 10 + day, 18, 0)).await;
            }
            for _ in 0..bookings {
                booking(&store, elsewhere.event_id, hall.venue_id).await;
            }

            let first = can_delete_venue(&store, hall.venue_id).await.map_err(|e| e.to_string());
            let second = can_delete_venue(&store, hall.venue_id).await.map_err(|e| e.to_string());
            (first, second)
        });

        let expected = if bookings > 0 {
            Err(guard::VENUE_HAS_BOOKINGS.to_string())
        } else if events > 0 {
            Err(guard::VENUE_HAS_EVENTS.to_string())
        } else {
            Ok(())
        };
        prop_assert_eq!(&first, &expected);
        prop_assert_eq!(first, second);
    }
}

#[tokio::test]
async fn refused_delete_reports_the_blocking_rows() {
    let store = MemoryStore::new();
    let hall = venue(&store, "Town Hall").await;
    let annex = venue(&store, "Annex").await;
    let gala = event(&store, annex.venue_id, "Gala", at(2024, 3, 10, 18, 0)).await;

    // The guard passed; a booking lands before the delete.
    can_delete_venue(&store, hall.venue_id).await.unwrap();
    booking(&store, gala.event_id, hall.venue_id).await;
    assert!(matches!(store.remove_venue(hall.venue_id).await, Err(StoreError::ForeignKey)));

    let err = guard::venue_delete_refusal(&store, hall.venue_id).await;
    assert!(matches!(err, AppError::ReferentialConflict(ref m) if m == guard::VENUE_HAS_BOOKINGS));
}

#[tokio::test]
async fn store_refuses_orphaning_deletes() {
    let store = MemoryStore::new();
    let hall = venue(&store, "Town Hall").await;
    let gala = event(&store, hall.venue_id, "Gala", at(2024, 3, 10, 18, 0)).await;
    booking(&store, gala.event_id, hall.venue_id).await;

    assert!(store.remove_venue(hall.venue_id).await.is_err());
    assert!(store.remove_event(gala.event_id).await.is_err());
}
