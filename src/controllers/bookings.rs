use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::status::{ApiError, DeleteConfirmation, Outcome};
use super::{settle_update, SearchQuery};
use crate::error::AppError;
use crate::models::{BookingDetails, BookingForm, BookingId, EventDetails, Venue};
use crate::rules::{self, BookingWrite};
use crate::AppState;

const BOOKING_NOT_FOUND: &str = "Booking not found.";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/options", get(booking_form_options))
        .route(
            "/bookings/{booking_id}",
            get(booking_details).put(edit_booking).delete(delete_booking),
        )
        .route("/bookings/{booking_id}/delete", get(confirm_delete_booking))
}

async fn find_booking(state: &AppState, booking_id: BookingId) -> Result<BookingDetails, AppError> {
    state
        .store
        .find_booking_details(booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound(BOOKING_NOT_FOUND.to_string()))
}

// GET /api/bookings?search=
async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let bookings = state
        .store
        .list_bookings(params.search.as_deref())
        .await
        .map_err(AppError::from)?;
    Ok(Outcome::data(bookings))
}

#[derive(Debug, Serialize)]
struct BookingFormOptions {
    venues: Vec<Venue>,
    events: Vec<EventDetails>,
}

// GET /api/bookings/options
async fn booking_form_options(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let venues = state.store.list_venues(None).await.map_err(AppError::from)?;
    let events = state.store.list_events(None).await.map_err(AppError::from)?;
    Ok(Outcome::data(BookingFormOptions { venues, events }))
}

// GET /api/bookings/{booking_id}
async fn booking_details(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<BookingId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Outcome::data(find_booking(&state, booking_id).await?))
}

// POST /api/bookings
async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(form): Json<BookingForm>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = form.validated().map_err(|e| e.resubmit(&form))?;

    rules::check_booking_write(state.store.as_ref(), &draft, BookingWrite::Create)
        .await
        .map_err(|e| e.resubmit(&form))?;

    let booking = state.store.insert_booking(&draft).await.map_err(|e| {
        e.on_write("An error occurred while saving the booking. Please try again.")
            .resubmit(&form)
    })?;

    info!(
        booking_id = %booking.booking_id,
        event_id = %booking.event_id,
        venue_id = %booking.venue_id,
        "booking created"
    );
    Ok((StatusCode::CREATED, Outcome::success("Booking created successfully.", booking)))
}

// PUT /api/bookings/{booking_id}
async fn edit_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<BookingId>,
    Json(form): Json<BookingForm>,
) -> Result<impl IntoResponse, ApiError> {
    if form.booking_id != Some(booking_id) {
        return Err(AppError::NotFound(BOOKING_NOT_FOUND.to_string()).resubmit(&form));
    }

    let current = state
        .store
        .find_booking_by_id(booking_id)
        .await
        .map_err(|e| AppError::from(e).resubmit(&form))?
        .ok_or_else(|| AppError::NotFound(BOOKING_NOT_FOUND.to_string()).resubmit(&form))?;

    let mut draft = form.validated().map_err(|e| e.resubmit(&form))?;
    if form.booking_date.is_none() {
        draft.booking_date = current.booking_date;
    }

    rules::check_booking_write(state.store.as_ref(), &draft, BookingWrite::Edit(booking_id))
        .await
        .map_err(|e| e.resubmit(&form))?;

    let booking = draft.with_id(booking_id);
    let store = state.store.clone();
    settle_update(
        state.store.update_booking(&booking).await,
        move || async move { store.find_booking_by_id(booking_id).await.map(|b| b.is_some()) },
        BOOKING_NOT_FOUND,
        "An error occurred while updating the booking.",
    )
    .await
    .map_err(|e| e.resubmit(&form))?;

    info!(%booking_id, event_id = %booking.event_id, "booking updated");
    Ok(Outcome::success("Booking updated successfully.", booking))
}

// GET /api/bookings/{booking_id}/delete
async fn confirm_delete_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<BookingId>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = find_booking(&state, booking_id).await?;
    Ok(Outcome::data(DeleteConfirmation::from_verdict(booking, Ok(()))?))
}

// DELETE /api/bookings/{booking_id}
// Bookings have no dependents, so deletion is unconditional.
async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<BookingId>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .store
        .remove_booking(booking_id)
        .await
        .map_err(|e| e.on_write("An error occurred while deleting the booking."))?;
    if !removed {
        return Err(AppError::NotFound(BOOKING_NOT_FOUND.to_string()).into());
    }

    info!(%booking_id, "booking deleted");
    Ok(Outcome::success("Booking deleted successfully!", booking_id))
}
