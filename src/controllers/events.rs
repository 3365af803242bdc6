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
use crate::models::{EventDetails, EventForm, EventId, Venue};
use crate::rules;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/options", get(event_form_options))
        .route(
            "/events/{event_id}",
            get(event_details).put(edit_event).delete(delete_event),
        )
        .route("/events/{event_id}/delete", get(confirm_delete_event))
}

async fn find_event(state: &AppState, event_id: EventId) -> Result<EventDetails, AppError> {
    state
        .store
        .find_event_details(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found.".to_string()))
}

// GET /api/events?search=
async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let events = state.store.list_events(params.search.as_deref()).await.map_err(AppError::from)?;
    Ok(Outcome::data(events))
}

#[derive(Debug, Serialize)]
struct EventFormOptions {
    venues: Vec<Venue>,
}

// GET /api/events/options
async fn event_form_options(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let venues = state.store.list_venues(None).await.map_err(AppError::from)?;
    Ok(Outcome::data(EventFormOptions { venues }))
}

// GET /api/events/{event_id}
async fn event_details(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Outcome::data(find_event(&state, event_id).await?))
}

// POST /api/events
async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(form): Json<EventForm>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = form.validated().map_err(|e| e.resubmit(&form))?;
    rules::check_event_write(state.store.as_ref(), &draft)
        .await
        .map_err(|e| e.resubmit(&form))?;

    let event = state
        .store
        .insert_event(&draft)
        .await
        .map_err(|e| e.on_write("An error occurred while creating the event.").resubmit(&form))?;

    info!(event_id = %event.event_id, venue_id = %event.venue_id, "event created");
    Ok((StatusCode::CREATED, Outcome::success("Event created successfully!", event)))
}

// PUT /api/events/{event_id}
async fn edit_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<EventId>,
    Json(form): Json<EventForm>,
) -> Result<impl IntoResponse, ApiError> {
    if form.event_id != Some(event_id) {
        return Err(AppError::NotFound("Event not found.".to_string()).resubmit(&form));
    }

    let draft = form.validated().map_err(|e| e.resubmit(&form))?;
    rules::check_event_write(state.store.as_ref(), &draft)
        .await
        .map_err(|e| e.resubmit(&form))?;
    rules::check_event_reschedule(state.store.as_ref(), event_id, &draft)
        .await
        .map_err(|e| e.resubmit(&form))?;

    let event = draft.with_id(event_id);
    let store = state.store.clone();
    settle_update(
        state.store.update_event(&event).await,
        move || async move { store.find_event_by_id(event_id).await.map(|e| e.is_some()) },
        "Event not found.",
        "An error occurred while updating the event.",
    )
    .await
    .map_err(|e| e.resubmit(&form))?;

    info!(%event_id, "event updated");
    Ok(Outcome::success("Event updated successfully!", event))
}

// GET /api/events/{event_id}/delete
async fn confirm_delete_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    let event = find_event(&state, event_id).await?;
    let verdict = rules::can_delete_event(state.store.as_ref(), event_id).await;
    Ok(Outcome::data(DeleteConfirmation::from_verdict(event, verdict)?))
}

// DELETE /api/events/{event_id}
async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    rules::can_delete_event(state.store.as_ref(), event_id).await?;

    let removed = state.store.remove_event(event_id).await.map_err(|e| {
        e.on_delete(
            "An error occurred while deleting the event.",
            rules::guard::EVENT_HAS_BOOKINGS,
        )
    })?;
    if !removed {
        return Err(AppError::NotFound("Event not found.".to_string()).into());
    }

    info!(%event_id, "event deleted");
    Ok(Outcome::success("Event deleted successfully!", event_id))
}
