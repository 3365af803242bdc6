use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::{error, info};

use super::status::{ApiError, DeleteConfirmation, Outcome};
use super::{settle_update, SearchQuery};
use crate::error::{AppError, StoreError};
use crate::models::{Venue, VenueForm, VenueId};
use crate::rules;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/venues", get(list_venues).post(create_venue))
        .route(
            "/venues/{venue_id}",
            get(venue_details).put(edit_venue).delete(delete_venue),
        )
        .route("/venues/{venue_id}/delete", get(confirm_delete_venue))
}

/* ---------- multipart form ---------- */

struct ImageFile {
    bytes: Vec<u8>,
    content_type: String,
    file_name: String,
}

fn malformed(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::ValidationFailed(format!("Malformed form data: {}", e))
}

fn set_field(form: &mut VenueForm, name: &str, value: String) -> Result<(), AppError> {
    let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
    match name {
        "venue_id" => {
            form.venue_id = value
                .map(|v| v.parse::<i64>().map(VenueId))
                .transpose()
                .map_err(|_| AppError::NotFound("Venue not found.".to_string()))?;
        }
        "venue_name" => form.venue_name = value,
        "venue_location" => form.venue_location = value,
        "venue_capacity" => {
            form.venue_capacity = value
                .map(|v| v.parse::<i32>())
                .transpose()
                .map_err(|_| {
                    AppError::ValidationFailed("Venue capacity must be a whole number".to_string())
                })?;
        }
        "image_url" => form.image_url = value,
        _ => {}
    }
    Ok(())
}

/// Reads venue fields and the optional `image_file` part.
async fn read_venue_form(mut multipart: Multipart) -> Result<(VenueForm, Option<ImageFile>), ApiError> {
    let mut form = VenueForm::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| malformed(e).resubmit(&form))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image_file" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(|e| malformed(e).resubmit(&form))?;
            if !bytes.is_empty() {
                image = Some(ImageFile { bytes: bytes.to_vec(), content_type, file_name });
            }
            continue;
        }

        let value = field.text().await.map_err(|e| malformed(e).resubmit(&form))?;
        set_field(&mut form, &name, value).map_err(|e| e.resubmit(&form))?;
    }

    Ok((form, image))
}

async fn upload(state: &AppState, image: ImageFile) -> Result<String, AppError> {
    state
        .uploader
        .upload_image(image.bytes, &image.content_type, &image.file_name)
        .await
        .map_err(|e| {
            error!("venue image upload failed: {:?}", e);
            AppError::UploadFailed(e)
        })
}

/* ---------- VENUES ---------- */

// GET /api/venues?search=
async fn list_venues(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let venues = state.store.list_venues(params.search.as_deref()).await.map_err(AppError::from)?;
    Ok(Outcome::data(venues))
}

// GET /api/venues/{venue_id}
async fn venue_details(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<VenueId>,
) -> Result<impl IntoResponse, ApiError> {
    let venue = find_venue(&state, venue_id).await?;
    Ok(Outcome::data(venue))
}

async fn find_venue(state: &AppState, venue_id: VenueId) -> Result<Venue, AppError> {
    state
        .store
        .find_venue_by_id(venue_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Venue not found.".to_string()))
}

// POST /api/venues (multipart)
async fn create_venue(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (mut form, image) = read_venue_form(multipart).await?;
    let mut venue = form.validated().map_err(|e| e.resubmit(&form))?;

    // Upload first; nothing is stored when it fails.
    if let Some(image) = image {
        let url = upload(&state, image).await.map_err(|e| e.resubmit(&form))?;
        form.image_url = Some(url.clone());
        venue.image_url = Some(url);
    }

    let venue = state
        .store
        .insert_venue(&venue)
        .await
        .map_err(|e| e.on_write("An error occurred while creating the venue.").resubmit(&form))?;

    info!(venue_id = %venue.venue_id, "venue created");
    Ok((StatusCode::CREATED, Outcome::success("Venue created successfully!", venue)))
}

// PUT /api/venues/{venue_id} (multipart)
async fn edit_venue(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<VenueId>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (mut form, image) = read_venue_form(multipart).await?;
    if form.venue_id != Some(venue_id) {
        return Err(AppError::NotFound("Venue not found.".to_string()).resubmit(&form));
    }

    let mut draft = form.validated().map_err(|e| e.resubmit(&form))?;
    let current = find_venue(&state, venue_id).await.map_err(|e| e.resubmit(&form))?;

    match image {
        Some(image) => {
            let url = upload(&state, image).await.map_err(|e| e.resubmit(&form))?;
            form.image_url = Some(url.clone());
            draft.image_url = Some(url);
        }
        None if draft.image_url.is_none() => draft.image_url = current.image_url,
        None => {}
    }

    let venue = draft.with_id(venue_id);
    let store = state.store.clone();
    settle_update(
        state.store.update_venue(&venue).await,
        move || async move { store.find_venue_by_id(venue_id).await.map(|v| v.is_some()) },
        "Venue not found.",
        "An error occurred while updating the venue.",
    )
    .await
    .map_err(|e| e.resubmit(&form))?;

    info!(%venue_id, "venue updated");
    Ok(Outcome::success("Venue updated successfully!", venue))
}

// GET /api/venues/{venue_id}/delete
async fn confirm_delete_venue(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<VenueId>,
) -> Result<impl IntoResponse, ApiError> {
    let venue = find_venue(&state, venue_id).await?;
    let verdict = rules::can_delete_venue(state.store.as_ref(), venue_id).await;
    Ok(Outcome::data(DeleteConfirmation::from_verdict(venue, verdict)?))
}

// DELETE /api/venues/{venue_id}
async fn delete_venue(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<VenueId>,
) -> Result<impl IntoResponse, ApiError> {
    rules::can_delete_venue(state.store.as_ref(), venue_id).await?;

    let removed = match state.store.remove_venue(venue_id).await {
        Ok(removed) => removed,
        Err(StoreError::ForeignKey) => {
            return Err(rules::guard::venue_delete_refusal(state.store.as_ref(), venue_id)
                .await
                .into())
        }
        Err(e) => return Err(e.on_write("An error occurred while deleting the venue.").into()),
    };
    if !removed {
        return Err(AppError::NotFound("Venue not found.".to_string()).into());
    }

    info!(%venue_id, "venue deleted");
    Ok(Outcome::success("Venue deleted successfully!", venue_id))
}
