pub mod bookings;
pub mod events;
pub mod status;
pub mod venues;

use axum::Router;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;

use crate::error::{AppError, StoreError};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(venues::routes())
        .merge(events::routes())
        .merge(bookings::routes())
}

/// `?search=` on the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

/// Maps the result of an update onto the user-facing outcome. When the write
/// itself failed, the row is looked up again: if it vanished in the meantime
/// the request is reported as not found.
pub(crate) async fn settle_update<F, Fut>(
    result: Result<bool, StoreError>,
    still_exists: F,
    not_found: &str,
    failure: &str,
) -> Result<(), AppError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<bool, StoreError>>,
{
    match result {
        Ok(true) => Ok(()),
        Ok(false) => Err(AppError::NotFound(not_found.to_string())),
        Err(err) => match still_exists().await {
            Ok(false) => Err(AppError::NotFound(not_found.to_string())),
            _ => Err(err.on_write(failure)),
        },
    }
}
