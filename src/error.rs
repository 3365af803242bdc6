use axum::http::StatusCode;
use thiserror::Error;
use tracing::error;

use crate::upload::UploadError;

/// Everything a request can fail with. Recovered at the request boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ValidationFailed(String),

    /// Delete blocked by dependent rows.
    #[error("{0}")]
    ReferentialConflict(String),

    #[error("This venue is already booked for that date.")]
    BookingConflict,

    #[error("{0}")]
    PersistenceFailure(String),

    #[error("Image upload failed. Please try again.")]
    UploadFailed(#[from] UploadError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ReferentialConflict(_) | AppError::BookingConflict => StatusCode::CONFLICT,
            AppError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::UploadFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid"))
                })
            })
            .collect();
        messages.sort();
        AppError::ValidationFailed(messages.join("; "))
    }
}

/// Store-level failures. Callers translate them with [`StoreError::on_write`]
/// or [`StoreError::on_delete`] so the user sees an operation-specific message.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("foreign key constraint violated")]
    ForeignKey,

    /// The per-venue serialized recheck found a booking on the same day.
    #[error("venue already booked for that date")]
    BookingConflict,
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_foreign_key_violation() {
                return StoreError::ForeignKey;
            }
        }
        StoreError::Database(err)
    }
}

impl StoreError {
    pub fn on_write(self, failure: &str) -> AppError {
        match self {
            StoreError::BookingConflict => AppError::BookingConflict,
            other => {
                error!("store write failed: {:?}", other);
                AppError::PersistenceFailure(failure.to_string())
            }
        }
    }

    pub fn on_delete(self, failure: &str, blocked: &str) -> AppError {
        match self {
            StoreError::ForeignKey => AppError::ReferentialConflict(blocked.to_string()),
            other => other.on_write(failure),
        }
    }
}

/// Plain reads have no operation-specific wording.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        error!("store read failed: {:?}", err);
        AppError::PersistenceFailure("The data store is unavailable. Please try again.".to_string())
    }
}

/// Failures while bringing the service up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("blob client setup failed: {0}")]
    Upload(#[from] UploadError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_survives_write_translation() {
        let err = StoreError::BookingConflict.on_write("save failed");
        assert!(matches!(err, AppError::BookingConflict));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn foreign_key_on_delete_is_referential_conflict() {
        let err = StoreError::ForeignKey.on_delete("delete failed", "still referenced");
        assert!(matches!(err, AppError::ReferentialConflict(ref m) if m == "still referenced"));
    }

    #[test]
    fn foreign_key_on_write_is_persistence_failure() {
        let err = StoreError::ForeignKey.on_write("save failed");
        assert!(matches!(err, AppError::PersistenceFailure(ref m) if m == "save failed"));
    }
}
