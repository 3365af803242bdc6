//! Per-response status messages and the error body handlers reply with.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: StatusKind::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: StatusKind::Error, message: message.into() }
    }
}

/// Successful response body: the payload plus the status line to show, if any.
#[derive(Debug, Serialize)]
pub struct Outcome<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusMessage>,
    pub data: T,
}

impl<T: Serialize> Outcome<T> {
    pub fn data(data: T) -> Self {
        Self { status: None, data }
    }

    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self { status: Some(StatusMessage::success(message)), data }
    }
}

impl<T: Serialize> IntoResponse for Outcome<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Delete confirmation view: the record and whether deleting it is allowed.
#[derive(Debug, Serialize)]
pub struct DeleteConfirmation<T> {
    pub record: T,
    pub can_delete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
}

impl<T> DeleteConfirmation<T> {
    /// Folds a guard verdict in. Only referential conflicts count as a "no";
    /// anything else is a real failure and is returned.
    pub fn from_verdict(record: T, verdict: Result<(), AppError>) -> Result<Self, AppError> {
        match verdict {
            Ok(()) => Ok(Self { record, can_delete: true, blocked_reason: None }),
            Err(AppError::ReferentialConflict(reason)) => Ok(Self {
                record,
                can_delete: false,
                blocked_reason: Some(reason),
            }),
            Err(other) => Err(other),
        }
    }
}

/// A rejected request. Form submissions carry their input back unchanged so
/// the client can correct and resubmit it.
#[derive(Debug)]
pub struct ApiError {
    pub error: AppError,
    pub submitted: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ErrorBody {
    status: StatusMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    submitted: Option<serde_json::Value>,
}

impl AppError {
    pub fn resubmit<T: Serialize>(self, form: &T) -> ApiError {
        ApiError {
            error: self,
            submitted: serde_json::to_value(form).ok(),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self { error, submitted: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: StatusMessage::error(self.error.to_string()),
            submitted: self.submitted,
        };
        (self.error.status_code(), Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
