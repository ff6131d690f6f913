use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::invoicing::InvoiceError;
use crate::services::lifecycle::{AssignmentError, TransitionError};

/// Failure reported by the booking store collaborator.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("booking {id} was modified concurrently (expected revision {expected})")]
    Conflict { id: String, expected: i64 },

    #[error("malformed record: {0}")]
    Malformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Invoice(#[from] InvoiceError),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,
}

fn persistence_status(e: &PersistenceError) -> StatusCode {
    match e {
        PersistenceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        PersistenceError::NotFound(_) => StatusCode::NOT_FOUND,
        PersistenceError::Conflict { .. } => StatusCode::CONFLICT,
        PersistenceError::Malformed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Persistence(e) => persistence_status(e),
            AppError::Assignment(AssignmentError::OutsideShift { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Assignment(AssignmentError::MechanicNotFound(_))
            | AppError::Assignment(AssignmentError::BookingNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Assignment(AssignmentError::Persistence(e)) => persistence_status(e),
            AppError::Transition(TransitionError::InvalidTransition { .. }) => StatusCode::CONFLICT,
            AppError::Transition(TransitionError::BookingNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Transition(TransitionError::Persistence(e)) => persistence_status(e),
            AppError::Invoice(InvoiceError::NotCompleted { .. }) => StatusCode::CONFLICT,
            AppError::Invoice(InvoiceError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            AppError::Invoice(InvoiceError::Overflow) => StatusCode::BAD_REQUEST,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
