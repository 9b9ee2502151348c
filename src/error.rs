use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    deck::DeckError,
    services::messenger::ChatId,
    state::session::SessionError,
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Snapshot storage failed.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A session already runs in the chat.
    #[error("a session is already running in chat {0}")]
    AlreadyRunning(ChatId),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The session worker could not be started.
    #[error("failed to start session: {0}")]
    WorkerStart(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<DeckError> for ServiceError {
    fn from(err: DeckError) -> Self {
        match err {
            DeckError::Unknown(_) => ServiceError::NotFound(err.to_string()),
            DeckError::InvalidName(_) | DeckError::Empty(_) => {
                ServiceError::InvalidInput(err.to_string())
            }
            DeckError::Read { .. } | DeckError::Parse { .. } => {
                ServiceError::InvalidInput(format!("{err}: {}", source_message(&err)))
            }
        }
    }
}

impl From<SessionError> for ServiceError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Duplicate(chat_id) => ServiceError::AlreadyRunning(chat_id),
            SessionError::Deck(deck) => deck.into(),
            SessionError::WorkerStart(reason) => ServiceError::WorkerStart(reason),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::AlreadyRunning(_) => AppError::Conflict(err.to_string()),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::WorkerStart(_) => AppError::Internal(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

fn source_message(err: &dyn std::error::Error) -> String {
    err.source()
        .map(ToString::to_string)
        .unwrap_or_default()
}
