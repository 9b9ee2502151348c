use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use validator::Validate;

use crate::{
    dto::session::{
        AnswerRequest, AnswerResponse, DeckListResponse, DelayRequest, SessionStatusResponse,
        StartSessionRequest, TimeoutRequest,
    },
    error::AppError,
    services::{messenger::ChatId, session_service},
    state::SharedState,
};

/// Routes driving per-chat quiz sessions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/decks", get(list_decks))
        .route(
            "/chats/{chat_id}/session",
            post(start_session).get(session_status).delete(stop_session),
        )
        .route("/chats/{chat_id}/session/timeout", put(set_timeout))
        .route("/chats/{chat_id}/session/delay", put(set_next_delay))
        .route("/chats/{chat_id}/answers", post(submit_answer))
}

/// List deck names a session can be started with.
pub async fn list_decks(State(state): State<SharedState>) -> Json<DeckListResponse> {
    Json(DeckListResponse {
        decks: session_service::list_decks(&state),
    })
}

/// Start a session in the chat.
pub async fn start_session(
    State(state): State<SharedState>,
    Path(chat_id): Path<ChatId>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<SessionStatusResponse>), AppError> {
    payload.validate()?;
    let status = session_service::start_session(&state, chat_id, &payload.deck_name).await?;
    Ok((StatusCode::CREATED, Json(status.into())))
}

/// Report the state of the chat's session.
pub async fn session_status(
    State(state): State<SharedState>,
    Path(chat_id): Path<ChatId>,
) -> Result<Json<SessionStatusResponse>, AppError> {
    let status = session_service::session_status(&state, chat_id)?;
    Ok(Json(status.into()))
}

/// Ask the chat's session to stop; it finishes asynchronously.
pub async fn stop_session(
    State(state): State<SharedState>,
    Path(chat_id): Path<ChatId>,
) -> Result<StatusCode, AppError> {
    session_service::stop_session(&state, chat_id)?;
    Ok(StatusCode::ACCEPTED)
}

/// Change the answer timeout.
pub async fn set_timeout(
    State(state): State<SharedState>,
    Path(chat_id): Path<ChatId>,
    Json(payload): Json<TimeoutRequest>,
) -> Result<Json<SessionStatusResponse>, AppError> {
    payload.validate()?;
    let status = session_service::set_timeout(
        &state,
        chat_id,
        Duration::from_secs(payload.seconds),
        payload.apply_immediately,
    )?;
    Ok(Json(status.into()))
}

/// Change the delay between cards.
pub async fn set_next_delay(
    State(state): State<SharedState>,
    Path(chat_id): Path<ChatId>,
    Json(payload): Json<DelayRequest>,
) -> Result<Json<SessionStatusResponse>, AppError> {
    payload.validate()?;
    let status = session_service::set_next_delay(
        &state,
        chat_id,
        Duration::from_secs(payload.seconds),
        payload.apply_immediately,
    )?;
    Ok(Json(status.into()))
}

/// Forward chat text to the chat's session as a candidate answer.
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(chat_id): Path<ChatId>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    payload.validate()?;
    let accepted = session_service::submit_answer(&state, chat_id, payload.into());
    Ok(Json(AnswerResponse { accepted }))
}
