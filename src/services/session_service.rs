use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{
    error::ServiceError,
    services::messenger::{ChatId, OutgoingText},
    state::{
        SharedState,
        registry::SessionRegistry,
        session::{IncomingAnswer, Session, SessionContext, SessionError, SessionStatus},
    },
};

/// Register and start a session for `chat_id` playing `deck_name`.
pub async fn start_session(
    state: &SharedState,
    chat_id: ChatId,
    deck_name: &str,
) -> Result<SessionStatus, ServiceError> {
    let session = state.registry().create(chat_id, deck_name)?;
    info!(chat_id, deck = deck_name, "session created");

    if let Err(err) = state
        .messenger()
        .send_message(chat_id, OutgoingText::plain("Session started!"))
        .await
    {
        warn!(chat_id, error = %err, "failed to announce session start");
    }

    launch(&session, state.session_context()).await?;
    Ok(session.status())
}

/// Start the worker of a registered session and supervise it.
///
/// On failure the chat is told why, the session is deregistered, and the
/// error is returned.
pub async fn launch(session: &Arc<Session>, context: &SessionContext) -> Result<(), SessionError> {
    let chat_id = session.chat_id();
    match session.start(context.clone()) {
        Ok(worker) => {
            supervise(Arc::clone(&context.registry), session, worker);
            Ok(())
        }
        Err(err) => {
            error!(chat_id, error = %err, "failed to start session worker");
            context.registry.remove(chat_id);
            let notice = OutgoingText::plain(format!("Failed to start session: {err}"));
            if let Err(send_err) = context.messenger.send_message(chat_id, notice).await {
                warn!(chat_id, error = %send_err, "failed to report start failure");
            }
            Err(err)
        }
    }
}

/// Deregister the session if its worker dies without finishing normally.
fn supervise(registry: Arc<SessionRegistry>, session: &Arc<Session>, worker: JoinHandle<()>) {
    let chat_id = session.chat_id();
    let session = Arc::downgrade(session);
    tokio::spawn(async move {
        let Err(err) = worker.await else {
            return;
        };
        if err.is_panic() {
            error!(chat_id, "session worker panicked; deregistering");
        } else {
            warn!(chat_id, error = %err, "session worker cancelled; deregistering");
        }
        registry.remove_if_same(chat_id, &session);
    });
}

fn borrow(state: &SharedState, chat_id: ChatId) -> Result<Arc<Session>, ServiceError> {
    state
        .registry()
        .get(chat_id)
        .ok_or_else(|| ServiceError::NotFound(format!("no session in chat {chat_id}")))
}

/// Ask the session of `chat_id` to stop.
pub fn stop_session(state: &SharedState, chat_id: ChatId) -> Result<(), ServiceError> {
    let session = borrow(state, chat_id)?;
    session.stop();
    info!(chat_id, "session stop requested");
    state.registry().put(session);
    Ok(())
}

/// Current status of the session of `chat_id`.
pub fn session_status(state: &SharedState, chat_id: ChatId) -> Result<SessionStatus, ServiceError> {
    let session = borrow(state, chat_id)?;
    let status = session.status();
    state.registry().put(session);
    Ok(status)
}

/// Change the answer timeout of the session of `chat_id`.
pub fn set_timeout(
    state: &SharedState,
    chat_id: ChatId,
    timeout: Duration,
    apply_immediately: bool,
) -> Result<SessionStatus, ServiceError> {
    let session = borrow(state, chat_id)?;
    session.set_timeout(timeout, apply_immediately);
    let status = session.status();
    state.registry().put(session);
    Ok(status)
}

/// Change the inter-card delay of the session of `chat_id`.
pub fn set_next_delay(
    state: &SharedState,
    chat_id: ChatId,
    next_delay: Duration,
    apply_immediately: bool,
) -> Result<SessionStatus, ServiceError> {
    let session = borrow(state, chat_id)?;
    session.set_next_delay(next_delay, apply_immediately);
    let status = session.status();
    state.registry().put(session);
    Ok(status)
}

/// Deliver chat text to the session of `chat_id`, if any.
///
/// Returns whether the text was accepted as the first correct answer to the
/// current card. Text for a chat without a session is ignored.
pub fn submit_answer(state: &SharedState, chat_id: ChatId, answer: IncomingAnswer) -> bool {
    let Some(session) = state.registry().get(chat_id) else {
        return false;
    };
    let accepted = session.answer(answer);
    state.registry().put(session);
    accepted
}

/// Names of every deck a session can be started with.
pub fn list_decks(state: &SharedState) -> Vec<String> {
    state.registry().decks().available()
}
