use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    dao::models::SessionSnapshot,
    error::ServiceError,
    services::session_service,
    state::{SharedState, session::Session},
};

/// Restart every session found in the snapshot store.
///
/// Snapshots that cannot be restored are logged and skipped. Returns the
/// number of sessions started.
pub async fn restore_sessions(state: &SharedState) -> Result<usize, ServiceError> {
    let snapshots = state.store().load_all().await?;
    let found = snapshots.len();

    let mut restored = 0;
    for snapshot in &snapshots {
        match restore(state, snapshot).await {
            Ok(_) => restored += 1,
            Err(err) => warn!(
                chat_id = snapshot.chat_id,
                deck = %snapshot.deck_name,
                error = %err,
                "failed to restore session; skipping"
            ),
        }
    }

    info!(found, restored, "session recovery finished");
    Ok(restored)
}

/// Recreate and start the session described by `snapshot`, scores included.
///
/// The deck starts fresh; only the scoreboard carries over.
pub async fn restore(
    state: &SharedState,
    snapshot: &SessionSnapshot,
) -> Result<Arc<Session>, ServiceError> {
    let session = state.registry().create_with_scores(
        snapshot.chat_id,
        &snapshot.deck_name,
        snapshot.scoreboard(),
    )?;
    session_service::launch(&session, state.session_context()).await?;
    info!(
        chat_id = snapshot.chat_id,
        deck = %snapshot.deck_name,
        participants = snapshot.scores.len(),
        "session restored"
    );
    Ok(session)
}
