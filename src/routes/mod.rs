use axum::Router;

use crate::state::SharedState;

pub mod health;
pub mod session;

/// Compose all route trees and wire in shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router().merge(session::router()).with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::snapshot_store::MemorySnapshotStore,
        state::AppState,
        testing::{RecordingMessenger, ScriptedRenderer},
    };

    async fn serve() -> (String, SharedState) {
        let (messenger, _deliveries) = RecordingMessenger::new();
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(MemorySnapshotStore::new()),
            messenger,
            Arc::new(ScriptedRenderer::default()),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), state)
    }

    #[tokio::test]
    async fn session_lifecycle_over_http() {
        let (base, state) = serve().await;
        let client = reqwest::Client::new();
        let session_url = format!("{base}/chats/-7/session");

        let created = client
            .post(&session_url)
            .json(&json!({"deck_name": "tozai_line"}))
            .send()
            .await
            .unwrap();
        assert_eq!(created.status(), 201);

        let duplicate = client
            .post(&session_url)
            .json(&json!({"deck_name": "tozai_line"}))
            .send()
            .await
            .unwrap();
        assert_eq!(duplicate.status(), 409);

        let status: Value = client
            .put(format!("{session_url}/timeout"))
            .json(&json!({"seconds": 90, "apply_immediately": false}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["chat_id"], -7);
        assert_eq!(status["deck_name"], "tozai_line");
        assert_eq!(status["timeout_secs"], 90);

        let health: Value = client
            .get(format!("{base}/healthcheck"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health, json!({"status": "ok", "active_sessions": 1}));

        let answer: Value = client
            .post(format!("{base}/chats/-7/answers"))
            .json(&json!({"participant_id": 1, "full_name": "Alice", "text": "not it"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(answer, json!({"accepted": false}));

        let stopped = client.delete(&session_url).send().await.unwrap();
        assert_eq!(stopped.status(), 202);
        assert!(state.registry().get(-7).is_none_or(|session| session.status().stop_requested));
    }

    #[tokio::test]
    async fn rejects_bad_input_and_unknown_targets() {
        let (base, _state) = serve().await;
        let client = reqwest::Client::new();

        let bad_deck = client
            .post(format!("{base}/chats/1/session"))
            .json(&json!({"deck_name": "../../etc/passwd"}))
            .send()
            .await
            .unwrap();
        assert_eq!(bad_deck.status(), 400);

        let unknown_deck = client
            .post(format!("{base}/chats/1/session"))
            .json(&json!({"deck_name": "missing_deck"}))
            .send()
            .await
            .unwrap();
        assert_eq!(unknown_deck.status(), 404);

        let no_session = client
            .get(format!("{base}/chats/1/session"))
            .send()
            .await
            .unwrap();
        assert_eq!(no_session.status(), 404);

        let zero_timeout = client
            .put(format!("{base}/chats/1/session/timeout"))
            .json(&json!({"seconds": 0}))
            .send()
            .await
            .unwrap();
        assert_eq!(zero_timeout.status(), 400);

        let decks: Value = client
            .get(format!("{base}/decks"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(decks["decks"][0], "tozai_line");
    }
}
