//! Quizdeck binary entrypoint wiring the session registry, snapshot storage,
//! chat and rendering collaborators, and the HTTP control surface.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quizdeck_back::{
    config::AppConfig,
    dao::snapshot_store::FileSnapshotStore,
    routes,
    services::{
        messenger::{LogMessenger, Messenger},
        recovery,
        renderer::LatexRenderer,
        telegram::TelegramMessenger,
    },
    state::{AppState, SharedState},
};

/// Environment variable carrying the Telegram bot token.
const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store = Arc::new(FileSnapshotStore::new(config.storage_dir.clone()));
    let renderer = Arc::new(LatexRenderer::new(
        config.renderer_endpoint.clone(),
        config.asset_url_prefix.clone(),
    ));
    let messenger = build_messenger(&config);

    let app_state = AppState::new(config, store, messenger, renderer);

    match recovery::restore_sessions(&app_state).await {
        Ok(restored) => info!(restored, "startup recovery complete"),
        Err(err) => error!(error = %err, "failed to scan session snapshots; starting empty"),
    }

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    // Snapshots stay on disk so the next start resumes these sessions.
    info!(
        live_sessions = app_state.registry().len(),
        "server stopped; session snapshots kept for recovery"
    );
    Ok(())
}

/// Pick the Telegram messenger when a bot token is configured, the logging one otherwise.
fn build_messenger(config: &AppConfig) -> Arc<dyn Messenger> {
    match env::var(BOT_TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => {
            info!(api_base = %config.telegram_api_base, "using Telegram messenger");
            Arc::new(TelegramMessenger::new(&config.telegram_api_base, token.trim()))
        }
        _ => {
            warn!("{BOT_TOKEN_ENV} not set; outgoing messages are only logged");
            Arc::new(LogMessenger::new())
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
