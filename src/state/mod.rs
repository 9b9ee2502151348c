pub mod registry;
pub mod scoreboard;
pub mod session;
pub mod state_machine;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    dao::snapshot_store::SnapshotStore,
    deck::DeckCatalog,
    services::{messenger::Messenger, renderer::ImageRenderer},
};

pub use self::registry::SessionRegistry;
pub use self::session::{Session, SessionContext, SessionError, SessionSettings};

pub type SharedState = Arc<AppState>;

/// Central application state: the session registry plus the collaborators
/// every session worker is started with.
pub struct AppState {
    config: AppConfig,
    context: SessionContext,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn SnapshotStore>,
        messenger: Arc<dyn Messenger>,
        renderer: Arc<dyn ImageRenderer>,
    ) -> SharedState {
        let registry = Arc::new(SessionRegistry::new(
            DeckCatalog::new(config.decks_dir.clone()),
            config.session_defaults,
        ));
        Arc::new(Self {
            config,
            context: SessionContext {
                registry,
                store,
                messenger,
                renderer,
            },
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registry of live sessions.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.context.registry
    }

    /// Collaborators handed to every session worker.
    pub fn session_context(&self) -> &SessionContext {
        &self.context
    }

    /// Outbound chat transport.
    pub fn messenger(&self) -> &Arc<dyn Messenger> {
        &self.context.messenger
    }

    /// Snapshot persistence backend.
    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.context.store
    }
}
