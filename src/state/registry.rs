use std::sync::{Arc, Weak};

use dashmap::{DashMap, mapref::entry::Entry};
use tracing::debug;

use crate::{
    deck::{Deck, DeckCatalog},
    services::messenger::ChatId,
    state::{
        scoreboard::ScoreBoard,
        session::{Session, SessionError, SessionSettings},
    },
};

/// Chat-indexed table of live sessions, at most one per chat.
///
/// Each chat id maps to its own shard entry, so creation, lookup and
/// removal for a chat are serialized without a table-wide lock. The
/// registry never touches a session's own lock while holding an entry.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: DashMap<ChatId, Arc<Session>>,
    decks: DeckCatalog,
    defaults: SessionSettings,
}

impl SessionRegistry {
    /// Registry opening decks from `decks` and seeding new sessions with `defaults`.
    pub fn new(decks: DeckCatalog, defaults: SessionSettings) -> Self {
        Self {
            sessions: DashMap::new(),
            decks,
            defaults,
        }
    }

    /// Deck catalog used for new sessions.
    pub fn decks(&self) -> &DeckCatalog {
        &self.decks
    }

    /// Register a fresh session for `chat_id` playing `deck_name`.
    pub fn create(&self, chat_id: ChatId, deck_name: &str) -> Result<Arc<Session>, SessionError> {
        self.create_with_scores(chat_id, deck_name, ScoreBoard::new())
    }

    /// Register a session whose scoreboard starts from `scores`.
    pub fn create_with_scores(
        &self,
        chat_id: ChatId,
        deck_name: &str,
        scores: ScoreBoard,
    ) -> Result<Arc<Session>, SessionError> {
        // Fail fast before loading the deck; the entry check below is the
        // authoritative one.
        if self.sessions.contains_key(&chat_id) {
            return Err(SessionError::Duplicate(chat_id));
        }
        let deck = self.decks.open(deck_name)?;
        self.insert(chat_id, deck, scores)
    }

    /// Register a session over an already opened deck.
    pub fn insert(
        &self,
        chat_id: ChatId,
        deck: Box<dyn Deck>,
        scores: ScoreBoard,
    ) -> Result<Arc<Session>, SessionError> {
        match self.sessions.entry(chat_id) {
            Entry::Occupied(_) => Err(SessionError::Duplicate(chat_id)),
            Entry::Vacant(slot) => {
                let session = Session::new(chat_id, deck, scores, self.defaults);
                slot.insert(Arc::clone(&session));
                debug!(chat_id, deck = session.deck_name(), "session registered");
                Ok(session)
            }
        }
    }

    /// Borrow the live session of `chat_id`. The handle keeps the session
    /// alive until it is released with [`SessionRegistry::put`] or dropped.
    pub fn get(&self, chat_id: ChatId) -> Option<Arc<Session>> {
        self.sessions
            .get(&chat_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Release a handle obtained from [`SessionRegistry::get`].
    pub fn put(&self, session: Arc<Session>) {
        drop(session);
    }

    /// Deregister the session of `chat_id`. Returns whether one was registered.
    pub fn remove(&self, chat_id: ChatId) -> bool {
        let removed = self.sessions.remove(&chat_id).is_some();
        if removed {
            debug!(chat_id, "session deregistered");
        }
        removed
    }

    /// Deregister `chat_id` only while it still maps to `session`.
    pub fn remove_if_same(&self, chat_id: ChatId, session: &Weak<Session>) -> bool {
        self.sessions
            .remove_if(&chat_id, |_, live| {
                std::ptr::eq(Arc::as_ptr(live), session.as_ptr())
            })
            .is_some()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Chat ids with a live session, in no particular order.
    pub fn chat_ids(&self) -> Vec<ChatId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }
}
