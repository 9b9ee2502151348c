//! Fakes shared by unit tests across modules.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicI64, Ordering},
    },
    time::Duration,
};

use futures::future::{self, BoxFuture};
use tokio::{
    sync::mpsc,
    time::{Instant, timeout},
};

use crate::{
    dao::snapshot_store::MemorySnapshotStore,
    deck::{Card, Deck, DeckCatalog, ShuffledCards},
    services::{
        messenger::{
            ChatId, MessageId, Messenger, MessengerError, OutgoingPhoto, OutgoingText,
        },
        renderer::{ImageRenderer, RenderError},
    },
    state::{
        registry::SessionRegistry,
        scoreboard::Participant,
        session::{IncomingAnswer, SessionContext, SessionSettings},
    },
};

/// Deck of `count` cards: question `qN`, accepted answer `aN`.
pub(crate) fn numbered_deck(count: usize) -> Box<dyn Deck> {
    let cards = (1..=count)
        .map(|i| {
            Card::new(
                format!("q{i}"),
                format!("card {i}"),
                format!("answer is a{i}"),
                [format!("a{i}")],
            )
        })
        .collect();
    Box::new(NumberedDeck {
        cards: ShuffledCards::new(cards),
    })
}

struct NumberedDeck {
    cards: ShuffledCards,
}

impl Deck for NumberedDeck {
    fn name(&self) -> &str {
        "numbered"
    }

    fn shuffle(&mut self) {
        self.cards.shuffle();
    }

    fn draw(&mut self) -> Option<Arc<Card>> {
        self.cards.draw()
    }

    fn is_finished(&self) -> bool {
        self.cards.is_finished()
    }

    fn len(&self) -> usize {
        self.cards.len()
    }
}

pub(crate) fn participant(id: i64, full_name: &str) -> Participant {
    Participant {
        id,
        full_name: full_name.into(),
        username: String::new(),
    }
}

pub(crate) fn answer(id: i64, full_name: &str, text: &str, message_id: MessageId) -> IncomingAnswer {
    IncomingAnswer {
        participant: participant(id, full_name),
        text: text.into(),
        message_id: Some(message_id),
    }
}

/// Something a session handed to the messenger.
#[derive(Debug, Clone)]
pub(crate) enum Sent {
    Text(OutgoingText),
    Photo(OutgoingPhoto),
}

#[derive(Debug, Clone)]
pub(crate) struct Delivery {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub at: Instant,
    pub sent: Sent,
}

impl Delivery {
    /// Body of a text message; panics on photos.
    pub fn text(&self) -> &OutgoingText {
        match &self.sent {
            Sent::Text(text) => text,
            Sent::Photo(photo) => panic!("expected a text message, got photo {photo:?}"),
        }
    }

    /// Photo payload; panics on texts.
    pub fn photo(&self) -> &OutgoingPhoto {
        match &self.sent {
            Sent::Photo(photo) => photo,
            Sent::Text(text) => panic!("expected a photo, got text {text:?}"),
        }
    }

    /// Accepted answer for the numbered-deck question shown in this photo.
    pub fn expected_answer(&self) -> String {
        let question = self
            .photo()
            .url
            .strip_prefix(RENDER_SCHEME)
            .unwrap_or_default();
        question.replacen('q', "a", 1)
    }
}

/// Messenger forwarding every delivery to a channel read by the test.
pub(crate) struct RecordingMessenger {
    next_id: AtomicI64,
    fail_photos: AtomicBool,
    fail_texts: AtomicBool,
    deliveries: mpsc::UnboundedSender<Delivery>,
}

impl RecordingMessenger {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let messenger = Arc::new(Self {
            next_id: AtomicI64::new(1000),
            fail_photos: AtomicBool::new(false),
            fail_texts: AtomicBool::new(false),
            deliveries: tx,
        });
        (messenger, rx)
    }

    pub fn fail_photos(&self) {
        self.fail_photos.store(true, Ordering::SeqCst);
    }

    pub fn fail_texts(&self) {
        self.fail_texts.store(true, Ordering::SeqCst);
    }

    fn record(&self, chat_id: ChatId, sent: Sent) -> MessageId {
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.deliveries.send(Delivery {
            chat_id,
            message_id,
            at: Instant::now(),
            sent,
        });
        message_id
    }
}

impl Messenger for RecordingMessenger {
    fn send_message(
        &self,
        chat_id: ChatId,
        message: OutgoingText,
    ) -> BoxFuture<'static, Result<MessageId, MessengerError>> {
        if self.fail_texts.load(Ordering::SeqCst) {
            return Box::pin(future::ready(Err(MessengerError::Rejected {
                method: "sendMessage",
                description: "message rejected".into(),
            })));
        }
        let message_id = self.record(chat_id, Sent::Text(message));
        Box::pin(future::ready(Ok(message_id)))
    }

    fn send_photo(
        &self,
        chat_id: ChatId,
        photo: OutgoingPhoto,
    ) -> BoxFuture<'static, Result<MessageId, MessengerError>> {
        if self.fail_photos.load(Ordering::SeqCst) {
            return Box::pin(future::ready(Err(MessengerError::Rejected {
                method: "sendPhoto",
                description: "photo rejected".into(),
            })));
        }
        let message_id = self.record(chat_id, Sent::Photo(photo));
        Box::pin(future::ready(Ok(message_id)))
    }
}

const RENDER_SCHEME: &str = "render://";

/// Renderer answering `render://<question>` without any I/O.
#[derive(Default)]
pub(crate) struct ScriptedRenderer {
    failing: AtomicBool,
}

impl ScriptedRenderer {
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

impl ImageRenderer for ScriptedRenderer {
    fn render(&self, text: String) -> BoxFuture<'static, Result<String, RenderError>> {
        let result = if self.failing.load(Ordering::SeqCst) {
            Err(RenderError::MissingAsset)
        } else {
            Ok(format!("{RENDER_SCHEME}{text}"))
        };
        Box::pin(future::ready(result))
    }
}

/// Registry plus fake collaborators wired together.
pub(crate) struct Harness {
    pub registry: Arc<SessionRegistry>,
    pub store: MemorySnapshotStore,
    pub messenger: Arc<RecordingMessenger>,
    pub renderer: Arc<ScriptedRenderer>,
    deliveries: mpsc::UnboundedReceiver<Delivery>,
}

impl Harness {
    pub fn new(settings: SessionSettings) -> Self {
        let (messenger, deliveries) = RecordingMessenger::new();
        Self {
            registry: Arc::new(SessionRegistry::new(
                DeckCatalog::new("does-not-exist"),
                settings,
            )),
            store: MemorySnapshotStore::new(),
            messenger,
            renderer: Arc::new(ScriptedRenderer::default()),
            deliveries,
        }
    }

    pub fn context(&self) -> SessionContext {
        SessionContext {
            registry: Arc::clone(&self.registry),
            store: Arc::new(self.store.clone()),
            messenger: self.messenger.clone(),
            renderer: self.renderer.clone(),
        }
    }

    /// Next delivery; fails instead of hanging when none ever comes.
    pub async fn next(&mut self) -> Delivery {
        timeout(Duration::from_secs(24 * 3600), self.deliveries.recv())
            .await
            .expect("no delivery before the guard timeout")
            .expect("messenger dropped")
    }

    /// Whether a delivery is already queued.
    pub fn has_pending(&mut self) -> bool {
        !self.deliveries.is_empty()
    }
}
