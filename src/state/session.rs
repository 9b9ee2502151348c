//! Per-chat quiz session: shared control state plus the worker task that
//! drives the card loop.
//!
//! The worker is the only code touching the deck and the scoreboard. Every
//! other caller (answer delivery, stop, reconfiguration) goes through
//! [`Control`], guarded by one mutex, and wakes the worker through one
//! [`Notify`] that serves both the await-answer and the inter-card waits.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use thiserror::Error;
use tokio::{
    runtime::Handle,
    sync::Notify,
    task::JoinHandle,
    time::{Instant, timeout_at},
};
use tracing::{debug, info, warn};

use crate::{
    dao::{models::SessionSnapshot, snapshot_store::SnapshotStore},
    deck::{Card, Deck, DeckError},
    services::{
        messenger::{ChatId, MessageId, Messenger, OutgoingPhoto, OutgoingText, ParseMode},
        renderer::ImageRenderer,
    },
    state::{
        registry::SessionRegistry,
        scoreboard::{Participant, ScoreBoard},
        state_machine::{FinishReason, SessionEvent, SessionPhase, SessionStateMachine},
    },
};

/// Errors raised while creating or starting a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A live session already exists for this chat.
    #[error("a session is already running in chat {0}")]
    Duplicate(ChatId),
    /// The requested deck could not be opened.
    #[error(transparent)]
    Deck(#[from] DeckError),
    /// The worker task could not be spawned.
    #[error("failed to start session worker: {0}")]
    WorkerStart(String),
}

/// Answer and delay durations applied to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// How long a card waits for a correct answer.
    pub timeout: Duration,
    /// Pause between a resolved card and the next one.
    pub next_delay: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            next_delay: Duration::from_secs(5),
        }
    }
}

/// Text received in a chat while a session may be running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingAnswer {
    /// Who sent the text.
    pub participant: Participant,
    /// Raw message text.
    pub text: String,
    /// Message carrying the answer, used to thread the reply.
    pub message_id: Option<MessageId>,
}

/// Answer accepted for the current card, waiting to be credited by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedAnswer {
    /// Participant to credit.
    pub participant: Participant,
    /// Message carrying the answer.
    pub message_id: Option<MessageId>,
}

/// Why a session wait returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeReason {
    /// A correct answer cleared the current card.
    Answered(AcceptedAnswer),
    /// The wait duration elapsed.
    TimedOut,
    /// Timeout or delay changed with immediate effect; the deadline must be
    /// recomputed.
    Reconfigured,
    /// Stop was requested.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitPhase {
    Answer,
    Delay,
}

/// Final outcome of a wait once reconfigurations are absorbed.
#[derive(Debug)]
enum Resolution {
    Answered(AcceptedAnswer),
    TimedOut,
    Stopped,
}

/// Read-only view of a session's control state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Chat the session runs in.
    pub chat_id: ChatId,
    /// Deck being played.
    pub deck_name: String,
    /// Current phase of the card loop.
    pub phase: SessionPhase,
    /// Number of phase transitions so far.
    pub version: usize,
    /// Current answer timeout.
    pub timeout: Duration,
    /// Current inter-card delay.
    pub next_delay: Duration,
    /// Whether a card is waiting for its answer.
    pub awaiting_answer: bool,
    /// Whether stop was requested.
    pub stop_requested: bool,
}

/// Fields shared between the worker and external callers.
struct Control {
    machine: SessionStateMachine,
    current_card: Option<Arc<Card>>,
    accepted: Option<AcceptedAnswer>,
    stop_requested: bool,
    reconfigured: bool,
    timeout: Duration,
    next_delay: Duration,
    last_message_id: Option<MessageId>,
}

impl Control {
    fn take_wake_reason(&mut self) -> Option<WakeReason> {
        if let Some(answer) = self.accepted.take() {
            return Some(WakeReason::Answered(answer));
        }
        if self.stop_requested {
            return Some(WakeReason::Stopped);
        }
        if std::mem::take(&mut self.reconfigured) {
            return Some(WakeReason::Reconfigured);
        }
        None
    }

    fn wait_duration(&self, phase: WaitPhase) -> Duration {
        match phase {
            WaitPhase::Answer => self.timeout,
            WaitPhase::Delay => self.next_delay,
        }
    }

    fn apply(&mut self, chat_id: ChatId, event: SessionEvent) {
        match self.machine.apply(event) {
            Ok(phase) => debug!(chat_id, phase = phase.as_str(), "session phase changed"),
            Err(err) => warn!(chat_id, error = %err, "ignoring invalid session transition"),
        }
    }
}

/// Deck and scoreboard waiting for the worker to take ownership.
struct Parts {
    deck: Box<dyn Deck>,
    scores: ScoreBoard,
}

/// Collaborators a session worker talks to.
#[derive(Clone)]
pub struct SessionContext {
    /// Registry the session deregisters from when it finishes.
    pub registry: Arc<SessionRegistry>,
    /// Where checkpoints are written.
    pub store: Arc<dyn SnapshotStore>,
    /// Outbound chat transport.
    pub messenger: Arc<dyn Messenger>,
    /// Question image renderer.
    pub renderer: Arc<dyn ImageRenderer>,
}

/// Live quiz game for one chat.
///
/// Handles are plain [`Arc`]s: the registry keeps one while the session is
/// live, the worker keeps one while it runs, and borrowers obtained through
/// [`SessionRegistry::get`] keep theirs until released. The session is
/// dropped when the last of them goes away.
pub struct Session {
    chat_id: ChatId,
    deck_name: String,
    control: Mutex<Control>,
    wake: Notify,
    parts: Mutex<Option<Parts>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("chat_id", &self.chat_id)
            .field("deck_name", &self.deck_name)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Build an idle session owning `deck` and `scores`.
    pub(crate) fn new(
        chat_id: ChatId,
        deck: Box<dyn Deck>,
        scores: ScoreBoard,
        settings: SessionSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            chat_id,
            deck_name: deck.name().to_owned(),
            control: Mutex::new(Control {
                machine: SessionStateMachine::new(),
                current_card: None,
                accepted: None,
                stop_requested: false,
                reconfigured: false,
                timeout: settings.timeout,
                next_delay: settings.next_delay,
                last_message_id: None,
            }),
            wake: Notify::new(),
            parts: Mutex::new(Some(Parts { deck, scores })),
        })
    }

    /// Chat the session runs in.
    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    /// Name of the deck being played.
    pub fn deck_name(&self) -> &str {
        &self.deck_name
    }

    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the control state.
    pub fn status(&self) -> SessionStatus {
        let control = self.lock_control();
        SessionStatus {
            chat_id: self.chat_id,
            deck_name: self.deck_name.clone(),
            phase: control.machine.phase(),
            version: control.machine.version(),
            timeout: control.timeout,
            next_delay: control.next_delay,
            awaiting_answer: control.current_card.is_some(),
            stop_requested: control.stop_requested,
        }
    }

    /// Spawn the worker on the current tokio runtime.
    ///
    /// Fails when the worker was already started or no runtime is available;
    /// the caller is then responsible for deregistering the session.
    pub fn start(self: &Arc<Self>, context: SessionContext) -> Result<JoinHandle<()>, SessionError> {
        let runtime = Handle::try_current()
            .map_err(|err| SessionError::WorkerStart(err.to_string()))?;

        let Parts { deck, scores } = self
            .parts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| SessionError::WorkerStart("worker already started".into()))?;

        let worker = SessionWorker {
            session: Arc::clone(self),
            deck,
            scores,
            context,
        };
        Ok(runtime.spawn(worker.run()))
    }

    /// Offer `incoming` as the answer to the current card.
    ///
    /// Returns `true` when it was the first correct answer; the card is
    /// cleared at once so later replies to the same question are ignored.
    pub fn answer(&self, incoming: IncomingAnswer) -> bool {
        let mut control = self.lock_control();
        let correct = control
            .current_card
            .as_ref()
            .is_some_and(|card| card.is_correct(&incoming.text));
        if !correct {
            return false;
        }

        control.current_card = None;
        control.accepted = Some(AcceptedAnswer {
            participant: incoming.participant,
            message_id: incoming.message_id,
        });
        drop(control);

        self.wake.notify_one();
        true
    }

    /// Ask the worker to finish after its current step.
    pub fn stop(&self) {
        self.lock_control().stop_requested = true;
        self.wake.notify_one();
    }

    /// Change the answer timeout. With `apply_immediately`, a pending wait
    /// re-evaluates its deadline against the new value.
    pub fn set_timeout(&self, timeout: Duration, apply_immediately: bool) {
        self.reconfigure(apply_immediately, |control| control.timeout = timeout);
    }

    /// Change the inter-card delay. With `apply_immediately`, a pending wait
    /// re-evaluates its deadline against the new value.
    pub fn set_next_delay(&self, next_delay: Duration, apply_immediately: bool) {
        self.reconfigure(apply_immediately, |control| control.next_delay = next_delay);
    }

    fn reconfigure(&self, apply_immediately: bool, update: impl FnOnce(&mut Control)) {
        let mut control = self.lock_control();
        update(&mut control);
        if !apply_immediately {
            return;
        }
        control.reconfigured = true;
        drop(control);
        self.wake.notify_one();
    }

    /// Wait until something wakes the worker or the phase deadline, measured
    /// from `started`, passes.
    ///
    /// Timing out of an answer wait clears the current card under the same
    /// lock that decides the outcome, so a late answer cannot be credited.
    async fn wait(&self, phase: WaitPhase, started: Instant) -> WakeReason {
        loop {
            let deadline = {
                let mut control = self.lock_control();
                if let Some(reason) = control.take_wake_reason() {
                    return reason;
                }
                deadline_after(started, control.wait_duration(phase))
            };

            if timeout_at(deadline, self.wake.notified()).await.is_ok() {
                continue;
            }

            let mut control = self.lock_control();
            if let Some(reason) = control.take_wake_reason() {
                return reason;
            }
            if phase == WaitPhase::Answer {
                control.current_card = None;
            }
            return WakeReason::TimedOut;
        }
    }

    /// [`Session::wait`], re-armed after every reconfiguration.
    async fn wait_resolved(&self, phase: WaitPhase, started: Instant) -> Resolution {
        loop {
            match self.wait(phase, started).await {
                WakeReason::Answered(answer) => return Resolution::Answered(answer),
                WakeReason::TimedOut => return Resolution::TimedOut,
                WakeReason::Stopped => return Resolution::Stopped,
                WakeReason::Reconfigured => {
                    debug!(chat_id = self.chat_id, ?phase, "wait reconfigured");
                }
            }
        }
    }
}

/// Instant `wait` after `started`, saturating to a far-future deadline.
fn deadline_after(started: Instant, wait: Duration) -> Instant {
    started
        .checked_add(wait)
        .unwrap_or_else(|| started + FAR_FUTURE)
}

/// Roughly thirty years, the same horizon tokio uses for "never".
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

impl Drop for Session {
    fn drop(&mut self) {
        debug!(chat_id = self.chat_id, "session released");
    }
}

/// Task state owned by the running worker.
struct SessionWorker {
    session: Arc<Session>,
    deck: Box<dyn Deck>,
    scores: ScoreBoard,
    context: SessionContext,
}

impl SessionWorker {
    async fn run(mut self) {
        let chat_id = self.session.chat_id;
        info!(chat_id, deck = %self.session.deck_name, "session worker started");

        self.session
            .lock_control()
            .apply(chat_id, SessionEvent::Start);
        self.deck.shuffle();

        let reason = self.play().await;
        self.finish(reason).await;
    }

    async fn play(&mut self) -> FinishReason {
        let chat_id = self.session.chat_id;

        loop {
            if self.session.lock_control().stop_requested {
                return FinishReason::Stopped;
            }
            if self.deck.is_finished() {
                return FinishReason::DeckExhausted;
            }
            let Some(card) = self.deck.draw() else {
                return FinishReason::DeckExhausted;
            };

            let shown_at = match self.present(&card).await {
                Ok(shown_at) => shown_at,
                Err(reason) => return reason,
            };

            match self.session.wait_resolved(WaitPhase::Answer, shown_at).await {
                Resolution::Answered(answer) => self.credit(&card, answer).await,
                Resolution::TimedOut => {
                    let reply_to = {
                        let mut control = self.session.lock_control();
                        control.apply(chat_id, SessionEvent::TimeElapsed);
                        control.last_message_id
                    };
                    self.notify(
                        OutgoingText::plain(format!("Time's up!\n\n{}", card.answer_info()))
                            .reply_to(reply_to),
                    )
                    .await;
                }
                Resolution::Stopped => return FinishReason::Stopped,
            }

            self.checkpoint().await;

            let stop_requested = self.session.lock_control().stop_requested;
            if !self.deck.is_finished() && !stop_requested {
                self.session
                    .lock_control()
                    .apply(chat_id, SessionEvent::DelayStarted);
                // Stop is picked up at the top of the loop; nothing else can
                // end a delay early.
                let _ = self
                    .session
                    .wait_resolved(WaitPhase::Delay, Instant::now())
                    .await;
            }

            self.session
                .lock_control()
                .apply(chat_id, SessionEvent::NextCard);
        }
    }

    /// Render and send `card`; on success it becomes the current card.
    async fn present(&mut self, card: &Arc<Card>) -> Result<Instant, FinishReason> {
        let chat_id = self.session.chat_id;

        let url = match self
            .context
            .renderer
            .render(card.question().to_owned())
            .await
        {
            Ok(url) => url,
            Err(err) => {
                warn!(chat_id, error = %err, "failed to render question");
                self.notify(OutgoingText::plain(
                    "Failed to generate image, stopping session...",
                ))
                .await;
                return Err(FinishReason::CollaboratorFailure);
            }
        };

        let (caption, reply_to) = {
            let control = self.session.lock_control();
            (
                format!(
                    "{}\n\nTimeout: {} seconds",
                    card.question_info(),
                    control.timeout.as_secs()
                ),
                control.last_message_id,
            )
        };

        let sent = self
            .context
            .messenger
            .send_photo(
                chat_id,
                OutgoingPhoto {
                    url,
                    caption,
                    reply_to,
                },
            )
            .await;

        match sent {
            Ok(message_id) => {
                let mut control = self.session.lock_control();
                control.last_message_id = Some(message_id);
                control.current_card = Some(Arc::clone(card));
                control.apply(chat_id, SessionEvent::CardShown);
                Ok(Instant::now())
            }
            Err(err) => {
                warn!(chat_id, error = %err, "failed to send question");
                self.notify(OutgoingText::plain(
                    "Failed to send image, stopping session...",
                ))
                .await;
                Err(FinishReason::CollaboratorFailure)
            }
        }
    }

    async fn credit(&mut self, card: &Card, answer: AcceptedAnswer) {
        let chat_id = self.session.chat_id;
        let point = self.scores.record_correct(&answer.participant);
        self.session
            .lock_control()
            .apply(chat_id, SessionEvent::AnswerAccepted);
        debug!(chat_id, participant = answer.participant.id, point, "answer credited");

        self.notify(
            OutgoingText::plain(format!(
                "Correct!\nYour point is: {point}\n\n{}",
                card.answer_info()
            ))
            .reply_to(answer.message_id),
        )
        .await;
    }

    async fn checkpoint(&self) {
        let snapshot =
            SessionSnapshot::capture(self.session.chat_id, &self.session.deck_name, &self.scores);
        if let Err(err) = self.context.store.save(snapshot).await {
            warn!(chat_id = self.session.chat_id, error = %err, "failed to checkpoint session");
        }
    }

    async fn notify(&self, text: OutgoingText) {
        if let Err(err) = self
            .context
            .messenger
            .send_message(self.session.chat_id, text)
            .await
        {
            warn!(chat_id = self.session.chat_id, error = %err, "failed to send message");
        }
    }

    /// Announce the ranking, then deregister and release the worker's handle.
    async fn finish(self, reason: FinishReason) {
        let chat_id = self.session.chat_id;

        let (unresolved, reply_to) = {
            let mut control = self.session.lock_control();
            control.apply(chat_id, SessionEvent::Finish(reason));
            (control.current_card.take(), control.last_message_id)
        };
        if let Some(card) = unresolved {
            self.notify(
                OutgoingText::plain(format!("Game is stopped!\n\n{}", card.answer_info()))
                    .reply_to(reply_to),
            )
            .await;
        }

        self.notify(
            OutgoingText::plain(finish_summary(&self.scores))
                .silent()
                .parse_mode(ParseMode::Html),
        )
        .await;

        // Snapshot goes before the registry entry that guards the chat id.
        if let Err(err) = self.context.store.remove(chat_id).await {
            warn!(chat_id, error = %err, "failed to remove session snapshot");
        }
        self.context.registry.remove(chat_id);

        info!(chat_id, ?reason, "session finished");
    }
}

/// HTML ranking sent when a session ends.
fn finish_summary(scores: &ScoreBoard) -> String {
    let mut summary = String::from("Session finished!\n\n");
    for (rank, (id, score)) in scores.rank().into_iter().enumerate() {
        let plural = if score.point > 1 { "s" } else { "" };
        summary.push_str(&format!(
            "{}. <a href=\"tg://user?id={id}\">{}</a>: {} point{plural}\n",
            rank + 1,
            escape_html(&score.full_name),
            score.point,
        ));
    }
    summary
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
