use thiserror::Error;

/// High-level phases a quiz session goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Registered but the worker has not started yet.
    Idle,
    /// Worker active, about to draw the next card.
    Running,
    /// A card has been shown and the worker waits for a correct answer.
    AwaitingAnswer,
    /// The current card was answered correctly.
    Answered,
    /// Nobody answered the current card in time.
    TimedOut,
    /// Pause between two cards.
    Delay,
    /// Deck exhausted, stop requested, or a collaborator failed.
    Finished,
}

impl SessionPhase {
    /// Stable lowercase name used in API payloads and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Running => "running",
            SessionPhase::AwaitingAnswer => "awaiting_answer",
            SessionPhase::Answered => "answered",
            SessionPhase::TimedOut => "timed_out",
            SessionPhase::Delay => "delay",
            SessionPhase::Finished => "finished",
        }
    }
}

/// Indicates why a session left its card loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Every card of the deck was played.
    DeckExhausted,
    /// Someone requested the session to stop.
    Stopped,
    /// Rendering or sending the question failed.
    CollaboratorFailure,
}

/// Events the worker applies to its session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Worker task started.
    Start,
    /// A card was rendered and sent to the chat.
    CardShown,
    /// A participant answered the current card correctly.
    AnswerAccepted,
    /// The answer timeout elapsed.
    TimeElapsed,
    /// The inter-card pause began.
    DelayStarted,
    /// Move on to the next card.
    NextCard,
    /// Leave the card loop.
    Finish(FinishReason),
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// State machine tracking where a session worker is in its card loop.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
    version: usize,
    finish_reason: Option<FinishReason>,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            version: 0,
            finish_reason: None,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine initialised in the idle phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Number of transitions applied so far.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Why the session finished, once it has.
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    /// Apply `event`, returning the new phase.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        if let SessionEvent::Finish(reason) = event {
            self.finish_reason = Some(reason);
        }
        self.phase = next;
        self.version += 1;
        Ok(next)
    }

    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        use SessionPhase::*;

        let next = match (self.phase, event) {
            (Idle, SessionEvent::Start) => Running,
            (Running, SessionEvent::CardShown) => AwaitingAnswer,
            (AwaitingAnswer, SessionEvent::AnswerAccepted) => Answered,
            (AwaitingAnswer, SessionEvent::TimeElapsed) => TimedOut,
            (Answered | TimedOut, SessionEvent::DelayStarted) => Delay,
            (Answered | TimedOut | Delay, SessionEvent::NextCard) => Running,
            (Finished, SessionEvent::Finish(_)) | (_, SessionEvent::Start) => {
                return Err(InvalidTransition {
                    from: self.phase,
                    event,
                });
            }
            (_, SessionEvent::Finish(_)) => Finished,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut SessionStateMachine, event: SessionEvent) -> SessionPhase {
        sm.apply(event).unwrap()
    }

    #[test]
    fn initial_state_is_idle() {
        let sm = SessionStateMachine::new();
        assert_eq!(sm.phase(), SessionPhase::Idle);
        assert_eq!(sm.version(), 0);
    }

    #[test]
    fn answered_card_then_timed_out_card_then_finish() {
        let mut sm = SessionStateMachine::new();

        assert_eq!(apply(&mut sm, SessionEvent::Start), SessionPhase::Running);
        assert_eq!(
            apply(&mut sm, SessionEvent::CardShown),
            SessionPhase::AwaitingAnswer
        );
        assert_eq!(
            apply(&mut sm, SessionEvent::AnswerAccepted),
            SessionPhase::Answered
        );
        assert_eq!(apply(&mut sm, SessionEvent::DelayStarted), SessionPhase::Delay);
        assert_eq!(apply(&mut sm, SessionEvent::NextCard), SessionPhase::Running);
        assert_eq!(
            apply(&mut sm, SessionEvent::CardShown),
            SessionPhase::AwaitingAnswer
        );
        assert_eq!(
            apply(&mut sm, SessionEvent::TimeElapsed),
            SessionPhase::TimedOut
        );
        assert_eq!(
            apply(&mut sm, SessionEvent::Finish(FinishReason::DeckExhausted)),
            SessionPhase::Finished
        );

        assert_eq!(sm.version(), 8);
        assert_eq!(sm.finish_reason(), Some(FinishReason::DeckExhausted));
    }

    #[test]
    fn stop_while_awaiting_answer_finishes() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::Start);
        apply(&mut sm, SessionEvent::CardShown);

        assert_eq!(
            apply(&mut sm, SessionEvent::Finish(FinishReason::Stopped)),
            SessionPhase::Finished
        );
    }

    #[test]
    fn answer_is_rejected_outside_await() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::Start);

        let err = sm.apply(SessionEvent::AnswerAccepted).unwrap_err();
        assert_eq!(err.from, SessionPhase::Running);
        assert_eq!(err.event, SessionEvent::AnswerAccepted);
        assert_eq!(sm.phase(), SessionPhase::Running);
    }

    #[test]
    fn finished_is_terminal() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::Finish(FinishReason::CollaboratorFailure));

        assert!(sm.apply(SessionEvent::Start).is_err());
        assert!(
            sm.apply(SessionEvent::Finish(FinishReason::Stopped))
                .is_err()
        );
        assert_eq!(
            sm.finish_reason(),
            Some(FinishReason::CollaboratorFailure)
        );
    }
}
