use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    dto::validation::validate_deck_name,
    services::messenger::{ChatId, MessageId},
    state::{
        scoreboard::{Participant, ParticipantId},
        session::{IncomingAnswer, SessionStatus},
    },
};

/// Payload starting a session in a chat.
#[derive(Debug, Deserialize, Validate)]
pub struct StartSessionRequest {
    /// Deck to play, see `GET /decks`.
    #[validate(length(max = 64), custom(function = validate_deck_name))]
    pub deck_name: String,
}

/// Payload changing the answer timeout.
#[derive(Debug, Deserialize, Validate)]
pub struct TimeoutRequest {
    #[validate(range(min = 1, max = 3600))]
    pub seconds: u64,
    /// Re-evaluate a pending answer wait against the new value.
    #[serde(default)]
    pub apply_immediately: bool,
}

/// Payload changing the inter-card delay.
#[derive(Debug, Deserialize, Validate)]
pub struct DelayRequest {
    #[validate(range(max = 3600))]
    pub seconds: u64,
    /// Re-evaluate a pending delay against the new value.
    #[serde(default)]
    pub apply_immediately: bool,
}

/// Chat text forwarded to the session of a chat.
#[derive(Debug, Deserialize, Validate)]
pub struct AnswerRequest {
    pub participant_id: ParticipantId,
    #[validate(length(min = 1, max = 256))]
    pub full_name: String,
    #[serde(default)]
    #[validate(length(max = 64))]
    pub username: String,
    #[validate(length(max = 4096))]
    pub text: String,
    #[serde(default)]
    pub message_id: Option<MessageId>,
}

impl From<AnswerRequest> for IncomingAnswer {
    fn from(value: AnswerRequest) -> Self {
        IncomingAnswer {
            participant: Participant {
                id: value.participant_id,
                full_name: value.full_name,
                username: value.username,
            },
            text: value.text,
            message_id: value.message_id,
        }
    }
}

/// Whether a forwarded answer was the first correct one.
#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub accepted: bool,
}

/// Externally visible state of a session.
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub chat_id: ChatId,
    pub deck_name: String,
    pub phase: &'static str,
    pub timeout_secs: u64,
    pub next_delay_secs: u64,
    pub awaiting_answer: bool,
    pub stop_requested: bool,
}

impl From<SessionStatus> for SessionStatusResponse {
    fn from(status: SessionStatus) -> Self {
        Self {
            chat_id: status.chat_id,
            deck_name: status.deck_name,
            phase: status.phase.as_str(),
            timeout_secs: status.timeout.as_secs(),
            next_delay_secs: status.next_delay.as_secs(),
            awaiting_answer: status.awaiting_answer,
            stop_requested: status.stop_requested,
        }
    }
}

/// Deck names a session can be started with.
#[derive(Debug, Serialize)]
pub struct DeckListResponse {
    pub decks: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_bounds_are_enforced() {
        let zero: TimeoutRequest = serde_json::from_str(r#"{"seconds": 0}"#).unwrap();
        assert!(zero.validate().is_err());
        assert!(!zero.apply_immediately);

        let ok: TimeoutRequest =
            serde_json::from_str(r#"{"seconds": 60, "apply_immediately": true}"#).unwrap();
        assert!(ok.validate().is_ok());

        let too_long: TimeoutRequest = serde_json::from_str(r#"{"seconds": 3601}"#).unwrap();
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn zero_delay_is_allowed() {
        let delay: DelayRequest = serde_json::from_str(r#"{"seconds": 0}"#).unwrap();
        assert!(delay.validate().is_ok());
    }

    #[test]
    fn deck_name_must_be_a_plain_identifier() {
        let bad: StartSessionRequest =
            serde_json::from_str(r#"{"deck_name": "../secrets"}"#).unwrap();
        assert!(bad.validate().is_err());

        let good: StartSessionRequest =
            serde_json::from_str(r#"{"deck_name": "tozai_line"}"#).unwrap();
        assert!(good.validate().is_ok());
    }

    #[test]
    fn answer_request_becomes_incoming_answer() {
        let request: AnswerRequest = serde_json::from_str(
            r#"{"participant_id": 7, "full_name": "Alice", "text": "kasai"}"#,
        )
        .unwrap();
        assert!(request.validate().is_ok());

        let incoming = IncomingAnswer::from(request);
        assert_eq!(incoming.participant.id, 7);
        assert_eq!(incoming.participant.username, "");
        assert_eq!(incoming.message_id, None);
    }
}
