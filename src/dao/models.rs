use serde::{Deserialize, Serialize};

use crate::state::scoreboard::{ParticipantId, Score, ScoreBoard};

/// Durable checkpoint of a session: enough to resume it after a restart.
///
/// The in-flight card is not part of it; a resumed session starts at
/// the next undrawn card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Chat the session runs in.
    pub chat_id: i64,
    /// Deck the session was created with.
    pub deck_name: String,
    /// Scores in scoreboard insertion order.
    pub scores: Vec<ScoreEntity>,
}

/// One scoreboard row as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntity {
    /// Participant identifier.
    pub user_id: ParticipantId,
    /// Display name shown in rankings.
    pub full_name: String,
    /// Platform username, possibly empty.
    pub username: String,
    /// Accumulated points.
    pub point: u32,
}

impl SessionSnapshot {
    /// Capture the durable part of a running session.
    pub fn capture(chat_id: i64, deck_name: &str, scores: &ScoreBoard) -> Self {
        Self {
            chat_id,
            deck_name: deck_name.to_owned(),
            scores: scores
                .iter()
                .map(|(user_id, score)| ScoreEntity {
                    user_id,
                    full_name: score.full_name.clone(),
                    username: score.username.clone(),
                    point: score.point,
                })
                .collect(),
        }
    }

    /// Rebuild the scoreboard, preserving the persisted order.
    pub fn scoreboard(&self) -> ScoreBoard {
        let mut board = ScoreBoard::new();
        for entity in &self.scores {
            board.restore(
                entity.user_id,
                Score {
                    point: entity.point,
                    full_name: entity.full_name.clone(),
                    username: entity.username.clone(),
                },
            );
        }
        board
    }
}
