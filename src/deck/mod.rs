//! Quiz cards and the decks that hand them out to a session.

mod catalog;
mod json;
mod tozai_line;

use std::sync::Arc;

use rand::seq::SliceRandom;
use thiserror::Error;

pub use self::catalog::{DeckCatalog, is_valid_deck_name};
pub use self::json::JsonDeck;
pub use self::tozai_line::{TOZAI_LINE_DECK, TozaiLineDeck};

/// Failures raised while locating or loading a deck.
#[derive(Debug, Error)]
pub enum DeckError {
    /// No built-in or on-disk deck is registered under this name.
    #[error("unknown deck `{0}`")]
    Unknown(String),
    /// Deck names are restricted to ASCII alphanumerics, `_` and `-`.
    #[error("invalid deck name `{0}`")]
    InvalidName(String),
    /// The deck file exists but could not be read.
    #[error("failed to read deck `{name}`")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
    /// The deck file is not a valid deck document.
    #[error("failed to parse deck `{name}`")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    /// A session cannot be played with zero cards.
    #[error("deck `{0}` has no cards")]
    Empty(String),
}

/// One quiz item. Cards are immutable once loaded and shared with the
/// answer path through an [`Arc`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    question: String,
    question_info: String,
    answer_info: String,
    answers: Vec<String>,
}

impl Card {
    /// Build a card accepting any of `answers` (compared after normalization).
    pub fn new(
        question: impl Into<String>,
        question_info: impl Into<String>,
        answer_info: impl Into<String>,
        answers: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        Self {
            question: question.into(),
            question_info: question_info.into(),
            answer_info: answer_info.into(),
            answers: answers
                .into_iter()
                .map(|answer| normalize_answer(answer.as_ref()))
                .filter(|answer| !answer.is_empty())
                .collect(),
        }
    }

    /// Text rendered into the question image.
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Caption shown together with the question image.
    pub fn question_info(&self) -> &str {
        &self.question_info
    }

    /// Explanation revealed once the card is resolved.
    pub fn answer_info(&self) -> &str {
        &self.answer_info
    }

    /// Whether `text` is an accepted answer for this card.
    pub fn is_correct(&self, text: &str) -> bool {
        let candidate = normalize_answer(text);
        !candidate.is_empty() && self.answers.iter().any(|answer| *answer == candidate)
    }
}

/// Lowercase and strip whitespace and hyphens so "Monzen-nakacho" and
/// "monzen nakacho" compare equal.
fn normalize_answer(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Ordered, shufflable source of cards owned by exactly one session.
///
/// After [`Deck::shuffle`], [`Deck::is_finished`] stays `false` until exactly
/// [`Deck::len`] successful [`Deck::draw`] calls have been made.
pub trait Deck: Send + Sync {
    /// Name the deck was selected by; persisted in session snapshots.
    fn name(&self) -> &str;
    /// Randomize the presentation order and rewind the cursor.
    fn shuffle(&mut self);
    /// Hand out the next card, or `None` once the deck is exhausted.
    fn draw(&mut self) -> Option<Arc<Card>>;
    /// Whether every card has been drawn.
    fn is_finished(&self) -> bool;
    /// Total number of cards in the deck.
    fn len(&self) -> usize;
    /// Whether the deck holds no cards at all.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Card storage plus a cursor over a permutation of it, shared by the
/// concrete deck variants.
#[derive(Debug, Clone)]
pub(crate) struct ShuffledCards {
    cards: Vec<Arc<Card>>,
    order: Vec<usize>,
    cursor: usize,
}

impl ShuffledCards {
    pub(crate) fn new(cards: Vec<Card>) -> Self {
        let order = (0..cards.len()).collect();
        Self {
            cards: cards.into_iter().map(Arc::new).collect(),
            order,
            cursor: 0,
        }
    }

    pub(crate) fn shuffle(&mut self) {
        self.order.shuffle(&mut rand::rng());
        self.cursor = 0;
    }

    pub(crate) fn draw(&mut self) -> Option<Arc<Card>> {
        let index = *self.order.get(self.cursor)?;
        let card = self.cards.get(index).cloned()?;
        self.cursor += 1;
        Some(card)
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.cursor >= self.order.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.cards.len()
    }
}
