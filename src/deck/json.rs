use std::{fs, path::Path, sync::Arc};

use serde::Deserialize;

use super::{Card, Deck, DeckError, ShuffledCards};

/// Deck loaded from a JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonDeck {
    name: String,
    cards: ShuffledCards,
}

#[derive(Debug, Deserialize)]
struct RawDeck {
    cards: Vec<RawCard>,
}

#[derive(Debug, Deserialize)]
struct RawCard {
    question: String,
    #[serde(default)]
    question_info: String,
    #[serde(default)]
    answer_info: String,
    answers: Vec<String>,
}

impl From<RawCard> for Card {
    fn from(value: RawCard) -> Self {
        Card::new(
            value.question,
            value.question_info,
            value.answer_info,
            value.answers,
        )
    }
}

impl JsonDeck {
    /// Read and parse the deck stored at `path`.
    pub fn load(name: impl Into<String>, path: &Path) -> Result<Self, DeckError> {
        let name = name.into();
        let contents = fs::read_to_string(path).map_err(|source| DeckError::Read {
            name: name.clone(),
            source,
        })?;
        Self::from_json(name, &contents)
    }

    /// Parse a deck document held in memory.
    pub fn from_json(name: impl Into<String>, contents: &str) -> Result<Self, DeckError> {
        let name = name.into();
        let raw: RawDeck = serde_json::from_str(contents).map_err(|source| DeckError::Parse {
            name: name.clone(),
            source,
        })?;

        let cards = raw.cards.into_iter().map(Card::from).collect::<Vec<_>>();
        if cards.is_empty() {
            return Err(DeckError::Empty(name));
        }

        Ok(Self {
            name,
            cards: ShuffledCards::new(cards),
        })
    }
}

impl Deck for JsonDeck {
    fn name(&self) -> &str {
        &self.name
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
