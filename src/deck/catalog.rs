use std::{fs, path::PathBuf};

use tracing::{debug, warn};

use super::{Deck, DeckError, JsonDeck, TOZAI_LINE_DECK, TozaiLineDeck};

/// Resolves deck names to concrete deck variants.
///
/// Built-in decks take precedence; any other name is looked up as
/// `<directory>/<name>.json`.
#[derive(Debug, Clone)]
pub struct DeckCatalog {
    directory: PathBuf,
}

impl DeckCatalog {
    /// Catalog backed by JSON decks stored in `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Load a fresh, unshuffled instance of the deck called `name`.
    pub fn open(&self, name: &str) -> Result<Box<dyn Deck>, DeckError> {
        if !is_valid_deck_name(name) {
            return Err(DeckError::InvalidName(name.to_owned()));
        }

        if name == TOZAI_LINE_DECK {
            return Ok(Box::new(TozaiLineDeck::new()));
        }

        let path = self.directory.join(format!("{name}.json"));
        if !path.is_file() {
            return Err(DeckError::Unknown(name.to_owned()));
        }

        debug!(deck = name, path = %path.display(), "loading deck from disk");
        let deck = JsonDeck::load(name, &path)?;
        Ok(Box::new(deck))
    }

    /// Names of every deck that can currently be opened, built-ins first.
    pub fn available(&self) -> Vec<String> {
        let mut names = vec![TOZAI_LINE_DECK.to_owned()];

        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(
                    path = %self.directory.display(),
                    error = %err,
                    "deck directory not readable; only built-in decks available"
                );
                return names;
            }
        };

        let mut on_disk = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(err) => {
                    warn!(error = %err, "failed to read deck directory entry");
                    None
                }
            })
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_owned))
            .filter(|name| is_valid_deck_name(name) && name != TOZAI_LINE_DECK)
            .collect::<Vec<_>>();
        on_disk.sort();

        names.extend(on_disk);
        names
    }
}

/// Whether `name` may select a deck: non-empty ASCII letters, digits, `_` and `-`.
pub fn is_valid_deck_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_builtin_deck_without_directory() {
        let catalog = DeckCatalog::new("/nonexistent/decks");
        let deck = catalog.open(TOZAI_LINE_DECK).unwrap();
        assert_eq!(deck.name(), TOZAI_LINE_DECK);
        assert_eq!(catalog.available(), vec![TOZAI_LINE_DECK.to_owned()]);
    }

    #[test]
    fn rejects_path_traversal_names() {
        let catalog = DeckCatalog::new("decks");
        assert!(matches!(
            catalog.open("../secret"),
            Err(DeckError::InvalidName(_))
        ));
        assert!(matches!(catalog.open(""), Err(DeckError::InvalidName(_))));
    }

    #[test]
    fn opens_and_lists_json_decks() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("colors.json"),
            r#"{"cards": [{"question": "赤", "answers": ["aka"]}]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = DeckCatalog::new(dir.path());
        let deck = catalog.open("colors").unwrap();
        assert_eq!(deck.name(), "colors");
        assert_eq!(deck.len(), 1);

        assert_eq!(
            catalog.available(),
            vec![TOZAI_LINE_DECK.to_owned(), "colors".to_owned()]
        );
        assert!(matches!(catalog.open("missing"), Err(DeckError::Unknown(_))));
    }
}
