//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::deck::is_valid_deck_name;

/// Validates that a deck name only uses ASCII letters, digits, `_` and `-`.
///
/// # Examples
///
/// ```ignore
/// validate_deck_name("tozai_line") // Ok
/// validate_deck_name("../etc")     // Err - path characters
/// validate_deck_name("")           // Err - empty
/// ```
pub fn validate_deck_name(name: &str) -> Result<(), ValidationError> {
    if is_valid_deck_name(name) {
        return Ok(());
    }

    let mut err = ValidationError::new("deck_name_format");
    err.message = Some("Deck name must contain only ASCII letters, digits, '_' or '-'".into());
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_deck_name_valid() {
        assert!(validate_deck_name("tozai_line").is_ok());
        assert!(validate_deck_name("JLPT-N5").is_ok());
    }

    #[test]
    fn test_validate_deck_name_invalid() {
        assert!(validate_deck_name("").is_err());
        assert!(validate_deck_name("../etc").is_err());
        assert!(validate_deck_name("two words").is_err());
        assert!(validate_deck_name("東西線").is_err());
    }
}
