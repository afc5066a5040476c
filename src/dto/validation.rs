//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::join::JoinError;

/// Longest raw alias input accepted before trimming.
pub const MAX_ALIAS_INPUT_CHARS: usize = 64;
/// Longest key name accepted by the reveal detector.
pub const MAX_KEY_NAME_CHARS: usize = 32;

/// Validates that a raw alias input stays within [`MAX_ALIAS_INPUT_CHARS`].
///
/// Domain rules (empty, too short, duplicates, 30-character cap) are applied
/// later on the trimmed value; this only bounds what reaches them.
pub fn validate_alias_input(alias: &str) -> Result<(), ValidationError> {
    let length = alias.chars().count();
    if length > MAX_ALIAS_INPUT_CHARS {
        let mut err = ValidationError::new("alias_too_long");
        err.message = Some(JoinError::AliasTooLong.to_string().into());
        err.add_param("length".into(), &length);
        return Err(err);
    }
    Ok(())
}

/// Validates a key name as reported by browsers (`a`, `ArrowUp`, ...).
///
/// # Examples
///
/// ```ignore
/// validate_key_name("ArrowUp") // Ok
/// validate_key_name("")        // Err - empty
/// validate_key_name("a b")     // Err - whitespace
/// ```
pub fn validate_key_name(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() || key.chars().count() > MAX_KEY_NAME_CHARS {
        let mut err = ValidationError::new("invalid_key");
        err.message =
            Some(format!("Key name must be 1 to {MAX_KEY_NAME_CHARS} characters").into());
        return Err(err);
    }

    if key.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("invalid_key");
        err.message = Some("Key name must not contain whitespace".into());
        return Err(err);
    }

    Ok(())
}
