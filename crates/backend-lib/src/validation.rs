// ============================
// taskchat-backend-lib/src/validation.rs
// ============================
//! Typed validation of inbound chat payloads.
//!
//! The original client could emit a `sendMessage` with missing fields and the
//! server would happily persist a partial record. Here every send is checked
//! before it touches the store; a rejected payload never reaches a room.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

// Validation constants
const MAX_CONVERSATION_ID_LENGTH: usize = 64;
const MAX_SENDER_LENGTH: usize = 64;
const MAX_TEXT_LENGTH: usize = 4096;

static CONVERSATION_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Possible validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing conversation id")]
    MissingConversationId,

    #[error("Invalid conversation id: {0}")]
    InvalidConversationId(String),

    #[error("Missing sender")]
    MissingSender,

    #[error("Sender too long ({0} chars)")]
    SenderTooLong(usize),

    #[error("Missing text")]
    MissingText,

    #[error("Text too long ({0} chars)")]
    TextTooLong(usize),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a conversation identifier used as a room key.
pub fn validate_conversation_id(conversation_id: &str) -> ValidationResult<&str> {
    if conversation_id.is_empty() {
        return Err(ValidationError::MissingConversationId);
    }

    if conversation_id.len() > MAX_CONVERSATION_ID_LENGTH
        || !CONVERSATION_ID_REGEX.is_match(conversation_id)
    {
        return Err(ValidationError::InvalidConversationId(
            conversation_id.to_string(),
        ));
    }

    Ok(conversation_id)
}

/// Validate a full `sendMessage` payload before persistence.
pub fn validate_send_message(
    conversation_id: &str,
    sender: &str,
    text: &str,
) -> ValidationResult<()> {
    validate_conversation_id(conversation_id)?;

    if sender.is_empty() {
        return Err(ValidationError::MissingSender);
    }
    let sender_chars = sender.chars().count();
    if sender_chars > MAX_SENDER_LENGTH {
        return Err(ValidationError::SenderTooLong(sender_chars));
    }

    if text.is_empty() {
        return Err(ValidationError::MissingText);
    }
    let text_chars = text.chars().count();
    if text_chars > MAX_TEXT_LENGTH {
        return Err(ValidationError::TextTooLong(text_chars));
    }

    Ok(())
}
