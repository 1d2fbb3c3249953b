use thiserror::Error;

/// Upper bound on a chat message, enforced at the HTTP boundary.
pub const MAX_MESSAGE_CHARS: usize = 500;

/// Minimum password length for new accounts.
pub const MIN_PASSWORD_CHARS: usize = 6;

/// Boundary validation failures. Every variant maps to a 4xx response at
/// the HTTP layer; none of them ever reaches the resolver.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Keyword cannot be empty")]
    EmptyKeyword,
    #[error("Response cannot be empty")]
    EmptyResponse,
    #[error("Message cannot be empty")]
    EmptyMessage,
    #[error("Message is too long (max {MAX_MESSAGE_CHARS} characters)")]
    MessageTooLong,
    #[error("Username cannot be empty")]
    EmptyUsername,
    #[error("Username already exists")]
    UsernameTaken,
    #[error("Password must be at least {MIN_PASSWORD_CHARS} characters long")]
    PasswordTooShort,
}

/// Trim and lowercase a keyword. Empty after normalization is a validation
/// failure, not a storable value.
pub fn normalize_keyword(raw: &str) -> Result<String, ValidationError> {
    let keyword = raw.trim().to_lowercase();
    if keyword.is_empty() {
        return Err(ValidationError::EmptyKeyword);
    }
    Ok(keyword)
}

/// Trim a response, preserving its case.
pub fn normalize_response(raw: &str) -> Result<String, ValidationError> {
    let response = raw.trim();
    if response.is_empty() {
        return Err(ValidationError::EmptyResponse);
    }
    Ok(response.to_owned())
}

/// Resolver-side message normalization. Never fails: odd input degrades to
/// an empty haystack, which simply matches nothing.
pub fn normalize_message(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Chat-endpoint validation: the message must be non-empty after trimming
/// and at most [`MAX_MESSAGE_CHARS`] characters. Returns the trimmed
/// message with its original casing.
pub fn validate_chat_message(raw: &str) -> Result<String, ValidationError> {
    if raw.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ValidationError::MessageTooLong);
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    Ok(trimmed.to_owned())
}

pub fn normalize_username(raw: &str) -> Result<String, ValidationError> {
    let username = raw.trim().to_lowercase();
    if username.is_empty() {
        return Err(ValidationError::EmptyUsername);
    }
    Ok(username)
}

pub fn validate_password(raw: &str) -> Result<(), ValidationError> {
    if raw.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}
