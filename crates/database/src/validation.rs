//! Input validation for tenant notification settings.

use std::fmt;

use crate::models::NotificationConfig;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid email format.
    InvalidEmail(String),
    /// Fallback timeout outside the allowed window.
    TimeoutOutOfRange { minutes: i64, min: i64, max: i64 },
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidEmail(msg) => write!(f, "Invalid email: {}", msg),
            ValidationError::TimeoutOutOfRange { minutes, min, max } => write!(
                f,
                "Fallback timeout must be between {} and {} minutes (got {})",
                min, max, minutes
            ),
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for email addresses.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Shortest allowed escalation window, in minutes.
pub const MIN_FALLBACK_TIMEOUT_MINUTES: i64 = 1;

/// Longest allowed escalation window, in minutes.
pub const MAX_FALLBACK_TIMEOUT_MINUTES: i64 = 60;

/// Validate an email address (basic RFC 5322 format check).
///
/// This is a basic validation that checks:
/// - Contains exactly one @
/// - Has at least one character before and after @
/// - Has at least one dot after @, not at either end and not doubled
/// - Is not too long
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Empty("email".to_string()));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LENGTH,
            actual: email.len(),
        });
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ValidationError::InvalidEmail(
            "must contain exactly one @ symbol".to_string(),
        ));
    }

    let (local, domain) = (parts[0], parts[1]);

    if local.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "missing local part (before @)".to_string(),
        ));
    }

    if domain.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "missing domain (after @)".to_string(),
        ));
    }

    if !domain.contains('.') {
        return Err(ValidationError::InvalidEmail(
            "domain must contain at least one dot".to_string(),
        ));
    }

    if domain.starts_with('.') || domain.ends_with('.') {
        return Err(ValidationError::InvalidEmail(
            "domain cannot start or end with a dot".to_string(),
        ));
    }

    if domain.contains("..") {
        return Err(ValidationError::InvalidEmail(
            "domain cannot contain consecutive dots".to_string(),
        ));
    }

    Ok(())
}

/// Validate the escalation window.
pub fn validate_fallback_timeout(minutes: i64) -> Result<(), ValidationError> {
    if !(MIN_FALLBACK_TIMEOUT_MINUTES..=MAX_FALLBACK_TIMEOUT_MINUTES).contains(&minutes) {
        return Err(ValidationError::TimeoutOutOfRange {
            minutes,
            min: MIN_FALLBACK_TIMEOUT_MINUTES,
            max: MAX_FALLBACK_TIMEOUT_MINUTES,
        });
    }
    Ok(())
}

/// Validate a full notification config before it is written.
pub fn validate_notification_config(config: &NotificationConfig) -> Result<(), ValidationError> {
    validate_fallback_timeout(config.email_fallback_timeout_minutes)?;

    if let Some(email) = config.notification_email.as_deref() {
        validate_email(email)?;
    }
    if let Some(email) = config.email_fallback_address.as_deref() {
        validate_email(email)?;
    }

    Ok(())
}
