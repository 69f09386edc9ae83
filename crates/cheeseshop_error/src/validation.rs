//! Caller input errors.

/// Rejected input, such as an unknown search operator.
///
/// # Examples
///
/// ```
/// use cheeseshop_error::{CheeseshopError, ValidationError};
///
/// let err: CheeseshopError = ValidationError::new("operator must be 'and' or 'or'").into();
/// assert!(!err.is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Validation Error: {} at line {} in {}", message, line, file)]
pub struct ValidationError {
    /// What was rejected
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ValidationError {
    /// Create a new ValidationError at the current location.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
