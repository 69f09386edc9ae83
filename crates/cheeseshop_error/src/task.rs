//! Background task failures.

/// A spawned task panicked or was cancelled before producing a value.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Task Error: {} at line {} in {}", message, line, file)]
pub struct TaskError {
    /// Join failure description
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl TaskError {
    /// Create a new TaskError at the current location.
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
