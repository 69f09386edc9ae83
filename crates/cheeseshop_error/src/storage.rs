//! Storage error types.

/// Kinds of storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// Failed to create the backend root or a shard directory
    #[display("Failed to create storage directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to write an object
    #[display("Failed to write object: {}", _0)]
    FileWrite(String),
    /// Failed to read an object
    #[display("Failed to read object: {}", _0)]
    FileRead(String),
    /// Object not present in the backend
    #[display("Object not found: {}", _0)]
    NotFound(String),
    /// Backend path is unusable
    #[display("Invalid storage path: {}", _0)]
    InvalidPath(String),
    /// Object already exists and overwriting was refused
    #[display("Object already exists: {}", _0)]
    Conflict(String),
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use cheeseshop_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::NotFound("sample.tar.gz".to_string()));
/// assert!(format!("{}", err).contains("not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
