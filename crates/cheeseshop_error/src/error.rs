//! Top-level error wrapper types.

use crate::{
    CacheError, ConfigError, HttpError, IntegrityError, JsonError, NotFoundError, StorageError,
    StorageErrorKind, TaskError, UpstreamError, ValidationError,
};

/// Every error condition the Cheeseshop core can surface.
///
/// # Examples
///
/// ```
/// use cheeseshop_error::{CheeseshopError, HttpError};
///
/// let http_err = HttpError::new("Connection failed");
/// let err: CheeseshopError = http_err.into();
/// assert!(format!("{}", err).contains("HTTP Error"));
/// ```
#[derive(Debug, Clone, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum CheeseshopErrorKind {
    /// Transport error talking to a remote host
    #[from(HttpError)]
    Http(HttpError),
    /// Upstream index answered with a fault or a malformed document
    #[from(UpstreamError)]
    Upstream(UpstreamError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Storage backend error
    #[from(StorageError)]
    Storage(StorageError),
    /// Package, release or file does not exist
    #[from(NotFoundError)]
    NotFound(NotFoundError),
    /// Checksum or size mismatch
    #[from(IntegrityError)]
    Integrity(IntegrityError),
    /// Invalid caller input
    #[from(ValidationError)]
    Validation(ValidationError),
    /// Cache persistence error
    #[from(CacheError)]
    Cache(CacheError),
    /// Spawned task panicked or was aborted
    #[from(TaskError)]
    Task(TaskError),
}

/// Cheeseshop error with kind discrimination.
///
/// # Examples
///
/// ```
/// use cheeseshop_error::{CheeseshopResult, ConfigError};
///
/// fn might_fail() -> CheeseshopResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// let err = might_fail().unwrap_err();
/// assert!(!err.is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Cheeseshop Error: {}", _0)]
pub struct CheeseshopError(Box<CheeseshopErrorKind>);

impl CheeseshopError {
    /// Create a new error from a kind.
    pub fn new(kind: CheeseshopErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &CheeseshopErrorKind {
        &self.0
    }

    /// Transport and upstream RPC failures may succeed on another attempt.
    ///
    /// Everything else (not-found, validation, configuration, integrity,
    /// storage) is permanent.
    pub fn is_retryable(&self) -> bool {
        match self.kind() {
            CheeseshopErrorKind::Http(_) => true,
            CheeseshopErrorKind::Upstream(err) => err.kind.is_retryable(),
            _ => false,
        }
    }

    /// True for missing packages, releases and files.
    pub fn is_not_found(&self) -> bool {
        match self.kind() {
            CheeseshopErrorKind::NotFound(_) => true,
            CheeseshopErrorKind::Storage(err) => matches!(err.kind, StorageErrorKind::NotFound(_)),
            _ => false,
        }
    }

    /// True when the caller tried to create something that already exists.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self.kind(),
            CheeseshopErrorKind::Storage(err) if matches!(err.kind, StorageErrorKind::Conflict(_))
        )
    }
}

// Generic From implementation for any type that converts to CheeseshopErrorKind
impl<T> From<T> for CheeseshopError
where
    T: Into<CheeseshopErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Cheeseshop operations.
///
/// # Examples
///
/// ```
/// use cheeseshop_error::{CheeseshopResult, HttpError};
///
/// fn fetch_data() -> CheeseshopResult<String> {
///     Err(HttpError::new("404 Not Found"))?
/// }
/// ```
pub type CheeseshopResult<T> = std::result::Result<T, CheeseshopError>;
