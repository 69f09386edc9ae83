//! Lookup failures.

/// Which entity was missing.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum NotFoundErrorKind {
    /// No package with this name, locally or upstream
    #[display("package {}", _0)]
    Package(String),
    /// Package exists but not at this version
    #[display("release {} {}", name, version)]
    Release {
        /// Package name
        name: String,
        /// Requested version
        version: String,
    },
    /// No stored file under this name
    #[display("file {}", _0)]
    File(String),
}

/// Lookup error with location tracking.
///
/// # Examples
///
/// ```
/// use cheeseshop_error::{CheeseshopError, NotFoundError, NotFoundErrorKind};
///
/// let err: CheeseshopError = NotFoundError::new(NotFoundErrorKind::Package("ghost".into())).into();
/// assert!(err.is_not_found());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Not Found: {} at line {} in {}", kind, line, file)]
pub struct NotFoundError {
    /// What was missing
    pub kind: NotFoundErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl NotFoundError {
    /// Create a new lookup error at the current location.
    #[track_caller]
    pub fn new(kind: NotFoundErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
