//! Content integrity errors.

/// How the received bytes disagreed with what was promised.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum IntegrityErrorKind {
    /// Digest mismatch
    #[display("{} checksum mismatch: expected {}, got {}", algorithm, expected, actual)]
    Checksum {
        /// Digest algorithm name
        algorithm: String,
        /// Advertised digest
        expected: String,
        /// Digest of the received bytes
        actual: String,
    },
    /// Length mismatch
    #[display("size mismatch: expected {} bytes, got {}", expected, actual)]
    Size {
        /// Advertised size
        expected: u64,
        /// Bytes actually produced
        actual: u64,
    },
}

/// Integrity error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Integrity Error: {} at line {} in {}", kind, line, file)]
pub struct IntegrityError {
    /// The kind of error that occurred
    pub kind: IntegrityErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl IntegrityError {
    /// Create a new integrity error at the current location.
    #[track_caller]
    pub fn new(kind: IntegrityErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
