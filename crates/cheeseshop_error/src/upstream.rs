//! Errors reported by the upstream package index.

/// What went wrong on the upstream side.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum UpstreamErrorKind {
    /// XML-RPC fault response
    #[display("RPC fault {}: {}", code, message)]
    Fault {
        /// Fault code
        code: i64,
        /// Fault string
        message: String,
    },
    /// Document could not be decoded
    #[display("Malformed response: {}", _0)]
    Protocol(String),
    /// Upstream answered with a server error
    #[display("Upstream status {}", _0)]
    Status(u16),
    /// Proxying is switched off in configuration
    #[display("Upstream proxying is disabled")]
    Disabled,
}

impl UpstreamErrorKind {
    /// Server errors and faults are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fault { .. } => true,
            Self::Status(status) => *status >= 500 || *status == 429,
            Self::Protocol(_) | Self::Disabled => false,
        }
    }
}

/// Upstream index error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Upstream Error: {} at line {} in {}", kind, line, file)]
pub struct UpstreamError {
    /// The kind of error that occurred
    pub kind: UpstreamErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl UpstreamError {
    /// Create a new upstream error at the current location.
    #[track_caller]
    pub fn new(kind: UpstreamErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
