//! Error status - how a caller should treat an error

use std::fmt;

/// Whether an error may succeed if the operation is attempted again.
///
/// The agent loop itself never retries; the status is surfaced in logs and
/// lets callers embedding the library make their own decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    /// Retrying will not help
    Permanent,
    /// The same operation may succeed later
    Temporary,
}

impl ErrorStatus {
    /// Check if this status allows a retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorStatus::Temporary)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStatus::Permanent => "permanent",
            ErrorStatus::Temporary => "temporary",
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
