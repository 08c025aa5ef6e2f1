//! The main Error type for shellmind

use crate::{ErrorKind, ErrorStatus};
use std::fmt;

/// The unified error type for all shellmind operations.
///
/// This error type provides:
/// - `kind`: What type of error occurred
/// - `message`: Human-readable description
/// - `status`: Whether the error is retryable
/// - `operation`: What operation caused the error
/// - `context`: Key-value pairs for debugging
/// - `source`: The underlying error (if any)
///
/// # Example
///
/// ```rust
/// use shellmind_error::{Error, ErrorKind, ErrorStatus};
///
/// let err = Error::new(ErrorKind::StorageFailed, "rename failed")
///     .with_operation("store::save")
///     .with_context("path", "bot_memory.json");
///
/// assert_eq!(err.kind(), ErrorKind::StorageFailed);
/// assert!(!err.status().is_retryable());
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: ErrorStatus,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let status = if kind.is_retryable() {
            ErrorStatus::Temporary
        } else {
            ErrorStatus::Permanent
        };

        Self {
            kind,
            message: message.into(),
            status,
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the error status
    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    /// Get the operation that caused this error
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Get the context key-value pairs
    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    // =========================================================================
    // Builders (chainable)
    // =========================================================================

    /// Set the operation that caused this error.
    ///
    /// If an operation was already set, the previous one is moved to context
    /// as "called" to preserve the call chain.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            self.context.push(("called", self.operation.to_string()));
        }
        self.operation = operation;
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Set the source error.
    ///
    /// # Panics (debug only)
    /// Panics in debug mode if source was already set.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "source error already set");
        self.source = Some(source.into());
        self
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        self.status.is_retryable()
    }
}

// =============================================================================
// Display - compact, single-line format for logs
// =============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) at {}", self.kind, self.status, self.operation)?;

        if !self.context.is_empty() {
            write!(f, ", context {{ ")?;
            for (i, (key, value)) in self.context.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", key, value)?;
            }
            write!(f, " }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        Ok(())
    }
}

// =============================================================================
// Debug - verbose, multi-line format for debugging
// =============================================================================

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}) at {}", self.kind, self.status, self.operation)?;

        if !self.message.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Message: {}", self.message)?;
        }

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Context:")?;
            for (key, value) in &self.context {
                writeln!(f, "        {}: {}", key, value)?;
            }
        }

        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "    Source: {:?}", source)?;
        }

        Ok(())
    }
}

// =============================================================================
// std::error::Error implementation
// =============================================================================

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// =============================================================================
// Convenient From implementations (be careful not to leak raw errors!)
// =============================================================================

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IoFailed,
        };
        Error::new(kind, err.to_string())
            .with_operation("io")
            .set_source(err)
    }
}

// =============================================================================
// Convenience constructors
// =============================================================================

impl Error {
    /// Create a ConfigInvalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create a CredentialMissing error
    pub fn credential_missing(variable: impl Into<String>) -> Self {
        let variable = variable.into();
        Self::new(
            ErrorKind::CredentialMissing,
            format!("no API key found, set {} or pass --api-key", variable),
        )
        .with_context("variable", variable)
    }

    /// Create a StorageFailed error
    pub fn storage_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StorageFailed, message)
    }

    /// Create a SerializationFailed error
    pub fn serialization_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SerializationFailed, message)
    }

    /// Create a CommandFailed error
    pub fn command_failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        let command = command.into();
        Self::new(ErrorKind::CommandFailed, reason)
            .with_context("command", command)
    }

    /// Create a CommandTimeout error
    pub fn command_timeout(command: impl Into<String>, secs: u64) -> Self {
        let command = command.into();
        Self::new(ErrorKind::CommandTimeout, format!("command timed out after {}s", secs))
            .with_context("command", command)
            .with_context("timeout_secs", secs.to_string())
    }

    /// Create a CommandRejected error
    pub fn command_rejected(command: impl Into<String>, reason: impl Into<String>) -> Self {
        let command = command.into();
        Self::new(ErrorKind::CommandRejected, reason)
            .with_context("command", command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::new(ErrorKind::StorageFailed, "disk full");
        assert_eq!(err.kind(), ErrorKind::StorageFailed);
        assert_eq!(err.message(), "disk full");
        assert_eq!(err.status(), ErrorStatus::Permanent);
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::new(ErrorKind::InferenceFailed, "timeout")
            .with_operation("provider::complete")
            .with_context("model", "gpt-4o-mini")
            .with_context("messages", "12");

        assert_eq!(err.operation(), "provider::complete");
        assert_eq!(err.context().len(), 2);
        assert_eq!(err.context()[0], ("model", "gpt-4o-mini".to_string()));
    }

    #[test]
    fn test_operation_chaining() {
        let err = Error::new(ErrorKind::IoFailed, "write failed")
            .with_operation("store::save")
            .with_operation("agent::persist");

        assert_eq!(err.operation(), "agent::persist");
        assert_eq!(err.context().len(), 1);
        assert_eq!(err.context()[0], ("called", "store::save".to_string()));
    }

    #[test]
    fn test_temporary_status() {
        let err = Error::new(ErrorKind::InferenceFailed, "rate limited");
        assert!(err.is_retryable());

        let err = Error::new(ErrorKind::StorageFailed, "read-only filesystem");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_display() {
        let err = Error::command_timeout("sleep 60", 30)
            .with_operation("executor::run");

        let display = format!("{}", err);
        assert!(display.contains("CommandTimeout"));
        assert!(display.contains("temporary"));
        assert!(display.contains("executor::run"));
        assert!(display.contains("command: sleep 60"));
        assert!(display.contains("timed out after 30s"));
    }

    #[test]
    fn test_convenience_constructors() {
        let err = Error::credential_missing("OPENAI_API_KEY");
        assert_eq!(err.kind(), ErrorKind::CredentialMissing);
        assert!(err.message().contains("OPENAI_API_KEY"));

        let err = Error::command_rejected("ls; rm -rf /", "disallowed metacharacter ';'");
        assert_eq!(err.kind(), ErrorKind::CommandRejected);
        assert_eq!(err.context()[0].0, "command");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: Error = io_err.into();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert!(std::error::Error::source(&err).is_some());
    }
}
