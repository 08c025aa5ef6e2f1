//! Error kinds for shellmind operations

use std::fmt;

/// The kind of error that occurred.
///
/// This enum categorizes errors to help users write clear error handling logic.
/// Users can match on ErrorKind to decide how to handle specific error cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// Invalid configuration or parameters
    ConfigInvalid,

    /// No API credential could be found
    CredentialMissing,

    // =========================================================================
    // Storage errors
    // =========================================================================
    /// Writing or replacing the state file failed
    StorageFailed,

    /// Serialization/deserialization failed
    SerializationFailed,

    // =========================================================================
    // Command errors
    // =========================================================================
    /// The shell could not be spawned or waited on
    CommandFailed,

    /// The command ran past its timeout
    CommandTimeout,

    /// The command was refused before execution
    CommandRejected,

    // =========================================================================
    // Inference/LLM errors
    // =========================================================================
    /// LLM inference failed
    InferenceFailed,

    /// Provider not available
    ProviderUnavailable,

    /// Rate limit exceeded
    RateLimited,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    /// Network error
    NetworkFailed,

    // =========================================================================
    // Parse errors
    // =========================================================================
    /// Failed to parse input
    ParseFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::CredentialMissing => "CredentialMissing",

            // Storage
            ErrorKind::StorageFailed => "StorageFailed",
            ErrorKind::SerializationFailed => "SerializationFailed",

            // Command
            ErrorKind::CommandFailed => "CommandFailed",
            ErrorKind::CommandTimeout => "CommandTimeout",
            ErrorKind::CommandRejected => "CommandRejected",

            // Inference
            ErrorKind::InferenceFailed => "InferenceFailed",
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::RateLimited => "RateLimited",

            // IO
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::NetworkFailed => "NetworkFailed",

            // Parse
            ErrorKind::ParseFailed => "ParseFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::InferenceFailed
                | ErrorKind::NetworkFailed
                | ErrorKind::RateLimited
                | ErrorKind::CommandTimeout
                | ErrorKind::ProviderUnavailable
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
