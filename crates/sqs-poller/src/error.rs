//! Error types for queue operations.

use thiserror::Error;

/// Error codes the service uses when it is throttling or temporarily unavailable.
const TRANSIENT_SERVICE_CODES: &[&str] = &[
    "RequestThrottled",
    "Throttling",
    "ThrottlingException",
    "ServiceUnavailable",
    "InternalError",
    "KmsThrottled",
];

/// Top level error returned by every queue operation
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue not found: {queue_name}")]
    QueueNotFound { queue_name: String },

    #[error("Remote service error: {0}")]
    RemoteService(#[from] RemoteServiceError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl QueueError {
    /// Check if the error is transient.
    ///
    /// This is informational only. The client never retries on its own.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::QueueNotFound { .. } => false,
            Self::RemoteService(e) => e.is_transient(),
            Self::InvalidArgument(_) => false,
            Self::Configuration(_) => false,
        }
    }

    /// Check if the error means the named queue does not exist
    pub fn is_queue_not_found(&self) -> bool {
        matches!(self, Self::QueueNotFound { .. })
    }
}

/// Failures reported by, or while talking to, the remote queue service.
///
/// The original code and message from the service are preserved so callers
/// can act on them.
#[derive(Debug, Error)]
pub enum RemoteServiceError {
    #[error("Transport failure: {message}")]
    Transport { message: String },

    #[error("Authentication failed ({code}): {message}")]
    Authentication { code: String, message: String },

    #[error("Service error (HTTP {status}) {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Malformed service response: {message}")]
    MalformedResponse { message: String },

    #[error("MD5 mismatch for message '{message_id}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        message_id: String,
        expected: String,
        actual: String,
    },
}

impl RemoteServiceError {
    /// Service error code, when the service supplied one
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Authentication { code, .. } | Self::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Check if the error is transient (network failure, throttling, 5xx)
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Authentication { .. } => false,
            Self::Service { status, code, .. } => {
                *status >= 500 || TRANSIENT_SERVICE_CODES.contains(&code.as_str())
            }
            Self::MalformedResponse { .. } => false,
            Self::ChecksumMismatch { .. } => false,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },
}

/// Validation errors for arguments rejected before any remote call
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },

    #[error("Duplicate value '{value}' for {field}")]
    Duplicate { field: String, value: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
