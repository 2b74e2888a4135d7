//! Error types for SCAT Core
//!
//! Provides error handling for:
//! - Persistence gateway calls
//! - Editing session operations
//! - Project lifecycle and durable storage
//! - Configuration loading

use crate::session::SessionStatus;
use scat_record::ProjectId;
use std::path::PathBuf;
use std::time::Duration;

/// Persistence gateway errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// No project with this id
    #[error("project {0} not found")]
    NotFound(ProjectId),

    /// Backend unreachable or failing
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Backend refused the request
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Call did not finish in time
    #[error("{operation} timed out after {}s", after.as_secs_f64())]
    Timeout {
        /// Gateway operation
        operation: &'static str,
        /// Configured bound
        after: Duration,
    },
}

impl GatewayError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

/// Editing session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Operation not allowed in the current status
    #[error("cannot {operation} while {status}")]
    InvalidState {
        /// Attempted operation
        operation: &'static str,
        /// Status at the time
        status: SessionStatus,
    },

    /// Transition outside the allowed table
    #[error("illegal session transition {from} -> {to}")]
    IllegalTransition {
        /// Current status
        from: SessionStatus,
        /// Requested status
        to: SessionStatus,
    },

    /// Loading the project failed
    #[error("failed to load project: {0}")]
    Load(#[source] GatewayError),

    /// Saving the record failed
    #[error("failed to save record: {0}")]
    Save(#[source] GatewayError),

    /// Session was stopped while the operation ran
    #[error("operation cancelled")]
    Cancelled,
}

impl SessionError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Load(e) | Self::Save(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Durable key-value storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Key cannot be used by this backend
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),

    /// I/O failure reading or writing a key
    #[error("storage I/O failed for {key}: {source}")]
    Io {
        /// Key being accessed
        key: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Backend refused the write
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Project lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Id already present in the active list or the trash
    #[error("project {0} already exists")]
    AlreadyExists(ProjectId),

    /// Id not in the active list
    #[error("project {0} is not active")]
    NotActive(ProjectId),

    /// Id not in the trash
    #[error("project {0} is not in the trash")]
    NotInTrash(ProjectId),

    /// Id in neither list
    #[error("project {0} not found")]
    NotFound(ProjectId),

    /// Stored list could not be decoded
    #[error("stored list {key} is corrupt: {source}")]
    Corrupt {
        /// Storage key
        key: String,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// List could not be encoded
    #[error("failed to encode project list: {0}")]
    Encode(#[source] serde_json::Error),

    /// Durable storage failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Remote gateway failed
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// TOML could not be parsed
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value out of range
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_gateway_errors() {
        assert!(GatewayError::Unavailable("down".into()).is_retryable());
        assert!(GatewayError::Timeout {
            operation: "save",
            after: Duration::from_secs(10)
        }
        .is_retryable());
        assert!(!GatewayError::Rejected("bad".into()).is_retryable());
        assert!(SessionError::Save(GatewayError::Unavailable("x".into())).is_retryable());
        assert!(!SessionError::Cancelled.is_retryable());
    }

    #[test]
    fn timeout_message() {
        let err = GatewayError::Timeout {
            operation: "load",
            after: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "load timed out after 1.5s");
    }
}
