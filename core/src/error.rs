//! Error types for the reminders API client.
//!
//! # Design
//! Application-level failures keep the raw status code and body text so the
//! message always carries both. Registration and read endpoints get separate
//! variants; 4xx and 5xx are not split further. Transport failures wrap the
//! underlying error transparently.
//!
//! `StoreError` never escapes a session operation: reads fall through to
//! registration and writes are logged.

use std::error::Error as StdError;

/// Errors returned by `ReminderClient` parse methods and `ReminderSession`
/// operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The registration endpoint returned a non-2xx status.
    #[error("registration failed: HTTP {status}: {body}")]
    Registration { status: u16, body: String },

    /// A read endpoint returned a non-2xx status.
    #[error("fetch failed: HTTP {status}: {body}")]
    Fetch { status: u16, body: String },

    /// The response body could not be decoded into the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ApiError {
    /// HTTP status of an application-level failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Registration { status, .. } | ApiError::Fetch { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Network-level failure (DNS, refused connection, timeout, broken body).
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct TransportError(Box<dyn StdError + Send + Sync + 'static>);

impl TransportError {
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Self(err.into())
    }

    pub fn into_inner(self) -> Box<dyn StdError + Send + Sync + 'static> {
        self.0
    }
}

/// Failure reported by a `TokenStore` backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("secure storage unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Backend(Box<dyn StdError + Send + Sync + 'static>),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("backend url is not configured (set {0})")]
    MissingBackendUrl(&'static str),

    #[error("backend url must start with http:// or https://, got {0:?}")]
    InvalidBackendUrl(String),
}
