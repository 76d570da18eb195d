//! Error types for hapi-extract
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for hapi-extract
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Row Decoding Errors
    // ============================================================================
    #[error("Unknown encoding '{encoding}' for resource {resource_id}")]
    UnknownEncoding {
        resource_id: String,
        encoding: String,
    },

    #[error("Failed to decode resource {resource_id}: {message}")]
    DecodeFailure {
        resource_id: String,
        message: String,
    },

    // ============================================================================
    // Store Errors
    // ============================================================================
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] duckdb::Error),

    #[error("Connection pool error: {message}")]
    Pool { message: String },

    #[error("Partition reader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create an unknown encoding error
    pub fn unknown_encoding(resource_id: impl Into<String>, encoding: impl Into<String>) -> Self {
        Self::UnknownEncoding {
            resource_id: resource_id.into(),
            encoding: encoding.into(),
        }
    }

    /// Create a decode error
    pub fn decode(resource_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DecodeFailure {
            resource_id: resource_id.into(),
            message: message.into(),
        }
    }

    /// Create a pool error
    pub fn pool(message: impl Into<String>) -> Self {
        Self::Pool {
            message: message.into(),
        }
    }

    /// Resource id of the row that caused this error, if any
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            Error::UnknownEncoding { resource_id, .. } | Error::DecodeFailure { resource_id, .. } => {
                Some(resource_id)
            }
            _ => None,
        }
    }

    /// Check if this error is retryable
    ///
    /// Only connectivity failures qualify. A corrupt or unrecognised payload
    /// will not become valid on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_) | Error::Pool { .. })
    }
}

/// Result type alias for hapi-extract
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
