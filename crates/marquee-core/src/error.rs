//! Error types and result aliases for Marquee.
//!
//! Store failures, missing documents and configuration problems are kept as
//! distinct variants so the HTTP layer can map them to 500, 404 and a fatal
//! startup error respectively. Parameter validation never produces an
//! [`Error`]; it reports through [`crate::validation::ValidationErrors`].

use std::fmt;
use std::time::Duration;

/// The result type used throughout Marquee.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Marquee operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A point read found no document.
    #[error("not found: {resource_type} with id {id}")]
    NotFound {
        /// The kind of document that was looked up.
        resource_type: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// The document store rejected or failed a request.
    #[error("store error: {message}")]
    Store {
        /// Description of the store failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A store call did not complete within the configured bound.
    #[error("store call {operation} timed out after {}ms", elapsed.as_millis())]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
        /// The configured bound.
        elapsed: Duration,
    },

    /// A stored document could not be decoded into the domain model.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the decoding failure.
        message: String,
    },

    /// A required secret or setting is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// An internal error that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new store error with the given message.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new store error with a source cause.
    #[must_use]
    pub fn store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new not found error.
    #[must_use]
    pub fn not_found(resource_type: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Returns true when this error is a typed not-found outcome.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            message: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinct_from_store_errors() {
        assert!(Error::not_found("Movie", "tt0000001").is_not_found());
        assert!(!Error::store("boom").is_not_found());
    }

    #[test]
    fn timeout_message_carries_operation_and_bound() {
        let err = Error::Timeout {
            operation: "query",
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "store call query timed out after 1500ms");
    }
}
