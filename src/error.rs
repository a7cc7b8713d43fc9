//! Error types for embedscope.
//!
//! embedscope uses a hierarchical error system:
//! - `ProjectorError` is the top-level error returned by all public APIs
//! - Specific error types (`TransportError`, `PayloadError`, `NotFoundError`)
//!   provide detail
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use embedscope::{Projector, Config, Iteration, Result};
//!
//! async fn example(projector: &Projector) -> Result<()> {
//!     let step = projector.show_iteration(Iteration::new(3), None).await?;
//!     println!("now showing {:?}", step.iteration);
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::types::Iteration;

/// Result type alias for embedscope operations.
pub type Result<T> = std::result::Result<T, ProjectorError>;

/// Top-level error enum for all embedscope operations.
///
/// This is the only error type returned by public APIs.
/// Use pattern matching to handle specific error cases.
#[derive(Debug, Error)]
pub enum ProjectorError {
    /// Network or HTTP-level failure talking to the projection server.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server payload failed the schema check.
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    /// Configuration error.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of what's wrong with the configuration.
        reason: String,
    },

    /// Requested entity not found.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// A search query could not be compiled into a predicate.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A newer request started before this response arrived; it was discarded.
    #[error("Response for generation {generation} superseded by generation {current}")]
    Superseded {
        /// Generation that issued the discarded request.
        generation: u64,
        /// Generation that was current when the response arrived.
        current: u64,
    },

    /// Internal engine state error (poisoned lock, unreserved snapshot slot).
    #[error("Engine state error: {0}")]
    State(String),
}

impl ProjectorError {
    /// Creates a configuration error with the given reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Creates an invalid query error with the given message.
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    /// Creates an engine state error with the given message.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Returns true if this is a transport error.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if this is a payload validation error.
    pub fn is_payload(&self) -> bool {
        matches!(self, Self::Payload(_))
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if the response was discarded as stale.
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }
}

/// Transport-level errors.
///
/// These errors indicate the request never produced a usable response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or the connection failed.
    #[error("Request to {endpoint} failed: {reason}")]
    Request {
        /// Endpoint path (e.g. `/updateProjection`).
        endpoint: String,
        /// Underlying failure description.
        reason: String,
    },

    /// The server answered with a non-success status code.
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        /// Endpoint path.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response body could not be decoded.
    #[error("Failed to decode {endpoint} response: {reason}")]
    Decode {
        /// Endpoint path.
        endpoint: String,
        /// Decoder error description.
        reason: String,
    },
}

impl TransportError {
    /// Creates a request failure error.
    pub fn request(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::Request {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a non-success status error.
    pub fn status(endpoint: impl Into<String>, status: u16) -> Self {
        Self::Status {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// Creates a decode failure error.
    pub fn decode(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised by the payload schema check.
///
/// A payload that fails any of these checks is rejected before a single
/// point is written.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// A required field is missing or empty.
    #[error("Required field missing: {field}")]
    RequiredField {
        /// Name of the missing field.
        field: String,
    },

    /// A per-point array is shorter than the point count it must cover.
    #[error("Field '{field}' has {got} entries, expected {expected}")]
    LengthMismatch {
        /// Name of the field.
        field: String,
        /// Required entry count.
        expected: usize,
        /// Actual entry count.
        got: usize,
    },

    /// An index list references a point outside the real point range.
    #[error("Field '{field}' references index {index} (real points: {bound})")]
    IndexOutOfRange {
        /// Name of the index list.
        field: String,
        /// Offending index.
        index: usize,
        /// Number of real points in the payload.
        bound: usize,
    },

    /// A field has an invalid value.
    #[error("Invalid field '{field}': {reason}")]
    InvalidValue {
        /// Name of the invalid field.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },

    /// The payload targets an iteration that is already cached.
    #[error("Iteration {0} is already cached")]
    IterationConflict(Iteration),
}

impl PayloadError {
    /// Creates a required field error.
    pub fn required_field(field: impl Into<String>) -> Self {
        Self::RequiredField {
            field: field.into(),
        }
    }

    /// Creates a length mismatch error.
    pub fn length_mismatch(field: impl Into<String>, expected: usize, got: usize) -> Self {
        Self::LengthMismatch {
            field: field.into(),
            expected,
            got,
        }
    }

    /// Creates an index out of range error.
    pub fn index_out_of_range(field: impl Into<String>, index: usize, bound: usize) -> Self {
        Self::IndexOutOfRange {
            field: field.into(),
            index,
            bound,
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Not found errors for specific entity types.
#[derive(Debug, Error)]
pub enum NotFoundError {
    /// Iteration has never been fetched.
    #[error("Iteration not cached: {0}")]
    Iteration(Iteration),

    /// Point index beyond the store length.
    #[error("Point not found: {0}")]
    Point(usize),
}

impl NotFoundError {
    /// Creates an iteration not found error.
    pub fn iteration(iteration: Iteration) -> Self {
        Self::Iteration(iteration)
    }

    /// Creates a point not found error.
    pub fn point(index: usize) -> Self {
        Self::Point(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProjectorError::config("server_url must not be empty");
        assert_eq!(
            err.to_string(),
            "Configuration error: server_url must not be empty"
        );
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::status("/query", 502);
        assert_eq!(err.to_string(), "/query returned HTTP 502");
    }

    #[test]
    fn test_payload_error_display() {
        let err = PayloadError::length_mismatch("prediction_list", 100, 98);
        assert_eq!(
            err.to_string(),
            "Field 'prediction_list' has 98 entries, expected 100"
        );
    }

    #[test]
    fn test_not_found_error_display() {
        let err = NotFoundError::iteration(Iteration::new(7));
        assert_eq!(err.to_string(), "Iteration not cached: 7");
    }

    #[test]
    fn test_is_transport() {
        let err: ProjectorError = TransportError::request("/al_train", "connection refused").into();
        assert!(err.is_transport());
        assert!(!err.is_payload());
    }

    #[test]
    fn test_superseded() {
        let err = ProjectorError::Superseded {
            generation: 3,
            current: 5,
        };
        assert!(err.is_superseded());
        assert_eq!(
            err.to_string(),
            "Response for generation 3 superseded by generation 5"
        );
    }

    #[test]
    fn test_error_conversion_chain() {
        fn inner() -> Result<()> {
            Err(PayloadError::required_field("result"))?
        }

        let result = inner();
        assert!(result.is_err());
        assert!(result.unwrap_err().is_payload());
    }
}
