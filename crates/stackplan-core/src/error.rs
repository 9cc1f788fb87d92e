//! Error types for deployment planning.
//!
//! Validation of a deployment never produces an [`Error`]; diagnostics are
//! reported as data. This type covers the fallible edges of the crate:
//! parsing, configuration, and node edits that reference unknown nodes or
//! forbidden interface slots.

use serde::Serialize;
use thiserror::Error;

/// Main error type for planning operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// CIDR string did not match `A.B.C.D/N`
    #[error("Invalid CIDR: {0}")]
    InvalidCidr(String),

    /// Dotted-quad address did not parse
    #[error("Invalid IP address: {0}")]
    InvalidIpAddress(String),

    /// No node with the given id exists in the node set
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// The node's roles do not permit the requested interface slot
    #[error("Interface not allowed: {slot} on node {hostname}")]
    InterfaceNotAllowed {
        /// Hostname of the node being edited
        hostname: String,
        /// Interface slot that was rejected
        slot: String,
    },

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to parse a deployment plan document
    #[error("Failed to parse deployment plan: {0}")]
    ParseError(String),
}

/// Specialized result type for planning operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error response for serialization.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCidr(_) => "INVALID_CIDR",
            Self::InvalidIpAddress(_) => "INVALID_IP_ADDRESS",
            Self::NodeNotFound(_) => "NODE_NOT_FOUND",
            Self::InterfaceNotAllowed { .. } => "INTERFACE_NOT_ALLOWED",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::ParseError(_) => "PARSE_ERROR",
        }
    }

    /// Converts the error into an `ErrorResponse`.
    #[must_use]
    pub fn into_error_response(self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}
