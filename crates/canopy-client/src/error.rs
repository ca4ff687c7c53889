//! Client error types

use thiserror::Error;

/// Errors surfaced by tenant clients
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure, surfaced verbatim
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The tenant rejected the request
    #[error("tenant rejected request (HTTP {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body, as reported by the tenant
        message: String,
    },

    /// The tenant answered with a body the client could not interpret
    #[error("malformed tenant response: {0}")]
    MalformedResponse(String),

    /// A payload handed to the client was not valid JSON
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
