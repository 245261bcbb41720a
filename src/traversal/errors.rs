//! # Upstream Errors
//!
//! Failures of the external explainer service: transport, protocol, and
//! payload-shape problems. The core never retries; an upstream failure
//! aborts the expansion that issued the call and propagates unchanged.

use thiserror::Error;

/// Result type for upstream calls.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Upstream call failures.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// Request could not be sent or the connection dropped.
    #[error("Upstream transport failure: {0}")]
    Transport(String),

    /// Upstream answered with a non-success status.
    #[error("Upstream returned status {status} for {endpoint}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Endpoint path the request was sent to.
        endpoint: String,
    },

    /// Response body did not match the expected shape.
    #[error("Malformed upstream response: {0}")]
    Malformed(String),
}
