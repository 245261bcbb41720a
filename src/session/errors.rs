//! # Explanation Errors
//!
//! Failure taxonomy for session operations. An empty traversal result is
//! NOT an error; it surfaces as `ExpandStatus::NoResults`.

use thiserror::Error;

use crate::traversal::UpstreamError;

/// Result type for session operations.
pub type ExplainResult<T> = Result<T, ExplainError>;

/// Explanation session errors.
#[derive(Debug, Clone, Error)]
pub enum ExplainError {
    // ==================
    // Input Errors
    // ==================
    /// Referenced event id is not in the session's event store.
    #[error("Event not found: {0}")]
    EventNotFound(String),

    /// Seed creation input was rejected.
    #[error("Invalid seed event: {0}")]
    InvalidSeed(String),

    // ==================
    // Lifecycle Errors
    // ==================
    /// The event is already in the seed selection.
    #[error("Event already selected for explanation: {0}")]
    SeedAlreadyAdded(String),

    /// The seed selection cannot change while expanded levels exist.
    #[error("Clear the explanation before changing its seed events")]
    ExplanationNotCleared,

    /// Seed-level rendering was requested with no seeds selected.
    #[error("No seed events selected")]
    NoSeedEvents,

    /// Another expansion is suspended on its upstream call. Concurrent
    /// expansions are rejected, never interleaved.
    #[error("An expansion is already in flight for this session")]
    ExpansionInProgress,

    // ==================
    // Collaborator Errors
    // ==================
    /// Upstream traversal, fingerprint, or hydrate call failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    // ==================
    // Internal Errors
    // ==================
    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
