//! Error types for the merge engine.

use thiserror::Error;

/// Errors that can occur while retrieving, parsing or validating a feed.
///
/// Every variant is scoped to a single source: the orchestrator turns them
/// into [`SourceFailure`](crate::merge::SourceFailure) entries instead of
/// aborting the merge.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The retrieval collaborator could not deliver the feed text.
    #[error("Network error: {0}")]
    Network(String),

    /// The document is malformed, or an event lacks a usable start time.
    #[error("ICS parse error: {0}")]
    Parse(String),

    /// Structurally valid input that fails a semantic check.
    ///
    /// Nothing raises this yet: end-before-start is normalized instead.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;
