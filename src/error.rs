//! Error types for the scoring service.

/// Errors surfaced across the scoring API surface.
///
/// `UpstreamLabelerFailure` is never returned to a caller of [`crate::engine::scoring::ScoreService`] —
/// it is caught internally and triggers a fallback to the heuristic labeler.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    /// A request parameter failed validation (empty term, no contexts, bad locale).
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Persistence was requested but no storage backend is configured.
    #[error("service unavailable: {reason}")]
    ServiceUnavailable { reason: String },

    /// A remote labeler call failed; callers never see this directly.
    #[error("upstream labeler failure: {reason}")]
    UpstreamLabelerFailure { reason: String },

    /// SQLite error, wrapped for any surface that does propagate storage failures.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Catch-all for anything else that should not happen in normal operation.
    #[error("internal error: {reason}")]
    Internal { reason: String },
}

pub type Result<T> = std::result::Result<T, ScoreError>;
