//! Context labeling — turns a (term, context) pair into severity/targetedness
//! judgments the fusion engine consumes.

pub mod heuristic;
pub mod remote;

pub use heuristic::HeuristicLabeler;
pub use remote::RemoteLabeler;

use crate::types::ContextLabel;

/// Labels a batch of contexts for a single candidate term.
///
/// Implementations must never fail outward: a remote/LLM-backed labeler
/// that cannot reach its backend falls back to a heuristic judgment rather
/// than surfacing the failure to callers (see [`crate::error::ScoreError::UpstreamLabelerFailure`]).
pub trait Labeler: Send + Sync {
    fn label_batch(&self, term: &str, contexts: &[String], locale: &str) -> Vec<ContextLabel>;
}
