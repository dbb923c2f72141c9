//! Persistence layer. Storage is optional: a [`ScoreService`](crate::engine::scoring::ScoreService)
//! built without one still scores terms, it just can't recall history,
//! compute quantiles, or accept feedback.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::ScoreError;
use crate::types::{FeatureQuantiles, FeedbackRequest, TermScoreHistoryItem, TermScoreResponse};

/// The query surface the scoring engine depends on. `SqliteStore` is the
/// one concrete implementation shipped here; anything satisfying this
/// trait can be substituted in.
pub trait StorageBackend: Send + Sync {
    fn save_term_score(&self, score: &TermScoreResponse) -> Result<i64, ScoreError>;
    fn get_feature_quantiles(&self) -> Result<Option<FeatureQuantiles>, ScoreError>;
    fn get_term_history(&self, term: &str, limit: usize) -> Result<Vec<TermScoreHistoryItem>, ScoreError>;
    fn save_feedback(&self, feedback: &FeedbackRequest) -> Result<i64, ScoreError>;
}
