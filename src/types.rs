//! Request/response and domain types flowing through the scoring service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Risk band assigned to a fused score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Monitor,
    Review,
    Block,
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monitor => write!(f, "monitor"),
            Self::Review => write!(f, "review"),
            Self::Block => write!(f, "block"),
        }
    }
}

/// Per-context label produced by a [`crate::labeler::Labeler`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextLabel {
    pub targetedness: f64,
    pub severity: f64,
    pub reclaimed: bool,
    pub is_quoted: bool,
    pub confidence: f64,
    pub rationale_code: String,
}

/// Request to score a single term against its observed contexts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermScoreRequest {
    pub term: String,
    pub contexts: Vec<String>,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub trend_velocity: f64,
}

fn default_locale() -> String {
    "en-US".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermScoreResponse {
    pub term: String,
    pub locale: String,
    pub sample_size: usize,
    pub eigen_ctx: f64,
    pub eigen_graph: f64,
    pub severity_mean: f64,
    pub targetedness_mean: f64,
    pub reclaimed_rate: f64,
    pub trend_velocity: f64,
    pub score: f64,
    pub confidence: f64,
    pub band: Band,
    pub model_version: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermScoreHistoryItem {
    pub id: i64,
    pub term: String,
    pub locale: String,
    pub score: f64,
    pub confidence: f64,
    pub band: Band,
    pub model_version: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermHistoryResponse {
    pub term: String,
    pub count: usize,
    pub history: Vec<TermScoreHistoryItem>,
}

/// Request to score every candidate term found within a larger body of text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextScoreRequest {
    pub text: String,
    pub candidate_terms: Vec<String>,
    #[serde(default = "default_locale")]
    pub locale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextTermScore {
    pub term: String,
    pub score: f64,
    pub confidence: f64,
    pub band: Band,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextScoreResponse {
    pub locale: String,
    pub terms_found: usize,
    pub results: Vec<TextTermScore>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    FalsePositive,
    FalseNegative,
    PolicyOverride,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub term: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    pub feedback_type: FeedbackType,
    pub proposed_band: Option<Band>,
    pub proposed_score: Option<f64>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub status: String,
    pub feedback_id: i64,
}

/// Feature vector handed to the fusion engine for a single scoring call.
#[derive(Debug, Clone, Copy)]
pub struct FeatureVector {
    pub lambda_graph: f64,
    pub lambda_ctx: f64,
    pub severity_mean: f64,
    pub targetedness_mean: f64,
    pub reclaimed_rate: f64,
    pub trend_velocity: f64,
    pub sample_size: usize,
}

#[derive(Debug, Clone)]
pub struct FusionOutput {
    pub score: f64,
    pub confidence: f64,
    pub band: Band,
    pub linear_value: f64,
    pub model_version: String,
}

/// Rolling quantiles over past scoring runs, opaque to the core beyond the
/// seven keys the fusion/scoring code reads.
pub type FeatureQuantiles = std::collections::HashMap<String, f64>;
