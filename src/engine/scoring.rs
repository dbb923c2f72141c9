// src/engine/scoring.rs
//
// ScoreService — the entry point a caller actually drives. Generalizes
// glasswally::Pipeline's "ingest → run workers concurrently → fuse →
// dispatch" shape to "ingest a scoring request → run the labeler and the
// spectral builders concurrently → fuse → persist".

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::ScoreError;
use crate::labeler::Labeler;
use crate::spectral::{build_cooccurrence_graph, context_covariance_largest_eigenvalue};
use crate::spectral::radius::term_graph_spectral_radius_default;
use crate::storage::StorageBackend;
use crate::text::{normalize_term, split_sentences, token_sequence_contains, tokenize};
use crate::types::{
    Band, FeatureQuantiles, FeatureVector, FeedbackRequest, FeedbackResponse, TermHistoryResponse,
    TermScoreRequest, TermScoreResponse, TextScoreRequest, TextScoreResponse, TextTermScore,
};

use super::fusion::FusionEngine;

const TERM_NOT_FOUND_WARNING: &str = "The scored term was not found in any provided context. \
Add contexts that include the exact term for reliable scoring.";
const NO_GRAPH_SIGNAL_WARNING: &str = "No graph signal was found for this term in the provided \
contexts. Add more varied contexts where the term co-occurs with descriptive language.";

const QUANTILE_CACHE_TTL: Duration = Duration::from_secs(30);

fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

/// Blends static default review/block thresholds with recent score
/// quantiles once enough history has accumulated, so the bands drift with
/// observed traffic instead of staying fixed forever.
pub fn tuned_band_thresholds(
    default_review: f64,
    default_block: f64,
    quantiles: Option<&FeatureQuantiles>,
    min_samples: f64,
) -> (f64, f64) {
    let quantiles = match quantiles {
        Some(q) => q,
        None => return (default_review, default_block),
    };

    let sample_count = quantiles.get("sample_count").copied().unwrap_or(0.0);
    let score_p70 = quantiles.get("score_p70").copied();
    let score_p90 = quantiles.get("score_p90").copied();
    let (score_p70, score_p90) = match (score_p70, score_p90) {
        (Some(p70), Some(p90)) if sample_count >= min_samples => (p70, p90),
        _ => return (default_review, default_block),
    };

    let review = clamp((0.7 * default_review) + (0.3 * score_p70), 0.2, 0.75);
    let block_candidate = (0.7 * default_block) + (0.3 * score_p90);
    let min_block = review + 0.08;
    let block = clamp(block_candidate.max(min_block), min_block, 0.95);
    (review, block)
}

pub fn score_band(score: f64, review_threshold: f64, block_threshold: f64) -> Band {
    if score >= block_threshold {
        Band::Block
    } else if score >= review_threshold {
        Band::Review
    } else {
        Band::Monitor
    }
}

#[derive(Default)]
struct QuantileCache {
    entry: Mutex<Option<(Instant, Option<FeatureQuantiles>)>>,
}

impl QuantileCache {
    fn get_or_refresh(&self, storage: &dyn StorageBackend) -> Result<Option<FeatureQuantiles>, ScoreError> {
        {
            let guard = self.entry.lock();
            if let Some((fetched_at, value)) = guard.as_ref() {
                if fetched_at.elapsed() < QUANTILE_CACHE_TTL {
                    return Ok(value.clone());
                }
            }
        }

        let fresh = storage.get_feature_quantiles()?;
        *self.entry.lock() = Some((Instant::now(), fresh.clone()));
        Ok(fresh)
    }
}

pub struct ScoreService {
    embedding_dim: usize,
    labeler: Arc<dyn Labeler>,
    fusion_engine: FusionEngine,
    storage: Option<Arc<dyn StorageBackend>>,
    quantile_cache: QuantileCache,
    // Sharded concurrent map of the most recent response per normalized term,
    // the same DashMap-of-state idiom glasswally::state::window::StateStore
    // uses for its per-account windows, scaled down to a single entry per key.
    recent_scores: DashMap<String, TermScoreResponse>,
}

impl ScoreService {
    pub fn new(
        embedding_dim: usize,
        labeler: Arc<dyn Labeler>,
        fusion_engine: FusionEngine,
        storage: Option<Arc<dyn StorageBackend>>,
    ) -> Self {
        Self {
            embedding_dim,
            labeler,
            fusion_engine,
            storage,
            quantile_cache: QuantileCache::default(),
            recent_scores: DashMap::new(),
        }
    }

    /// Last in-process score computed for `term`, if any. Populated on every
    /// `score_term` call regardless of `persist`, so repeated lookups of the
    /// same term within a process don't need a storage round trip.
    pub fn cached_score(&self, term: &str) -> Option<TermScoreResponse> {
        let normalized = normalize_term(term);
        self.recent_scores.get(&normalized).map(|entry| entry.clone())
    }

    pub async fn score_term(&self, request: &TermScoreRequest, persist: bool) -> Result<TermScoreResponse, ScoreError> {
        if request.term.trim().is_empty() {
            return Err(ScoreError::InvalidArgument {
                reason: "term must not be empty".to_string(),
            });
        }
        if request.contexts.is_empty() {
            return Err(ScoreError::InvalidArgument {
                reason: "at least one context is required".to_string(),
            });
        }

        let target = normalize_term(&request.term);
        let target_tokens = tokenize(&target);
        let term_found_in_context = request
            .contexts
            .iter()
            .any(|context| token_sequence_contains(&tokenize(context), &target_tokens));

        let mut warnings = Vec::new();
        if !term_found_in_context {
            warnings.push(TERM_NOT_FOUND_WARNING.to_string());
        }

        let embedding_dim = self.embedding_dim;

        let labeler = Arc::clone(&self.labeler);
        let term_for_labels = target.clone();
        let contexts_for_labels = request.contexts.clone();
        let locale_for_labels = request.locale.clone();
        let label_task = tokio::task::spawn_blocking(move || {
            labeler.label_batch(&term_for_labels, &contexts_for_labels, &locale_for_labels)
        });

        let contexts_for_ctx = request.contexts.clone();
        let ctx_task = tokio::task::spawn_blocking(move || {
            context_covariance_largest_eigenvalue(&contexts_for_ctx, embedding_dim)
        });

        let contexts_for_graph = request.contexts.clone();
        let target_for_graph = target.clone();
        let graph_task = tokio::task::spawn_blocking(move || {
            let graph = build_cooccurrence_graph(&contexts_for_graph);
            term_graph_spectral_radius_default(&target_for_graph, &graph)
        });

        let (labels, eigen_ctx, eigen_graph) = tokio::join!(label_task, ctx_task, graph_task);
        let labels = labels.map_err(|e| ScoreError::Internal { reason: e.to_string() })?;
        let eigen_ctx = eigen_ctx.map_err(|e| ScoreError::Internal { reason: e.to_string() })?;
        let eigen_graph = eigen_graph.map_err(|e| ScoreError::Internal { reason: e.to_string() })?;

        if term_found_in_context && eigen_graph <= 0.0 {
            warnings.push(NO_GRAPH_SIGNAL_WARNING.to_string());
        }

        let sample_size = labels.len();
        let severity_mean = labels.iter().map(|l| l.severity).sum::<f64>() / sample_size as f64;
        let targetedness_mean = labels.iter().map(|l| l.targetedness).sum::<f64>() / sample_size as f64;
        let reclaimed_rate = labels.iter().filter(|l| l.reclaimed).count() as f64 / sample_size as f64;

        let feature_quantiles = match &self.storage {
            Some(storage) => self.quantile_cache.get_or_refresh(storage.as_ref())?,
            None => None,
        };

        let (review_threshold, block_threshold) = tuned_band_thresholds(
            self.fusion_engine.review_threshold,
            self.fusion_engine.block_threshold,
            feature_quantiles.as_ref(),
            80.0,
        );

        let features = FeatureVector {
            lambda_graph: eigen_graph,
            lambda_ctx: eigen_ctx,
            severity_mean,
            targetedness_mean,
            reclaimed_rate,
            trend_velocity: request.trend_velocity,
            sample_size,
        };
        let fusion = self.fusion_engine.fuse(&features, feature_quantiles.as_ref());
        let band = score_band(fusion.score, review_threshold, block_threshold);

        let response = TermScoreResponse {
            term: target,
            locale: request.locale.clone(),
            sample_size,
            eigen_ctx,
            eigen_graph,
            severity_mean,
            targetedness_mean,
            reclaimed_rate,
            trend_velocity: request.trend_velocity,
            score: fusion.score,
            confidence: fusion.confidence,
            band,
            model_version: fusion.model_version,
            warnings,
        };

        if persist {
            if let Some(storage) = &self.storage {
                storage.save_term_score(&response)?;
            }
        }

        self.recent_scores.insert(response.term.clone(), response.clone());

        Ok(response)
    }

    pub async fn score_text(&self, request: &TextScoreRequest) -> Result<TextScoreResponse, ScoreError> {
        let text_tokens = tokenize(&request.text);
        let sentences = {
            let split = split_sentences(&request.text);
            if split.is_empty() {
                vec![request.text.clone()]
            } else {
                split
            }
        };

        let mut candidates: Vec<String> = request
            .candidate_terms
            .iter()
            .filter(|term| !term.trim().is_empty())
            .map(|term| normalize_term(term))
            .collect();
        candidates.sort();
        candidates.dedup();

        let mut results = Vec::new();
        for candidate in candidates {
            let candidate_tokens = tokenize(&candidate);
            if !token_sequence_contains(&text_tokens, &candidate_tokens) {
                continue;
            }

            let mut term_contexts: Vec<String> = sentences
                .iter()
                .filter(|sentence| token_sequence_contains(&tokenize(sentence), &candidate_tokens))
                .cloned()
                .collect();
            if term_contexts.is_empty() {
                term_contexts = vec![request.text.clone()];
            }

            let scored = self
                .score_term(
                    &TermScoreRequest {
                        term: candidate,
                        contexts: term_contexts,
                        locale: request.locale.clone(),
                        trend_velocity: 0.0,
                    },
                    false,
                )
                .await?;

            results.push(TextTermScore {
                term: scored.term,
                score: scored.score,
                confidence: scored.confidence,
                band: scored.band,
            });
        }

        Ok(TextScoreResponse {
            locale: request.locale.clone(),
            terms_found: results.len(),
            results,
        })
    }

    pub fn get_term_history(&self, term: &str, limit: usize) -> Result<TermHistoryResponse, ScoreError> {
        let normalized = normalize_term(term);
        let storage = match &self.storage {
            Some(storage) => storage,
            None => {
                return Ok(TermHistoryResponse {
                    term: normalized,
                    count: 0,
                    history: Vec::new(),
                })
            }
        };

        let history = storage.get_term_history(&normalized, limit)?;
        Ok(TermHistoryResponse {
            term: normalized,
            count: history.len(),
            history,
        })
    }

    pub fn submit_feedback(&self, payload: &FeedbackRequest) -> Result<FeedbackResponse, ScoreError> {
        let storage = self.storage.as_ref().ok_or_else(|| ScoreError::ServiceUnavailable {
            reason: "persistence is disabled; feedback cannot be recorded".to_string(),
        })?;
        let feedback_id = storage.save_feedback(payload)?;
        Ok(FeedbackResponse {
            status: "accepted".to_string(),
            feedback_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuned_band_thresholds_without_quantiles_uses_defaults() {
        let (review, block) = tuned_band_thresholds(0.35, 0.65, None, 80.0);
        assert_eq!(review, 0.35);
        assert_eq!(block, 0.65);
    }

    #[test]
    fn tuned_band_thresholds_with_quantiles_blends_history() {
        let mut quantiles = FeatureQuantiles::new();
        quantiles.insert("sample_count".to_string(), 160.0);
        quantiles.insert("score_p70".to_string(), 0.52);
        quantiles.insert("score_p90".to_string(), 0.82);

        let (review, block) = tuned_band_thresholds(0.35, 0.65, Some(&quantiles), 80.0);
        assert!(review > 0.39 && review < 0.43);
        assert!(block > 0.69 && block < 0.73);
        assert!(block > review + 0.08 - 1e-9);
    }

    #[test]
    fn score_band_applies_threshold_order() {
        assert_eq!(score_band(0.2, 0.35, 0.65), Band::Monitor);
        assert_eq!(score_band(0.5, 0.35, 0.65), Band::Review);
        assert_eq!(score_band(0.8, 0.35, 0.65), Band::Block);
    }

    #[tokio::test]
    async fn score_term_populates_recent_score_cache() {
        use crate::labeler::HeuristicLabeler;

        let service = ScoreService::new(
            64,
            Arc::new(HeuristicLabeler::new()),
            FusionEngine::new(),
            None,
        );

        assert!(service.cached_score("widget").is_none());

        let request = TermScoreRequest {
            term: "widget".to_string(),
            contexts: vec![
                "the widget is fine".to_string(),
                "you are a widget and I hate you".to_string(),
            ],
            locale: "en-US".to_string(),
            trend_velocity: 0.0,
        };
        let response = service.score_term(&request, false).await.unwrap();

        let cached = service.cached_score("widget").unwrap();
        assert_eq!(cached.score, response.score);
    }
}
