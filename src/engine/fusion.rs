// src/engine/fusion.rs
//
// Calibrated logistic fusion of the graph/context spectral signals with the
// labeler's severity/targetedness/reclaimed aggregates.
//
// Coefficients below are an initial rule-based prior, not a fitted model —
// replacing them with a calibrated model is future work, same as upstream.

use crate::types::{Band, FeatureQuantiles, FeatureVector, FusionOutput};

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

fn compress_nonnegative(value: f64) -> f64 {
    value.max(0.0).ln_1p().tanh()
}

fn sigmoid(value: f64) -> f64 {
    1.0 / (1.0 + (-value).exp())
}

fn safe_quantile(quantiles: Option<&FeatureQuantiles>, key: &str) -> Option<f64> {
    quantiles.and_then(|q| q.get(key)).copied()
}

fn calibrate_nonnegative_feature(value: f64, p50: Option<f64>, p90: Option<f64>) -> f64 {
    let baseline = compress_nonnegative(value);
    let (p50, p90) = match (p50, p90) {
        (Some(p50), Some(p90)) if p90 > p50 => (p50, p90),
        _ => return baseline,
    };

    let spread = (p90 - p50).max(1e-6);
    let z_score = (value - p50) / spread;
    let calibrated = sigmoid(1.2 * z_score);
    clamp01((0.45 * baseline) + (0.55 * calibrated))
}

pub struct FusionEngine {
    pub review_threshold: f64,
    pub block_threshold: f64,
    pub model_version: String,

    b0: f64,
    b1: f64,
    b2: f64,
    b3: f64,
    b4: f64,
    b5: f64,
    b6: f64,
}

impl FusionEngine {
    pub fn new() -> Self {
        Self {
            review_threshold: 0.35,
            block_threshold: 0.65,
            model_version: "fusion_v1".to_string(),
            b0: -0.8,
            b1: 0.9,
            b2: 0.7,
            b3: 1.1,
            b4: 1.0,
            b5: 0.9,
            b6: 0.4,
        }
    }

    pub fn fuse(&self, features: &FeatureVector, feature_quantiles: Option<&FeatureQuantiles>) -> FusionOutput {
        let graph_signal = calibrate_nonnegative_feature(
            features.lambda_graph,
            safe_quantile(feature_quantiles, "eigen_graph_p50"),
            safe_quantile(feature_quantiles, "eigen_graph_p90"),
        );
        let ctx_signal = calibrate_nonnegative_feature(
            features.lambda_ctx,
            safe_quantile(feature_quantiles, "eigen_ctx_p50"),
            safe_quantile(feature_quantiles, "eigen_ctx_p90"),
        );

        let linear = self.b0
            + (self.b1 * graph_signal)
            + (self.b2 * ctx_signal)
            + (self.b3 * features.severity_mean)
            + (self.b4 * features.targetedness_mean)
            - (self.b5 * features.reclaimed_rate)
            + (self.b6 * features.trend_velocity);
        let score = sigmoid(linear);

        let sample_strength = (features.sample_size as f64 / 20.0).min(1.0);
        let mut confidence = 0.45 + (0.25 * ((score - 0.5) * 2.0).abs()) + (0.2 * sample_strength);
        confidence -= 0.1 * features.reclaimed_rate;
        let confidence = clamp01(confidence);

        let band = if score >= self.block_threshold {
            Band::Block
        } else if score >= self.review_threshold {
            Band::Review
        } else {
            Band::Monitor
        };

        FusionOutput {
            score: clamp01(score),
            confidence,
            band,
            linear_value: linear,
            model_version: self.model_version.clone(),
        }
    }
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(lambda_graph: f64, lambda_ctx: f64) -> FeatureVector {
        FeatureVector {
            lambda_graph,
            lambda_ctx,
            severity_mean: 0.5,
            targetedness_mean: 0.5,
            reclaimed_rate: 0.0,
            trend_velocity: 0.0,
            sample_size: 10,
        }
    }

    #[test]
    fn quantile_calibration_changes_signal() {
        let engine = FusionEngine::new();
        let mut quantiles = FeatureQuantiles::new();
        quantiles.insert("eigen_graph_p50".to_string(), 0.08);
        quantiles.insert("eigen_graph_p90".to_string(), 0.32);
        quantiles.insert("eigen_ctx_p50".to_string(), 0.04);
        quantiles.insert("eigen_ctx_p90".to_string(), 0.22);

        let lower = engine.fuse(&features(0.05, 0.04), Some(&quantiles));
        let higher = engine.fuse(&features(0.5, 0.2), Some(&quantiles));

        assert!(higher.score > lower.score);
    }

    #[test]
    fn without_quantiles_still_produces_bounded_values() {
        let engine = FusionEngine::new();
        let result = engine.fuse(
            &FeatureVector {
                lambda_graph: 1.0,
                lambda_ctx: 0.2,
                severity_mean: 0.6,
                targetedness_mean: 0.7,
                reclaimed_rate: 0.1,
                trend_velocity: 0.2,
                sample_size: 8,
            },
            None,
        );

        assert!((0.0..=1.0).contains(&result.score));
        assert!((0.0..=1.0).contains(&result.confidence));
    }

    #[test]
    fn model_version_is_stable() {
        let engine = FusionEngine::new();
        let result = engine.fuse(&features(0.1, 0.1), None);
        assert_eq!(result.model_version, "fusion_v1");
    }
}
