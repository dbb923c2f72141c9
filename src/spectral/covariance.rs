//! Context covariance spectrum — the largest eigenvalue of the (shrunk)
//! covariance of hashed-embedded contexts.

use nalgebra::{DMatrix, SymmetricEigen};

use crate::text::{split_sentences, tokenize};

use super::embed::embed_text;

/// Builds at least two "views" of a candidate's contexts to compute a
/// covariance over, falling back through sentence splitting, then sliding
/// token windows, then a simple halves split when only a single short
/// context is available.
fn covariance_views(contexts: &[String]) -> Vec<String> {
    let cleaned: Vec<String> = contexts
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    if cleaned.len() >= 2 {
        return cleaned;
    }
    if cleaned.is_empty() {
        return Vec::new();
    }

    let source = &cleaned[0];
    let sentence_views = split_sentences(source);
    if sentence_views.len() >= 2 {
        return sentence_views;
    }

    let tokens = tokenize(source);
    if tokens.len() < 2 {
        return cleaned;
    }

    let window = ((tokens.len() as f64).sqrt() as usize + 1).clamp(3, 8);
    let stride = (window / 2).max(1);

    let mut spans: Vec<String> = Vec::new();
    let mut start = 0;
    while start < tokens.len() {
        let end = (start + window).min(tokens.len());
        let chunk = &tokens[start..end];
        if chunk.len() >= 2 {
            spans.push(chunk.join(" "));
        }
        start += stride;
    }

    let mut deduped = Vec::new();
    for span in spans {
        if !deduped.contains(&span) {
            deduped.push(span);
        }
    }
    if deduped.len() >= 2 {
        return deduped;
    }

    let midpoint = (tokens.len() / 2).max(1);
    [tokens[..midpoint].join(" "), tokens[midpoint..].join(" ")]
        .into_iter()
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Largest eigenvalue of the shrunk covariance matrix of hashed-embedded
/// context views. Zero when fewer than two views can be constructed.
pub fn context_covariance_largest_eigenvalue(contexts: &[String], dim: usize) -> f64 {
    let views = covariance_views(contexts);
    if views.len() < 2 {
        return 0.0;
    }

    let sample_count = views.len();
    let rows: Vec<Vec<f64>> = views.iter().map(|text| embed_text(text, dim)).collect();
    let matrix = DMatrix::from_fn(sample_count, dim, |r, c| rows[r][c]);

    let mut column_means = vec![0.0f64; dim];
    for col in 0..dim {
        column_means[col] = matrix.column(col).sum() / sample_count as f64;
    }
    let centered = DMatrix::from_fn(sample_count, dim, |r, c| matrix[(r, c)] - column_means[c]);

    let gram = centered.transpose() * centered.clone();
    let mut covariance = gram / (sample_count as f64 - 1.0);

    let shrinkage = (4.0 / (sample_count as f64 + 3.0)).min(0.35);
    let diagonal: Vec<f64> = (0..dim).map(|i| covariance[(i, i)]).collect();
    for r in 0..dim {
        for c in 0..dim {
            let target = if r == c { diagonal[r] } else { 0.0 };
            covariance[(r, c)] = (1.0 - shrinkage) * covariance[(r, c)] + shrinkage * target;
        }
    }

    let eigen = SymmetricEigen::new(covariance);
    let largest = eigen
        .eigenvalues
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    largest.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn largest_eigenvalue_is_nonnegative() {
        let contexts = ctx(&[
            "this is a neutral sentence",
            "this sentence is more hostile toward you",
            "community members reclaimed the term for themselves",
        ]);
        let value = context_covariance_largest_eigenvalue(&contexts, 128);
        assert!(value >= 0.0);
    }

    #[test]
    fn single_varied_context_produces_signal_distinct_from_repetitive_one() {
        let varied = context_covariance_largest_eigenvalue(
            &ctx(&["example alpha beta gamma delta epsilon"]),
            128,
        );
        let repetitive =
            context_covariance_largest_eigenvalue(&ctx(&["example example example example"]), 128);

        assert!(varied > 0.0);
        assert!((varied - repetitive).abs() > 1e-6);
    }

    #[test]
    fn empty_contexts_yield_zero() {
        let value = context_covariance_largest_eigenvalue(&[], 64);
        assert_eq!(value, 0.0);
    }
}
