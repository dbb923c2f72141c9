//! Windowed co-occurrence graph construction with a PPMI-plus-proximity edge
//! weight.

use std::collections::{HashMap, HashSet};

use crate::error::ScoreError;
use crate::text::tokenize;

/// Symmetric token co-occurrence graph built over a set of contexts.
#[derive(Debug, Clone, Default)]
pub struct CooccurrenceGraph {
    pub adjacency: HashMap<String, HashMap<String, f64>>,
    pub token_document_frequency: HashMap<String, i64>,
    pub context_count: i64,
}

fn default_stopwords() -> &'static HashSet<&'static str> {
    use std::sync::OnceLock;
    static STOPWORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    STOPWORDS.get_or_init(|| {
        [
            "a", "an", "and", "are", "as", "at", "be", "been", "but", "by", "for", "from", "had",
            "has", "have", "he", "her", "his", "i", "if", "in", "into", "is", "it", "its", "me",
            "my", "of", "on", "or", "our", "she", "that", "the", "their", "them", "they", "this",
            "to", "was", "we", "were", "with", "you", "your",
        ]
        .into_iter()
        .collect()
    })
}

fn filter_tokens(text: &str, stopwords: &HashSet<&str>, min_token_length: usize) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|token| token.len() >= min_token_length && !stopwords.contains(token.as_str()))
        .collect()
}

/// Builds a co-occurrence graph over `contexts` with the default window
/// size of 6, minimum token length of 2, and the built-in stopword list.
pub fn build_cooccurrence_graph(contexts: &[String]) -> CooccurrenceGraph {
    build_cooccurrence_graph_with(contexts, 6, 2, default_stopwords()).unwrap()
}

/// Builds a co-occurrence graph with explicit window size, minimum token
/// length, and stopword set. Returns [`ScoreError::InvalidArgument`] if
/// `window_size < 2`.
pub fn build_cooccurrence_graph_with(
    contexts: &[String],
    window_size: usize,
    min_token_length: usize,
    stopwords: &HashSet<&str>,
) -> Result<CooccurrenceGraph, ScoreError> {
    if window_size < 2 {
        return Err(ScoreError::InvalidArgument {
            reason: "window_size must be >= 2".to_string(),
        });
    }

    let mut pair_document_frequency: HashMap<(String, String), i64> = HashMap::new();
    let mut pair_proximity_sum: HashMap<(String, String), f64> = HashMap::new();
    let mut token_document_frequency: HashMap<String, i64> = HashMap::new();
    let mut context_count: i64 = 0;

    for text in contexts {
        let tokens = filter_tokens(text, stopwords, min_token_length);
        if tokens.is_empty() {
            continue;
        }

        context_count += 1;
        let unique_tokens: HashSet<&String> = tokens.iter().collect();
        for token in unique_tokens {
            *token_document_frequency.entry(token.clone()).or_insert(0) += 1;
        }

        let mut context_pair_proximity: HashMap<(String, String), f64> = HashMap::new();
        for left in 0..tokens.len() {
            let right_edge = (left + window_size).min(tokens.len());
            for right in (left + 1)..right_edge {
                let token_a = &tokens[left];
                let token_b = &tokens[right];
                if token_a == token_b {
                    continue;
                }
                let pair = if token_a < token_b {
                    (token_a.clone(), token_b.clone())
                } else {
                    (token_b.clone(), token_a.clone())
                };
                let proximity = 1.0 / (right - left) as f64;
                let entry = context_pair_proximity.entry(pair).or_insert(0.0);
                if proximity > *entry {
                    *entry = proximity;
                }
            }
        }

        for (pair, proximity) in context_pair_proximity {
            *pair_document_frequency.entry(pair.clone()).or_insert(0) += 1;
            *pair_proximity_sum.entry(pair).or_insert(0.0) += proximity;
        }
    }

    if context_count == 0 || pair_document_frequency.is_empty() {
        return Ok(CooccurrenceGraph {
            adjacency: HashMap::new(),
            token_document_frequency,
            context_count,
        });
    }

    let mut graph: HashMap<String, HashMap<String, f64>> = HashMap::new();
    for (pair, pair_count) in &pair_document_frequency {
        let (token_a, token_b) = pair;
        let df_a = *token_document_frequency.get(token_a).unwrap_or(&0);
        let df_b = *token_document_frequency.get(token_b).unwrap_or(&0);
        if df_a == 0 || df_b == 0 {
            continue;
        }

        let pmi = ((*pair_count as f64) * context_count as f64 / (df_a as f64 * df_b as f64)).ln();
        let support = *pair_count as f64 / context_count as f64;
        let mean_proximity = pair_proximity_sum[pair] / *pair_count as f64;
        let ppmi = pmi.max(0.0) + (support * mean_proximity);
        if ppmi <= 0.0 {
            continue;
        }

        graph
            .entry(token_a.clone())
            .or_default()
            .insert(token_b.clone(), ppmi);
        graph
            .entry(token_b.clone())
            .or_default()
            .insert(token_a.clone(), ppmi);
    }

    Ok(CooccurrenceGraph {
        adjacency: graph,
        token_document_frequency,
        context_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn windowed_cooccurrence_reduces_long_range_edges() {
        let empty_stopwords = HashSet::new();
        let near = build_cooccurrence_graph_with(&ctx(&["alpha beta"]), 2, 2, &empty_stopwords)
            .unwrap();
        let far = build_cooccurrence_graph_with(
            &ctx(&["alpha x1 x2 x3 beta"]),
            2,
            2,
            &empty_stopwords,
        )
        .unwrap();

        assert!(near.adjacency.get("alpha").unwrap().contains_key("beta"));
        assert!(!far
            .adjacency
            .get("alpha")
            .map(|n| n.contains_key("beta"))
            .unwrap_or(false));
    }

    #[test]
    fn window_size_below_two_is_rejected() {
        let result = build_cooccurrence_graph_with(&ctx(&["a b c"]), 1, 2, default_stopwords());
        assert!(result.is_err());
    }

    #[test]
    fn empty_contexts_yield_empty_graph() {
        let graph = build_cooccurrence_graph(&[]);
        assert!(graph.adjacency.is_empty());
        assert_eq!(graph.context_count, 0);
    }
}
