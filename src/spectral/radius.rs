//! Graph spectral signal — a normalized-Laplacian-style spectral radius over
//! a term's BFS-bounded ego subgraph, IDF-weighted across the term's tokens.

use std::collections::{HashMap, HashSet};

use nalgebra::{DMatrix, SymmetricEigen};

use crate::text::{normalize_term, tokenize};

use super::graph::CooccurrenceGraph;

const DEFAULT_HOPS: usize = 2;
const MAX_EGO_NODES: usize = 128;

/// Breadth-first expansion from `center` out to `hops` hops, capped at
/// `MAX_EGO_NODES` total nodes and returned in sorted order for a
/// deterministic eigendecomposition.
fn ego_nodes(adjacency: &HashMap<String, HashMap<String, f64>>, center: &str, hops: usize) -> Vec<String> {
    if !adjacency.contains_key(center) {
        return Vec::new();
    }

    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(center.to_string());
    let mut frontier: Vec<String> = vec![center.to_string()];

    for _ in 0..hops {
        let mut next_frontier: Vec<String> = Vec::new();
        'frontier: for node in &frontier {
            if let Some(neighbors) = adjacency.get(node) {
                let mut sorted_neighbors: Vec<&String> = neighbors.keys().collect();
                sorted_neighbors.sort();
                for neighbor in sorted_neighbors {
                    if visited.contains(neighbor) {
                        continue;
                    }
                    visited.insert(neighbor.clone());
                    next_frontier.push(neighbor.clone());
                    if visited.len() >= MAX_EGO_NODES {
                        break 'frontier;
                    }
                }
            }
        }
        if visited.len() >= MAX_EGO_NODES || next_frontier.is_empty() {
            break;
        }
        frontier = next_frontier;
    }

    let mut nodes: Vec<String> = visited.into_iter().collect();
    nodes.sort();
    nodes
}

/// Non-trivial normalized spectral signal over an ego subgraph: symmetrize,
/// degree-normalize, take every eigenvalue but the largest (the trivial
/// one), and scale down for small subgraphs via a coverage factor.
fn non_trivial_normalized_spectral_signal(
    nodes: &[String],
    adjacency: &HashMap<String, HashMap<String, f64>>,
) -> f64 {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();
    let n = nodes.len();

    let mut raw = DMatrix::<f64>::zeros(n, n);
    for node_a in nodes {
        let row = index[node_a.as_str()];
        if let Some(neighbors) = adjacency.get(node_a) {
            for (node_b, weight) in neighbors {
                if let Some(&col) = index.get(node_b.as_str()) {
                    raw[(row, col)] = *weight;
                }
            }
        }
    }

    let symmetric = (raw.clone() + raw.transpose()) / 2.0;
    let degrees: Vec<f64> = (0..n).map(|i| symmetric.row(i).sum()).collect();
    if !degrees.iter().any(|d| *d > 0.0) {
        return 0.0;
    }

    let inv_sqrt: Vec<f64> = degrees
        .iter()
        .map(|d| if *d > 0.0 { 1.0 / d.sqrt() } else { 0.0 })
        .collect();
    let normalized = DMatrix::from_fn(n, n, |r, c| symmetric[(r, c)] * inv_sqrt[r] * inv_sqrt[c]);

    let eigen = SymmetricEigen::new(normalized);
    let mut eigenvalues: Vec<f64> = eigen.eigenvalues.iter().cloned().collect();
    if eigenvalues.len() <= 1 {
        return 0.0;
    }

    eigenvalues.sort_by(|a, b| a.partial_cmp(b).unwrap());
    eigenvalues.pop(); // drop the largest (trivial) eigenvalue
    let non_trivial = eigenvalues
        .iter()
        .cloned()
        .map(f64::abs)
        .fold(0.0, f64::max);

    let coverage = 1.0 - (-((n as f64 - 1.0) / 3.0)).exp();
    (non_trivial * coverage).max(0.0)
}

fn idf_weight(token: &str, token_document_frequency: &HashMap<String, i64>, context_count: i64) -> f64 {
    if context_count <= 0 {
        return 1.0;
    }
    let df = *token_document_frequency.get(token).unwrap_or(&0);
    1.0 + ((context_count as f64 + 1.0) / (df as f64 + 1.0)).ln()
}

/// IDF-weighted average of the ego-subgraph spectral signal across each
/// token of a (possibly multi-word) candidate term.
pub fn term_graph_spectral_radius(term: &str, graph: &CooccurrenceGraph, hops: usize) -> f64 {
    let targets = tokenize(&normalize_term(term));
    if targets.is_empty() {
        return 0.0;
    }

    let mut weighted_radius = 0.0;
    let mut weight_total = 0.0;

    for target in &targets {
        let nodes = ego_nodes(&graph.adjacency, target, hops);
        if nodes.len() < 2 {
            continue;
        }

        let signal = non_trivial_normalized_spectral_signal(&nodes, &graph.adjacency);
        if signal <= 0.0 {
            continue;
        }

        let weight = idf_weight(target, &graph.token_document_frequency, graph.context_count);
        weighted_radius += signal * weight;
        weight_total += weight;
    }

    if weight_total == 0.0 {
        return 0.0;
    }
    weighted_radius / weight_total
}

/// Convenience entry point using the default hop count of 2.
pub fn term_graph_spectral_radius_default(term: &str, graph: &CooccurrenceGraph) -> f64 {
    term_graph_spectral_radius(term, graph, DEFAULT_HOPS)
}
