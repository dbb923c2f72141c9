//! Spectral signal computation: the hashed-embedding context covariance
//! spectrum and the co-occurrence graph spectral radius.

pub mod covariance;
pub mod embed;
pub mod graph;
pub mod radius;

pub use covariance::context_covariance_largest_eigenvalue;
pub use graph::{build_cooccurrence_graph, CooccurrenceGraph};
pub use radius::term_graph_spectral_radius;
