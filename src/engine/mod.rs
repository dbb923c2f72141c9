//! Fusion and orchestration: combining spectral and labeler signals into a
//! bounded score, then wiring the whole pipeline into a runnable service.

pub mod fusion;
pub mod scoring;

pub use fusion::FusionEngine;
pub use scoring::ScoreService;
