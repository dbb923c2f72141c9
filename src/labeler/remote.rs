//! Remote/LLM-backed labeler shape. The actual network transport is an
//! external collaborator and out of scope here; what matters to the core is
//! that a failed remote call falls back to the heuristic labeler instead of
//! surfacing [`crate::error::ScoreError::UpstreamLabelerFailure`] outward.

use tracing::warn;

use crate::error::ScoreError;
use crate::types::ContextLabel;

use super::{HeuristicLabeler, Labeler};

/// A pluggable remote classification backend (e.g. an LLM JSON classifier).
/// Left unimplemented here on purpose — wiring a real one in is the
/// deployment's job, not the core's.
pub trait RemoteBackend: Send + Sync {
    fn classify(&self, term: &str, context: &str, locale: &str) -> Result<ContextLabel, ScoreError>;
}

pub struct RemoteLabeler {
    backend: Option<Box<dyn RemoteBackend>>,
    fallback: HeuristicLabeler,
}

impl RemoteLabeler {
    pub fn new(backend: Box<dyn RemoteBackend>) -> Self {
        Self {
            backend: Some(backend),
            fallback: HeuristicLabeler::new(),
        }
    }

    /// A remote labeler with no backend wired in — every call falls back to
    /// the heuristic labeler. Useful as a configuration default.
    pub fn without_backend() -> Self {
        Self {
            backend: None,
            fallback: HeuristicLabeler::new(),
        }
    }

    fn label_context(&self, term: &str, context: &str, locale: &str) -> ContextLabel {
        let outcome = match &self.backend {
            Some(backend) => backend.classify(term, context, locale),
            None => Err(ScoreError::UpstreamLabelerFailure {
                reason: "no remote backend configured".to_string(),
            }),
        };

        match outcome {
            Ok(label) => label,
            Err(error) => {
                warn!(%error, "remote labeler call failed, falling back to heuristic");
                let mut fallback = self.fallback.label_context(term, context, locale);
                fallback.rationale_code = "llm_fallback_heuristic_v1".to_string();
                fallback
            }
        }
    }
}

impl Labeler for RemoteLabeler {
    fn label_batch(&self, term: &str, contexts: &[String], locale: &str) -> Vec<ContextLabel> {
        contexts
            .iter()
            .map(|context| self.label_context(term, context, locale))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn without_backend_falls_back_to_heuristic_rationale() {
        let labeler = RemoteLabeler::without_backend();
        let labels = labeler.label_batch("term", &["you are a term".to_string()], "en-US");
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].rationale_code, "llm_fallback_heuristic_v1");
    }

    struct AlwaysFails;
    impl RemoteBackend for AlwaysFails {
        fn classify(&self, _term: &str, _context: &str, _locale: &str) -> Result<ContextLabel, ScoreError> {
            Err(ScoreError::UpstreamLabelerFailure {
                reason: "simulated outage".to_string(),
            })
        }
    }

    #[test]
    fn backend_failure_never_surfaces_outward() {
        let labeler = RemoteLabeler::new(Box::new(AlwaysFails));
        let labels = labeler.label_batch("term", &["hello".to_string()], "en-US");
        assert_eq!(labels[0].rationale_code, "llm_fallback_heuristic_v1");
    }

    struct AlwaysSucceeds;
    impl RemoteBackend for AlwaysSucceeds {
        fn classify(&self, _term: &str, _context: &str, _locale: &str) -> Result<ContextLabel, ScoreError> {
            Ok(ContextLabel {
                targetedness: 0.9,
                severity: 0.8,
                reclaimed: false,
                is_quoted: false,
                confidence: 0.95,
                rationale_code: "openai_json_v1".to_string(),
            })
        }
    }

    #[test]
    fn successful_backend_call_is_passed_through() {
        let labeler = RemoteLabeler::new(Box::new(AlwaysSucceeds));
        let labels = labeler.label_batch("term", &["hello".to_string()], "en-US");
        assert_eq!(labels[0].rationale_code, "openai_json_v1");
        assert_eq!(labels[0].severity, 0.8);
    }
}
