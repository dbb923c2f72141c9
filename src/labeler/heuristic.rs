//! Deterministic cue-based labeler — no network calls, used both standalone
//! and as the fallback target for [`super::remote::RemoteLabeler`].

use crate::text::normalize_term;
use crate::types::ContextLabel;

use super::Labeler;

const SECOND_PERSON_CUES: &[&str] = &[" you ", " your ", " yourself ", "@"];
const AGGRESSION_CUES: &[&str] = &[
    "hate",
    "kill",
    "attack",
    "destroy",
    "worthless",
    "disgusting",
    "stupid",
    "filthy",
];
const RECLAIM_CUES: &[&str] = &["we", "our", "ours", "us", "reclaim", "reclaimed"];

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

#[derive(Debug, Default, Clone)]
pub struct HeuristicLabeler;

impl HeuristicLabeler {
    pub fn new() -> Self {
        Self
    }

    pub fn label_context(&self, term: &str, context: &str, _locale: &str) -> ContextLabel {
        let term_norm = normalize_term(term);
        let text = format!(" {} ", context.to_lowercase());

        let is_quoted =
            text.contains(&format!("\"{}\"", term_norm)) || text.contains(&format!("'{}'", term_norm));
        let targeted_hits = SECOND_PERSON_CUES.iter().filter(|cue| text.contains(*cue)).count();
        let aggression_hits = AGGRESSION_CUES.iter().filter(|cue| text.contains(*cue)).count();
        let reclaim_hits = RECLAIM_CUES
            .iter()
            .filter(|cue| text.contains(&format!(" {} ", cue)))
            .count();

        let mut targetedness = 0.2 + (0.25 * targeted_hits as f64);
        if text.contains("they") || text.contains("those people") {
            targetedness += 0.15;
        }
        if is_quoted {
            targetedness *= 0.75;
        }

        let mut severity = 0.15 + (0.17 * aggression_hits as f64);
        if context.contains('!') {
            severity += 0.05;
        }
        if is_quoted {
            severity *= 0.65;
        }

        let reclaimed = reclaim_hits >= 2 && text.contains(&term_norm);
        if reclaimed {
            severity *= 0.55;
            targetedness *= 0.8;
        }

        let mut confidence = 0.58 + (0.04 * (targeted_hits + aggression_hits) as f64).min(0.25);
        if is_quoted && targeted_hits == 0 {
            confidence -= 0.08;
        }
        let confidence = clamp01(confidence);

        ContextLabel {
            targetedness: clamp01(targetedness),
            severity: clamp01(severity),
            reclaimed,
            is_quoted,
            confidence,
            rationale_code: "heuristic_v1".to_string(),
        }
    }
}

impl Labeler for HeuristicLabeler {
    fn label_batch(&self, term: &str, contexts: &[String], locale: &str) -> Vec<ContextLabel> {
        contexts
            .iter()
            .map(|text| self.label_context(term, text, locale))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_person_context_raises_targetedness() {
        let labeler = HeuristicLabeler::new();
        let label = labeler.label_context("term", "you are a term and I hate you", "en-US");
        assert!(label.targetedness > 0.2);
        assert!(label.severity > 0.15);
    }

    #[test]
    fn quoted_usage_is_flagged_and_softened() {
        let labeler = HeuristicLabeler::new();
        let label = labeler.label_context("term", "the word \"term\" was used in an article", "en-US");
        assert!(label.is_quoted);
    }

    #[test]
    fn reclaimed_usage_lowers_severity() {
        let labeler = HeuristicLabeler::new();
        let label = labeler.label_context(
            "term",
            "we reclaimed term for us, our community embraces term",
            "en-US",
        );
        assert!(label.reclaimed);
    }

    #[test]
    fn all_fields_are_bounded() {
        let labeler = HeuristicLabeler::new();
        for context in [
            "a completely neutral sentence with no cues",
            "YOU ARE WORTHLESS AND STUPID @everyone",
            "",
        ] {
            let label = labeler.label_context("term", context, "en-US");
            assert!((0.0..=1.0).contains(&label.targetedness));
            assert!((0.0..=1.0).contains(&label.severity));
            assert!((0.0..=1.0).contains(&label.confidence));
        }
    }
}
