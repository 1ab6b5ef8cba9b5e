//! LLM-as-a-judge scoring of translations.
//!
//! The judge reply is free text. [`JudgementParser`] pulls out whatever it can
//! and leaves the rest at the [`JudgementScore`] sentinels; a malformed reply
//! is a degraded score, never an error.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use clarity_core::traits::AnswerGenerator;
use clarity_core::{Criterion, JudgementScore, Result};

use crate::prompt::{render, JUDGE_TEMPLATE};

static CRITERION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+):\s*(\d+)").expect("criterion regex is valid")
});
static OVERALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Overall Score:\s*([\d.]+)").expect("overall score regex is valid")
});
static EXPLANATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Explanation:").expect("explanation regex is valid")
});
static SUGGESTIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Improvement Suggestions(?:\s*\([^)\n]*\))?:").expect("suggestions regex is valid")
});

/// Tolerant extraction of a [`JudgementScore`] from a judge reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct JudgementParser;

impl JudgementParser {
    pub fn parse(&self, reply: &str) -> JudgementScore {
        let mut score = JudgementScore::default();

        // Later occurrences win.
        for caps in CRITERION_RE.captures_iter(reply) {
            let Some(criterion) = Criterion::from_label(&caps[1]) else { continue };
            match caps[2].parse::<u32>() {
                Ok(value) => score.set_criterion(criterion, value),
                Err(_) => tracing::warn!(criterion = criterion.label(), raw = &caps[2], "unparseable criterion score"),
            }
        }

        if let Some(caps) = OVERALL_RE.captures(reply) {
            let raw = caps[1].trim_end_matches('.');
            match raw.parse::<f64>() {
                Ok(value) => score.overall_score = value,
                Err(_) => tracing::warn!(raw = &caps[1], "unparseable overall score"),
            }
        }

        score.explanation = section(reply, &EXPLANATION_RE).unwrap_or_default();
        score.improvement_suggestions = section(reply, &SUGGESTIONS_RE).filter(|s| !s.is_empty());

        let missing: Vec<&str> = Criterion::ALL.into_iter().filter(|c| score.criterion(*c) == 0).map(Criterion::label).collect();
        if !missing.is_empty() {
            tracing::warn!(?missing, "judge reply is missing criteria");
        }
        score
    }
}

/// Text after the first match of `label`, up to the next blank line or the end.
fn section(reply: &str, label: &Regex) -> Option<String> {
    let m = label.find(reply)?;
    let rest = reply[m.end()..].trim_start();
    let end = rest.find("\n\n").unwrap_or(rest.len());
    Some(rest[..end].trim().to_string())
}

/// Scores a translation with the rubric prompt on a dedicated generator.
pub struct QualityJudge {
    generator: Arc<dyn AnswerGenerator>,
    parser: JudgementParser,
}

impl QualityJudge {
    pub fn new(generator: Arc<dyn AnswerGenerator>) -> Self {
        Self { generator, parser: JudgementParser }
    }

    pub fn prompt(&self, vague: &str, translation: &str) -> String {
        render(JUDGE_TEMPLATE, &[("vague", vague), ("translation", translation)])
    }

    /// Backend failures propagate; only the reply parsing is lenient.
    pub async fn judge(&self, vague: &str, translation: &str) -> Result<JudgementScore> {
        let reply = self.generator.generate(&self.prompt(vague, translation)).await?;
        let score = self.parser.parse(&reply);
        tracing::info!(model = self.generator.model(), overall = score.overall_score, complete = score.is_complete(), "judged translation");
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "Criteria Scores:

Accuracy: 4
Clarity: 5
Completeness: 3
Relevance: 4

Overall Score: 4.0
Explanation: The translation captures the request to meet.
It is short.

Improvement Suggestions (if necessary): Mention the roadmap explicitly.";

    #[test]
    fn partial_reply_keeps_what_it_has() {
        let s = JudgementParser.parse("Accuracy: 4\nClarity: 5\nOverall Score: 4.5\nExplanation: Good.\n");
        assert_eq!(s.accuracy, 4);
        assert_eq!(s.clarity, 5);
        assert_eq!(s.completeness, 0);
        assert_eq!(s.relevance, 0);
        assert_eq!(s.overall_score, 4.5);
        assert_eq!(s.explanation, "Good.");
        assert_eq!(s.improvement_suggestions, None);
        assert!(!s.is_complete());
    }

    #[test]
    fn well_formed_reply_fills_every_field() {
        let s = JudgementParser.parse(WELL_FORMED);
        assert_eq!((s.accuracy, s.clarity, s.completeness, s.relevance), (4, 5, 3, 4));
        assert_eq!(s.overall_score, 4.0);
        assert_eq!(s.explanation, "The translation captures the request to meet.\nIt is short.");
        assert_eq!(s.improvement_suggestions.as_deref(), Some("Mention the roadmap explicitly."));
        assert!(s.is_complete());
    }

    #[test]
    fn garbage_yields_sentinels() {
        assert_eq!(JudgementParser.parse("I cannot evaluate this."), JudgementScore::default());
        assert_eq!(JudgementParser.parse(""), JudgementScore::default());
    }

    #[test]
    fn criterion_names_are_case_sensitive() {
        let s = JudgementParser.parse("accuracy: 5\nCLARITY: 5\nRelevance: 2");
        assert_eq!(s.accuracy, 0);
        assert_eq!(s.clarity, 0);
        assert_eq!(s.relevance, 2);
    }

    #[test]
    fn last_occurrence_wins() {
        let s = JudgementParser.parse("Accuracy: 2\n...on reflection...\nAccuracy: 4");
        assert_eq!(s.accuracy, 4);
    }

    #[test]
    fn overall_score_tolerates_sentence_period() {
        assert_eq!(JudgementParser.parse("Overall Score: 3.5.").overall_score, 3.5);
        assert_eq!(JudgementParser.parse("Overall Score: ..").overall_score, 0.0);
    }

    #[test]
    fn plain_suggestions_label_is_accepted() {
        let s = JudgementParser.parse("Improvement Suggestions: Be specific.\n\nThanks");
        assert_eq!(s.improvement_suggestions.as_deref(), Some("Be specific."));
    }

    #[test]
    fn explanation_starting_after_blank_line_is_found() {
        let s = JudgementParser.parse("Explanation:\n\nSolid work.\n\nOverall Score: 5");
        assert_eq!(s.explanation, "Solid work.");
        assert_eq!(s.overall_score, 5.0);
    }
}
