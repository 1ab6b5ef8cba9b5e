//! Ground-truth generation: five paraphrases per vague statement, each
//! labelled with the id of the document it came from.

use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;

use clarity_core::config::EvalSettings;
use clarity_core::traits::AnswerGenerator;
use clarity_core::{BackendFailure, Document, Error, GroundTruth, Result};

use crate::prompt::{render, GROUND_TRUTH_TEMPLATE};
use crate::retry::retry_fixed;

pub const VARIANTS_PER_STATEMENT: usize = 5;

#[derive(Debug, Clone)]
pub struct GroundTruthOptions {
    pub max_concurrency: usize,
    /// Attempts per generation call on transient errors, and rounds per document on bad replies.
    pub max_attempts: usize,
    pub retry_delay: Duration,
    /// Pause after each generation call, spacing requests out.
    pub request_interval: Duration,
}

impl Default for GroundTruthOptions {
    fn default() -> Self { Self::from(&EvalSettings::default()) }
}

impl From<&EvalSettings> for GroundTruthOptions {
    fn from(s: &EvalSettings) -> Self {
        Self {
            max_concurrency: s.max_concurrency,
            max_attempts: s.max_retries,
            retry_delay: Duration::from_millis(s.retry_delay_ms),
            request_interval: Duration::from_millis(s.request_interval_ms),
        }
    }
}

fn invalid(message: String) -> Error {
    Error::GenerationBackend { kind: BackendFailure::InvalidResponse, message }
}

/// Parse a reply into exactly five variants. Code fences are ignored.
pub fn parse_variants(reply: &str) -> Result<Vec<String>> {
    let cleaned = reply.replace("```", "");
    let cleaned = cleaned.trim();
    let cleaned = cleaned.strip_prefix("json").unwrap_or(cleaned).trim();
    let variants: Vec<String> = serde_json::from_str(cleaned).map_err(|e| invalid(format!("not a JSON list of strings: {e}")))?;
    if variants.len() != VARIANTS_PER_STATEMENT {
        return Err(invalid(format!("expected {VARIANTS_PER_STATEMENT} variants, got {}", variants.len())));
    }
    Ok(variants)
}

/// Generate labelled paraphrases for every document.
///
/// Documents are processed concurrently under `max_concurrency` permits.
/// Each gets up to `max_attempts` rounds; a document that never yields a
/// valid list is logged and skipped. A rejected call (bad key, unknown
/// model) fails the whole run. `on_document` fires once per finished document.
pub async fn generate_ground_truth<F>(
    generator: &dyn AnswerGenerator,
    docs: &[Document],
    options: &GroundTruthOptions,
    on_document: F,
) -> Result<Vec<GroundTruth>>
where
    F: Fn() + Sync,
{
    if options.max_concurrency == 0 || options.max_attempts == 0 {
        return Err(Error::InvalidConfig("max_concurrency and max_attempts must be at least 1".into()));
    }
    let permits = Semaphore::new(options.max_concurrency);
    let on_document = &on_document;

    let results = join_all(docs.iter().map(|doc| {
        let permits = &permits;
        async move {
            let out = variants_for(generator, doc, options, permits).await;
            on_document();
            out
        }
    }))
    .await;

    let mut rows = Vec::new();
    for (doc, result) in docs.iter().zip(results) {
        match result? {
            Some(variants) => rows.extend(variants.into_iter().map(|vague| GroundTruth { vague, doc_id: doc.id.clone() })),
            None => tracing::warn!(doc_id = %doc.id, attempts = options.max_attempts, "no valid variants, skipping document"),
        }
    }
    tracing::info!(documents = docs.len(), rows = rows.len(), "ground truth generated");
    Ok(rows)
}

async fn variants_for(
    generator: &dyn AnswerGenerator,
    doc: &Document,
    options: &GroundTruthOptions,
    permits: &Semaphore,
) -> Result<Option<Vec<String>>> {
    let prompt = render(GROUND_TRUTH_TEMPLATE, &[("question", &doc.vague)]);
    for attempt in 1..=options.max_attempts {
        let reply = {
            let _permit = permits.acquire().await.map_err(|e| Error::InvalidConfig(e.to_string()))?;
            let reply = retry_fixed(options.max_attempts, options.retry_delay, || generator.generate(&prompt)).await;
            tokio::time::sleep(options.request_interval).await;
            reply
        };
        match reply.and_then(|r| parse_variants(&r)) {
            Ok(variants) => return Ok(Some(variants)),
            Err(e @ Error::GenerationBackend { kind: BackendFailure::Rejected, .. }) => return Err(e),
            Err(e) => tracing::warn!(doc_id = %doc.id, attempt, error = %e, "variant generation failed"),
        }
        if attempt < options.max_attempts {
            tokio::time::sleep(options.request_interval).await;
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_fenced_lists() {
        let plain = r#"["a", "b", "c", "d", "e"]"#;
        assert_eq!(parse_variants(plain).unwrap().len(), 5);
        let fenced = "```json\n[\"a\", \"b\", \"c\", \"d\", \"e\"]\n```";
        assert_eq!(parse_variants(fenced).unwrap()[4], "e");
    }

    #[test]
    fn rejects_wrong_count_and_shape() {
        assert!(parse_variants(r#"["a", "b"]"#).is_err());
        assert!(parse_variants(r#"{"variants": ["a"]}"#).is_err());
        assert!(parse_variants("Sure! Here you go").is_err());
        assert!(parse_variants(r#"[1, 2, 3, 4, 5]"#).is_err());
    }
}
