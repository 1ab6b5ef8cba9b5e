//! Offline retrieval evaluation against labelled queries.

use futures::future::try_join_all;
use serde::Serialize;
use tokio::sync::Semaphore;

use clarity_core::metrics::{hit_rate, mrr, relevance_sequence};
use clarity_core::traits::Embedder;
use clarity_core::{Error, GroundTruth, Result};
use clarity_retrieval::{Query, RetrievalStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RetrievalReport {
    pub queries: usize,
    pub hit_rate: f64,
    pub mrr: f64,
}

/// Run every labelled query through `strategy` with at most `max_concurrency`
/// searches in flight, then score the rankings. The first failed search
/// aborts the run.
pub async fn evaluate_retrieval(
    strategy: &RetrievalStrategy,
    encoder: Option<&dyn Embedder>,
    ground_truth: &[GroundTruth],
    max_concurrency: usize,
) -> Result<RetrievalReport> {
    if max_concurrency == 0 {
        return Err(Error::InvalidConfig("max_concurrency must be at least 1".into()));
    }
    if strategy.requires_vector() && encoder.is_none() {
        return Err(Error::InvalidConfig(format!("{} search needs an encoder", strategy.name())));
    }
    let permits = Semaphore::new(max_concurrency);

    let sequences = try_join_all(ground_truth.iter().map(|gt| {
        let permits = &permits;
        async move {
            let _permit = permits.acquire().await.map_err(|e| Error::InvalidConfig(e.to_string()))?;
            let retrieved = match encoder {
                Some(encoder) if strategy.requires_vector() => {
                    let vector = encoder.embed(&gt.vague)?;
                    strategy.search(Query::Vector(&vector)).await?
                }
                _ => strategy.search(Query::Text(&gt.vague)).await?,
            };
            Ok::<_, Error>(relevance_sequence(&retrieved, &gt.doc_id))
        }
    }))
    .await?;

    let report = RetrievalReport { queries: sequences.len(), hit_rate: hit_rate(&sequences)?, mrr: mrr(&sequences)? };
    tracing::info!(strategy = strategy.name(), queries = report.queries, hit_rate = report.hit_rate, mrr = report.mrr, "retrieval evaluated");
    Ok(report)
}
