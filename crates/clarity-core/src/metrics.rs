//! Offline ranking-quality metrics over relevance sequences.
//!
//! A relevance sequence holds one flag per retrieved rank, `true` where the
//! document at that rank is the query's ground-truth document.

use crate::error::{Error, Result};
use crate::types::RetrievedSet;

/// Flags for each rank of `retrieved`: does it hold `ground_truth_id`?
pub fn relevance_sequence(retrieved: &RetrievedSet, ground_truth_id: &str) -> Vec<bool> {
    retrieved.iter().map(|d| d.id == ground_truth_id).collect()
}

/// Fraction of sequences with at least one relevant rank.
pub fn hit_rate<S: AsRef<[bool]>>(sequences: &[S]) -> Result<f64> {
    if sequences.is_empty() {
        return Err(Error::EmptyInput("hit_rate needs at least one relevance sequence"));
    }
    let hits = sequences.iter().filter(|s| s.as_ref().contains(&true)).count();
    Ok(hits as f64 / sequences.len() as f64)
}

/// Mean reciprocal rank.
///
/// Every relevant rank of a sequence contributes `1 / (rank + 1)`, not only
/// the first one. With a single ground-truth id per query at most one rank is
/// relevant, so this matches the textbook definition in practice.
pub fn mrr<S: AsRef<[bool]>>(sequences: &[S]) -> Result<f64> {
    if sequences.is_empty() {
        return Err(Error::EmptyInput("mrr needs at least one relevance sequence"));
    }
    let total: f64 = sequences
        .iter()
        .map(|s| {
            s.as_ref()
                .iter()
                .enumerate()
                .filter(|(_, relevant)| **relevant)
                .map(|(rank, _)| 1.0 / (rank as f64 + 1.0))
                .sum::<f64>()
        })
        .sum();
    Ok(total / sequences.len() as f64)
}
