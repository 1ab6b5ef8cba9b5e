use std::collections::HashMap;

use clarity_core::{DocId, Error, Result};

use crate::similarity::cosine_similarity;

/// Exact vector store keyed by document id.
///
/// The first vector fixes the dimensionality; every later insert and query
/// must match it.
#[derive(Debug, Default, Clone)]
pub struct VectorStore {
    dim: Option<usize>,
    ids: Vec<DocId>,
    vectors: Vec<Vec<f32>>,
    positions: HashMap<DocId, usize>,
}

impl VectorStore {
    pub fn new() -> Self { Self::default() }

    pub fn dim(&self) -> Option<usize> { self.dim }
    pub fn len(&self) -> usize { self.ids.len() }
    pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    /// Insert or replace the vector for `id`.
    pub fn insert(&mut self, id: &str, vector: Vec<f32>) -> Result<()> {
        match self.dim {
            Some(expected) if expected != vector.len() => {
                return Err(Error::DimensionMismatch { expected, actual: vector.len() });
            }
            None => self.dim = Some(vector.len()),
            _ => {}
        }
        match self.positions.get(id) {
            Some(&pos) => self.vectors[pos] = vector,
            None => {
                self.positions.insert(id.to_string(), self.ids.len());
                self.ids.push(id.to_string());
                self.vectors.push(vector);
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&[f32]> {
        self.positions.get(id).map(|&pos| self.vectors[pos].as_slice())
    }

    pub fn check_query(&self, query: &[f32]) -> Result<()> {
        match self.dim {
            Some(expected) if expected != query.len() => Err(Error::DimensionMismatch { expected, actual: query.len() }),
            _ => Ok(()),
        }
    }

    /// Drop the vector for `id`, keeping the insertion order of the rest.
    pub fn remove(&mut self, id: &str) -> Option<Vec<f32>> {
        let pos = self.positions.remove(id)?;
        self.ids.remove(pos);
        let vector = self.vectors.remove(pos);
        for later in &self.ids[pos..] {
            if let Some(p) = self.positions.get_mut(later) { *p -= 1; }
        }
        Some(vector)
    }

    /// Top `k` ids by cosine similarity, best first; ties keep insertion order.
    pub fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<(DocId, f32)>> {
        self.check_query(query)?;
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(query, v)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        tracing::debug!(candidates = self.len(), k, "exact knn scan");
        Ok(scored.into_iter().map(|(i, s)| (self.ids[i].clone(), s)).collect())
    }
}
