//! Keyword, semantic and hybrid retrieval.
//!
//! Each strategy builds its own [`IndexQuery`] shape, runs it on the shared
//! index handle and trims the hits into a [`RetrievedSet`]. [`RetrievalStrategy`]
//! is the closed set callers dispatch on.

use std::sync::Arc;

use clarity_core::query::{FieldBoost, Fuzziness, IndexQuery, KnnClause, MultiMatch, VAGUE_EMBEDDING_FIELD};
use clarity_core::traits::{Embedder, SearchIndex};
use clarity_core::{Error, Result, RetrievedSet};

fn default_source() -> Vec<String> {
    ["vague", "actual", "id"].iter().map(|s| s.to_string()).collect()
}

/// What a strategy searches with: raw text, or a pre-computed vector.
#[derive(Debug, Clone, Copy)]
pub enum Query<'a> {
    Text(&'a str),
    Vector(&'a [f32]),
}

/// Best-fields lexical match on `vague^3` and `actual`.
pub struct KeywordSearch {
    index: Arc<dyn SearchIndex>,
    size: usize,
}

impl KeywordSearch {
    pub const DEFAULT_SIZE: usize = 5;

    pub fn new(index: Arc<dyn SearchIndex>) -> Self { Self { index, size: Self::DEFAULT_SIZE } }

    pub fn index_query(&self, text: &str) -> IndexQuery {
        IndexQuery::Lexical {
            size: self.size,
            matcher: MultiMatch {
                text: text.to_string(),
                fields: vec![FieldBoost::boosted("vague", 3.0), FieldBoost::plain("actual")],
                fuzziness: None,
            },
            source: default_source(),
        }
    }

    pub async fn search(&self, text: &str) -> Result<RetrievedSet> {
        let hits = self.index.search(&self.index_query(text)).await?;
        Ok(RetrievedSet::from_ranked(hits, self.size))
    }
}

/// Nearest neighbours of a query vector on `vague_embedding`.
pub struct SemanticSearch {
    index: Arc<dyn SearchIndex>,
    k: usize,
    num_candidates: usize,
    dims: Option<usize>,
}

impl SemanticSearch {
    pub const DEFAULT_K: usize = 5;
    pub const NUM_CANDIDATES: usize = 100;

    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index, k: Self::DEFAULT_K, num_candidates: Self::NUM_CANDIDATES, dims: None }
    }

    /// Reject query vectors of any other length before they reach the index.
    pub fn with_dims(mut self, dims: usize) -> Self {
        self.dims = Some(dims);
        self
    }

    pub fn index_query(&self, vector: &[f32]) -> IndexQuery {
        IndexQuery::Knn {
            knn: KnnClause { field: VAGUE_EMBEDDING_FIELD.to_string(), vector: vector.to_vec(), k: self.k, num_candidates: self.num_candidates },
            source: default_source(),
        }
    }

    pub async fn search(&self, vector: &[f32]) -> Result<RetrievedSet> {
        if let Some(expected) = self.dims {
            if vector.len() != expected {
                return Err(Error::DimensionMismatch { expected, actual: vector.len() });
            }
        }
        let hits = self.index.search(&self.index_query(vector)).await?;
        Ok(RetrievedSet::from_ranked(hits, self.k))
    }
}

/// Fuzzy multi-field lexical match rescored with cosine similarity.
///
/// Final score is `0.5 * (cosine + 1) + 0.5 * lexical`, see
/// [`hybrid_score`](clarity_core::query::hybrid_score). Takes raw text and
/// encodes it with its own encoder.
pub struct HybridSearch {
    index: Arc<dyn SearchIndex>,
    encoder: Arc<dyn Embedder>,
    size: usize,
}

impl HybridSearch {
    pub const DEFAULT_SIZE: usize = 10;

    pub fn new(index: Arc<dyn SearchIndex>, encoder: Arc<dyn Embedder>) -> Self {
        Self { index, encoder, size: Self::DEFAULT_SIZE }
    }

    pub fn index_query(&self, text: &str, vector: Vec<f32>) -> IndexQuery {
        IndexQuery::Blended {
            size: self.size,
            matcher: MultiMatch {
                text: text.to_string(),
                fields: vec![
                    FieldBoost::boosted("vague", 3.0),
                    FieldBoost::boosted("vague.keyword", 2.0),
                    FieldBoost::boosted("actual", 2.0),
                    FieldBoost::plain("actual.keyword"),
                    FieldBoost::boosted("combined_text", 4.0),
                ],
                fuzziness: Some(Fuzziness::Auto),
            },
            vector_field: VAGUE_EMBEDDING_FIELD.to_string(),
            vector,
            source: default_source(),
        }
    }

    pub async fn search(&self, text: &str) -> Result<RetrievedSet> {
        let vector = self.encoder.embed(text)?;
        let hits = self.index.search(&self.index_query(text, vector)).await?;
        Ok(RetrievedSet::from_ranked(hits, self.size))
    }
}

pub enum RetrievalStrategy {
    Keyword(KeywordSearch),
    Semantic(SemanticSearch),
    Hybrid(HybridSearch),
}

impl RetrievalStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Keyword(_) => "keyword",
            Self::Semantic(_) => "semantic",
            Self::Hybrid(_) => "hybrid",
        }
    }

    /// Whether callers must encode the query before searching.
    pub fn requires_vector(&self) -> bool { matches!(self, Self::Semantic(_)) }

    /// Upper bound on the size of every returned set.
    pub fn k(&self) -> usize {
        match self {
            Self::Keyword(s) => s.size,
            Self::Semantic(s) => s.k,
            Self::Hybrid(s) => s.size,
        }
    }

    pub async fn search(&self, query: Query<'_>) -> Result<RetrievedSet> {
        let set = match (self, query) {
            (Self::Keyword(s), Query::Text(text)) => s.search(text).await?,
            (Self::Hybrid(s), Query::Text(text)) => s.search(text).await?,
            (Self::Semantic(s), Query::Vector(vector)) => s.search(vector).await?,
            (Self::Semantic(_), Query::Text(_)) => {
                return Err(Error::InvalidInput("semantic search needs an encoded query vector".into()));
            }
            (_, Query::Vector(_)) => {
                return Err(Error::InvalidInput(format!("{} search needs query text", self.name())));
            }
        };
        tracing::debug!(strategy = self.name(), hits = set.len(), "retrieved");
        Ok(set)
    }
}

impl From<KeywordSearch> for RetrievalStrategy {
    fn from(s: KeywordSearch) -> Self { Self::Keyword(s) }
}

impl From<SemanticSearch> for RetrievalStrategy {
    fn from(s: SemanticSearch) -> Self { Self::Semantic(s) }
}

impl From<HybridSearch> for RetrievalStrategy {
    fn from(s: HybridSearch) -> Self { Self::Hybrid(s) }
}
