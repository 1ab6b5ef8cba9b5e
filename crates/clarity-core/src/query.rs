//! Typed index queries.
//!
//! Each retrieval strategy builds one of these. Backends either execute them
//! directly (the embedded tantivy index) or render them with
//! [`IndexQuery::to_elastic_body`], which reproduces the Elasticsearch request
//! bodies field for field.

use serde_json::{json, Value};

pub const VAGUE_EMBEDDING_FIELD: &str = "vague_embedding";

/// Painless script of the blended hybrid score, see [`hybrid_score`].
pub const HYBRID_SCRIPT: &str =
    "(cosineSimilarity(params.query_vector, 'vague_embedding') + 1.0) * 0.5 + _score * 0.5";

/// Blend cosine similarity and lexical score for hybrid ranking.
///
/// Cosine is rescaled from [-1, 1] to [0, 1], then both terms are weighted 0.5
/// and added.
pub fn hybrid_score(cosine: f32, lexical: f32) -> f32 {
    0.5 * (cosine + 1.0) + 0.5 * lexical
}

/// A field name with an optional boost, rendered `field^boost`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBoost {
    pub field: String,
    pub boost: Option<f32>,
}

impl FieldBoost {
    pub fn plain(field: &str) -> Self { Self { field: field.to_string(), boost: None } }
    pub fn boosted(field: &str, boost: f32) -> Self { Self { field: field.to_string(), boost: Some(boost) } }
    pub fn weight(&self) -> f32 { self.boost.unwrap_or(1.0) }

    pub fn to_elastic(&self) -> String {
        match self.boost {
            Some(b) => format!("{}^{}", self.field, b),
            None => self.field.clone(),
        }
    }

    /// `.keyword` sub-fields match the whole query string exactly.
    pub fn is_keyword(&self) -> bool { self.field.ends_with(".keyword") }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fuzziness {
    Auto,
}

/// Best-fields multi-match: a document scores as its best matching field.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiMatch {
    pub text: String,
    pub fields: Vec<FieldBoost>,
    pub fuzziness: Option<Fuzziness>,
}

impl MultiMatch {
    fn to_elastic(&self) -> Value {
        let mut clause = json!({
            "query": self.text,
            "fields": self.fields.iter().map(FieldBoost::to_elastic).collect::<Vec<_>>(),
            "type": "best_fields",
        });
        if let Some(Fuzziness::Auto) = self.fuzziness {
            clause["fuzziness"] = json!("AUTO");
        }
        json!({ "multi_match": clause })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnnClause {
    pub field: String,
    pub vector: Vec<f32>,
    pub k: usize,
    pub num_candidates: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexQuery {
    /// `bool.must` multi-match, ranked by lexical score.
    Lexical { size: usize, matcher: MultiMatch, source: Vec<String> },
    /// Approximate nearest neighbours by cosine similarity.
    Knn { knn: KnnClause, source: Vec<String> },
    /// `bool.should` multi-match rescored with [`hybrid_score`].
    Blended { size: usize, matcher: MultiMatch, vector_field: String, vector: Vec<f32>, source: Vec<String> },
}

impl IndexQuery {
    /// Maximum number of hits the query asks for.
    pub fn limit(&self) -> usize {
        match self {
            Self::Lexical { size, .. } | Self::Blended { size, .. } => *size,
            Self::Knn { knn, .. } => knn.k,
        }
    }

    pub fn source(&self) -> &[String] {
        match self {
            Self::Lexical { source, .. } | Self::Knn { source, .. } | Self::Blended { source, .. } => source,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Lexical { .. } => "lexical",
            Self::Knn { .. } => "knn",
            Self::Blended { .. } => "blended",
        }
    }

    pub fn to_elastic_body(&self) -> Value {
        match self {
            Self::Lexical { size, matcher, source } => json!({
                "size": size,
                "query": { "bool": { "must": matcher.to_elastic() } },
                "_source": source,
            }),
            Self::Knn { knn, source } => json!({
                "knn": {
                    "field": knn.field,
                    "query_vector": knn.vector,
                    "num_candidates": knn.num_candidates,
                    "k": knn.k,
                },
                "_source": source,
            }),
            Self::Blended { size, matcher, vector_field, vector, source } => json!({
                "size": size,
                "query": {
                    "script_score": {
                        "query": { "bool": { "should": [matcher.to_elastic()] } },
                        "script": {
                            "source": HYBRID_SCRIPT.replace(VAGUE_EMBEDDING_FIELD, vector_field),
                            "params": { "query_vector": vector },
                        },
                    }
                },
                "_source": source,
            }),
        }
    }
}
