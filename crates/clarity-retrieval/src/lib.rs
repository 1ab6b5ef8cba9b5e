//! clarity-retrieval
//!
//! Retrieval strategies over a [`SearchIndex`](clarity_core::traits::SearchIndex)
//! and the Elasticsearch HTTP backend they normally run against.

pub mod elastic;
pub mod strategy;

pub use elastic::ElasticIndex;
pub use strategy::{HybridSearch, KeywordSearch, Query, RetrievalStrategy, SemanticSearch};
