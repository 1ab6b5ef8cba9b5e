//! clarity-text
//!
//! Embedded document index on tantivy. It executes the same typed queries the
//! Elasticsearch backend renders to JSON: best-fields multi-match, exact kNN
//! over stored vectors, and the blended hybrid rescoring.

pub mod tantivy_utils;
pub mod index;
mod matcher;

pub use index::TantivyIndex;
