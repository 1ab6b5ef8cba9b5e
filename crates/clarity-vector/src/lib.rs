//! clarity-vector
//!
//! Dense-vector helpers: cosine similarity and an exact in-memory store that
//! backs kNN and hybrid rescoring in the embedded index.

pub mod similarity;
pub mod store;

pub use similarity::cosine_similarity;
pub use store::VectorStore;
