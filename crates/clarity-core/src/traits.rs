use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::query::IndexQuery;
use crate::types::Document;

/// Maps text to fixed-dimension vectors.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| Error::Encoding("encoder returned no vector".into()))
    }
}

/// A searchable document index keyed by document id.
///
/// Hits come back in the index's ranking order, projected to the query's
/// `_source` fields. No match is an empty list, not an error.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    fn name(&self) -> &str;
    async fn search(&self, query: &IndexQuery) -> Result<Vec<Document>>;
}

/// Write side of an index, used by ingestion.
#[async_trait]
pub trait DocumentIndexer: Send + Sync {
    /// Store documents under their `id`, replacing existing ones. Returns the count written.
    async fn index_documents(&self, docs: &[Document]) -> Result<usize>;
}

/// A language model that turns a prompt into free text.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    fn model(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String>;
}
