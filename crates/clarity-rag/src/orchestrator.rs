use std::sync::Arc;

use tracing::{debug, info};

use clarity_core::traits::{AnswerGenerator, Embedder};
use clarity_core::{Error, Result, RetrievedSet};
use clarity_retrieval::{Query, RetrievalStrategy};

use crate::prompt::PromptBuilder;

/// Retrieval, prompt construction and generation behind one `answer` call.
///
/// Every collaborator is injected at construction, so swapping the generator
/// backend leaves retrieval and prompts untouched. Failures propagate as-is;
/// there are no retries at this layer.
///
/// ```rust,ignore
/// let rag = RagOrchestrator::builder()
///     .strategy(SemanticSearch::new(index).into())
///     .encoder(encoder)
///     .generator(Arc::new(ChatCompletionsGenerator::local("phi3")))
///     .build()?;
/// let answer = rag.answer("We need to sync up on the roadmap").await?;
/// ```
pub struct RagOrchestrator {
    strategy: RetrievalStrategy,
    encoder: Option<Arc<dyn Embedder>>,
    prompt: PromptBuilder,
    generator: Arc<dyn AnswerGenerator>,
}

impl RagOrchestrator {
    pub fn builder() -> RagOrchestratorBuilder { RagOrchestratorBuilder::default() }

    pub fn strategy(&self) -> &RetrievalStrategy { &self.strategy }

    /// Run the configured strategy, encoding the query first when it needs a vector.
    pub async fn retrieve(&self, vague: &str) -> Result<RetrievedSet> {
        if self.strategy.requires_vector() {
            let encoder = self
                .encoder
                .as_ref()
                .ok_or_else(|| Error::InvalidConfig(format!("{} search needs an encoder", self.strategy.name())))?;
            let vector = encoder.embed(vague)?;
            self.strategy.search(Query::Vector(&vector)).await
        } else {
            self.strategy.search(Query::Text(vague)).await
        }
    }

    pub fn build_prompt(&self, vague: &str, retrieved: &RetrievedSet) -> String {
        self.prompt.build(vague, retrieved)
    }

    /// Answer text exactly as the generator returned it.
    pub async fn answer(&self, vague: &str) -> Result<String> {
        let (_, answer) = self.answer_with_context(vague).await?;
        Ok(answer)
    }

    /// Like [`answer`](Self::answer), also handing back what was retrieved.
    pub async fn answer_with_context(&self, vague: &str) -> Result<(RetrievedSet, String)> {
        let retrieved = self.retrieve(vague).await?;
        debug!(strategy = self.strategy.name(), context_docs = retrieved.len(), "building prompt");
        let prompt = self.build_prompt(vague, &retrieved);
        let answer = self.generator.generate(&prompt).await?;
        info!(strategy = self.strategy.name(), model = self.generator.model(), "answered");
        Ok((retrieved, answer))
    }
}

#[derive(Default)]
pub struct RagOrchestratorBuilder {
    strategy: Option<RetrievalStrategy>,
    encoder: Option<Arc<dyn Embedder>>,
    prompt: Option<PromptBuilder>,
    generator: Option<Arc<dyn AnswerGenerator>>,
}

impl RagOrchestratorBuilder {
    pub fn strategy(mut self, strategy: RetrievalStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Encoder for strategies that search by vector.
    pub fn encoder(mut self, encoder: Arc<dyn Embedder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Defaults to [`PromptBuilder::translator`].
    pub fn prompt(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// # Errors
    ///
    /// [`Error::InvalidConfig`] when the strategy or generator is missing, or
    /// the strategy needs vectors and no encoder was given.
    pub fn build(self) -> Result<RagOrchestrator> {
        let strategy = self.strategy.ok_or_else(|| Error::InvalidConfig("strategy is required".into()))?;
        let generator = self.generator.ok_or_else(|| Error::InvalidConfig("generator is required".into()))?;
        if strategy.requires_vector() && self.encoder.is_none() {
            return Err(Error::InvalidConfig(format!("{} search needs an encoder", strategy.name())));
        }
        Ok(RagOrchestrator { strategy, encoder: self.encoder, prompt: self.prompt.unwrap_or_default(), generator })
    }
}
