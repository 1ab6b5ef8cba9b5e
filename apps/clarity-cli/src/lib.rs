//! Shared wiring for the `clarity` and `clarity-indexer` binaries.

use std::sync::Arc;

use anyhow::Context;
use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

use clarity_core::config::{expand_path, Config, Settings};
use clarity_core::traits::{Embedder, SearchIndex};
use clarity_embed::get_default_embedder;
use clarity_retrieval::{ElasticIndex, HybridSearch, KeywordSearch, RetrievalStrategy, SemanticSearch};
use clarity_text::TantivyIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyKind {
    Keyword,
    Semantic,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    Elastic,
    Tantivy,
}

/// `RUST_LOG` wins; otherwise `info`. Logs go to stderr so stdout stays clean.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Load `.env`, then the layered configuration.
pub fn load_settings() -> anyhow::Result<Settings> {
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, "no .env loaded");
    }
    let config = Config::load().context("loading configuration")?;
    config.settings().context("reading settings")
}

pub fn load_encoder(settings: &Settings) -> anyhow::Result<Arc<dyn Embedder>> {
    let encoder = get_default_embedder(&settings.embedding).context("loading sentence encoder")?;
    Ok(Arc::from(encoder))
}

pub fn open_index(backend: BackendKind, settings: &Settings) -> anyhow::Result<Arc<dyn SearchIndex>> {
    Ok(match backend {
        BackendKind::Elastic => Arc::new(ElasticIndex::from_settings(&settings.elastic)),
        BackendKind::Tantivy => {
            let dir = expand_path(&settings.data.tantivy_index_dir);
            Arc::new(
                TantivyIndex::open_in_dir(&settings.elastic.index_name, &dir)
                    .with_context(|| format!("opening tantivy index at {}", dir.display()))?,
            )
        }
    })
}

/// Keyword search runs without an encoder, so none is loaded for it.
pub fn load_encoder_for(kind: StrategyKind, settings: &Settings) -> anyhow::Result<Option<Arc<dyn Embedder>>> {
    match kind {
        StrategyKind::Keyword => Ok(None),
        StrategyKind::Semantic | StrategyKind::Hybrid => load_encoder(settings).map(Some),
    }
}

pub fn build_strategy(
    kind: StrategyKind,
    index: Arc<dyn SearchIndex>,
    encoder: Option<Arc<dyn Embedder>>,
    settings: &Settings,
) -> anyhow::Result<RetrievalStrategy> {
    Ok(match (kind, encoder) {
        (StrategyKind::Keyword, _) => KeywordSearch::new(index).into(),
        (StrategyKind::Semantic, _) => SemanticSearch::new(index).with_dims(settings.embedding.dim).into(),
        (StrategyKind::Hybrid, Some(encoder)) => HybridSearch::new(index, encoder).into(),
        (StrategyKind::Hybrid, None) => anyhow::bail!("hybrid search needs an encoder"),
    })
}

/// Print the front-end message for a library error, then the error chain.
pub fn report(err: &anyhow::Error) {
    if let Some(e) = err.downcast_ref::<clarity_core::Error>() {
        eprintln!("{}", e.user_message());
    }
    eprintln!("Error: {err:#}");
}
