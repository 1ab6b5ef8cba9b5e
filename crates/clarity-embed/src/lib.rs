//! clarity-embed
//!
//! Sentence encoder for query and document vectors. [`SentenceEncoder`] runs a
//! BERT-family sentence-transformer checkpoint (e.g. `multi-qa-MiniLM-L6-cos-v1`)
//! on candle with masked mean pooling; [`FakeEmbedder`] is a deterministic
//! hashing stand-in for tests and development.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use clarity_core::config::{expand_path, EmbeddingSettings};
use clarity_core::traits::Embedder;
use clarity_core::{Error, Result};
use tokenizers::Tokenizer;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;
pub use tokenize::tokenize_on_device;

const DEFAULT_MODEL: &str = "multi-qa-MiniLM-L6-cos-v1";
const BERT_PAD_ID: u32 = 0;

pub(crate) fn encoding(e: candle_core::Error) -> Error {
    Error::Encoding(e.to_string())
}

pub struct SentenceEncoder { model: BertModel, tokenizer: Tokenizer, device: Device, dim: usize, max_len: usize }

impl SentenceEncoder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = device::select_device();
        tracing::info!(model_dir = %model_dir.display(), "loading sentence encoder");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::Encoding(format!("failed to load tokenizer from {}: {}", tokenizer_path.display(), e)))?;
        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)
            .map_err(|e| Error::Encoding(format!("invalid model config {}: {}", config_path.display(), e)))?;
        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DTYPE, &device);
        let model = BertModel::load(vb, &config).map_err(encoding)?;
        tracing::info!(dim = config.hidden_size, max_len, "sentence encoder ready");
        Ok(Self { model, tokenizer, device, dim: config.hidden_size, max_len })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, self.max_len, BERT_PAD_ID, &self.device)?;
        let token_type_ids = input_ids.zeros_like().map_err(encoding)?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask)).map_err(encoding)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb: Vec<f32> = pooled.to_device(&Device::Cpu).and_then(|t| t.squeeze(0)).and_then(|t| t.to_vec1()).map_err(encoding)?;
        if emb.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: emb.len() });
        }
        if start.elapsed().as_millis() > 100 { tracing::warn!(elapsed_ms = start.elapsed().as_millis() as u64, "slow embedding"); }
        Ok(emb)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return candle_core::safetensors::load(&safetensors, device).map_err(encoding);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&pickle).map_err(encoding)?;
    weights
        .into_iter()
        .map(|(name, t)| t.to_device(device).map(|t| (name, t)).map_err(encoding))
        .collect()
}

impl Embedder for SentenceEncoder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

/// Token-hashing embedder: shared words give similar vectors, identical text identical ones.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder { pub fn new(dim: usize) -> Self { Self { dim } } }

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

impl FakeEmbedder {
    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher}; use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let token = token.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            if token.is_empty() { continue; }
            let mut hasher = XxHash64::with_seed(0); token.hash(&mut hasher); let h = hasher.finish();
            let idx = (h as usize) % self.dim; let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6); for x in &mut v { *x /= norm; }
        v
    }
}

fn fake_requested_by_env() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    if settings.use_fake || fake_requested_by_env() {
        tracing::info!(dim = settings.dim, "using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(settings.dim)));
    }
    let dir = resolve_model_dir(settings.model_dir.as_deref())?;
    let encoder = SentenceEncoder::load(&dir, settings.max_len)?;
    if encoder.dim() != settings.dim {
        return Err(Error::DimensionMismatch { expected: settings.dim, actual: encoder.dim() });
    }
    Ok(Box::new(encoder))
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured { let p = expand_path(dir); if p.exists() { return Ok(p); } }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) { let p = PathBuf::from(&dir); if p.exists() { tracing::info!(var, dir = %p.display(), "model dir from env"); return Ok(p); } }
    }
    let root = Path::new("../models").join(DEFAULT_MODEL); if root.exists() { return Ok(root); }
    let local = Path::new("models").join(DEFAULT_MODEL); if local.exists() { return Ok(local); }
    Err(Error::InvalidConfig(format!("could not locate the {DEFAULT_MODEL} model directory")))
}
