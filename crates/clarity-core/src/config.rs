//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nesting, e.g. `APP_ELASTIC__URL`). [`Config::settings`]
//! extracts the typed, defaulted [`Settings`] used to wire the components.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> Result<()> {
        if matches!(env, "prod" | "production") {
            let settings = self.settings()?;
            if settings.embedding.use_fake {
                return Err(Error::InvalidConfig("fake embeddings are not allowed in production".into()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub elastic: ElasticSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub data: DataSettings,
    pub eval: EvalSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.eval.max_concurrency == 0 {
            return Err(Error::InvalidConfig("eval.max_concurrency must be greater than zero".into()));
        }
        if self.eval.max_retries == 0 {
            return Err(Error::InvalidConfig("eval.max_retries must be greater than zero".into()));
        }
        if self.llm.model.trim().is_empty() || self.llm.judge_model.trim().is_empty() {
            return Err(Error::InvalidConfig("llm.model and llm.judge_model must be set".into()));
        }
        if self.embedding.dim == 0 {
            return Err(Error::InvalidConfig("embedding.dim must be greater than zero".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticSettings {
    pub url: String,
    pub index_name: String,
    pub timeout_secs: u64,
}

impl Default for ElasticSettings {
    fn default() -> Self {
        Self { url: "http://localhost:9200".into(), index_name: "vague-actual".into(), timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: Option<String>,
    pub dim: usize,
    pub max_len: usize,
    pub use_fake: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { model_dir: None, dim: 384, max_len: 256, use_fake: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    #[default]
    Hosted,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub backend: LlmBackend,
    /// Overrides the backend's default endpoint.
    pub base_url: Option<String>,
    pub model: String,
    pub judge_model: String,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Hosted,
            base_url: None,
            model: "gpt-4o-mini".into(),
            judge_model: "gpt-4o-mini".into(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub documents: String,
    pub ground_truth: String,
    pub tantivy_index_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            documents: "data/initial_data.json".into(),
            ground_truth: "data/ground_truth_data.csv".into(),
            tantivy_index_dir: "data/indexes/tantivy".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalSettings {
    pub max_concurrency: usize,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
    pub request_interval_ms: u64,
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self { max_concurrency: 5, max_retries: 3, retry_delay_ms: 2000, request_interval_ms: 500 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
