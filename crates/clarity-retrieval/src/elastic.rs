//! Elasticsearch backend over its REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use clarity_core::config::ElasticSettings;
use clarity_core::query::IndexQuery;
use clarity_core::timeout::with_deadline;
use clarity_core::traits::{DocumentIndexer, SearchIndex};
use clarity_core::{Document, Error, Result};

/// Handle to one Elasticsearch index.
///
/// Every request honours the optional deadline; expiry surfaces as
/// [`Error::Timeout`], connection failures as [`Error::IndexUnavailable`] and
/// error statuses as [`Error::IndexRejected`].
pub struct ElasticIndex {
    client: reqwest::Client,
    base_url: String,
    index: String,
    deadline: Option<Duration>,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(rename = "_source")]
    source: Document,
}

#[derive(Deserialize)]
struct BulkResponse {
    errors: bool,
    #[serde(default)]
    items: Vec<Value>,
}

impl ElasticIndex {
    pub fn new(base_url: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            index: index.into(),
            deadline: None,
        }
    }

    pub fn from_settings(settings: &ElasticSettings) -> Self {
        Self::new(&settings.url, &settings.index_name).with_deadline(Duration::from_secs(settings.timeout_secs))
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn unavailable(&self, e: reqwest::Error) -> Error {
        error!(index = %self.index, error = %e, "index request failed");
        Error::IndexUnavailable { index: self.index.clone(), message: e.to_string() }
    }

    fn rejected(&self, message: impl Into<String>) -> Error {
        Error::IndexRejected { index: self.index.clone(), message: message.into() }
    }

    /// Send `request`, returning the body of a 2xx answer. Statuses listed in
    /// `tolerated` also count as success.
    async fn send(&self, operation: &'static str, request: reqwest::RequestBuilder, tolerated: &[u16]) -> Result<String> {
        with_deadline(operation, self.deadline, async {
            let response = request.send().await.map_err(|e| self.unavailable(e))?;
            let status = response.status();
            let body = response.text().await.map_err(|e| self.unavailable(e))?;
            if status.is_success() || tolerated.contains(&status.as_u16()) {
                return Ok(body);
            }
            let reason = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["error"]["reason"].as_str().map(str::to_string))
                .unwrap_or(body);
            error!(index = %self.index, %status, operation, "index rejected request");
            Err(self.rejected(format!("{status}: {reason}")))
        })
        .await
    }

    /// Drop the index if present, then create it with the document mapping.
    pub async fn recreate(&self, dims: usize) -> Result<()> {
        let url = self.url(&self.index);
        self.send("index delete", self.client.delete(&url), &[404]).await?;
        self.send("index create", self.client.put(&url).json(&index_definition(dims)), &[]).await?;
        info!(index = %self.index, dims, "index recreated");
        Ok(())
    }
}

/// Settings and mapping for the vague/actual document index.
pub fn index_definition(dims: usize) -> Value {
    json!({
        "settings": { "number_of_shards": 1, "number_of_replicas": 0 },
        "mappings": {
            "properties": {
                "id": { "type": "keyword" },
                "vague": { "type": "text", "fields": { "keyword": { "type": "keyword" } } },
                "actual": { "type": "text", "fields": { "keyword": { "type": "keyword" } } },
                "combined_text": { "type": "text" },
                "vague_embedding": { "type": "dense_vector", "dims": dims, "index": true, "similarity": "cosine" },
            }
        }
    })
}

#[async_trait]
impl SearchIndex for ElasticIndex {
    fn name(&self) -> &str { &self.index }

    async fn search(&self, query: &IndexQuery) -> Result<Vec<Document>> {
        let body = query.to_elastic_body();
        debug!(index = %self.index, kind = query.kind(), "search");
        let request = self.client.post(self.url(&format!("{}/_search", self.index))).json(&body);
        let raw = self.send("index search", request, &[]).await?;
        let parsed: SearchResponse = serde_json::from_str(&raw)
            .map_err(|e| self.rejected(format!("unexpected search response: {e}")))?;
        Ok(parsed
            .hits
            .hits
            .into_iter()
            .map(|hit| {
                let mut doc = hit.source;
                if doc.id.is_empty() {
                    doc.id = hit.id.unwrap_or_default();
                }
                doc
            })
            .collect())
    }
}

#[async_trait]
impl DocumentIndexer for ElasticIndex {
    async fn index_documents(&self, docs: &[Document]) -> Result<usize> {
        if docs.is_empty() { return Ok(0); }
        let mut payload = String::new();
        for doc in docs {
            let action = json!({ "index": { "_index": self.index, "_id": doc.id } });
            let source = serde_json::to_string(doc).map_err(|e| Error::InvalidInput(e.to_string()))?;
            payload.push_str(&action.to_string());
            payload.push('\n');
            payload.push_str(&source);
            payload.push('\n');
        }
        let request = self
            .client
            .post(self.url("_bulk?refresh=true"))
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(payload);
        let raw = self.send("bulk index", request, &[]).await?;
        let parsed: BulkResponse = serde_json::from_str(&raw)
            .map_err(|e| self.rejected(format!("unexpected bulk response: {e}")))?;
        if parsed.errors {
            let first = parsed
                .items
                .iter()
                .find_map(|item| item["index"]["error"]["reason"].as_str())
                .unwrap_or("bulk request reported errors");
            return Err(self.rejected(first.to_string()));
        }
        info!(index = %self.index, count = docs.len(), "indexed documents");
        Ok(docs.len())
    }
}
