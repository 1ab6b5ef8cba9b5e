//! Loading and saving the document corpus and ground-truth labels.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::traits::Embedder;
use crate::types::{Document, GroundTruth};

#[derive(Debug, Deserialize)]
struct RawRecord {
    vague: String,
    actual: String,
}

const EMBED_BATCH: usize = 64;

/// Read a JSON array of `{vague, actual}` records and derive ids.
///
/// Extra fields are ignored; ids and `combined_text` are always recomputed so
/// a stale file cannot smuggle in an inconsistent key.
pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let raw = fs::read_to_string(path)?;
    let records: Vec<RawRecord> = serde_json::from_str(&raw)
        .map_err(|e| Error::Dataset(format!("{}: {}", path.display(), e)))?;
    let docs: Vec<Document> = records.into_iter().map(|r| Document::new(r.vague, r.actual)).collect();
    info!(path = %path.display(), documents = docs.len(), "loaded documents");
    Ok(docs)
}

pub fn save_documents(path: &Path, docs: &[Document]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() { fs::create_dir_all(parent)?; }
    }
    let json = serde_json::to_string(docs).map_err(|e| Error::Dataset(e.to_string()))?;
    fs::write(path, json)?;
    Ok(())
}

/// Fill `embedding` from each document's `vague` field.
pub fn embed_documents(docs: &mut [Document], encoder: &dyn Embedder) -> Result<()> {
    for batch in docs.chunks_mut(EMBED_BATCH) {
        let texts: Vec<String> = batch.iter().map(|d| d.vague.clone()).collect();
        let vectors = encoder.embed_batch(&texts)?;
        if vectors.len() != batch.len() {
            return Err(Error::Encoding(format!("expected {} vectors, got {}", batch.len(), vectors.len())));
        }
        for (doc, vector) in batch.iter_mut().zip(vectors) {
            doc.embedding = Some(vector);
        }
    }
    Ok(())
}

/// Read a `vague,doc_id` CSV.
pub fn load_ground_truth(path: &Path) -> Result<Vec<GroundTruth>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| Error::Dataset(format!("{}: {}", path.display(), e)))?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<GroundTruth>, _>>()
        .map_err(|e| Error::Dataset(format!("{}: {}", path.display(), e)))?;
    info!(path = %path.display(), queries = rows.len(), "loaded ground truth");
    Ok(rows)
}

pub fn write_ground_truth(path: &Path, rows: &[GroundTruth]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() { fs::create_dir_all(parent)?; }
    }
    let mut writer = csv::Writer::from_path(path).map_err(|e| Error::Dataset(e.to_string()))?;
    for row in rows {
        writer.serialize(row).map_err(|e| Error::Dataset(e.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}
