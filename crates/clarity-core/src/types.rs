//! Domain types used by the index backends, the orchestrator and the judge.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::identity::derive_id;

pub type DocId = String;

/// A vague statement paired with its plain meaning.
///
/// - `id`: content-addressed key, see [`derive_id`]
/// - `embedding`: vector of `vague`, stored in the index as `vague_embedding`
/// - `combined_text`: `"{vague} {actual}"`, used by hybrid lexical matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: DocId,
    pub vague: String,
    pub actual: String,
    #[serde(rename = "vague_embedding", default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined_text: Option<String>,
}

impl Document {
    pub fn new(vague: impl Into<String>, actual: impl Into<String>) -> Self {
        let vague = vague.into();
        let actual = actual.into();
        Self {
            id: derive_id(&vague, &actual),
            combined_text: Some(format!("{vague} {actual}")),
            vague,
            actual,
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// True when the stored id is the one its fields derive to.
    pub fn has_consistent_id(&self) -> bool {
        self.id == derive_id(&self.vague, &self.actual)
    }
}

/// Ranked documents for one query: at most `k`, no repeated ids, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedSet {
    docs: Vec<Document>,
}

impl RetrievedSet {
    /// Keep the ranking order, drop later duplicates of an id, cut at `k`.
    pub fn from_ranked(ranked: impl IntoIterator<Item = Document>, k: usize) -> Self {
        let mut seen = HashSet::new();
        let docs = ranked
            .into_iter()
            .filter(|d| seen.insert(d.id.clone()))
            .take(k)
            .collect();
        Self { docs }
    }

    pub fn len(&self) -> usize { self.docs.len() }
    pub fn is_empty(&self) -> bool { self.docs.is_empty() }
    pub fn documents(&self) -> &[Document] { &self.docs }
    pub fn iter(&self) -> std::slice::Iter<'_, Document> { self.docs.iter() }
    pub fn ids(&self) -> Vec<&str> { self.docs.iter().map(|d| d.id.as_str()).collect() }
}

impl<'a> IntoIterator for &'a RetrievedSet {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;
    fn into_iter(self) -> Self::IntoIter { self.docs.iter() }
}

/// One labelled query: a vague statement and the id of the document it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub vague: String,
    pub doc_id: DocId,
}

/// The four rubric criteria, spelled exactly as the judge template prints them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    Accuracy,
    Clarity,
    Completeness,
    Relevance,
}

impl Criterion {
    pub const ALL: [Criterion; 4] = [Self::Accuracy, Self::Clarity, Self::Completeness, Self::Relevance];

    pub fn label(self) -> &'static str {
        match self {
            Self::Accuracy => "Accuracy",
            Self::Clarity => "Clarity",
            Self::Completeness => "Completeness",
            Self::Relevance => "Relevance",
        }
    }

    /// Case-sensitive lookup by label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}

/// Structured result of a judge reply.
///
/// Fields the reply did not contain stay at their sentinel: `0` for scores,
/// empty for `explanation`, `None` for `improvement_suggestions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JudgementScore {
    pub accuracy: u32,
    pub clarity: u32,
    pub completeness: u32,
    pub relevance: u32,
    pub overall_score: f64,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvement_suggestions: Option<String>,
}

impl JudgementScore {
    pub fn criterion(&self, criterion: Criterion) -> u32 {
        match criterion {
            Criterion::Accuracy => self.accuracy,
            Criterion::Clarity => self.clarity,
            Criterion::Completeness => self.completeness,
            Criterion::Relevance => self.relevance,
        }
    }

    pub fn set_criterion(&mut self, criterion: Criterion, score: u32) {
        match criterion {
            Criterion::Accuracy => self.accuracy = score,
            Criterion::Clarity => self.clarity = score,
            Criterion::Completeness => self.completeness = score,
            Criterion::Relevance => self.relevance = score,
        }
    }

    /// All four criteria were found in the reply.
    pub fn is_complete(&self) -> bool {
        Criterion::ALL.into_iter().all(|c| self.criterion(c) != 0)
    }
}
