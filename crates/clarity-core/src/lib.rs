//! clarity-core
//!
//! Shared data model, error taxonomy and capability traits for the clarity
//! workspace, plus the pure pieces every other crate leans on: document
//! identity, typed index queries and ranking metrics.

pub mod config;
pub mod dataset;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod query;
pub mod timeout;
pub mod traits;
pub mod types;

pub use error::{BackendFailure, Error, Result};
pub use identity::derive_id;
pub use types::{Criterion, DocId, Document, GroundTruth, JudgementScore, RetrievedSet};
