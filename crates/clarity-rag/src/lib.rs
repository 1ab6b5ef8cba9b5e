//! clarity-rag
//!
//! Retrieval-augmented answering for vague statements, and the tooling to
//! check it: an LLM judge with a tolerant reply parser, offline retrieval
//! evaluation, and ground-truth generation.

pub mod evaluate;
pub mod generator;
pub mod ground_truth;
pub mod judge;
pub mod orchestrator;
pub mod prompt;
pub mod retry;

pub use evaluate::{evaluate_retrieval, RetrievalReport};
pub use generator::ChatCompletionsGenerator;
pub use ground_truth::{generate_ground_truth, parse_variants, GroundTruthOptions};
pub use judge::{JudgementParser, QualityJudge};
pub use orchestrator::{RagOrchestrator, RagOrchestratorBuilder};
pub use prompt::PromptBuilder;
pub use retry::retry_fixed;
