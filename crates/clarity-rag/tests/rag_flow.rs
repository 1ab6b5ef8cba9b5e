use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use clarity_core::dataset::embed_documents;
use clarity_core::traits::{AnswerGenerator, DocumentIndexer, Embedder};
use clarity_core::{BackendFailure, Document, Error, GroundTruth, Result};
use clarity_embed::FakeEmbedder;
use clarity_rag::{
    evaluate_retrieval, generate_ground_truth, GroundTruthOptions, PromptBuilder, QualityJudge, RagOrchestrator,
};
use clarity_retrieval::{KeywordSearch, SemanticSearch};
use clarity_text::TantivyIndex;

/// Replays canned replies in order and records every prompt it was given.
struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn new(replies: Vec<Result<String>>) -> Self {
        Self { replies: Mutex::new(replies.into()), prompts: Mutex::new(Vec::new()) }
    }

    fn always(reply: &str, n: usize) -> Self {
        Self::new((0..n).map(|_| Ok(reply.to_string())).collect())
    }

    fn prompts(&self) -> Vec<String> { self.prompts.lock().unwrap().clone() }
}

#[async_trait]
impl AnswerGenerator for ScriptedGenerator {
    fn model(&self) -> &str { "scripted" }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::GenerationBackend { kind: BackendFailure::InvalidResponse, message: "script exhausted".into() }))
    }
}

const JUDGE_REPLY: &str = "Criteria Scores:

Accuracy: 5
Clarity: 4
Completeness: 4
Relevance: 5

Overall Score: 4.5
Explanation: Captures the intent to schedule a planning meeting.";

async fn roadmap_index() -> Arc<TantivyIndex> {
    let index = TantivyIndex::create_in_ram("vague-actual").unwrap();
    index.index_documents(&[Document::new("sync up on the roadmap", "schedule a planning meeting")]).await.unwrap();
    Arc::new(index)
}

#[tokio::test]
async fn keyword_rag_answers_and_judge_scores() {
    let index = roadmap_index().await;
    let generator = Arc::new(ScriptedGenerator::always("Let's schedule a planning meeting.", 1));
    let rag = RagOrchestrator::builder()
        .strategy(KeywordSearch::new(index).into())
        .generator(generator.clone())
        .build()
        .unwrap();

    let (retrieved, answer) = rag.answer_with_context("We need to sync up on the roadmap").await.unwrap();
    assert_eq!(retrieved.documents()[0].vague, "sync up on the roadmap");
    assert!(retrieved.documents()[0].has_consistent_id());
    assert_eq!(answer, "Let's schedule a planning meeting.");

    let prompt = &generator.prompts()[0];
    assert!(prompt.contains("VAGUE: We need to sync up on the roadmap"));
    assert!(prompt.contains("vague: sync up on the roadmap\nactual: schedule a planning meeting\n\n"));

    let judge = QualityJudge::new(Arc::new(ScriptedGenerator::always(JUDGE_REPLY, 1)));
    let score = judge.judge("We need to sync up on the roadmap", &answer).await.unwrap();
    assert!(score.is_complete());
    assert_eq!((score.accuracy, score.clarity, score.completeness, score.relevance), (5, 4, 4, 5));
    assert_eq!(score.overall_score, 4.5);
}

#[tokio::test]
async fn judge_prompt_carries_both_texts() {
    let generator = Arc::new(ScriptedGenerator::always("nonsense", 1));
    let judge = QualityJudge::new(generator.clone());
    let score = judge.judge("circle back", "we will not decide now").await.unwrap();
    assert_eq!(score.overall_score, 0.0);
    let prompt = &generator.prompts()[0];
    assert!(prompt.contains("Vague IT boss question: circle back\n"));
    assert!(prompt.contains("RAG Translation: we will not decide now\n"));
}

#[tokio::test]
async fn generator_failures_propagate() {
    let index = roadmap_index().await;
    let generator = Arc::new(ScriptedGenerator::new(vec![Err(Error::GenerationBackend {
        kind: BackendFailure::Unreachable,
        message: "connection refused".into(),
    })]));
    let rag = RagOrchestrator::builder()
        .strategy(KeywordSearch::new(index).into())
        .prompt(PromptBuilder::ambiguity_resolver())
        .generator(generator.clone())
        .build()
        .unwrap();
    let err = rag.answer("sync up").await.unwrap_err();
    assert!(matches!(err, Error::GenerationBackend { kind: BackendFailure::Unreachable, .. }));
    assert_eq!(generator.prompts().len(), 1, "no retries inside the orchestrator");
    assert!(generator.prompts()[0].ends_with("CLEAR STATEMENT:"));
}

#[tokio::test]
async fn semantic_rag_encodes_the_query() {
    let encoder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(32));
    let mut docs = vec![
        Document::new("sync up on the roadmap", "schedule a planning meeting"),
        Document::new("put a pin in it", "postpone this topic"),
    ];
    embed_documents(&mut docs, encoder.as_ref()).unwrap();
    let index = TantivyIndex::create_in_ram("vague-actual").unwrap();
    index.index_documents(&docs).await.unwrap();
    let index = Arc::new(index);

    let generator = Arc::new(ScriptedGenerator::always("answer", 1));
    assert!(matches!(
        RagOrchestrator::builder().strategy(SemanticSearch::new(index.clone()).into()).generator(generator.clone()).build(),
        Err(Error::InvalidConfig(_))
    ));

    let rag = RagOrchestrator::builder()
        .strategy(SemanticSearch::new(index).with_dims(32).into())
        .encoder(encoder)
        .generator(generator)
        .build()
        .unwrap();
    let retrieved = rag.retrieve("put a pin in it").await.unwrap();
    assert_eq!(retrieved.documents()[0].actual, "postpone this topic");
}

#[tokio::test]
async fn evaluation_scores_labelled_queries() {
    let index = TantivyIndex::create_in_ram("vague-actual").unwrap();
    let docs = vec![
        Document::new("sync up on the roadmap", "schedule a planning meeting"),
        Document::new("put a pin in it", "postpone this topic"),
    ];
    index.index_documents(&docs).await.unwrap();
    let strategy = KeywordSearch::new(Arc::new(index)).into();

    let ground_truth = vec![
        GroundTruth { vague: "we should sync up about the roadmap".into(), doc_id: docs[0].id.clone() },
        GroundTruth { vague: "let's put a pin in this one".into(), doc_id: docs[1].id.clone() },
        GroundTruth { vague: "completely unrelated words".into(), doc_id: docs[1].id.clone() },
    ];
    let report = evaluate_retrieval(&strategy, None, &ground_truth, 2).await.unwrap();
    assert_eq!(report.queries, 3);
    assert!((report.hit_rate - 2.0 / 3.0).abs() < 1e-9);
    assert!((report.mrr - 2.0 / 3.0).abs() < 1e-9);

    assert!(matches!(evaluate_retrieval(&strategy, None, &[], 2).await, Err(Error::EmptyInput(_))));
    assert!(matches!(evaluate_retrieval(&strategy, None, &ground_truth, 0).await, Err(Error::InvalidConfig(_))));
}

fn fast_options() -> GroundTruthOptions {
    GroundTruthOptions { max_concurrency: 1, max_attempts: 3, retry_delay: Duration::from_millis(1), request_interval: Duration::ZERO }
}

/// Answers by statement and per-statement call count, so concurrent documents cannot steal each other's replies.
struct ByStatement {
    calls: Mutex<HashMap<String, usize>>,
    script: fn(&str, usize) -> Result<String>,
}

#[async_trait]
impl AnswerGenerator for ByStatement {
    fn model(&self) -> &str { "by-statement" }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(prompt.to_string()).or_insert(0);
            *n += 1;
            *n - 1
        };
        (self.script)(prompt, n)
    }
}

#[tokio::test]
async fn ground_truth_retries_bad_replies_and_skips_hopeless_documents() {
    let docs = vec![Document::new("sync up on the roadmap", "meet"), Document::new("put a pin in it", "postpone")];
    let generator = ByStatement {
        calls: Mutex::new(HashMap::new()),
        script: |prompt, n| {
            if prompt.contains("The original vague IT statement:\nsync up on the roadmap\n") {
                if n == 0 { Ok("not json".into()) } else { Ok(r#"```["v1", "v2", "v3", "v4", "v5"]```"#.into()) }
            } else {
                Ok(r#"["only one"]"#.into())
            }
        },
    };
    let finished = AtomicUsize::new(0);
    let rows = generate_ground_truth(&generator, &docs, &fast_options(), || {
        finished.fetch_add(1, Ordering::SeqCst);
    })
    .await
    .unwrap();

    assert_eq!(finished.load(Ordering::SeqCst), 2);
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r.doc_id == docs[0].id));
    assert_eq!(rows[0].vague, "v1");
    let calls = generator.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls.values().copied().max(), Some(3), "the hopeless statement used every round");
}

#[tokio::test]
async fn ground_truth_stops_on_rejected_calls() {
    let docs = vec![Document::new("sync up on the roadmap", "meet")];
    let generator = ScriptedGenerator::new(vec![Err(Error::GenerationBackend {
        kind: BackendFailure::Rejected,
        message: "bad key".into(),
    })]);
    let err = generate_ground_truth(&generator, &docs, &fast_options(), || {}).await.unwrap_err();
    assert!(matches!(err, Error::GenerationBackend { kind: BackendFailure::Rejected, .. }));
}
