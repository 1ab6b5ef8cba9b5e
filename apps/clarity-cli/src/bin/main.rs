use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};

use clarity_cli::{build_strategy, init_tracing, load_encoder_for, load_settings, open_index, report, BackendKind, StrategyKind};
use clarity_core::config::{expand_path, Settings};
use clarity_core::dataset::{load_documents, load_ground_truth, write_ground_truth};
use clarity_rag::{
    evaluate_retrieval, generate_ground_truth, ChatCompletionsGenerator, GroundTruthOptions, PromptBuilder, QualityJudge,
    RagOrchestrator,
};

#[derive(Parser)]
#[command(name = "clarity", about = "Translate vague boss statements into plain language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer one statement, or start an interactive loop when none is given.
    Ask {
        #[arg(long, value_enum, default_value = "semantic")]
        strategy: StrategyKind,
        #[arg(long, value_enum, default_value = "elastic")]
        backend: BackendKind,
        /// Use the ambiguity-resolver prompt instead of the translator prompt.
        #[arg(long)]
        resolver: bool,
        /// Also score every answer with the judge model.
        #[arg(long)]
        judge: bool,
        query: Option<String>,
    },
    /// Score a translation of a vague statement.
    Judge {
        #[arg(long)]
        vague: String,
        #[arg(long)]
        translation: String,
    },
    /// Hit rate and MRR of a strategy over the ground-truth set.
    Evaluate {
        #[arg(long, value_enum, default_value = "semantic")]
        strategy: StrategyKind,
        #[arg(long, value_enum, default_value = "elastic")]
        backend: BackendKind,
    },
    /// Generate paraphrased ground truth for every document.
    GroundTruth {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        report(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings()?;
    match cli.command {
        Command::Ask { strategy, backend, resolver, judge, query } => ask(&settings, strategy, backend, resolver, judge, query).await,
        Command::Judge { vague, translation } => {
            let judge = QualityJudge::new(Arc::new(ChatCompletionsGenerator::from_settings(&settings.llm, &settings.llm.judge_model)?));
            let score = judge.judge(&vague, &translation).await?;
            println!("{}", serde_json::to_string_pretty(&score)?);
            Ok(())
        }
        Command::Evaluate { strategy, backend } => {
            let encoder = load_encoder_for(strategy, &settings)?;
            let index = open_index(backend, &settings)?;
            let retrieval = build_strategy(strategy, index, encoder.clone(), &settings)?;
            let path = expand_path(&settings.data.ground_truth);
            let ground_truth = load_ground_truth(&path).with_context(|| format!("reading {}", path.display()))?;
            let spinner = ProgressBar::new_spinner();
            spinner.set_message(format!("evaluating {} queries", ground_truth.len()));
            spinner.enable_steady_tick(std::time::Duration::from_millis(120));
            let outcome = evaluate_retrieval(&retrieval, encoder.as_deref(), &ground_truth, settings.eval.max_concurrency).await;
            spinner.finish_and_clear();
            let metrics = outcome?;
            println!("strategy: {}", retrieval.name());
            println!("queries:  {}", metrics.queries);
            println!("hit rate: {:.4}", metrics.hit_rate);
            println!("MRR:      {:.4}", metrics.mrr);
            Ok(())
        }
        Command::GroundTruth { output } => {
            let generator = ChatCompletionsGenerator::from_settings(&settings.llm, &settings.llm.model)?;
            let path = expand_path(&settings.data.documents);
            let docs = load_documents(&path).with_context(|| format!("reading {}", path.display()))?;
            let pb = ProgressBar::new(docs.len() as u64);
            pb.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} documents ({eta})")?);
            let options = GroundTruthOptions::from(&settings.eval);
            let rows = generate_ground_truth(&generator, &docs, &options, || pb.inc(1)).await?;
            pb.finish();
            let output = output.unwrap_or_else(|| expand_path(&settings.data.ground_truth));
            write_ground_truth(&output, &rows)?;
            println!("✅ Wrote {} ground-truth rows to {}", rows.len(), output.display());
            Ok(())
        }
    }
}

async fn ask(
    settings: &Settings,
    strategy: StrategyKind,
    backend: BackendKind,
    resolver: bool,
    with_judge: bool,
    query: Option<String>,
) -> anyhow::Result<()> {
    let encoder = load_encoder_for(strategy, settings)?;
    let index = open_index(backend, settings)?;
    let mut builder = RagOrchestrator::builder()
        .strategy(build_strategy(strategy, index, encoder.clone(), settings)?)
        .prompt(if resolver { PromptBuilder::ambiguity_resolver() } else { PromptBuilder::translator() })
        .generator(Arc::new(ChatCompletionsGenerator::from_settings(&settings.llm, &settings.llm.model)?));
    if let Some(encoder) = encoder {
        builder = builder.encoder(encoder);
    }
    let rag = builder.build()?;
    let judge = if with_judge {
        Some(QualityJudge::new(Arc::new(ChatCompletionsGenerator::from_settings(&settings.llm, &settings.llm.judge_model)?)))
    } else {
        None
    };

    if let Some(query) = query {
        return answer_once(&rag, judge.as_ref(), &query).await;
    }

    println!("Hello, I am Vague Resolver RAG.");
    println!("Type \"exit\" or \"quit\" to end the program.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("Input your vague statement: ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else { break };
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            println!("Thank you for using Vague Resolver RAG. Goodbye!");
            break;
        }
        if line.is_empty() {
            println!("Please enter a valid statement.");
            continue;
        }
        if let Err(e) = answer_once(&rag, judge.as_ref(), line).await {
            report(&e);
        }
    }
    Ok(())
}

async fn answer_once(rag: &RagOrchestrator, judge: Option<&QualityJudge>, query: &str) -> anyhow::Result<()> {
    let answer = rag.answer(query).await?;
    println!("Your boss meant: {answer}");
    if let Some(judge) = judge {
        let score = judge.judge(query, &answer).await?;
        println!(
            "Accuracy {} | Clarity {} | Completeness {} | Relevance {} | Overall {:.1}",
            score.accuracy, score.clarity, score.completeness, score.relevance, score.overall_score
        );
        if !score.explanation.is_empty() {
            println!("{}", score.explanation);
        }
    }
    Ok(())
}
