use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use indicatif::ProgressBar;

use clarity_cli::{init_tracing, load_encoder, load_settings, report, BackendKind};
use clarity_core::config::expand_path;
use clarity_core::dataset::{embed_documents, load_documents, save_documents};
use clarity_core::traits::DocumentIndexer;
use clarity_retrieval::ElasticIndex;
use clarity_text::TantivyIndex;

/// Load vague/actual pairs, embed them and (re)build the search index.
#[derive(Parser)]
#[command(name = "clarity-indexer")]
struct Args {
    #[arg(long, value_enum, default_value = "elastic")]
    backend: BackendKind,
    /// JSON array of {vague, actual}; defaults to data.documents.
    #[arg(long)]
    documents: Option<PathBuf>,
    /// Also write the enriched documents (ids, vectors) here.
    #[arg(long)]
    save: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(e) = run(Args::parse()).await {
        report(&e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let settings = load_settings()?;
    let path = args.documents.unwrap_or_else(|| expand_path(&settings.data.documents));
    println!("Clarity Indexer\n===============");
    println!("Documents: {}", path.display());

    let mut docs = load_documents(&path).with_context(|| format!("reading {}", path.display()))?;
    let encoder = load_encoder(&settings)?;
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("embedding {} documents", docs.len()));
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));
    let embedded = embed_documents(&mut docs, &*encoder);
    spinner.finish_and_clear();
    embedded?;

    if let Some(save) = &args.save {
        save_documents(save, &docs)?;
        println!("Saved enriched documents to {}", save.display());
    }

    let count = match args.backend {
        BackendKind::Elastic => {
            let index = ElasticIndex::from_settings(&settings.elastic);
            index.recreate(encoder.dim()).await?;
            index.index_documents(&docs).await?
        }
        BackendKind::Tantivy => {
            let dir = expand_path(&settings.data.tantivy_index_dir);
            let index = TantivyIndex::create_in_dir(&settings.elastic.index_name, &dir)?;
            println!("Created Tantivy index at: {}", dir.display());
            index.index_documents(&docs).await?
        }
    };
    println!("\n✅ Indexing completed successfully!");
    println!("📊 Indexed {count} documents into '{}'", settings.elastic.index_name);
    Ok(())
}
