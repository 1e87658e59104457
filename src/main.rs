//! docqa CLI: document Q&A over a vector index.
//!
//! Ingest documents, ask questions with cited answers, and administer the
//! stored vectors (list, delete by document, wipe, purge). Destructive
//! commands ask for confirmation unless `--force` is given. Every surfaced
//! error names the failing operation and exits non-zero.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use ai_llm_service::config::default_config::{config_embedding, config_generative};
use ai_llm_service::service_profiles::LlmServiceProfiles;
use rag_store::{AnswerResult, IndexLifecycle, RagConfig, RagPipeline, Reporter};

#[derive(Parser)]
#[command(name = "docqa", version, about = "Document Q&A over a vector index")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the vector index if it does not exist yet.
    Init,

    /// Ingest a document (txt or pdf) into the index.
    Ingest {
        /// Path to the file to ingest.
        file: PathBuf,
    },

    /// Ask a question against the ingested documents.
    Ask {
        /// The question to answer.
        question: String,

        /// Number of chunks to retrieve (default from configuration).
        #[arg(long)]
        top_k: Option<u64>,
    },

    /// List stored documents with chunk and page counts.
    List,

    /// Delete all vectors of a specific document.
    Delete {
        /// Document name as shown by `list`.
        document: String,

        /// Skip the confirmation prompt.
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Delete every vector in the index.
    DeleteAll {
        /// Skip the confirmation prompts.
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Delete every vector and drop the index itself.
    Purge {
        /// Skip the confirmation prompts.
        #[arg(long, short = 'f')]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    // .env is optional; environment variables win either way.
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = RagConfig::from_env()?;
    let svc = Arc::new(LlmServiceProfiles::new(
        config_generative()?,
        config_embedding()?,
        None,
    )?);
    let pipeline = RagPipeline::new(cfg, svc)?.with_reporter(Arc::new(ConsoleReporter));

    match cli.command {
        Commands::Init => {
            pipeline.ensure_index().await?;
            println!("{} vector index ready", "✓".green());
        }

        Commands::Ingest { file } => {
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("invalid file path: {}", file.display()))?
                .to_string();
            let bytes = std::fs::read(&file)?;

            pipeline.ensure_index().await?;
            let report = pipeline.ingest(&bytes, &filename).await?;

            println!(
                "{} ingested {}: {} page(s), {} chunk(s), {} embedded ({} failed), {} stored in {} batch(es)",
                "✓".green(),
                filename.bold(),
                report.pages,
                report.chunks,
                report.embedded,
                report.failed,
                report.stored,
                report.batches,
            );
        }

        Commands::Ask { question, top_k } => {
            let result = pipeline.ask(&question, top_k).await?;
            print_answer(&result);
        }

        Commands::List => {
            list_documents(&pipeline).await?;
        }

        Commands::Delete { document, force } => {
            if !force && !confirm(&format!("Delete all vectors for '{document}'?"))? {
                println!("cancelled");
                return Ok(());
            }
            let outcome = pipeline.delete_document(&document).await?;
            if outcome.deleted_count == 0 {
                println!("{} no vectors found for document: {document}", "⚠".yellow());
            } else {
                println!(
                    "{} deleted {} vector(s) of {document}",
                    "✓".green(),
                    outcome.deleted_count
                );
            }
        }

        Commands::DeleteAll { force } => {
            if !force {
                list_documents(&pipeline).await?;
                if !confirm("Delete ALL vectors? This cannot be undone!")?
                    || !confirm("Are you absolutely sure?")?
                {
                    println!("cancelled");
                    return Ok(());
                }
            }
            let outcome = pipeline.delete_all().await?;
            if outcome.deleted_count == 0 {
                println!("{} no vectors found in index", "⚠".yellow());
            } else {
                println!("{} deleted {} vector(s)", "✓".green(), outcome.deleted_count);
            }
        }

        Commands::Purge { force } => {
            if !force
                && (!confirm("Delete ALL vectors AND the index itself?")?
                    || !confirm("Final confirmation: purge everything?")?)
            {
                println!("cancelled");
                return Ok(());
            }

            // Best-effort vector wipe first; a missing collection should not
            // stop the index drop.
            match pipeline.delete_all().await {
                Ok(outcome) => {
                    println!("{} deleted {} vector(s)", "✓".green(), outcome.deleted_count)
                }
                Err(e) => println!("{} vector wipe failed (continuing): {e}", "⚠".yellow()),
            }

            match pipeline.delete_index().await? {
                IndexLifecycle::Deleted => println!("{} index deleted", "✓".green()),
                IndexLifecycle::NotFound => println!("{} index not found", "⚠".yellow()),
            }
        }
    }

    Ok(())
}

async fn list_documents(pipeline: &RagPipeline) -> anyhow::Result<()> {
    let documents = pipeline.list_documents().await?;

    if documents.is_empty() {
        println!("no documents stored");
        return Ok(());
    }

    println!("{}", "stored documents".bold());
    for (i, doc) in documents.iter().enumerate() {
        println!("\n{}. {}", i + 1, doc.document.bold());
        println!("   type:   {}", doc.source_type);
        println!("   chunks: {}", doc.chunk_count);
        println!("   pages:  {}", doc.page_count);
        if !doc.pages.is_empty() {
            let shown: Vec<String> = doc.pages.iter().take(5).map(|p| p.to_string()).collect();
            let suffix = if doc.pages.len() > 5 { ", ..." } else { "" };
            println!("   page list: [{}{}]", shown.join(", "), suffix);
        }
    }

    let total_chunks: usize = documents.iter().map(|d| d.chunk_count).sum();
    println!(
        "\n{} document(s), {} vector(s) total",
        documents.len(),
        total_chunks
    );
    Ok(())
}

fn print_answer(result: &AnswerResult) {
    println!("{}", "answer".bold());
    println!("{}", result.answer);

    if !result.sources.is_empty() {
        println!("\n{}", "sources".bold());
        for (i, source) in result.sources.iter().enumerate() {
            println!(
                "{}. {} (page {}, similarity {:.0}%)",
                i + 1,
                source.document,
                source.page,
                source.similarity * 100.0
            );
            println!("   {}", source.preview.dimmed());
        }
    }

    if let Some(stats) = &result.retrieval_stats {
        println!(
            "\n{}",
            format!(
                "{}/{} relevant chunk(s) (threshold {})",
                stats.total_relevant, stats.total_retrieved, stats.similarity_threshold
            )
            .dimmed()
        );
    }
}

/// Asks a yes/no question on stdin.
fn confirm(message: &str) -> anyhow::Result<bool> {
    print!("\n{message} (yes/no): ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "yes" | "y"))
}

/// Reporter that surfaces pipeline notices on the terminal.
struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn info(&self, message: &str) {
        println!("{} {message}", "•".cyan());
    }

    fn warn(&self, message: &str) {
        eprintln!("{} {message}", "⚠".yellow());
    }
}
