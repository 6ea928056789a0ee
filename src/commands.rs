use anyhow::{Context, Result};
use console::style;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::SchemeError;
use crate::config::Config;
use crate::database::lancedb::VectorStore;
use crate::database::sqlite::Database;
use crate::generation::{AnswerComposer, ComposedAnswer, OllamaGenerator};
use crate::indexer::IndexBuilder;
use crate::retriever::{RetrievalSession, RetrievedPassage};
use crate::sources;

/// Build (or rebuild) the index from the PDF corpus.
#[inline]
pub async fn build_index(config: Config, corpus_override: Option<PathBuf>) -> Result<()> {
    let corpus_dir = corpus_override.unwrap_or_else(|| config.corpus_dir_path());

    info!("Starting index build from {}", corpus_dir.display());

    let mut builder = IndexBuilder::new(config)
        .await
        .context("Failed to initialize index builder")?;
    let report = builder.build(&corpus_dir).await?;

    println!("Index build completed!");
    println!("  Documents indexed: {}", report.documents_indexed);
    if report.documents_failed > 0 {
        println!(
            "  {} {}",
            style("Documents skipped:").yellow(),
            report.documents_failed
        );
    }
    println!("  Chunks created: {}", report.chunks_created);
    println!("  Embedding dimension: {}", report.embedding_dimension);
    println!("  Build ID: {}", report.build_id);

    Ok(())
}

/// Retrieve the passages most relevant to a question and print them.
#[inline]
pub async fn run_query(config: &Config, query: &str, top_k: usize) -> Result<()> {
    let session = RetrievalSession::open(config).await?;
    let passages = session.search(query, top_k).await?;

    if passages.is_empty() {
        println!("No passages found. Is the index empty?");
        return Ok(());
    }

    print_passages(&passages);
    Ok(())
}

/// Retrieve, then compose a grounded answer with the generation backend.
///
/// A generation failure degrades to showing the retrieved passages rather
/// than producing nothing.
#[inline]
pub async fn ask(config: &Config, query: &str, top_k: usize) -> Result<()> {
    let session = RetrievalSession::open(config).await?;
    let passages = session.search(query, top_k).await?;

    let generator = OllamaGenerator::new(config)?;
    let composer = AnswerComposer::new(&generator, config.generation.min_score);

    match composer.compose(query, &passages).await {
        Ok(ComposedAnswer::Grounded(answer)) => {
            println!("{}", style("Answer").bold().green());
            println!("{}", answer);
        }
        Ok(ComposedAnswer::NotFound) => {
            let best = passages.first().map(|p| p.score).unwrap_or(0.0);
            println!("{}", style("NOT FOUND").bold().red());
            println!(
                "(No strong match in the local PDFs. Best similarity score: {:.3})",
                best
            );
            return Ok(());
        }
        Err(SchemeError::Generation(reason)) => {
            warn!("Answer generation failed: {}", reason);
            println!(
                "{}",
                style("Explanation unavailable (generation backend failed).").yellow()
            );
            println!("Here are the relevant passages instead:");
        }
        Err(other) => return Err(other.into()),
    }

    let registry = sources::load_registry(&config.registry_path())?;
    let matched = sources::match_links(&registry, &passages);
    if !matched.is_empty() {
        println!();
        println!("{}", style("Official Links").bold());
        for scheme in matched {
            println!("  {}", scheme.scheme_name);
            println!("    Apply: {}", scheme.apply_link);
            for source in &scheme.source_links {
                println!("    Source: {}", source);
            }
        }
    }

    println!();
    println!("{}", style("Evidence used").bold());
    print_passages(&passages);

    Ok(())
}

/// Show the state of the persisted index pair.
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    let database = Database::new(config.database_path())
        .await
        .context("Failed to open metadata store")?;
    let vector_store = VectorStore::new(config).await?;

    match database.manifest().await? {
        Some(manifest) => {
            println!("Index manifest:");
            println!("  Build ID: {}", manifest.build_id);
            println!("  Embedding model: {}", manifest.embedding_model);
            println!("  Dimension: {}", manifest.embedding_dimension);
            println!("  Metric: {}", manifest.distance_metric);
            println!("  Rows: {}", manifest.row_count);
            println!(
                "  Built: {}",
                manifest.built_date.format("%Y-%m-%d %H:%M:%S")
            );
        }
        None => {
            println!("No index has been built yet.");
            println!("Use 'scheme-advisor build' after placing PDFs in the corpus directory.");
        }
    }

    let chunk_count = database.count_chunks().await?;
    let vector_count = vector_store.count().await?;
    println!();
    println!("Stores:");
    println!("  Metadata rows: {}", chunk_count);
    println!("  Vector rows: {}", vector_count);
    if chunk_count != vector_count as i64 {
        println!(
            "  {} stores are misaligned; rebuild the index",
            style("⚠").yellow()
        );
    }

    let documents = database.list_documents().await?;
    if documents.is_empty() {
        return Ok(());
    }

    println!();
    println!("Documents ({} total):", documents.len());
    for document in &documents {
        println!(
            "  📄 {} [{}] {} pages, {} chunks",
            document.file_name, document.status, document.page_count, document.chunk_count
        );
        if let Some(error) = &document.error_message {
            println!("     ⚠ {}", error);
        }
    }

    Ok(())
}

/// Write the built-in scheme registry and optionally fetch its PDF sources.
#[inline]
pub fn sync_sources(config: &Config, download: bool) -> Result<()> {
    let registry_path = config.registry_path();

    let registry = if registry_path.exists() {
        println!("Using existing registry: {}", registry_path.display());
        sources::load_registry(&registry_path)?
    } else {
        let registry = sources::builtin_registry();
        sources::write_registry(&registry_path, &registry)?;
        println!("Wrote registry: {}", registry_path.display());
        registry
    };

    println!("Schemes: {}", registry.len());

    if download {
        let corpus_dir = config.corpus_dir_path();
        let downloaded = sources::download_sources(&registry, &corpus_dir)?;
        println!("PDFs downloaded: {}", downloaded);
        println!("Next: run 'scheme-advisor build' to rebuild the index.");
    }

    Ok(())
}

fn print_passages(passages: &[RetrievedPassage]) {
    for passage in passages {
        println!(
            "  [{} | page {}] (score {:.3})",
            passage.file_name, passage.page_number, passage.score
        );
        let preview: String = passage.text.chars().take(900).collect();
        if preview.len() < passage.text.len() {
            println!("  {}…", preview);
        } else {
            println!("  {}", preview);
        }
        println!();
    }
}
