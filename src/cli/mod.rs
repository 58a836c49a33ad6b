//! Command-line interface for lurnix.
//!
//! Provides commands for discovering documents in the artifact store,
//! viewing their channels, and submitting new files for processing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::adapters::{
    BlobContainerStore, FilesystemStore, HttpPipelineTrigger, ObjectStore,
};
use crate::config::{self, ResolvedConfig, StoreLocation};
use crate::core::{
    DocumentAggregator, DocumentStore, LifecycleController, Pipeline, SimulatedPipeline,
    StorePollingPipeline,
};
use crate::domain::submission::mime_from_extension;
use crate::domain::{Document, DocumentId, DocumentStatus, SubmissionRequest, TranslationView};

/// lurnix - Multi-modal learning document engine
#[derive(Parser, Debug)]
#[command(name = "lurnix")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List documents
    Documents {
        /// Discover documents in the artifact store first and save them
        #[arg(long)]
        sync: bool,
    },

    /// Show a document's content channels
    Show {
        /// Document ID (unique prefix is enough)
        document_id: String,

        /// Only show this channel
        #[arg(short, long, value_enum)]
        channel: Option<ChannelArg>,
    },

    /// Submit a file for processing
    Submit {
        /// PDF, PNG, or JPG file
        file: PathBuf,

        /// Target language code (en, ta, hi, es, fr)
        #[arg(short, long, default_value = "en")]
        language: String,

        /// MIME type (guessed from the extension if not specified)
        #[arg(long)]
        mime: Option<String>,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Channel selection for `show`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChannelArg {
    Original,
    Simplified,
    Translated,
    Audio,
    Images,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Documents { sync } => list_documents(sync).await,
            Commands::Show {
                document_id,
                channel,
            } => show_document(&document_id, channel).await,
            Commands::Submit {
                file,
                language,
                mime,
            } => submit_file(&file, &language, mime).await,
            Commands::Config => show_config().await,
        }
    }
}

/// Build the object store named by the configuration
fn object_store(cfg: &ResolvedConfig) -> Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match cfg.store {
        StoreLocation::Filesystem(ref root) => Arc::new(FilesystemStore::new(root.clone())),
        StoreLocation::Container(ref url) => {
            Arc::new(BlobContainerStore::new(url, cfg.store_request_timeout)?)
        }
    };
    Ok(store)
}

fn aggregator(cfg: &ResolvedConfig) -> Result<DocumentAggregator> {
    Ok(DocumentAggregator::new(object_store(cfg)?)
        .with_max_concurrent_groups(cfg.max_concurrent_groups))
}

/// Real pipeline when an endpoint is configured, simulated otherwise
fn pipeline(cfg: &ResolvedConfig) -> Result<Arc<dyn Pipeline>> {
    let settings = &cfg.pipeline;
    let pipeline: Arc<dyn Pipeline> = match settings.endpoint {
        Some(ref endpoint) => {
            let trigger = HttpPipelineTrigger::new(endpoint.as_str(), settings.timeout)
                .context("Failed to create pipeline trigger")?;
            Arc::new(StorePollingPipeline::new(
                Arc::new(trigger),
                aggregator(cfg)?,
                settings.poll_interval,
                settings.timeout,
            ))
        }
        None => Arc::new(SimulatedPipeline::new(cfg.lifecycle.processing_delay)),
    };
    Ok(pipeline)
}

/// Find a document by exact id, else by unique id prefix
async fn resolve_id(store: &DocumentStore, id: &str) -> Result<DocumentId> {
    let exact = DocumentId::from(id);
    if store.get(&exact).await.is_some() {
        return Ok(exact);
    }

    let matches: Vec<DocumentId> = store
        .list()
        .await
        .into_iter()
        .map(|d| d.id)
        .filter(|d| d.as_str().starts_with(id))
        .collect();

    match matches.as_slice() {
        [only] => Ok(only.clone()),
        [] => anyhow::bail!("Document not found: {}", id),
        _ => anyhow::bail!("Ambiguous document ID '{}' ({} matches)", id, matches.len()),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

/// List documents, optionally syncing from the artifact store first
async fn list_documents(sync: bool) -> Result<()> {
    let cfg = config::config()?;
    let catalog = cfg.catalog_path();
    let store = DocumentStore::load(&catalog).await?;

    if sync {
        let summary = aggregator(cfg)?
            .aggregate_into(&store)
            .await
            .with_context(|| format!("Failed to sync documents from {}", cfg.store))?;
        store.save(&catalog).await?;
        println!(
            "Synced from {}: {} new, {} updated, {} skipped\n",
            cfg.store, summary.inserted, summary.replaced, summary.rejected
        );
    }

    let documents = store.list().await;
    if documents.is_empty() {
        println!("No documents yet. Use 'lurnix documents --sync' or 'lurnix submit <file>'.");
        return Ok(());
    }

    println!(
        "{:<38} {:<30} {:<12} {:<10} {:<14}",
        "ID", "NAME", "DATE", "LANGUAGE", "STATUS"
    );
    println!("{}", "-".repeat(106));

    for doc in &documents {
        println!(
            "{:<38} {:<30} {:<12} {:<10} {:<14}",
            truncate(doc.id.as_str(), 36),
            truncate(&doc.display_name, 28),
            doc.upload_date.format("%Y-%m-%d").to_string(),
            doc.language,
            doc.status.label()
        );
    }

    println!("\nTotal: {} documents", documents.len());

    Ok(())
}

fn print_text(title: &str, text: Option<&str>) {
    println!("── {} ──", title);
    match text {
        Some(text) => println!("{}", text),
        None => println!("(not available)"),
    }
    println!();
}

fn print_translation(doc: &Document) {
    println!("── Translated text ──");
    match doc.translation() {
        TranslationView::Missing => println!("(not available)"),
        TranslationView::Available { language, text } => {
            println!("Translated to {}:", language);
            println!("{}", text);
        }
        TranslationView::DataError(e) => {
            debug!(document_id = %doc.id, error = %e, "Malformed translation payload");
            println!("Invalid translated data format.");
        }
    }
    println!();
}

fn print_audio(doc: &Document) {
    println!("── Audio ──");
    println!("{}", doc.channels.audio_ref.as_deref().unwrap_or("(not available)"));
    println!();
}

fn print_images(doc: &Document) {
    println!("── Images ({}) ──", doc.image_count());
    if doc.channels.image_refs.is_empty() {
        println!("(not available)");
    }
    for (i, image) in doc.channels.image_refs.iter().enumerate() {
        println!("  {}. {}", i + 1, image);
    }
    println!();
}

/// Show a finished document's channels
async fn show_document(document_id: &str, channel: Option<ChannelArg>) -> Result<()> {
    let catalog = config::catalog_path()?;
    let store = DocumentStore::load(&catalog).await?;

    let id = resolve_id(&store, document_id).await?;
    let doc = store.select_viewable(&id).await?;
    store.save(&catalog).await?;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("  {}", doc.display_name);
    println!("  ID: {}", doc.id);
    println!("  Uploaded: {}", doc.upload_date.format("%Y-%m-%d"));
    println!("  Language: {}", doc.language);
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    match channel {
        Some(ChannelArg::Original) => print_text("Original text", doc.channels.original_text.as_deref()),
        Some(ChannelArg::Simplified) => {
            print_text("Simplified text", doc.channels.simplified_text.as_deref())
        }
        Some(ChannelArg::Translated) => print_translation(&doc),
        Some(ChannelArg::Audio) => print_audio(&doc),
        Some(ChannelArg::Images) => print_images(&doc),
        None => {
            print_text("Original text", doc.channels.original_text.as_deref());
            print_text("Simplified text", doc.channels.simplified_text.as_deref());
            print_translation(&doc);
            print_audio(&doc);
            print_images(&doc);
        }
    }

    Ok(())
}

/// Submit a file and follow it until processing settles
async fn submit_file(file: &Path, language: &str, mime: Option<String>) -> Result<()> {
    let cfg = config::config()?;

    let metadata = tokio::fs::metadata(file)
        .await
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let mime_type = mime
        .or_else(|| mime_from_extension(file).map(String::from))
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let request = SubmissionRequest::new(file_name, mime_type, metadata.len(), language)
        .with_source_path(file);

    let catalog = cfg.catalog_path();
    let store = DocumentStore::load(&catalog).await?;
    let controller = LifecycleController::new(store.clone(), pipeline(cfg)?)
        .with_limits(cfg.submission.clone())
        .with_pending_delay(cfg.lifecycle.pending_delay);

    let mut changes = store.subscribe();
    let doc = controller.submit(request).await?;
    println!("Submitted {} as {} ({})", doc.display_name, doc.id, doc.language);
    println!("  Status: {}", doc.status.label());

    loop {
        tokio::select! {
            change = changes.recv() => match change {
                Ok(change) if change.id == doc.id => {
                    if change.status != DocumentStatus::Pending {
                        println!("  Status: {}", change.status.label());
                    }
                    if change.status.is_terminal() {
                        break;
                    }
                }
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Interrupted, cancelling processing...");
                controller.cancel(&doc.id).await;
                break;
            }
        }
    }

    let finished = controller
        .wait(&doc.id)
        .await
        .with_context(|| format!("Document disappeared: {}", doc.id))?;
    store.save(&catalog).await?;

    match finished.status {
        DocumentStatus::Done => {
            println!("\nReady. View it with 'lurnix show {}'", finished.id);
            Ok(())
        }
        status => anyhow::bail!("Processing did not complete for {} ({})", finished.id, status),
    }
}

/// Show the resolved configuration (for debugging)
async fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("  Lurnix Configuration");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:     {}", cfg.home.display());
    println!("  Catalog:  {}", cfg.catalog_path().display());
    println!("  Store:    {}", cfg.store);
    println!("  Store request timeout: {:?}", cfg.store_request_timeout);
    println!();
    println!("Lifecycle:");
    println!("  Pending delay:    {:?}", cfg.lifecycle.pending_delay);
    println!("  Processing delay: {:?}", cfg.lifecycle.processing_delay);
    println!();
    println!("Submission limits:");
    println!("  Max size:   {} bytes", cfg.submission.max_size_bytes);
    println!("  Types:      {}", cfg.submission.allowed_types.join(", "));
    println!("  Extensions: {}", cfg.submission.allowed_extensions.join(", "));
    println!();
    println!("Aggregation:");
    println!("  Max concurrent groups: {}", cfg.max_concurrent_groups);
    println!();
    println!("Pipeline:");
    match cfg.pipeline.endpoint {
        Some(ref endpoint) => {
            println!("  Endpoint:      {}", endpoint);
            println!("  Poll interval: {:?}", cfg.pipeline.poll_interval);
            println!("  Timeout:       {:?}", cfg.pipeline.timeout);
        }
        None => println!("  (simulated)"),
    }

    Ok(())
}
