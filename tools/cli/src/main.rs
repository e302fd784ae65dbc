//! QuoteSync CLI - Command line interface for the quote collection.
//!
//! This tool browses, adds, imports and exports quotes in the local store
//! and keeps it in sync with a remote feed.

mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use quotesync_common::FILTER_ALL;
use quotesync_storage::{LocalStore, QuoteStore, EXPORT_FILE_NAME};
use quotesync_sync::{HttpFeed, RemoteFeed, StubFeed, SyncEngine, SyncOutcome, SyncTrigger};

use settings::Settings;

type Engine = SyncEngine<dyn RemoteFeed, LocalStore>;

#[derive(Parser)]
#[command(name = "quotesync")]
#[command(about = "QuoteSync - Quote collection with remote sync")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Settings file (JSON).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the collection and preferences.
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Remote feed endpoint, overrides the settings file.
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Ignore any configured endpoint and use an empty simulated feed.
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new quote.
    Add {
        /// Quote text.
        #[arg(short, long)]
        text: String,

        /// Quote category.
        #[arg(short = 'g', long)]
        category: String,
    },

    /// List quotes.
    List {
        /// Only list this category.
        #[arg(short = 'g', long, default_value = FILTER_ALL)]
        category: String,
    },

    /// List categories.
    Categories,

    /// Show a random quote from the selected category.
    Random {
        /// Select a category first (persisted).
        #[arg(short = 'g', long)]
        category: Option<String>,
    },

    /// Export the collection to a JSON file.
    Export {
        /// Destination file.
        #[arg(short, long, default_value = EXPORT_FILE_NAME)]
        output: PathBuf,
    },

    /// Import quotes from a JSON file.
    Import {
        /// Source file.
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Run one sync cycle now.
    Sync,

    /// Keep syncing on a fixed interval until interrupted.
    Watch {
        /// Seconds between cycles, overrides the settings file.
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Show preferences and store location.
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "info" })
    });

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = Some(dir);
    }
    if let Some(endpoint) = cli.endpoint {
        settings.sync.endpoint = Some(endpoint);
    }
    if let Commands::Watch {
        interval: Some(secs),
    } = cli.command
    {
        settings.sync.interval_secs = secs;
    }
    settings.sync.validate()?;

    let engine = build_engine(&settings, cli.offline)?;

    match cli.command {
        Commands::Add { text, category } => cmd_add(&engine, &text, &category).await,
        Commands::List { category } => cmd_list(&engine, &category).await,
        Commands::Categories => cmd_categories(&engine).await,
        Commands::Random { category } => cmd_random(&engine, category.as_deref()).await,
        Commands::Export { output } => cmd_export(&engine, &output).await,
        Commands::Import { file } => cmd_import(&engine, &file).await,
        Commands::Sync => cmd_sync(&engine).await,
        Commands::Watch { .. } => cmd_watch(Arc::new(engine)).await,
        Commands::Info => cmd_info(&engine, &settings).await,
    }
}

/// Wire store, feed and engine from settings.
fn build_engine(settings: &Settings, offline: bool) -> Result<Engine> {
    let data_dir = settings.data_dir()?;
    let backend = LocalStore::new(&data_dir)
        .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;
    let store = Arc::new(QuoteStore::new(Arc::new(backend)));

    let feed: Arc<dyn RemoteFeed> = match settings.sync.endpoint_url()? {
        Some(url) if !offline => {
            info!("Using remote feed at {}", url);
            Arc::new(HttpFeed::new(url, settings.sync.field_mapping.clone())?)
        }
        _ => Arc::new(StubFeed::empty()),
    };

    Ok(SyncEngine::new(store, feed, settings.sync.clone())?)
}

/// Capitalize the first letter of a category for display.
fn display_category(category: &str) -> String {
    let mut chars = category.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Add a quote.
async fn cmd_add(engine: &Engine, text: &str, category: &str) -> Result<()> {
    let added = engine.add_quote(text, category).await?;

    // Give the background publish a chance to finish before the process exits
    if let Err(e) = added.publish.await {
        tracing::warn!("Publish task did not complete: {}", e);
    }

    println!("Quote added successfully! ({} quotes total)", added.total);
    Ok(())
}

/// List quotes, optionally filtered by category.
async fn cmd_list(engine: &Engine, category: &str) -> Result<()> {
    let category = category.trim().to_lowercase();
    let collection = engine.collection().await?;
    let quotes: Vec<_> = collection.filter(&category).collect();

    if quotes.is_empty() {
        println!("No quotes available for this category.");
        return Ok(());
    }

    for quote in quotes {
        println!("[{}] \"{}\"", display_category(quote.category()), quote.text());
    }
    Ok(())
}

/// List categories.
async fn cmd_categories(engine: &Engine) -> Result<()> {
    println!("All");
    for category in engine.categories().await? {
        println!("{}", display_category(&category));
    }
    Ok(())
}

/// Show a random quote.
async fn cmd_random(engine: &Engine, category: Option<&str>) -> Result<()> {
    if let Some(category) = category {
        engine.set_category_filter(category).await?;
    }

    match engine.next_quote().await? {
        Some(quote) => println!("\"{}\"", quote.text()),
        None => println!("No quotes available for this category."),
    }
    Ok(())
}

/// Export the collection.
async fn cmd_export(engine: &Engine, output: &Path) -> Result<()> {
    let document = engine.export_document().await?;
    tokio::fs::write(output, &document)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Exported collection to {}", output.display());
    Ok(())
}

/// Import quotes from a file.
async fn cmd_import(engine: &Engine, file: &Path) -> Result<()> {
    let document = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let count = engine
        .import_document(&document)
        .await
        .with_context(|| format!("Failed to import {}", file.display()))?;

    println!("Quotes imported successfully! ({} added)", count);
    Ok(())
}

/// Run one sync cycle.
async fn cmd_sync(engine: &Engine) -> Result<()> {
    match engine.sync(SyncTrigger::Manual).await? {
        SyncOutcome::Completed(report) if report.added > 0 => {
            println!("Synced {} new quotes ({} total)", report.added, report.total)
        }
        SyncOutcome::Completed(_) => println!("Already up to date"),
        SyncOutcome::Skipped => println!("A sync is already running"),
    }
    Ok(())
}

/// Sync periodically until Ctrl-C.
async fn cmd_watch(engine: Arc<Engine>) -> Result<()> {
    let (scheduler, task) = engine.start_scheduler()?;
    println!(
        "Syncing every {}s, press Ctrl-C to stop.",
        engine.config().interval_secs
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    scheduler.shutdown().await;
    task.await.context("Scheduler task failed")?;

    if let Some(status) = engine.state().last_status() {
        println!("Last status: {}", status);
    }
    Ok(())
}

/// Show preferences and store information.
async fn cmd_info(engine: &Engine, settings: &Settings) -> Result<()> {
    let prefs = engine.preferences().await?;
    let collection = engine.collection().await?;

    println!("QuoteSync Information:");
    println!("  Data directory: {}", settings.data_dir()?.display());
    println!("  Quotes: {}", collection.len());
    println!("  Category filter: {}", prefs.category_filter);
    println!(
        "  Last viewed: {}",
        prefs.last_viewed.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Remote: {}",
        settings.sync.endpoint.as_deref().unwrap_or("(offline)")
    );
    println!("  Sync interval: {}s", settings.sync.interval_secs);
    Ok(())
}
