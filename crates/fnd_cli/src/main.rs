use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use fnd_core::{ArticleStorage, ClassifierSource, GUARDIAN_SECTIONS, RESET_CATEGORIES};
use fnd_inference::loader::{DEFAULT_BLOB_NAME, DEFAULT_CONTAINER, DEFAULT_MODEL_PATH};
use fnd_inference::{assess, ArtifactLoader, HttpArtifactStore, LazyClassifier, LoaderConfig};
use fnd_ingest::{
    FetcherConfig, GuardianFetcher, HtmlImageResolver, IngestionPipeline, PipelineConfig, RateLimiter,
    RateLimiterConfig, Scheduler, GUARDIAN_API_URL,
};
use fnd_storage::StorageKind;
use fnd_web::{create_app, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod duration;

use duration::HumanDuration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Live news reliability service", long_about = None)]
pub struct Cli {
    /// Storage backend: memory or sqlite
    #[arg(long, env = "FND_STORAGE", default_value = "memory")]
    storage: StorageKind,
    /// SQLite database file
    #[arg(long, env = "FND_DATABASE", default_value = "fnd.db")]
    database: PathBuf,
    #[arg(long, env = "GUARDIAN_API_KEY", default_value = "", hide_env_values = true)]
    api_key: String,
    #[arg(long, default_value = GUARDIAN_API_URL)]
    api_url: String,
    /// Local classifier artifact
    #[arg(long, env = "FND_MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    model_path: PathBuf,
    /// Blob store base URL used when the local artifact is missing
    #[arg(long, env = "FND_MODEL_STORE_URL")]
    model_store_url: Option<String>,
    #[arg(long, default_value = DEFAULT_CONTAINER)]
    model_container: String,
    #[arg(long, default_value = DEFAULT_BLOB_NAME)]
    model_blob: String,
    /// Refuse artifacts trained with another toolchain version
    #[arg(long)]
    strict_model_version: bool,
    /// Time between scheduled ingestion cycles (e.g. 5m, 1h15m30s)
    #[arg(long, default_value = "5m")]
    interval: HumanDuration,
    /// Minimum spacing between upstream requests
    #[arg(long, default_value = "1s")]
    min_interval: HumanDuration,
    #[arg(long, default_value_t = 3)]
    max_retries: u32,
    #[arg(long, default_value = "2s")]
    retry_delay: HumanDuration,
    /// Upstream HTTP timeout
    #[arg(long, default_value = "20s")]
    timeout: HumanDuration,
    #[arg(long, default_value = "1s")]
    category_pause: HumanDuration,
    /// Skip TLS certificate verification for upstream calls
    #[arg(long)]
    accept_invalid_certs: bool,
    #[arg(long, env = "FND_LISTEN", default_value = "127.0.0.1:8000")]
    listen: String,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scheduler and the HTTP API (default)
    Serve {
        /// Serve the API without background ingestion
        #[arg(long)]
        no_scheduler: bool,
    },
    /// Run one ingestion pass now
    Fetch {
        /// Only this category instead of every active one
        category: Option<String>,
        /// Print what upstream returns without classifying or storing
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete every article and reset the active categories
    Reset,
    /// Activate the full list of Guardian sections
    Categories,
    /// Print ingestion statistics
    Show,
    /// Classify a single headline
    Check { title: String },
}

struct Services {
    storage: Arc<dyn ArticleStorage>,
    fetcher: Arc<GuardianFetcher>,
    classifiers: Arc<LazyClassifier>,
    pipeline: Arc<IngestionPipeline>,
}

async fn open_storage(kind: StorageKind, path: PathBuf) -> anyhow::Result<Arc<dyn ArticleStorage>> {
    let mut retries = 3;
    loop {
        match fnd_storage::create_storage(kind, Some(path.clone())).await {
            Ok(storage) => return Ok(storage),
            Err(e) if retries > 1 => {
                retries -= 1;
                warn!("Storage initialization failed ({}), retrying {}/3...", e, 3 - retries);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            Err(e) => return Err(e).context("storage initialization failed after all retries"),
        }
    }
}

async fn build_services(cli: &Cli) -> anyhow::Result<Services> {
    let storage = open_storage(cli.storage, cli.database.clone()).await?;

    let limiter = Arc::new(RateLimiter::new(RateLimiterConfig {
        min_interval: cli.min_interval.0,
        max_retries: cli.max_retries,
        retry_delay: cli.retry_delay.0,
    }));
    let fetcher_config = FetcherConfig {
        api_url: cli.api_url.clone(),
        api_key: cli.api_key.clone(),
        timeout: cli.timeout.0,
        accept_invalid_certs: cli.accept_invalid_certs,
        ..Default::default()
    };
    if fetcher_config.api_key.is_empty() {
        warn!("No Guardian API key configured, upstream requests will be rejected");
    }
    if fetcher_config.accept_invalid_certs {
        warn!("TLS certificate verification is disabled for upstream requests");
    }
    let fetcher = Arc::new(GuardianFetcher::new(fetcher_config.clone(), limiter)?);
    let images = Arc::new(HtmlImageResolver::from_config(&fetcher_config)?);

    let mut loader = ArtifactLoader::new(LoaderConfig {
        model_path: cli.model_path.clone(),
        blob_name: cli.model_blob.clone(),
        strict_version: cli.strict_model_version,
    });
    if let Some(url) = &cli.model_store_url {
        loader = loader.with_store(Arc::new(HttpArtifactStore::new(url, &cli.model_container)?));
    }
    let classifiers = Arc::new(LazyClassifier::new(loader));

    let pipeline = Arc::new(IngestionPipeline::new(
        fetcher.clone(),
        images,
        storage.clone(),
        classifiers.clone(),
        PipelineConfig {
            category_pause: cli.category_pause.0,
        },
    ));

    Ok(Services {
        storage,
        fetcher,
        classifiers,
        pipeline,
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("🛑 Shutdown requested");
}

async fn serve(cli: &Cli, services: Services, no_scheduler: bool) -> anyhow::Result<()> {
    if services.storage.list_categories().await?.is_empty() {
        info!("No categories configured, activating defaults: {}", RESET_CATEGORIES.join(", "));
        services.storage.set_active_categories(RESET_CATEGORIES).await?;
    }

    let scheduler = if no_scheduler {
        None
    } else {
        Some(Scheduler::new(services.pipeline.clone(), cli.interval.0).spawn())
    };

    let state = AppState::new(services.storage.clone(), services.classifiers.clone())
        .with_pipeline(services.pipeline.clone());
    fnd_web::serve(create_app(state), &cli.listen, shutdown_signal())
        .await
        .with_context(|| format!("failed to serve on {}", cli.listen))?;

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await;
    }
    Ok(())
}

async fn fetch(services: &Services, category: Option<String>, dry_run: bool) -> anyhow::Result<()> {
    if dry_run {
        let articles = services.fetcher.try_fetch(category.as_deref()).await?;
        for article in &articles {
            println!(
                "{}  {}  {}",
                article.web_publication_date.as_deref().unwrap_or("-"),
                article.web_title.as_deref().unwrap_or("<untitled>"),
                article.web_url.as_deref().unwrap_or("-")
            );
        }
        info!("Fetched {} articles", articles.len());
        return Ok(());
    }

    match category {
        Some(name) => {
            let outcome = services.pipeline.ingest_category(&name).await?;
            println!(
                "{}: {} created, {} skipped, {} failed",
                name,
                outcome.created,
                outcome.skipped,
                outcome.failed.len()
            );
        }
        None => {
            let report = services.pipeline.run_cycle().await?;
            for category in &report.categories {
                match &category.result {
                    Ok(outcome) => println!("{}: {} created", category.category, outcome.created),
                    Err(e) => println!("{}: failed ({})", category.category, e),
                }
            }
            println!("Successfully created {} new articles", report.created());
        }
    }
    Ok(())
}

async fn show(storage: &dyn ArticleStorage) -> anyhow::Result<()> {
    let now = Utc::now();
    println!("Active categories:");
    for category in storage.active_categories().await? {
        match category.last_fetch_at {
            Some(at) => println!(
                "  {:<16} last fetched {} ({} minutes ago)",
                category.name,
                at.format("%Y-%m-%d %H:%M:%S"),
                (now - at).num_minutes()
            ),
            None => println!("  {:<16} never fetched", category.name),
        }
    }

    let stats = storage.stats(now - chrono::Duration::hours(24)).await?;
    println!("Articles in the last 24 hours: {}", stats.recent);
    println!(
        "Total articles: {} ({} reliable, {} unreliable, {:.1}% reliable)",
        stats.total,
        stats.reliable,
        stats.unreliable,
        stats.reliable_percent()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut cli = Cli::parse();
    let command = cli.command.take().unwrap_or(Commands::Serve { no_scheduler: false });
    let services = build_services(&cli).await?;
    info!("✨ Storage ready (using {})", cli.storage);

    match command {
        Commands::Serve { no_scheduler } => serve(&cli, services, no_scheduler).await?,
        Commands::Fetch { category, dry_run } => fetch(&services, category, dry_run).await?,
        Commands::Reset => {
            let deleted = services.storage.delete_all_articles().await?;
            services.storage.set_active_categories(RESET_CATEGORIES).await?;
            info!("🧹 Deleted {} articles", deleted);
            info!("Active categories: {}", RESET_CATEGORIES.join(", "));
        }
        Commands::Categories => {
            services.storage.set_active_categories(GUARDIAN_SECTIONS).await?;
            info!("Activated {} categories", GUARDIAN_SECTIONS.len());
        }
        Commands::Show => show(services.storage.as_ref()).await?,
        Commands::Check { title } => {
            let classifier = services.classifiers.classifier().await?;
            let assessment = assess(classifier.as_ref(), &title, "")?;
            println!("Title: {}", title);
            println!("Prediction: {}", assessment.label());
            println!("Confidence: {}", assessment.formatted_confidence());
            println!("Reliability score: {}", assessment.reliability_score);
            println!("Risk score: {:.1}/100", assessment.risk.risk_score);
        }
    }

    Ok(())
}
