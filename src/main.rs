use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use folio_reconcile::{
    application::{
        ports::{ObjectStore, RecordRepository},
        reconcile::{ExecutionMode, ReconcileConfig, RunReport},
        use_cases::{
            AuditCurrentUseCase, AuditReferencesUseCase, DeduplicateStorageUseCase,
            FixGalleryOrderUseCase, HealReferencesUseCase, OrganizeStorageUseCase,
        },
    },
    config::LogFormat,
    infrastructure::{
        persistence::{JsonSnapshotRepository, PostgresRecordRepository},
        storage::LocalFilesystemStore,
    },
    url_codec::DownloadUrlTemplate,
    Config,
};

#[derive(Parser)]
#[command(
    name = "folio-reconcile",
    version,
    about = "Reconcile site records with the image bucket"
)]
struct Cli {
    /// Read and write records in a JSON export instead of the database
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Find byte-identical objects and delete redundant copies
    Duplicates {
        #[arg(long)]
        prefix: Option<String>,
        /// Actually delete (default is a dry run)
        #[arg(long)]
        execute: bool,
    },
    /// Report missing, invalid and unreferenced objects
    Audit {
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Point broken references at a surviving copy of the same file
    Heal {
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        execute: bool,
        /// Also relink references that are not download URLs, by file name
        #[arg(long)]
        relink_invalid: bool,
    },
    /// Give gallery records without an order a place at the end
    FixGalleryOrder {
        #[arg(long)]
        execute: bool,
    },
    /// List current sections with their items and report orphans
    AuditCurrent,
    /// Move files at the bucket root into images/ and relink their records
    Organize {
        #[arg(long)]
        execute: bool,
    },
    /// Apply database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = Config::from_env();
    init_tracing(config.log_format);
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Command::Duplicates { prefix, execute } => {
            let records = open_records(&config, cli.snapshot.as_deref()).await?;
            let store = open_store(&config).await?;
            let run = ReconcileConfig::new(
                config.prefix_or_default(prefix),
                ExecutionMode::from_execute_flag(execute),
            );
            let report = DeduplicateStorageUseCase::new(records, store)
                .execute(&run)
                .await?;
            print_report(&report, cli.format)?;
        }
        Command::Audit { prefix } => {
            let records = open_records(&config, cli.snapshot.as_deref()).await?;
            let store = open_store(&config).await?;
            let report = AuditReferencesUseCase::new(records, store)
                .execute(&config.prefix_or_default(prefix))
                .await?;
            print_report(&report, cli.format)?;
        }
        Command::Heal {
            prefix,
            execute,
            relink_invalid,
        } => {
            let urls = DownloadUrlTemplate::new(config.storage_host.clone(), config.bucket()?);
            let records = open_records(&config, cli.snapshot.as_deref()).await?;
            let store = open_store(&config).await?;
            let report = HealReferencesUseCase::new(records, store, urls)
                .with_invalid_relink(relink_invalid)
                .execute(
                    &config.prefix_or_default(prefix),
                    ExecutionMode::from_execute_flag(execute),
                )
                .await?;
            print_report(&report, cli.format)?;
        }
        Command::FixGalleryOrder { execute } => {
            let records = open_records(&config, cli.snapshot.as_deref()).await?;
            let report = FixGalleryOrderUseCase::new(records)
                .execute(ExecutionMode::from_execute_flag(execute))
                .await?;
            print_report(&report, cli.format)?;
        }
        Command::AuditCurrent => {
            let records = open_records(&config, cli.snapshot.as_deref()).await?;
            let report = AuditCurrentUseCase::new(records).execute().await?;
            print_report(&report, cli.format)?;
        }
        Command::Organize { execute } => {
            let urls = DownloadUrlTemplate::new(config.storage_host.clone(), config.bucket()?);
            let records = open_records(&config, cli.snapshot.as_deref()).await?;
            let store = open_store(&config).await?;
            let report = OrganizeStorageUseCase::new(records, store, urls)
                .execute(ExecutionMode::from_execute_flag(execute))
                .await?;
            print_report(&report, cli.format)?;
        }
        Command::Migrate => {
            let pool = connect(&config).await?;
            info!("Running database migrations");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            info!("Migrations applied");
        }
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // Logs go to stderr so reports on stdout stay machine-readable
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init(),
    }
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let url = config.database_url()?;
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .connect(&url)
        .await
        .context("Failed to connect to database")
}

async fn open_records(
    config: &Config,
    snapshot: Option<&std::path::Path>,
) -> anyhow::Result<Arc<dyn RecordRepository>> {
    match snapshot {
        Some(path) => {
            let repo = JsonSnapshotRepository::open(path)
                .await
                .with_context(|| format!("Failed to open snapshot {}", path.display()))?;
            Ok(Arc::new(repo))
        }
        None => {
            let pool = connect(config).await?;
            info!("Connected to database");
            Ok(Arc::new(PostgresRecordRepository::new(pool)))
        }
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn ObjectStore>> {
    let root = config.storage_root()?.to_path_buf();
    if !root.is_dir() {
        anyhow::bail!("STORAGE_ROOT {} is not a directory", root.display());
    }
    info!(root = %root.display(), "Using local bucket mirror");
    Ok(Arc::new(LocalFilesystemStore::new(root)))
}

fn print_report<R: RunReport>(report: &R, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => println!("{}", report.details()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}
