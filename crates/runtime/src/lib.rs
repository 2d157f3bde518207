use std::path::Path;

use anyhow::{Context, Result};
use coursedeck_auth::Authenticator;
use coursedeck_config::{AppConfig, DatabaseConfig, StorageConfig};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::INFO)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub authenticator: Authenticator,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database).await?;
        prepare_storage(&config.storage).await?;

        let authenticator = Authenticator::new(db_pool.clone(), config.auth.clone());
        info!("authentication subsystem ready");

        Ok(Self {
            db_pool,
            authenticator,
        })
    }
}

/// Connect to sqlite, creating the database file on first run, and
/// bring the schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> Result<SqlitePool> {
    if let Some(sqlite_path) = config.url.strip_prefix("sqlite://") {
        if sqlite_path != ":memory:" {
            ensure_sqlite_file(Path::new(sqlite_path)).await?;
        }
    }

    let db_pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
        .with_context(|| format!("failed to connect to database {}", config.url))?;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&db_pool)
        .await
        .context("failed to enable foreign keys for sqlite")?;

    MIGRATOR
        .run(&db_pool)
        .await
        .context("database migrations failed")?;

    info!(url = %config.url, "database ready");
    Ok(db_pool)
}

/// Create the upload directories so the static-file routes have
/// something to serve from the first request on.
pub async fn prepare_storage(config: &StorageConfig) -> Result<()> {
    for dir in [&config.images_dir, &config.videos_dir, &config.pdfs_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create upload directory {dir}"))?;
    }
    Ok(())
}

async fn ensure_sqlite_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| {
                    format!("failed to create sqlite directory {}", parent.display())
                })?;
        }
    }

    if !path.exists() {
        tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(path)
            .await
            .with_context(|| {
                format!("failed to create sqlite database file {}", path.display())
            })?;
    }

    Ok(())
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
