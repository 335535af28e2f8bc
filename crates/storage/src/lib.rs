use anyhow::Context;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::{fs, path::Path};
use tracing::{debug, info};

mod models;
mod repo;

/// Episode record store backed by SQLite.
#[derive(Clone)]
pub struct Db {
    pub(crate) pool: Pool<Sqlite>,
}

impl Db {
    /// Opens (creating if needed) the episode store at `db_url` and applies
    /// pending migrations.
    pub async fn new(db_url: &str) -> anyhow::Result<Self> {
        if let Some(parent) = file_path(db_url).and_then(Path::parent) {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("cannot create directory {} for episode store", parent.display())
                })?;
            }
        }
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("creating episode store at {}", db_url);
            Sqlite::create_database(db_url)
                .await
                .with_context(|| format!("cannot create episode store {}", db_url))?;
        }

        let pool = SqlitePoolOptions::new()
            .connect(db_url)
            .await
            .with_context(|| format!("cannot connect to episode store {}", db_url))?;
        for pragma in ["PRAGMA journal_mode = WAL;", "PRAGMA synchronous = NORMAL;"] {
            sqlx::query(pragma).execute(&pool).await?;
        }
        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .with_context(|| format!("migrating episode store {} failed", db_url))?;

        debug!("episode store ready: {}", db_url);
        Ok(Self { pool })
    }
}

/// On-disk path of a file-backed SQLite url, `None` for in-memory databases.
fn file_path(db_url: &str) -> Option<&Path> {
    let path = db_url.strip_prefix("sqlite://")?;
    if path.contains(":memory:") {
        return None;
    }
    Some(Path::new(path.split('?').next().unwrap_or(path)))
}
