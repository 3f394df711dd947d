//! Cache and durable key-value interfaces with in-memory and SQLite
//! backends.
//!
//! Both stores are passed into the orchestrator as trait objects so tests
//! can substitute deterministic fakes.
//!
//! ## Key namespace
//! - `payload:<hemisphere>` - last-good rendered payload
//! - `etag:<url>` - validator token for conditional fetch
//! - `diagnostics:last` - most recent refresh diagnostics record
//! - `asset:<slot>` - viewline image fetch status

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::RwLock;
use tracing::info;

use aurora_core::payload::Hemisphere;

pub const DIAGNOSTICS_KEY: &str = "diagnostics:last";

pub fn payload_key(hemisphere: Hemisphere) -> String {
    format!("payload:{hemisphere}")
}

pub fn etag_key(url: &str) -> String {
    format!("etag:{url}")
}

pub fn asset_key(slot: &str) -> String {
    format!("asset:{slot}")
}

/// Volatile TTL cache holding the last-good rendered payload per key.
#[async_trait]
pub trait VolatileCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String, ttl: Duration);
}

/// Durable key-value store surviving restarts: the cache of last resort
/// and home of validator tokens.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// In-memory TTL cache with lazy expiry on read.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VolatileCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some((value, deadline)) if *deadline > Instant::now() => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let deadline = Instant::now() + ttl;
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value, deadline));
    }
}

/// SQLite-backed key-value store using sqlx.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open or create the store database at the given path.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to open SQLite database")?;

        Self::init(&pool).await?;
        info!(path = %path.display(), "Opened durable key-value store");
        Ok(Self { pool })
    }

    /// Open an in-memory database (for testing).
    pub async fn open_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::init(&pool).await?;
        Ok(Self { pool })
    }

    async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DurableStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read from kv_store")?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to write to kv_store")?;
        Ok(())
    }
}
