//! Key-value slots that hold the serialized history.
//!
//! A slot stores one opaque string per key and is always read and written as a
//! whole; parsing and capping are done by the result store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;

use crate::utils::retry::RetryPolicy;

#[async_trait]
pub trait SlotBackend: Send + Sync {
    /// Backend label used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn read(&self, key: &str) -> Result<Option<String>>;

    async fn write(&self, key: &str, value: &str) -> Result<()>;

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// One `<key>.json` file per slot inside a data directory.
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl SlotBackend for FileSlot {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        // Write next to the target and rename so readers never see a torn file.
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        tokio::fs::write(&tmp, value)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        match tokio::fs::metadata(&self.dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(anyhow!("{} is not a directory", self.dir.display())),
            // Created on first write.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// A single Redis string key per slot.
pub struct RedisSlot {
    redis: ConnectionManager,
    retry: RetryPolicy,
}

impl RedisSlot {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            redis,
            retry: RetryPolicy::default(),
        }
    }

    pub async fn connect(redis_uri: &str) -> Result<Self> {
        let client = redis::Client::open(redis_uri).context("Invalid Redis URI")?;

        tracing::info!("Attempting to connect to Redis...");

        let redis = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            ConnectionManager::new(client),
        )
        .await
        .map_err(|_| anyhow!("Redis connection timeout after 30s"))??;

        let slot = Self::new(redis);
        tokio::time::timeout(std::time::Duration::from_secs(5), slot.ping())
            .await
            .map_err(|_| anyhow!("Redis PING timeout after 5s"))??;

        tracing::info!("Redis connection established successfully");
        Ok(slot)
    }
}

#[async_trait]
impl SlotBackend for RedisSlot {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        self.retry
            .run("redis GET", || async {
                let mut conn = self.redis.clone();
                redis::cmd("GET")
                    .arg(key)
                    .query_async::<Option<String>>(&mut conn)
                    .await
                    .context("Failed to read history from Redis")
            })
            .await
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.retry
            .run("redis SET", || async {
                let mut conn = self.redis.clone();
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .query_async::<()>(&mut conn)
                    .await
                    .context("Failed to write history to Redis")
            })
            .await
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.redis.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .context("Redis PING failed")?;
        Ok(())
    }
}

/// Process-local slot, used in tests and with `storage.backend = "memory"`.
#[derive(Default)]
pub struct MemorySlot {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let slot = Self::default();
        slot.put(key, value);
        slot
    }

    fn put(&self, key: &str, value: &str) {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl SlotBackend for MemorySlot {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.put(key, value);
        Ok(())
    }
}
