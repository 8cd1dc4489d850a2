use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::metrics::{track_store_operation, HISTORY_RESETS_TOTAL};
use crate::models::QuizResult;

use super::history_slot::SlotBackend;

pub const DEFAULT_HISTORY_KEY: &str = "smart_study_results";
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Storage capability handed to the study flow and the dashboard.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Prepends `result` and drops entries beyond the capacity.
    async fn append(&self, result: QuizResult) -> Result<()>;

    /// Newest-first history. Unreadable data is treated as no history.
    async fn list(&self) -> Vec<QuizResult>;

    async fn health(&self) -> Result<()>;
}

/// Bounded history kept as one JSON array in a key-value slot.
pub struct ResultStore {
    backend: Arc<dyn SlotBackend>,
    key: String,
    capacity: usize,
    write_lock: Mutex<()>,
}

impl ResultStore {
    pub fn new(backend: Arc<dyn SlotBackend>, key: impl Into<String>, capacity: usize) -> Self {
        Self {
            backend,
            key: key.into(),
            capacity: capacity.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_defaults(backend: Arc<dyn SlotBackend>) -> Self {
        Self::new(backend, DEFAULT_HISTORY_KEY, DEFAULT_HISTORY_CAPACITY)
    }

    async fn load(&self) -> Vec<QuizResult> {
        let backend = self.backend.name();
        let raw = match track_store_operation("read", backend, self.backend.read(&self.key)).await
        {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Could not read history slot '{}': {:#}", self.key, e);
                HISTORY_RESETS_TOTAL.inc();
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<QuizResult>>(&raw) {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(
                    "Stored history in slot '{}' is unreadable, starting empty: {}",
                    self.key,
                    e
                );
                HISTORY_RESETS_TOTAL.inc();
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl HistoryStore for ResultStore {
    async fn append(&self, result: QuizResult) -> Result<()> {
        result.validate().context("Refusing to store invalid result")?;

        let _guard = self.write_lock.lock().await;

        let mut history = self.load().await;
        history.insert(0, result);
        history.truncate(self.capacity);

        let serialized = serde_json::to_string(&history).context("Failed to serialize history")?;
        track_store_operation(
            "write",
            self.backend.name(),
            self.backend.write(&self.key, &serialized),
        )
        .await?;

        tracing::debug!(
            "History slot '{}' now holds {} results",
            self.key,
            history.len()
        );
        Ok(())
    }

    async fn list(&self) -> Vec<QuizResult> {
        self.load().await
    }

    async fn health(&self) -> Result<()> {
        self.backend.ping().await
    }
}
