use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::config::{Config, StorageBackend};

use self::history_slot::{FileSlot, MemorySlot, RedisSlot, SlotBackend};
use self::notes_extractor::{PdfTextExtractor, TextExtractor};
use self::quiz_generator::{GeminiQuizGenerator, QuizGenerator};
use self::result_store::{HistoryStore, ResultStore};
use self::study_service::StudyService;

pub struct AppState {
    pub config: Config,
    pub study: StudyService,
    pub store: Arc<dyn HistoryStore>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let slot: Arc<dyn SlotBackend> = match config.storage_backend {
            StorageBackend::File => {
                tracing::info!("Storing history under {}", config.data_dir.display());
                Arc::new(FileSlot::new(&config.data_dir))
            }
            StorageBackend::Redis => {
                let uri = config
                    .redis_uri
                    .as_deref()
                    .context("REDIS_URI must be set for the redis storage backend")?;
                Arc::new(RedisSlot::connect(uri).await?)
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory history, results are lost on restart");
                Arc::new(MemorySlot::new())
            }
        };

        let store: Arc<dyn HistoryStore> = Arc::new(ResultStore::new(
            slot,
            config.history_key.clone(),
            config.history_capacity,
        ));
        let generator = Arc::new(
            GeminiQuizGenerator::from_config(&config)
                .context("Failed to build generation client")?,
        );

        Ok(Self::with_components(
            config,
            store,
            generator,
            Arc::new(PdfTextExtractor::default()),
        ))
    }

    /// Wires the study flow around already-built collaborators.
    pub fn with_components(
        config: Config,
        store: Arc<dyn HistoryStore>,
        generator: Arc<dyn QuizGenerator>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        let study = StudyService::new(
            store.clone(),
            generator,
            extractor,
            config.question_seconds,
            Duration::from_millis(config.tick_interval_ms),
        );

        Self {
            config,
            study,
            store,
        }
    }
}

pub mod analytics;
pub mod history_slot;
pub mod notes_extractor;
pub mod quiz_generator;
pub mod quiz_session;
pub mod result_store;
pub mod screen;
pub mod study_service;
