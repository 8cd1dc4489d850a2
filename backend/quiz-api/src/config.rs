use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::services::result_store::DEFAULT_HISTORY_CAPACITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Redis,
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Some(StorageBackend::File),
            "redis" => Some(StorageBackend::Redis),
            "memory" => Some(StorageBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub generation_timeout_secs: u64,
    pub storage_backend: StorageBackend,
    pub data_dir: PathBuf,
    pub redis_uri: Option<String>,
    pub history_key: String,
    pub history_capacity: usize,
    pub question_seconds: u32,
    pub tick_interval_ms: u64,
    pub upload_limit_bytes: usize,
    /// `user:password` guarding `/metrics`; unguarded when unset.
    pub metrics_auth: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8081".to_string(),
            gemini_api_key: String::new(),
            gemini_model: "gemini-3-flash-preview".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com/".to_string(),
            generation_timeout_secs: 60,
            storage_backend: StorageBackend::File,
            data_dir: PathBuf::from("data"),
            redis_uri: None,
            history_key: "smart_study_results".to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            question_seconds: 30,
            tick_interval_ms: 1000,
            upload_limit_bytes: 16 * 1024 * 1024,
            metrics_auth: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or(defaults.bind_addr);

        let gemini_api_key = settings
            .get_string("gemini.api_key")
            .or_else(|_| env::var("GEMINI_API_KEY"))
            .or_else(|_| env::var("API_KEY"))
            .unwrap_or_else(|_| {
                if env == "prod" {
                    panic!("FATAL: GEMINI_API_KEY must be set in production!");
                }
                eprintln!("WARNING: GEMINI_API_KEY is not set, quiz generation will fail");
                String::new()
            });

        let gemini_model = settings
            .get_string("gemini.model")
            .or_else(|_| env::var("GEMINI_MODEL"))
            .unwrap_or(defaults.gemini_model);

        let gemini_base_url = settings
            .get_string("gemini.base_url")
            .or_else(|_| env::var("GEMINI_BASE_URL"))
            .unwrap_or(defaults.gemini_base_url);

        let generation_timeout_secs = settings
            .get_int("gemini.timeout_secs")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.generation_timeout_secs);

        let storage_backend = settings
            .get_string("storage.backend")
            .or_else(|_| env::var("STORAGE_BACKEND"))
            .ok()
            .map(|value| {
                StorageBackend::parse(&value).ok_or_else(|| {
                    config::ConfigError::Message(format!("Unknown storage backend: {}", value))
                })
            })
            .transpose()?
            .unwrap_or(defaults.storage_backend);

        let data_dir = settings
            .get_string("storage.data_dir")
            .or_else(|_| env::var("DATA_DIR"))
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let redis_uri = settings
            .get_string("redis.uri")
            .or_else(|_| env::var("REDIS_URI"))
            .ok();

        if storage_backend == StorageBackend::Redis && redis_uri.is_none() {
            return Err(config::ConfigError::Message(
                "REDIS_URI must be set when the redis storage backend is selected".to_string(),
            ));
        }

        let history_key = settings
            .get_string("storage.history_key")
            .unwrap_or(defaults.history_key);

        let history_capacity = settings
            .get_int("storage.history_capacity")
            .ok()
            .and_then(|v| usize::try_from(v).ok())
            .filter(|v| *v > 0)
            .map(|v| v.min(DEFAULT_HISTORY_CAPACITY))
            .unwrap_or(defaults.history_capacity);

        let question_seconds = settings
            .get_int("quiz.question_seconds")
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.question_seconds);

        let tick_interval_ms = settings
            .get_int("quiz.tick_interval_ms")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.tick_interval_ms);

        let upload_limit_bytes = settings
            .get_int("server.upload_limit_bytes")
            .ok()
            .and_then(|v| usize::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.upload_limit_bytes);

        let metrics_auth = settings
            .get_string("server.metrics_auth")
            .or_else(|_| env::var("METRICS_AUTH"))
            .ok()
            .filter(|v| !v.is_empty());

        Ok(Config {
            bind_addr,
            gemini_api_key,
            gemini_model,
            gemini_base_url,
            generation_timeout_secs,
            storage_backend,
            data_dir,
            redis_uri,
            history_key,
            history_capacity,
            question_seconds,
            tick_interval_ms,
            upload_limit_bytes,
            metrics_auth,
        })
    }
}
