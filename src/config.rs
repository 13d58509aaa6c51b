use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::journal::KeyScheme;
use crate::store::DistanceMetric;

/// Environment variable holding the Pinecone API key.
pub const PINECONE_API_KEY_VAR: &str = "PINECONE_API_KEY";
/// Environment variable holding the Gemini API key.
pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PenpalConfig {
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    /// `"pinecone"` or `"sqlite"`.
    pub provider: String,
    pub collection: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
    pub cloud: String,
    pub region: String,
    pub control_plane_url: String,
    pub db_path: String,
    pub key_scheme: KeyScheme,
    /// Never read from TOML; populated from `PINECONE_API_KEY`.
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub similarity_threshold: f32,
    pub context_separator: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Minimum pause between consecutive model calls. `0` disables the gate.
    pub min_interval_ms: u64,
    /// Never read from TOML; populated from `GEMINI_API_KEY`.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for PenpalConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            embedding: EmbeddingConfig::default(),
            store: StoreConfig::default(),
            retrieval: RetrievalConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            host: "127.0.0.1".into(),
            port: 8480,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_penpal_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        let db_path = default_penpal_dir()
            .join("journal.db")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "pinecone".into(),
            collection: "journal-entries".into(),
            dimension: crate::embedding::EMBEDDING_DIM,
            metric: DistanceMetric::Cosine,
            cloud: "aws".into(),
            region: "us-east-1".into(),
            control_plane_url: "https://api.pinecone.io".into(),
            db_path,
            key_scheme: KeyScheme::Generated,
            api_key: None,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 15,
            similarity_threshold: 0.10,
            context_separator: ". ".into(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".into(),
            model: "gemini-pro".into(),
            base_url: "https://generativelanguage.googleapis.com".into(),
            timeout_secs: 60,
            min_interval_ms: 2000,
            api_key: None,
        }
    }
}

/// Returns `~/.penpal/`
pub fn default_penpal_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".penpal")
}

/// Returns the default config file path: `~/.penpal/config.toml`
pub fn default_config_path() -> PathBuf {
    default_penpal_dir().join("config.toml")
}

impl PenpalConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            PenpalConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides and pick up the API keys.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PENPAL_DB") {
            self.store.db_path = val;
        }
        if let Ok(val) = std::env::var("PENPAL_STORE") {
            self.store.provider = val;
        }
        if let Ok(val) = std::env::var("PENPAL_COLLECTION") {
            self.store.collection = val;
        }
        if let Ok(val) = std::env::var("PENPAL_LOG_LEVEL") {
            self.server.log_level = val;
        }
        self.store.api_key = non_empty_var(PINECONE_API_KEY_VAR);
        self.llm.api_key = non_empty_var(GEMINI_API_KEY_VAR);
    }

    /// Fail fast when a credential required by the configured providers is missing.
    pub fn require_credentials(&self) -> Result<()> {
        if self.store.provider == "pinecone" && self.store.api_key.is_none() {
            anyhow::bail!(
                "{PINECONE_API_KEY_VAR} is not set; it is required for the pinecone store"
            );
        }
        if self.llm.provider == "gemini" && self.llm.api_key.is_none() {
            anyhow::bail!("{GEMINI_API_KEY_VAR} is not set; it is required for the gemini model");
        }
        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
