#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::generation::AnswerMode;
use crate::http::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_TIMEOUT_SECONDS, RetryPolicy};
use crate::retrieval::SearchStrategy;
use crate::safety::DEFAULT_DENYLIST;
use crate::weaviate::SchemaVariant;

pub const ENV_WEAVIATE_HOST: &str = "WEAVIATE_HOST";
pub const ENV_WEAVIATE_HTTP_PORT: &str = "WEAVIATE_HTTP_PORT";
pub const ENV_WEAVIATE_GRPC_PORT: &str = "WEAVIATE_GRPC_PORT";
pub const ENV_WEAVIATE_DEFAULT_COLLECTION: &str = "WEAVIATE_DEFAULT_COLLECTION";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub weaviate: WeaviateConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub query_log: QueryLogConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
    #[serde(skip)]
    api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WeaviateConfig {
    pub protocol: String,
    pub host: String,
    pub http_port: u16,
    pub grpc_port: u16,
    pub default_collection: String,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
}

impl Default for WeaviateConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "wikiragweaviate".to_string(),
            http_port: 8080,
            grpc_port: 50051,
            default_collection: "LinuxCommand".to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub batch_size: u32,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            batch_size: 32,
            timeout_seconds: 60,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Hybrid,
    NearVector,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub search: SearchMode,
    /// Weight of the vector score in hybrid search; 0 is pure keyword, 1 pure vector.
    pub alpha: f32,
    pub fetch_limit: usize,
    pub context_limit: usize,
    pub relevance_gate: bool,
    pub relevance_threshold: f32,
    pub rerank: bool,
    pub safety_scan: bool,
    pub answer_mode: AnswerMode,
    pub language: String,
    pub danger_keywords: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search: SearchMode::Hybrid,
            alpha: 0.5,
            fetch_limit: 12,
            context_limit: 4,
            relevance_gate: true,
            relevance_threshold: 0.20,
            rerank: false,
            safety_scan: true,
            answer_mode: AnswerMode::Verbose,
            language: "French".to_string(),
            danger_keywords: DEFAULT_DENYLIST.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatasetConfig {
    pub base_url: String,
    pub id: String,
    pub config: String,
    pub split: String,
    pub limit: usize,
    pub variant: SchemaVariant,
    pub primary_field: String,
    pub secondary_field: Option<String>,
    /// Used when the row has no secondary field, e.g. the dataset name as a source.
    pub secondary_default: Option<String>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            base_url: "https://datasets-server.huggingface.co".to_string(),
            id: "hrsvrn/linux-commands-dataset".to_string(),
            config: "default".to_string(),
            split: "train".to_string(),
            limit: 50,
            variant: SchemaVariant::Command,
            primary_field: "output".to_string(),
            secondary_field: Some("input".to_string()),
            secondary_default: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QueryLogConfig {
    pub enabled: bool,
    /// Relative paths are resolved against the configuration directory.
    pub path: PathBuf,
}

impl Default for QueryLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("queries.csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7860,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid batch size: {0} (must be between 1 and 2048)")]
    InvalidBatchSize(u32),
    #[error("Invalid hybrid alpha: {0} (must be between 0 and 1)")]
    InvalidAlpha(f32),
    #[error("Invalid relevance threshold: {0} (must be a finite number)")]
    InvalidThreshold(f32),
    #[error("Invalid limits: context limit {context} must be between 1 and fetch limit {fetch} (max 100)")]
    InvalidLimits { fetch: usize, context: usize },
    #[error("Invalid collection name: {0:?}")]
    InvalidCollectionName(String),
    #[error("Dangerous keyword list contains an empty entry")]
    EmptyDenylistEntry,
    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnvValue { name: String, value: String },
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default configuration directory, `~/.linux-rag`
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".linux-rag"))
            .or_else(|| dirs::data_dir().map(|data| data.join("linux-rag")))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load from the default directory and apply environment overrides.
    #[inline]
    pub fn load_default() -> Result<Self> {
        let dir = Self::config_dir().context("Failed to locate configuration directory")?;
        Self::load(dir)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let mut config = Self::load_file(config_dir)?;
        config
            .apply_env_overrides()
            .context("Invalid environment configuration")?;
        config
            .validate()
            .context("Configuration validation failed")?;
        Ok(config)
    }

    /// Read `config.toml` without consulting the environment.
    #[inline]
    pub fn load_file<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();
        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any key/value source; blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(host) = get(ENV_WEAVIATE_HOST) {
            self.weaviate.host = host.trim().to_string();
        }
        if let Some(port) = get(ENV_WEAVIATE_HTTP_PORT) {
            self.weaviate.http_port = parse_port(ENV_WEAVIATE_HTTP_PORT, &port)?;
        }
        if let Some(port) = get(ENV_WEAVIATE_GRPC_PORT) {
            self.weaviate.grpc_port = parse_port(ENV_WEAVIATE_GRPC_PORT, &port)?;
        }
        if let Some(collection) = get(ENV_WEAVIATE_DEFAULT_COLLECTION) {
            self.weaviate.default_collection = collection.trim().to_string();
        }
        if let Some(base_url) = get(ENV_OPENAI_BASE_URL) {
            self.openai.base_url = base_url.trim().to_string();
        }
        if let Some(key) = get(ENV_OPENAI_API_KEY) {
            self.api_key = Some(key.trim().to_string());
        }
        Ok(())
    }

    /// The model API key; its absence is fatal for every command that calls the model.
    #[inline]
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }

    /// Defaults rooted at `base_dir`.
    #[inline]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    #[inline]
    pub fn query_log_path(&self) -> PathBuf {
        if self.query_log.path.is_absolute() {
            self.query_log.path.clone()
        } else {
            self.get_base_dir().join(&self.query_log.path)
        }
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weaviate.validate()?;
        self.openai.validate()?;
        self.pipeline.validate()?;
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort(self.server.port));
        }
        Ok(())
    }
}

fn parse_port(name: &str, value: &str) -> Result<u16, ConfigError> {
    match value.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::InvalidEnvValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

impl WeaviateConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }
        if self.http_port == 0 {
            return Err(ConfigError::InvalidPort(self.http_port));
        }
        if self.grpc_port == 0 {
            return Err(ConfigError::InvalidPort(self.grpc_port));
        }
        self.base_url()?;
        if self.default_collection.trim().is_empty() {
            return Err(ConfigError::InvalidCollectionName(
                self.default_collection.clone(),
            ));
        }
        Ok(())
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.http_port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    #[inline]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, RetryPolicy::default().base_delay)
    }

    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        let candidate = WeaviateConfig {
            host: host.clone(),
            ..self.clone()
        };
        candidate.validate()?;
        self.host = host;
        Ok(())
    }

    pub fn set_http_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        self.http_port = port;
        Ok(())
    }

    pub fn set_default_collection(&mut self, name: String) -> Result<(), ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidCollectionName(name));
        }
        self.default_collection = name;
        Ok(())
    }
}

impl OpenAiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))?;
        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }
        if self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.chat_model.clone()));
        }
        if self.batch_size == 0 || self.batch_size > 2048 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        Ok(())
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    #[inline]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, RetryPolicy::default().base_delay)
    }

    pub fn set_chat_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.chat_model = model;
        Ok(())
    }

    pub fn set_embedding_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.embedding_model = model;
        Ok(())
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(ConfigError::InvalidAlpha(self.alpha));
        }
        if !self.relevance_threshold.is_finite() {
            return Err(ConfigError::InvalidThreshold(self.relevance_threshold));
        }
        if self.context_limit == 0
            || self.context_limit > self.fetch_limit
            || self.fetch_limit > 100
        {
            return Err(ConfigError::InvalidLimits {
                fetch: self.fetch_limit,
                context: self.context_limit,
            });
        }
        if self.danger_keywords.iter().any(|k| k.is_empty()) {
            return Err(ConfigError::EmptyDenylistEntry);
        }
        Ok(())
    }

    #[inline]
    pub fn strategy(&self) -> SearchStrategy {
        match self.search {
            SearchMode::Hybrid => SearchStrategy::Hybrid { alpha: self.alpha },
            SearchMode::NearVector => SearchStrategy::NearVector,
        }
    }

    pub fn set_relevance_threshold(&mut self, threshold: f32) -> Result<(), ConfigError> {
        if !threshold.is_finite() {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        self.relevance_threshold = threshold;
        Ok(())
    }

    pub fn set_alpha(&mut self, alpha: f32) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(ConfigError::InvalidAlpha(alpha));
        }
        self.alpha = alpha;
        Ok(())
    }
}
