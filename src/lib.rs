use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Connection unavailable: {0}")]
    ConnectionUnavailable(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Collection not found: {name}")]
    CollectionNotFound { name: String },

    #[error("Collection already exists: {name}")]
    CollectionExists { name: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus {
        status: u16,
        url: String,
        /// Response body, kept for error details the server puts there.
        body: String,
    },

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RagError {
    /// Whether a failed network call is worth repeating.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionUnavailable(_) | Self::Timeout(_) => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<config::ConfigError> for RagError {
    #[inline]
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub mod commands;
pub mod config;
pub mod dataset;
pub mod generation;
pub mod http;
pub mod ingest;
pub mod openai;
pub mod pipeline;
pub mod query_log;
pub mod retrieval;
pub mod safety;
#[cfg(test)]
pub(crate) mod testing;
pub mod weaviate;
pub mod web;
