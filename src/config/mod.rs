//! TOML settings in the configuration directory, overridden by the environment.

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, DatasetConfig, OpenAiConfig, PipelineConfig, QueryLogConfig, SearchMode,
    ServerConfig, WeaviateConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
