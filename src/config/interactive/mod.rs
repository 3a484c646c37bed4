#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::{Config, ConfigError, PipelineConfig, WeaviateConfig};
use crate::generation::AnswerMode;

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Linux RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir);

    eprintln!("{}", style("Weaviate Configuration").bold().yellow());
    eprintln!("Configure the vector store holding your collections.");
    eprintln!();
    configure_weaviate(&mut config.weaviate)?;

    eprintln!();
    eprintln!("{}", style("Language Model Configuration").bold().yellow());
    eprintln!("The API key is read from OPENAI_API_KEY and never written to disk.");
    eprintln!();
    configure_models(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Answer Pipeline").bold().yellow());
    configure_pipeline(&mut config.pipeline)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_weaviate_connection(&config.weaviate) {
        eprintln!("{}", style("✓ Weaviate is ready!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not reach Weaviate").yellow()
        );
        eprintln!("You can continue, but make sure Weaviate is running before querying.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config: &Config) {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Weaviate:").bold().yellow());
    match config.weaviate.base_url() {
        Ok(url) => eprintln!("  URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!("  gRPC Port: {}", style(config.weaviate.grpc_port).cyan());
    eprintln!(
        "  Default Collection: {}",
        style(&config.weaviate.default_collection).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Language Model:").bold().yellow());
    eprintln!("  Endpoint: {}", style(&config.openai.base_url).cyan());
    eprintln!("  Chat Model: {}", style(&config.openai.chat_model).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.openai.embedding_model).cyan()
    );
    let key_state = if config.api_key().is_ok() {
        style("set").green()
    } else {
        style("missing").red()
    };
    eprintln!("  API Key: {}", key_state);

    eprintln!();
    eprintln!("{}", style("Pipeline:").bold().yellow());
    let pipeline = &config.pipeline;
    eprintln!("  Search: {}", style(format!("{:?}", pipeline.strategy())).cyan());
    eprintln!(
        "  Fetch / Context Limit: {}",
        style(format!("{} / {}", pipeline.fetch_limit, pipeline.context_limit)).cyan()
    );
    eprintln!(
        "  Relevance Gate: {}",
        style(if pipeline.relevance_gate {
            format!("on (threshold {:.2})", pipeline.relevance_threshold)
        } else {
            "off".to_string()
        })
        .cyan()
    );
    eprintln!("  Rerank: {}", style(on_off(pipeline.rerank)).cyan());
    eprintln!("  Safety Scan: {}", style(on_off(pipeline.safety_scan)).cyan());
    eprintln!("  Answer Mode: {}", style(pipeline.answer_mode).cyan());

    eprintln!();
    if config.query_log.enabled {
        eprintln!(
            "Query log: {}",
            style(config.query_log_path().display()).dim()
        );
    }
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

fn load_existing_config(config_dir: &Path) -> Config {
    Config::load_file(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Config::with_base_dir(config_dir)
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            config
        },
    )
}

fn configure_weaviate(weaviate: &mut WeaviateConfig) -> Result<()> {
    let host: String = Input::new()
        .with_prompt("Weaviate host")
        .default(weaviate.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let candidate = WeaviateConfig {
                host: input.clone(),
                ..WeaviateConfig::default()
            };
            candidate.validate()
        })
        .interact_text()?;

    let http_port: u16 = Input::new()
        .with_prompt("Weaviate HTTP port")
        .default(weaviate.http_port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let collection: String = Input::new()
        .with_prompt("Default collection")
        .default(weaviate.default_collection.clone())
        .interact_text()?;

    weaviate.set_host(host)?;
    weaviate.set_http_port(http_port)?;
    weaviate.set_default_collection(collection)?;

    Ok(())
}

fn configure_models(config: &mut Config) -> Result<()> {
    let chat_model: String = Input::new()
        .with_prompt("Chat model")
        .default(config.openai.chat_model.clone())
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(config.openai.embedding_model.clone())
        .interact_text()?;

    config.openai.set_chat_model(chat_model)?;
    config.openai.set_embedding_model(embedding_model)?;

    Ok(())
}

fn configure_pipeline(pipeline: &mut PipelineConfig) -> Result<()> {
    let threshold: f32 = Input::new()
        .with_prompt("Relevance threshold")
        .default(pipeline.relevance_threshold)
        .interact_text()?;
    pipeline.set_relevance_threshold(threshold)?;

    let modes = [AnswerMode::Verbose, AnswerMode::Strict];
    let default_index = modes
        .iter()
        .position(|m| *m == pipeline.answer_mode)
        .unwrap_or(0);
    let mode_index = Select::new()
        .with_prompt("Answer mode")
        .default(default_index)
        .items(&modes)
        .interact()?;
    pipeline.answer_mode = modes[mode_index];

    pipeline.rerank = Confirm::new()
        .with_prompt("Rerank retrieved commands with the language model?")
        .default(pipeline.rerank)
        .interact()?;

    Ok(())
}

fn test_weaviate_connection(weaviate: &WeaviateConfig) -> bool {
    let Ok(base) = weaviate.base_url() else {
        return false;
    };
    let Ok(url) = base.join("/v1/.well-known/ready") else {
        return false;
    };

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    agent.get(url.as_str()).call().is_ok()
}
