use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::sync::Arc;
use tracing::{info, warn};

use crate::RagError;
use crate::config::Config;
use crate::dataset::{DatasetMapping, HuggingFaceDatasets};
use crate::http::HttpTransport;
use crate::ingest::Ingestor;
use crate::openai::OpenAiClient;
use crate::pipeline::{Answer, PipelineSettings, RagPipeline};
use crate::query_log::QueryLogger;
use crate::weaviate::admin::{self, CreateOutcome, DeleteOutcome, ExistingCollection};
use crate::weaviate::{CollectionSchema, SchemaVariant, WeaviateClient, normalize_collection_name};
use crate::web::{self, AppState};

/// Options of `create-schema`.
#[derive(Debug, Clone, Default)]
pub struct CreateSchemaOptions {
    pub collection: Option<String>,
    pub variant: Option<SchemaVariant>,
    pub vectorizer: Option<String>,
    pub recreate: bool,
}

/// Options of `ingest`; unset values come from the `[dataset]` section.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub collection: Option<String>,
    pub dataset: Option<String>,
    pub split: Option<String>,
    pub limit: Option<usize>,
}

fn weaviate_client(config: &Config) -> Result<WeaviateClient> {
    WeaviateClient::new(&config.weaviate).context("Failed to create Weaviate client")
}

fn openai_client(config: &Config) -> Result<OpenAiClient> {
    let api_key = config
        .api_key()
        .context("Set OPENAI_API_KEY to use the language model")?;
    Ok(OpenAiClient::new(&config.openai, api_key))
}

/// The collection named on the command line, or the configured default.
fn resolve_collection(config: &Config, collection: Option<String>) -> Result<String> {
    let name = collection.unwrap_or_else(|| config.weaviate.default_collection.clone());
    Ok(normalize_collection_name(&name)?)
}

/// Report a missing collection, listing the ones that exist as a hint.
///
/// The returned error wraps [`RagError::CollectionNotFound`].
fn collection_not_found(client: &WeaviateClient, name: String) -> anyhow::Error {
    println!("❌ Collection '{}' does not exist.", name);
    println!();
    println!("Available collections:");
    match client.list_collections() {
        Ok(available) if available.is_empty() => println!("   (none)"),
        Ok(available) => {
            for info in &available {
                println!("   • {}", info.name);
            }
        }
        Err(e) => println!("   ⚠️  Could not list collections: {}", e),
    }
    anyhow::Error::new(RagError::CollectionNotFound { name })
}

/// Build the answering pipeline from configuration.
#[inline]
pub fn build_pipeline(config: &Config) -> Result<RagPipeline> {
    let openai = Arc::new(openai_client(config)?);
    let store = Arc::new(weaviate_client(config)?);

    let pipeline = RagPipeline::new(
        openai.clone(),
        store,
        openai,
        PipelineSettings::from(&config.pipeline),
    );

    Ok(if config.query_log.enabled {
        pipeline.with_logger(Arc::new(QueryLogger::new(config.query_log_path())))
    } else {
        pipeline
    })
}

/// Create a collection, asking what to do if it already exists
#[inline]
pub fn create_schema(config: &Config, options: CreateSchemaOptions) -> Result<()> {
    let client = weaviate_client(config)?;
    let mut name = resolve_collection(config, options.collection)?;
    let variant = options.variant.unwrap_or(config.dataset.variant);

    let mut on_existing = if options.recreate {
        ExistingCollection::Recreate
    } else {
        ExistingCollection::Fail
    };

    if !options.recreate && client.collection_exists(&name)? {
        println!("⚠️  Collection '{}' already exists.", name);
        let choices = ["Recreate it (all records are lost)", "Use a new name", "Keep it"];
        let selection = Select::new()
            .with_prompt("What do you want to do?")
            .items(&choices)
            .default(2)
            .interact()?;

        match selection {
            0 => on_existing = ExistingCollection::Recreate,
            1 => {
                let new_name: String = Input::new()
                    .with_prompt("New collection name")
                    .validate_with(|input: &String| -> Result<(), String> {
                        normalize_collection_name(input)
                            .map(|_| ())
                            .map_err(|e| e.to_string())
                    })
                    .interact_text()?;
                name = normalize_collection_name(&new_name)?;
            }
            _ => on_existing = ExistingCollection::Skip,
        }
    }

    let mut schema = CollectionSchema::new(&name, variant);
    if let Some(vectorizer) = options.vectorizer {
        schema = schema.with_vectorizer(vectorizer);
    }

    match admin::create_collection(&client, &schema, on_existing)? {
        CreateOutcome::Created => println!("✅ Collection '{}' created ({} schema).", name, variant),
        CreateOutcome::Recreated => {
            println!("✅ Collection '{}' recreated ({} schema).", name, variant);
        }
        CreateOutcome::Skipped => println!("✅ No changes made, '{}' kept as is.", name),
    }

    Ok(())
}

/// Load the configured dataset and store it in a collection
#[inline]
pub fn ingest(config: &Config, options: IngestOptions) -> Result<()> {
    let collection = resolve_collection(config, options.collection)?;
    let dataset = &config.dataset;
    let dataset_id = options.dataset.unwrap_or_else(|| dataset.id.clone());
    let split = options.split.unwrap_or_else(|| dataset.split.clone());
    let limit = options.limit.unwrap_or(dataset.limit);

    let openai = Arc::new(openai_client(config)?);
    let client = weaviate_client(config)?;

    println!("📥 Loading {} [{}] (up to {} rows)…", dataset_id, split, limit);
    println!("🎯 Target collection: '{}'", collection);

    let transport = HttpTransport::new(config.openai.timeout(), config.openai.retry_policy());
    let source = HuggingFaceDatasets::new(&dataset.base_url, transport)?;
    let rows = source
        .load(&dataset_id, &dataset.config, &split, limit)
        .with_context(|| format!("Failed to load dataset {dataset_id}"))?;

    let mapping = DatasetMapping::from_config(dataset);
    let pairs = mapping.pairs(&rows);
    let incomplete = rows.len() - pairs.len();
    if incomplete > 0 {
        warn!("{} rows lacked {} or its pair field", incomplete, mapping.primary_field);
    }
    println!("📝 {} documents prepared", pairs.len());

    let ingestor = Ingestor::new(client.clone(), openai).with_batch_size(config.openai.batch_size as usize);
    let mut report = match ingestor.ingest(&collection, pairs) {
        Ok(report) => report,
        Err(RagError::CollectionNotFound { name }) => {
            let err = collection_not_found(&client, name.clone());
            println!("💡 Run 'linux-rag create-schema {}' to create it.", name);
            return Err(err);
        }
        Err(e) => return Err(e).context("Ingestion failed"),
    };
    report.skipped += incomplete;

    println!(
        "✅ {} records indexed into '{}' ({} skipped)",
        report.inserted, collection, report.skipped
    );
    Ok(())
}

/// Answer one question from the command line
#[inline]
pub fn query(config: &Config, question: &str, collection: Option<String>) -> Result<()> {
    let collection = resolve_collection(config, collection)?;
    let pipeline = build_pipeline(config)?;

    println!("❓ Question: {}", question);
    println!("📚 Collection: {}", collection);
    println!();

    let answer = match pipeline.answer(question, &collection) {
        Ok(answer) => answer,
        Err(RagError::CollectionNotFound { name }) => {
            return Err(collection_not_found(&weaviate_client(config)?, name));
        }
        Err(e) => return Err(e.into()),
    };
    match &answer {
        Answer::Generated { .. } => {
            println!("{}", style("Answer:").bold().green());
            println!("{}", answer.message());
        }
        Answer::NoResults | Answer::LowRelevance { .. } => {
            println!("{}", style(answer.message()).yellow());
        }
    }

    if !answer.sources().is_empty() {
        println!();
        println!("{}", style("Sources:").bold());
        for (i, source) in answer.sources().iter().enumerate() {
            println!("{}. {}", i + 1, style(&source.primary).cyan());
            println!("   ↳ {}", source.secondary);
        }
    }

    Ok(())
}

/// Delete a collection after an interactive confirmation
#[inline]
pub fn delete_collection(config: &Config, collection: &str) -> Result<()> {
    let client = weaviate_client(config)?;
    let name = normalize_collection_name(collection)?;

    if !client.collection_exists(&name)? {
        return Err(collection_not_found(&client, name));
    }

    match client.aggregate_count(&name) {
        Ok(count) => println!("📊 '{}' holds {} objects.", name, count),
        Err(e) => println!("⚠️  Could not count objects: {}", e),
    }

    println!();
    println!(
        "{}",
        style(format!("⚠️  You are about to delete '{name}'. This cannot be undone.")).red()
    );
    let confirmed = Confirm::new()
        .with_prompt("Delete this collection?")
        .default(false)
        .interact()?;

    match admin::delete_collection(&client, &name, confirmed)? {
        DeleteOutcome::Deleted { objects } => {
            info!("Deleted collection {} ({:?} objects)", name, objects);
            println!("✅ Collection '{}' deleted.", name);
        }
        DeleteOutcome::Cancelled => println!("❌ Deletion cancelled."),
    }

    Ok(())
}

/// List every collection with its size and fields
#[inline]
pub fn list_collections(config: &Config) -> Result<()> {
    let client = weaviate_client(config)?;
    let summaries = admin::list_collections(&client).context("Failed to list collections")?;

    if summaries.is_empty() {
        println!("📋 No collections found in Weaviate.");
        println!("Use 'linux-rag create-schema' to create one.");
        return Ok(());
    }

    println!("📋 Collections ({} total):", summaries.len());
    println!();
    for summary in &summaries {
        println!("📚 {}", style(&summary.info.name).bold());
        match summary.objects {
            Some(count) => println!("   Objects: {}", count),
            None => println!("   Objects: unknown"),
        }
        let fields = if summary.info.fields.is_empty() {
            "none".to_string()
        } else {
            summary.info.fields.join(", ")
        };
        println!("   Properties: {}", fields);
        if let Some(vectorizer) = &summary.info.vectorizer {
            println!("   Vectorizer: {}", vectorizer);
        }
        println!();
    }

    println!("💡 Next Steps:");
    println!("   • 'linux-rag query \"<question>\" <collection>' to ask a question");
    println!("   • 'linux-rag ingest <collection>' to add records");
    println!("   • 'linux-rag delete-collection <collection>' to remove one");

    Ok(())
}

/// Check Weaviate and the model API
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    println!("📊 Linux RAG Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🔍 Weaviate:");
    let client = weaviate_client(config)?;
    match client.ready() {
        Ok(()) => {
            println!("   ✅ Ready at {}", client.base_url());
            match client.list_collections() {
                Ok(collections) => println!("   📚 Collections: {}", collections.len()),
                Err(e) => println!("   ⚠️  Could not list collections: {}", e),
            }
        }
        Err(e) => println!("   ❌ Unreachable at {}: {}", client.base_url(), e),
    }

    println!();
    println!("🤖 Language model:");
    match openai_client(config) {
        Ok(client) => match client.ping() {
            Ok(()) => {
                println!("   ✅ Reachable at {}", config.openai.base_url);
                println!("   📋 Chat model: {}", client.chat_model());
                println!("   🔢 Embedding model: {}", client.embedding_model());
            }
            Err(e) => println!("   ❌ Unreachable: {}", e),
        },
        Err(e) => println!("   ❌ {:#}", e),
    }

    Ok(())
}

/// Start the web UI
#[inline]
pub async fn serve(config: &Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let default_collection = normalize_collection_name(&config.weaviate.default_collection)?;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    println!("🚀 Serving on http://{}:{} (collection '{}')", host, port, default_collection);

    let state = Arc::new(AppState {
        pipeline: Arc::new(pipeline),
        default_collection,
    });
    web::serve(state, &host, port).await
}
