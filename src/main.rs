use clap::{Parser, Subcommand};
use linux_rag::Result;
use linux_rag::commands::{
    CreateSchemaOptions, IngestOptions, create_schema, delete_collection, ingest,
    list_collections, query, serve, show_status,
};
use linux_rag::config::{Config, run_interactive_config, show_config};
use linux_rag::weaviate::SchemaVariant;

#[derive(Parser)]
#[command(name = "linux-rag")]
#[command(about = "Answer Linux shell questions from a Weaviate collection of commands")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Weaviate, the language model and the answer pipeline
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Create a collection in Weaviate
    CreateSchema {
        /// Collection name, defaults to the configured collection
        collection: Option<String>,
        /// Record layout: "command" or "passage"
        #[arg(long, value_parser = parse_variant)]
        variant: Option<SchemaVariant>,
        /// Server-side vectorizer module, e.g. "text2vec-openai"
        #[arg(long)]
        vectorizer: Option<String>,
        /// Drop and recreate the collection if it already exists
        #[arg(long)]
        recreate: bool,
    },
    /// Load the configured dataset into a collection
    Ingest {
        /// Collection name, defaults to the configured collection
        collection: Option<String>,
        /// Hugging Face dataset id
        #[arg(long)]
        dataset: Option<String>,
        /// Dataset split, e.g. "train"
        #[arg(long)]
        split: Option<String>,
        /// Maximum number of rows to load
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Ask a question
    Query {
        /// The question, in natural language
        question: String,
        /// Collection name, defaults to the configured collection
        collection: Option<String>,
    },
    /// Delete a collection after confirmation
    DeleteCollection {
        /// Collection to delete
        collection: String,
    },
    /// List all collections with their size
    ListCollections,
    /// Check that Weaviate and the language model are reachable
    Status,
    /// Start the web UI
    Serve {
        /// Address to bind, defaults to the configured host
        #[arg(long)]
        host: Option<String>,
        /// Port to bind, defaults to the configured port
        #[arg(long)]
        port: Option<u16>,
    },
}

fn parse_variant(value: &str) -> std::result::Result<SchemaVariant, String> {
    match value.trim().to_lowercase().as_str() {
        "command" => Ok(SchemaVariant::Command),
        "passage" => Ok(SchemaVariant::Passage),
        other => Err(format!("unknown variant '{other}' (expected 'command' or 'passage')")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&Config::load_default()?);
            } else {
                run_interactive_config(&Config::config_dir()?)?;
            }
        }
        Commands::CreateSchema {
            collection,
            variant,
            vectorizer,
            recreate,
        } => {
            let options = CreateSchemaOptions {
                collection,
                variant,
                vectorizer,
                recreate,
            };
            create_schema(&Config::load_default()?, options)?;
        }
        Commands::Ingest {
            collection,
            dataset,
            split,
            limit,
        } => {
            let options = IngestOptions {
                collection,
                dataset,
                split,
                limit,
            };
            ingest(&Config::load_default()?, options)?;
        }
        Commands::Query {
            question,
            collection,
        } => {
            query(&Config::load_default()?, &question, collection)?;
        }
        Commands::DeleteCollection { collection } => {
            delete_collection(&Config::load_default()?, &collection)?;
        }
        Commands::ListCollections => {
            list_collections(&Config::load_default()?)?;
        }
        Commands::Status => {
            show_status(&Config::load_default()?)?;
        }
        Commands::Serve { host, port } => {
            serve(&Config::load_default()?, host, port).await?;
        }
    }

    Ok(())
}
