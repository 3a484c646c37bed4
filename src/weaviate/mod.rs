//! Weaviate vector store client.
//!
//! REST for schema and batch writes, GraphQL for search and aggregation.


pub mod admin;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::WeaviateConfig;
use crate::http::HttpTransport;
use crate::retrieval::{Candidate, DocumentProperties, SearchRequest, SearchStrategy, VectorSearch};
use crate::{RagError, Result};

pub use admin::{CollectionSummary, CreateOutcome, DeleteOutcome, ExistingCollection};

/// Vectorizer value Weaviate uses for collections embedded client-side.
pub const NO_VECTORIZER: &str = "none";

/// The two record layouts the assistant knows how to store and query.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    /// Shell commands with a natural-language description.
    #[default]
    Command,
    /// Free-text passages with their source.
    Passage,
}

impl SchemaVariant {
    #[inline]
    pub fn primary_field(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Passage => "text",
        }
    }

    #[inline]
    pub fn secondary_field(self) -> &'static str {
        match self {
            Self::Command => "description",
            Self::Passage => "source",
        }
    }

    /// Recognize a variant from a collection's property names.
    pub fn from_fields(fields: &[String]) -> Option<Self> {
        [Self::Command, Self::Passage].into_iter().find(|variant| {
            fields.iter().any(|f| f == variant.primary_field())
                && fields.iter().any(|f| f == variant.secondary_field())
        })
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => f.write_str("command"),
            Self::Passage => f.write_str("passage"),
        }
    }
}

/// Definition used to create a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    pub name: String,
    pub variant: SchemaVariant,
    /// Store-side vectorizer module, `None` when vectors are computed by the client.
    pub vectorizer: Option<String>,
}

impl CollectionSchema {
    #[inline]
    pub fn new(name: impl Into<String>, variant: SchemaVariant) -> Self {
        Self {
            name: name.into(),
            variant,
            vectorizer: None,
        }
    }

    #[inline]
    pub fn with_vectorizer(mut self, vectorizer: impl Into<String>) -> Self {
        self.vectorizer = Some(vectorizer.into());
        self
    }
}

/// A collection as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: String,
    pub fields: Vec<String>,
    pub vectorizer: Option<String>,
}

impl CollectionInfo {
    #[inline]
    pub fn variant(&self) -> Option<SchemaVariant> {
        SchemaVariant::from_fields(&self.fields)
    }

    #[inline]
    pub fn has_vectorizer(&self) -> bool {
        self.vectorizer.is_some()
    }
}

/// A record ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub properties: DocumentProperties,
    pub vector: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct SchemaResponse {
    #[serde(default)]
    classes: Vec<ClassDefinition>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassDefinition {
    class: String,
    #[serde(default)]
    properties: Vec<PropertyDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vectorizer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vector_index_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PropertyDefinition {
    name: String,
    #[serde(default)]
    data_type: Vec<String>,
}

impl From<ClassDefinition> for CollectionInfo {
    fn from(class: ClassDefinition) -> Self {
        Self {
            name: class.class,
            fields: class.properties.into_iter().map(|p| p.name).collect(),
            vectorizer: class.vectorizer.filter(|v| v != NO_VECTORIZER && !v.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Stable object id for a record, so re-sent batches overwrite instead of duplicating.
pub fn object_id(collection: &str, properties: &DocumentProperties) -> Uuid {
    let key = format!(
        "{collection}\n{}\n{}",
        properties.primary(),
        properties.secondary()
    );
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
}

/// Messages of a Weaviate REST error body, or the raw body if it has another shape.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct RestError {
        #[serde(default)]
        error: Vec<GraphQlError>,
    }

    match serde_json::from_str::<RestError>(body) {
        Ok(parsed) if !parsed.error.is_empty() => parsed
            .error
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.trim().to_string(),
    }
}

/// Validate a collection name and return it the way Weaviate stores it.
///
/// Names must start with a letter and contain only ASCII letters, digits and
/// underscores; the first letter is upper-cased.
pub fn normalize_collection_name(name: &str) -> Result<String> {
    let name = name.trim();
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(RagError::InvalidInput(
            "collection name cannot be empty".to_string(),
        ));
    };

    if !first.is_ascii_alphabetic() || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(RagError::InvalidInput(format!(
            "invalid collection name {name:?}: use letters, digits and underscores, starting with a letter"
        )));
    }

    let mut normalized = String::with_capacity(name.len());
    normalized.push(first.to_ascii_uppercase());
    normalized.push_str(&name[first.len_utf8()..]);
    Ok(normalized)
}

#[derive(Debug, Clone)]
pub struct WeaviateClient {
    base_url: Url,
    transport: HttpTransport,
}

impl WeaviateClient {
    #[inline]
    pub fn new(config: &WeaviateConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        let transport = HttpTransport::new(config.timeout(), config.retry_policy());
        Ok(Self::with_transport(base_url, transport))
    }

    #[inline]
    pub fn with_transport(base_url: Url, transport: HttpTransport) -> Self {
        Self {
            base_url,
            transport,
        }
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<String> {
        self.base_url
            .join(path)
            .map(String::from)
            .map_err(|e| RagError::Config(format!("Failed to build Weaviate URL {path}: {e}")))
    }

    /// Check that the instance reports itself ready.
    #[inline]
    pub fn ready(&self) -> Result<()> {
        let url = self.endpoint("/v1/.well-known/ready")?;
        debug!("Checking Weaviate readiness at {}", url);
        self.transport.get(&url)?;
        Ok(())
    }

    #[inline]
    pub fn describe_collection(&self, name: &str) -> Result<CollectionInfo> {
        let name = normalize_collection_name(name)?;
        let url = self.endpoint(&format!("/v1/schema/{name}"))?;

        let body = self.transport.get(&url).map_err(|e| match e {
            RagError::HttpStatus { status: 404, .. } => RagError::CollectionNotFound {
                name: name.clone(),
            },
            other => other,
        })?;

        let class: ClassDefinition = serde_json::from_str(&body).map_err(|e| {
            RagError::VectorStore(format!("Failed to parse schema of {name}: {e}"))
        })?;
        Ok(class.into())
    }

    #[inline]
    pub fn collection_exists(&self, name: &str) -> Result<bool> {
        match self.describe_collection(name) {
            Ok(_) => Ok(true),
            Err(RagError::CollectionNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[inline]
    pub fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let url = self.endpoint("/v1/schema")?;
        let body = self.transport.get(&url)?;
        let schema: SchemaResponse = serde_json::from_str(&body)
            .map_err(|e| RagError::VectorStore(format!("Failed to parse schema: {e}")))?;

        debug!("Weaviate reports {} collections", schema.classes.len());
        Ok(schema.classes.into_iter().map(CollectionInfo::from).collect())
    }

    #[inline]
    pub fn create_collection(&self, schema: &CollectionSchema) -> Result<()> {
        let name = normalize_collection_name(&schema.name)?;
        let url = self.endpoint("/v1/schema")?;

        let class = ClassDefinition {
            class: name.clone(),
            properties: [schema.variant.primary_field(), schema.variant.secondary_field()]
                .into_iter()
                .map(|field| PropertyDefinition {
                    name: field.to_string(),
                    data_type: vec!["text".to_string()],
                })
                .collect(),
            vectorizer: Some(
                schema
                    .vectorizer
                    .clone()
                    .unwrap_or_else(|| NO_VECTORIZER.to_string()),
            ),
            vector_index_type: Some("hnsw".to_string()),
        };

        self.transport
            .post_json(&url, &class)
            .map_err(|e| match e {
                RagError::HttpStatus {
                    status: 422, body, ..
                } => {
                    let message = error_message(&body);
                    if message.to_lowercase().contains("already exists") {
                        RagError::CollectionExists { name: name.clone() }
                    } else {
                        RagError::VectorStore(format!(
                            "Weaviate rejected collection {name}: {message}"
                        ))
                    }
                }
                other => other,
            })?;

        info!("Created collection {} ({} schema)", name, schema.variant);
        Ok(())
    }

    #[inline]
    pub fn delete_collection(&self, name: &str) -> Result<()> {
        let name = normalize_collection_name(name)?;
        let url = self.endpoint(&format!("/v1/schema/{name}"))?;
        self.transport.delete(&url).map_err(|e| match e {
            RagError::HttpStatus { status: 404, .. } => RagError::CollectionNotFound {
                name: name.clone(),
            },
            other => other,
        })?;
        info!("Deleted collection {}", name);
        Ok(())
    }

    /// Insert records in one batch request, returning how many were stored.
    #[inline]
    pub fn insert_many(&self, name: &str, records: &[DocumentRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let name = normalize_collection_name(name)?;
        let url = self.endpoint("/v1/batch/objects")?;

        let objects: Vec<Value> = records
            .iter()
            .map(|record| {
                let mut object = json!({
                    "class": name,
                    "id": object_id(&name, &record.properties).to_string(),
                    "properties": record.properties.to_object(),
                });
                if let Some(vector) = &record.vector {
                    object["vector"] = json!(vector);
                }
                object
            })
            .collect();

        let body = self
            .transport
            .post_json(&url, &json!({ "objects": objects }))?;
        let results: Vec<Value> = serde_json::from_str(&body)
            .map_err(|e| RagError::VectorStore(format!("Failed to parse batch response: {e}")))?;

        let failures: Vec<String> = results
            .iter()
            .filter_map(|r| r.pointer("/result/errors/error/0/message"))
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();

        if let Some(first) = failures.first() {
            warn!("{} of {} objects rejected", failures.len(), records.len());
            return Err(RagError::VectorStore(format!(
                "{} of {} objects rejected by {}: {}",
                failures.len(),
                records.len(),
                name,
                first
            )));
        }

        debug!("Inserted {} objects into {}", records.len(), name);
        Ok(records.len())
    }

    #[inline]
    pub fn aggregate_count(&self, name: &str) -> Result<u64> {
        let name = normalize_collection_name(name)?;
        let data = self.graphql(&name, &format!("{{ Aggregate {{ {name} {{ meta {{ count }} }} }} }}"))?;

        data.pointer(&format!("/Aggregate/{name}/0/meta/count"))
            .and_then(Value::as_u64)
            .ok_or_else(|| RagError::VectorStore(format!("No count returned for {name}")))
    }

    /// Hybrid search blending keyword relevance and vector similarity.
    ///
    /// Without a vector, the store's own vectorizer embeds `text`.
    #[inline]
    pub fn query_hybrid(
        &self,
        collection: &CollectionInfo,
        text: &str,
        vector: Option<&[f32]>,
        alpha: f32,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        let mut clause = format!("hybrid: {{query: {}, alpha: {}", graphql_string(text), alpha);
        if let Some(vector) = vector {
            clause.push_str(", vector: ");
            clause.push_str(&graphql_vector(vector));
        }
        clause.push('}');
        self.get(collection, &clause, limit, "id score")
    }

    #[inline]
    pub fn query_near_vector(
        &self,
        collection: &CollectionInfo,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        let clause = format!("nearVector: {{vector: {}}}", graphql_vector(vector));
        self.get(collection, &clause, limit, "id distance certainty")
    }

    #[inline]
    pub fn query_near_text(
        &self,
        collection: &CollectionInfo,
        text: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        let clause = format!("nearText: {{concepts: [{}]}}", graphql_string(text));
        self.get(collection, &clause, limit, "id distance certainty")
    }

    fn get(
        &self,
        collection: &CollectionInfo,
        clause: &str,
        limit: usize,
        additional: &str,
    ) -> Result<Vec<Candidate>> {
        let variant = collection.variant().ok_or_else(|| {
            RagError::VectorStore(format!(
                "Collection {} has no recognized text fields: {:?}",
                collection.name, collection.fields
            ))
        })?;
        let name = &collection.name;

        let query = format!(
            "{{ Get {{ {name}({clause}, limit: {limit}) {{ {} {} _additional {{ {additional} }} }} }} }}",
            variant.primary_field(),
            variant.secondary_field()
        );
        let data = self.graphql(name, &query)?;

        let objects = data
            .pointer(&format!("/Get/{name}"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let candidates: Vec<Candidate> = objects
            .iter()
            .filter_map(Value::as_object)
            .map(|object| candidate_from_object(variant, object))
            .collect();

        debug!("Search on {} returned {} objects", name, candidates.len());
        Ok(candidates)
    }

    fn graphql(&self, collection: &str, query: &str) -> Result<Value> {
        let url = self.endpoint("/v1/graphql")?;
        debug!("GraphQL query: {}", query);

        let body = self.transport.post_json(&url, &json!({ "query": query }))?;
        let response: GraphQlResponse = serde_json::from_str(&body)
            .map_err(|e| RagError::VectorStore(format!("Failed to parse GraphQL response: {e}")))?;

        if !response.errors.is_empty() {
            if response
                .errors
                .iter()
                .any(|e| e.message.contains("Cannot query field"))
            {
                return Err(RagError::CollectionNotFound {
                    name: collection.to_string(),
                });
            }
            let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(RagError::VectorStore(messages.join("; ")));
        }

        response
            .data
            .ok_or_else(|| RagError::VectorStore("GraphQL response without data".to_string()))
    }
}

impl VectorSearch for WeaviateClient {
    fn describe(&self, collection: &str) -> Result<CollectionInfo> {
        self.describe_collection(collection)
    }

    fn search(&self, collection: &CollectionInfo, request: &SearchRequest) -> Result<Vec<Candidate>> {
        match (request.strategy, request.vector.as_deref()) {
            (SearchStrategy::Hybrid { alpha }, vector) => {
                self.query_hybrid(collection, &request.text, vector, alpha, request.limit)
            }
            (SearchStrategy::NearVector, Some(vector)) => {
                self.query_near_vector(collection, vector, request.limit)
            }
            (SearchStrategy::NearVector, None) => {
                self.query_near_text(collection, &request.text, request.limit)
            }
        }
    }
}

fn candidate_from_object(variant: SchemaVariant, object: &Map<String, Value>) -> Candidate {
    let additional = object.get("_additional").and_then(Value::as_object);

    Candidate {
        id: additional
            .and_then(|a| a.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string),
        properties: DocumentProperties::from_object(variant, object),
        score: additional.map_or(0.0, score_from_additional),
    }
}

/// Hybrid search reports `score` (as a string); vector searches report
/// `certainty` and `distance`.
fn score_from_additional(additional: &Map<String, Value>) -> f32 {
    let number = |key: &str| -> Option<f64> {
        match additional.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    };

    number("score")
        .or_else(|| number("certainty"))
        .or_else(|| number("distance").map(|d| 1.0 - d))
        .unwrap_or(0.0) as f32
}

fn graphql_string(text: &str) -> String {
    // JSON string literals are valid GraphQL string literals.
    Value::String(text.to_string()).to_string()
}

fn graphql_vector(vector: &[f32]) -> String {
    json!(vector).to_string()
}
