
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::retrieval::{DocumentProperties, Embedder};
use crate::weaviate::{DocumentRecord, WeaviateClient};
use crate::{RagError, Result};

pub const DEFAULT_INGEST_BATCH_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Records built from complete pairs.
    pub prepared: usize,
    pub inserted: usize,
    /// Pairs dropped for a blank field.
    pub skipped: usize,
}

/// Text embedded for a record: the description first, then the command.
#[inline]
pub fn embedding_text(primary: &str, secondary: &str) -> String {
    format!("{secondary}\n{primary}")
}

pub struct Ingestor {
    store: WeaviateClient,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl Ingestor {
    #[inline]
    pub fn new(store: WeaviateClient, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            batch_size: DEFAULT_INGEST_BATCH_SIZE,
        }
    }

    #[inline]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Store `(primary, secondary)` pairs in an existing collection.
    ///
    /// Vectors are computed here only when the collection has no vectorizer.
    pub fn ingest(&self, collection: &str, pairs: Vec<(String, String)>) -> Result<IngestReport> {
        let info = self.store.describe_collection(collection)?;
        let variant = info.variant().ok_or_else(|| {
            RagError::VectorStore(format!(
                "Collection {} has no recognized text fields: {:?}",
                info.name, info.fields
            ))
        })?;

        let total = pairs.len();
        let pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(p, s)| (p.trim().to_string(), s.trim().to_string()))
            .filter(|(p, s)| !p.is_empty() && !s.is_empty())
            .collect();

        let mut report = IngestReport {
            prepared: pairs.len(),
            inserted: 0,
            skipped: total - pairs.len(),
        };
        if report.skipped > 0 {
            warn!("Skipping {} pairs with a blank field", report.skipped);
        }

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(pairs.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] Ingesting into {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            )
        } else {
            ProgressBar::hidden()
        };
        bar.set_message(info.name.clone());

        let embed = !info.has_vectorizer();
        for chunk in pairs.chunks(self.batch_size) {
            let vectors: Vec<Option<Vec<f32>>> = if embed {
                let texts: Vec<String> = chunk.iter().map(|(p, s)| embedding_text(p, s)).collect();
                let vectors = self.embedder.embed_batch(&texts)?;
                if vectors.len() != chunk.len() {
                    return Err(RagError::Model(format!(
                        "requested {} embeddings, received {}",
                        chunk.len(),
                        vectors.len()
                    )));
                }
                vectors.into_iter().map(Some).collect()
            } else {
                vec![None; chunk.len()]
            };

            let records: Vec<DocumentRecord> = chunk
                .iter()
                .cloned()
                .zip(vectors)
                .map(|((primary, secondary), vector)| DocumentRecord {
                    properties: DocumentProperties::from_pair(variant, primary, secondary),
                    vector,
                })
                .collect();

            report.inserted += self.store.insert_many(&info.name, &records)?;
            bar.inc(chunk.len() as u64);
            debug!("Inserted batch of {} into {}", chunk.len(), info.name);
        }
        bar.finish_and_clear();

        info!(
            "Ingested {} of {} records into {}",
            report.inserted, report.prepared, info.name
        );
        Ok(report)
    }
}
