//! Candidate search against a collection, deduplication and relevance gating.


pub mod dedupe;
pub mod gate;
pub mod records;

use std::sync::Arc;
use tracing::debug;

use crate::weaviate::CollectionInfo;
use crate::{RagError, Result};

pub use dedupe::{DEFAULT_CONTEXT_LIMIT, dedupe};
pub use gate::{DEFAULT_RELEVANCE_THRESHOLD, GateOutcome, evaluate, passes};
pub use records::{Candidate, DocumentProperties};

/// Candidates fetched per query, over-fetched to leave room for deduplication.
pub const DEFAULT_FETCH_LIMIT: usize = 12;

/// Turns text into vectors.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

/// Read access to a vector store.
pub trait VectorSearch: Send + Sync {
    /// Fails with [`RagError::CollectionNotFound`] when the collection is absent.
    fn describe(&self, collection: &str) -> Result<CollectionInfo>;

    fn search(&self, collection: &CollectionInfo, request: &SearchRequest) -> Result<Vec<Candidate>>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchStrategy {
    /// Blend of keyword and vector relevance; `alpha` weights the vector side.
    Hybrid { alpha: f32 },
    /// Pure nearest-neighbour search.
    NearVector,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub text: String,
    /// Query embedding; `None` when the store vectorizes the text itself.
    pub vector: Option<Vec<f32>>,
    pub strategy: SearchStrategy,
    pub limit: usize,
}

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorSearch>,
    strategy: SearchStrategy,
}

impl Retriever {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorSearch>,
        strategy: SearchStrategy,
    ) -> Self {
        Self {
            embedder,
            store,
            strategy,
        }
    }

    /// Fetch up to `k` ranked candidates for `question` from `collection`.
    ///
    /// The question is embedded client-side only when the collection has no
    /// vectorizer of its own.
    pub fn retrieve(&self, question: &str, collection: &str, k: usize) -> Result<Vec<Candidate>> {
        if question.trim().is_empty() {
            return Err(RagError::InvalidInput("question cannot be empty".to_string()));
        }

        let info = self.store.describe(collection)?;

        let vector = if info.has_vectorizer() {
            debug!("{} vectorizes queries itself", info.name);
            None
        } else {
            Some(self.embedder.embed(question)?)
        };

        let request = SearchRequest {
            text: question.to_string(),
            vector,
            strategy: self.strategy,
            limit: k,
        };

        let candidates = self.store.search(&info, &request)?;
        debug!(
            "Retrieved {} candidates from {} (k = {})",
            candidates.len(),
            info.name,
            k
        );
        Ok(candidates)
    }
}
