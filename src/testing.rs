//! In-memory stand-ins for the embedding, search and chat seams.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::generation::{ChatMessage, ChatModel};
use crate::retrieval::{Candidate, DocumentProperties, Embedder, SearchRequest, VectorSearch};
use crate::weaviate::{CollectionInfo, SchemaVariant};
use crate::{RagError, Result};

pub(crate) fn command(command: &str, description: &str, score: f32) -> Candidate {
    Candidate::new(DocumentProperties::command(command, description), score)
}

pub(crate) fn collection(name: &str, variant: SchemaVariant) -> CollectionInfo {
    CollectionInfo {
        name: name.to_string(),
        fields: vec![
            variant.primary_field().to_string(),
            variant.secondary_field().to_string(),
        ],
        vectorizer: None,
    }
}

#[derive(Default)]
pub(crate) struct FakeEmbedder {
    calls: AtomicUsize,
    fail: bool,
}

impl FakeEmbedder {
    pub(crate) fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for FakeEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RagError::Model("embedding service down".to_string()));
        }
        Ok(vec![text.len() as f32, 1.0, 0.0])
    }
}

pub(crate) struct FakeStore {
    info: Option<CollectionInfo>,
    results: Vec<Candidate>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl FakeStore {
    pub(crate) fn with_results(name: &str, results: Vec<Candidate>) -> Self {
        Self {
            info: Some(collection(name, SchemaVariant::Command)),
            results,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn missing() -> Self {
        Self {
            info: None,
            results: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_vectorizer(mut self, vectorizer: &str) -> Self {
        if let Some(info) = self.info.as_mut() {
            info.vectorizer = Some(vectorizer.to_string());
        }
        self
    }

    pub(crate) fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl VectorSearch for FakeStore {
    fn describe(&self, collection: &str) -> Result<CollectionInfo> {
        self.info
            .clone()
            .ok_or_else(|| RagError::CollectionNotFound {
                name: collection.to_string(),
            })
    }

    fn search(&self, _collection: &CollectionInfo, request: &SearchRequest) -> Result<Vec<Candidate>> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.results.iter().take(request.limit).cloned().collect())
    }
}

/// Replays scripted replies in order and records every prompt it receives.
pub(crate) struct FakeChat {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    prompts: Mutex<Vec<(String, f32)>>,
}

impl FakeChat {
    pub(crate) fn replying(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Ok((*r).to_string())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(message.to_string())])),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub(crate) fn prompts(&self) -> Vec<(String, f32)> {
        self.prompts.lock().unwrap().clone()
    }
}

impl ChatModel for FakeChat {
    fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push((prompt, temperature));

        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(RagError::Model(message)),
            None => Err(RagError::Model("no scripted reply left".to_string())),
        }
    }
}
