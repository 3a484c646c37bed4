#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::OpenAiConfig;
use crate::generation::{ChatMessage, ChatModel};
use crate::http::HttpTransport;
use crate::retrieval::Embedder;
use crate::{RagError, Result};

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: String,
    embedding_model: String,
    chat_model: String,
    batch_size: usize,
    transport: HttpTransport,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    #[inline]
    pub fn new(config: &OpenAiConfig, api_key: &str) -> Self {
        let transport = HttpTransport::new(config.timeout(), config.retry_policy())
            .with_header("Authorization", &format!("Bearer {api_key}"));
        Self::with_transport(config, transport)
    }

    #[inline]
    pub fn with_transport(config: &OpenAiConfig, transport: HttpTransport) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            embedding_model: config.embedding_model.clone(),
            chat_model: config.chat_model.clone(),
            batch_size: config.batch_size.max(1) as usize,
            transport,
        }
    }

    #[inline]
    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    #[inline]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Check that the API answers and accepts the key.
    #[inline]
    pub fn ping(&self) -> Result<()> {
        let url = self.endpoint("models");
        debug!("Pinging model API at {}", url);
        self.transport.get(&url)?;
        info!("Model API reachable at {}", self.base_url);
        Ok(())
    }

    #[inline]
    pub fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_chunk(&[text.to_string()])?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Model("embedding response was empty".to_string()))
    }

    /// Embed many texts, one request per `batch_size` inputs; output order matches input.
    #[inline]
    pub fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} texts with {}", texts.len(), self.embedding_model);
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_chunk(chunk)?);
        }
        Ok(vectors)
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let body = self.transport.post_json(&self.endpoint("embeddings"), &request)?;
        let mut response: EmbeddingResponse = serde_json::from_str(&body)
            .map_err(|e| RagError::Model(format!("Failed to parse embedding response: {e}")))?;

        if response.data.len() != texts.len() {
            return Err(RagError::Model(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                response.data.len()
            )));
        }

        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    #[inline]
    pub fn chat_complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages,
            temperature,
        };

        debug!(
            "Requesting chat completion from {} ({} messages)",
            self.chat_model,
            messages.len()
        );
        let body = self
            .transport
            .post_json(&self.endpoint("chat/completions"), &request)?;
        let response: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| RagError::Model(format!("Failed to parse chat response: {e}")))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RagError::Model("chat response contained no choices".to_string()))
    }
}

impl Embedder for OpenAiClient {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_one(text)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed_many(texts)
    }
}

impl ChatModel for OpenAiClient {
    fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        self.chat_complete(messages, temperature)
    }
}
