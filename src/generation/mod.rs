//! Answer generation and language-model reranking.
//!
//! Every call to the model uses [`GENERATION_TEMPERATURE`], so identical
//! prompts produce identical answers.

#[cfg(test)]
mod tests;

pub mod rerank;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

use crate::{RagError, Result};

pub use rerank::{RerankParse, RerankedCandidate, Reranker, build_rerank_prompt, parse_rerank_output};

/// Sampling temperature for every completion; zero keeps output reproducible.
pub const GENERATION_TEMPERATURE: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A chat-completion endpoint.
pub trait ChatModel: Send + Sync {
    fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    /// Command block, short explanation and an optional improvement.
    #[default]
    Verbose,
    /// Command block only.
    Strict,
}

impl fmt::Display for AnswerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verbose => f.write_str("verbose"),
            Self::Strict => f.write_str("strict"),
        }
    }
}

/// Render context entries as `- primary :: secondary` lines.
pub fn build_context<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    entries
        .into_iter()
        .fold(String::new(), |mut context, (primary, secondary)| {
            let _ = writeln!(context, "- {primary} :: {secondary}");
            context
        })
}

pub fn build_answer_prompt(question: &str, context: &str, mode: AnswerMode, language: &str) -> String {
    let instructions = match mode {
        AnswerMode::Verbose => format!(
            "You are an expert Linux assistant. Answer in {language}, concisely.\n\
             \n\
             Response format:\n\
             1) a single command in a ```bash code block\n\
             2) a short explanation\n\
             3) an improved version of the command, only if it can be improved"
        ),
        AnswerMode::Strict => format!(
            "You are an expert Linux assistant. Answer in {language}.\n\
             Reply with a single command in a ```bash code block and nothing else."
        ),
    };

    format!(
        "{instructions}\n\nQuestion: {question}\n\nContext:\n{}\n",
        context.trim_end()
    )
}

pub struct AnswerGenerator {
    chat: Arc<dyn ChatModel>,
    language: String,
}

impl AnswerGenerator {
    #[inline]
    pub fn new(chat: Arc<dyn ChatModel>, language: impl Into<String>) -> Self {
        Self {
            chat,
            language: language.into(),
        }
    }

    /// One completion call; failures are returned as-is, without retrying here.
    pub fn generate(&self, question: &str, context: &str, mode: AnswerMode) -> Result<String> {
        let prompt = build_answer_prompt(question, context, mode, &self.language);
        debug!("Answer prompt is {} bytes ({} mode)", prompt.len(), mode);

        let answer = self
            .chat
            .complete(&[ChatMessage::user(prompt)], GENERATION_TEMPERATURE)?;

        let answer = answer.trim();
        if answer.is_empty() {
            return Err(RagError::Model("model returned an empty answer".to_string()));
        }
        Ok(answer.to_string())
    }
}
