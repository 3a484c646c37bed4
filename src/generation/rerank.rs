use std::sync::Arc;
use tracing::{debug, warn};

use super::{ChatMessage, ChatModel, GENERATION_TEMPERATURE, build_context};
use crate::Result;

const SEPARATOR: &str = "::";
const RANK_PREFIXES: [(&str, f32); 2] = [("1.", 1.0), ("2.", 0.8)];

#[derive(Debug, Clone, PartialEq)]
pub struct RerankedCandidate {
    pub primary: String,
    pub secondary: String,
    /// Fixed weight per rank, not a calibrated probability.
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RerankParse {
    Parsed(Vec<RerankedCandidate>),
    Unparseable,
}

impl RerankParse {
    #[inline]
    pub fn into_vec(self) -> Vec<RerankedCandidate> {
        match self {
            Self::Parsed(entries) => entries,
            Self::Unparseable => Vec::new(),
        }
    }
}

pub fn build_rerank_prompt(question: &str, candidates: &[(&str, &str)]) -> String {
    format!(
        "Rank the Linux commands below by how well they answer the question.\n\
         Reply with exactly two lines and nothing else, in this format:\n\
         1. <command> :: <description>\n\
         2. <command> :: <description>\n\
         \n\
         Question: {question}\n\
         \n\
         Commands:\n{}",
        build_context(candidates.iter().copied())
    )
}

/// Read `<rank>. <primary> :: <secondary>` lines for ranks 1 and 2.
///
/// A line counts only if it starts with `1.` or `2.` and contains `::`;
/// anything else is skipped. Never fails.
pub fn parse_rerank_output(text: &str) -> RerankParse {
    let entries: Vec<RerankedCandidate> = text
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let (rest, confidence) = RANK_PREFIXES
                .iter()
                .find_map(|(prefix, weight)| line.strip_prefix(prefix).map(|rest| (rest, *weight)))?;
            let (primary, secondary) = rest.split_once(SEPARATOR)?;

            Some(RerankedCandidate {
                primary: primary.trim().to_string(),
                secondary: secondary.trim().to_string(),
                confidence: round_2(confidence),
            })
        })
        .take(RANK_PREFIXES.len())
        .collect();

    if entries.is_empty() {
        RerankParse::Unparseable
    } else {
        RerankParse::Parsed(entries)
    }
}

fn round_2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

pub struct Reranker {
    chat: Arc<dyn ChatModel>,
}

impl Reranker {
    #[inline]
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }

    /// Ask the model for the two best candidates.
    ///
    /// Malformed output yields an empty list; only a failed call is an error.
    pub fn rerank(&self, question: &str, candidates: &[(&str, &str)]) -> Result<Vec<RerankedCandidate>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = build_rerank_prompt(question, candidates);
        let output = self
            .chat
            .complete(&[ChatMessage::user(prompt)], GENERATION_TEMPERATURE)?;

        match parse_rerank_output(&output) {
            RerankParse::Parsed(entries) => {
                debug!("Reranker selected {} entries", entries.len());
                Ok(entries)
            }
            RerankParse::Unparseable => {
                warn!("Rerank output had no usable lines, keeping search order");
                Ok(Vec::new())
            }
        }
    }
}
