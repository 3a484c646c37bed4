//! Question answering: retrieve, dedupe, gate, rerank, generate, scan, log.


use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::generation::{AnswerGenerator, AnswerMode, ChatModel, Reranker, build_context};
use crate::query_log::QueryLogger;
use crate::retrieval::{
    Candidate, Embedder, GateOutcome, Retriever, SearchStrategy, VectorSearch, dedupe, evaluate,
};
use crate::safety::SafetyScanner;
use crate::{RagError, Result};

pub const NO_RESULTS_MESSAGE: &str =
    "No matching entries were found in the collection. Try rephrasing the question.";
pub const LOW_RELEVANCE_MESSAGE: &str =
    "The closest entries are not relevant enough to answer reliably. Try a more specific question.";

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub strategy: SearchStrategy,
    pub fetch_limit: usize,
    pub context_limit: usize,
    /// `None` disables the relevance gate.
    pub relevance_threshold: Option<f32>,
    pub rerank: bool,
    /// `None` disables the safety scan.
    pub safety: Option<SafetyScanner>,
    pub mode: AnswerMode,
    pub language: String,
}

impl From<&PipelineConfig> for PipelineSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            strategy: config.strategy(),
            fetch_limit: config.fetch_limit,
            context_limit: config.context_limit,
            relevance_threshold: config
                .relevance_gate
                .then_some(config.relevance_threshold),
            rerank: config.rerank,
            safety: config
                .safety_scan
                .then(|| SafetyScanner::new(&config.danger_keywords)),
            mode: config.answer_mode,
            language: config.language.clone(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

/// An entry that was given to the model as context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    pub primary: String,
    pub secondary: String,
    /// Search score, absent for reranked entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    /// Rerank confidence, absent when reranking was not applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl From<&Candidate> for Source {
    fn from(candidate: &Candidate) -> Self {
        Self {
            primary: candidate.primary().to_string(),
            secondary: candidate.secondary().to_string(),
            score: Some(candidate.score),
            confidence: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// The search found nothing usable; the model was not called.
    NoResults,
    /// The best entry scored below the threshold; the model was not called.
    LowRelevance { top_score: f32, threshold: f32 },
    Generated {
        text: String,
        sources: Vec<Source>,
        /// The safety scan matched and a warning was appended to `text`.
        dangerous: bool,
        reranked: bool,
    },
}

impl Answer {
    /// Text to show the user.
    #[inline]
    pub fn message(&self) -> &str {
        match self {
            Self::NoResults => NO_RESULTS_MESSAGE,
            Self::LowRelevance { .. } => LOW_RELEVANCE_MESSAGE,
            Self::Generated { text, .. } => text,
        }
    }

    #[inline]
    pub fn sources(&self) -> &[Source] {
        match self {
            Self::Generated { sources, .. } => sources,
            _ => &[],
        }
    }

    /// Short machine-readable label of the outcome.
    #[inline]
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::NoResults => "no_results",
            Self::LowRelevance { .. } => "low_relevance",
            Self::Generated { .. } => "generated",
        }
    }
}

pub struct RagPipeline {
    retriever: Retriever,
    generator: AnswerGenerator,
    reranker: Reranker,
    settings: PipelineSettings,
    logger: Option<Arc<QueryLogger>>,
}

impl RagPipeline {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorSearch>,
        chat: Arc<dyn ChatModel>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            retriever: Retriever::new(embedder, store, settings.strategy),
            generator: AnswerGenerator::new(Arc::clone(&chat), settings.language.clone()),
            reranker: Reranker::new(chat),
            settings,
            logger: None,
        }
    }

    #[inline]
    pub fn with_logger(mut self, logger: Arc<QueryLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    #[inline]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn answer(&self, question: &str, collection: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidInput("question cannot be empty".to_string()));
        }
        if collection.trim().is_empty() {
            return Err(RagError::InvalidInput(
                "collection name cannot be empty".to_string(),
            ));
        }

        let candidates = self
            .retriever
            .retrieve(question, collection, self.settings.fetch_limit)?;
        let unique = dedupe(candidates, self.settings.context_limit);
        debug!("{} unique candidates kept as context", unique.len());

        // A disabled gate still refuses to answer from an empty context.
        let threshold = self.settings.relevance_threshold.unwrap_or(f32::NEG_INFINITY);
        match evaluate(&unique, threshold) {
            GateOutcome::Empty => {
                info!("No results for question in {}", collection);
                return Ok(Answer::NoResults);
            }
            GateOutcome::BelowThreshold {
                top_score,
                threshold,
            } => {
                info!(
                    "Top score {:.3} below relevance threshold {:.3}",
                    top_score, threshold
                );
                return Ok(Answer::LowRelevance {
                    top_score,
                    threshold,
                });
            }
            GateOutcome::Pass { top_score } => {
                debug!("Relevance gate passed with top score {:.3}", top_score);
            }
        }

        let (sources, reranked) = self.select_sources(question, &unique)?;
        let context = build_context(
            sources
                .iter()
                .map(|s| (s.primary.as_str(), s.secondary.as_str())),
        );

        let raw = self
            .generator
            .generate(question, &context, self.settings.mode)?;

        let (text, dangerous) = match &self.settings.safety {
            Some(scanner) => scanner.annotate(&raw),
            None => (raw, false),
        };

        if let Some(logger) = &self.logger {
            if let Err(e) = logger.log(question, &text) {
                warn!("Failed to write query log {}: {}", logger.path().display(), e);
            }
        }

        Ok(Answer::Generated {
            text,
            sources,
            dangerous,
            reranked,
        })
    }

    fn select_sources(&self, question: &str, unique: &[Candidate]) -> Result<(Vec<Source>, bool)> {
        let fallback = || unique.iter().map(Source::from).collect::<Vec<_>>();

        if !self.settings.rerank {
            return Ok((fallback(), false));
        }

        let pairs: Vec<(&str, &str)> = unique.iter().map(|c| (c.primary(), c.secondary())).collect();
        let reranked = self.reranker.rerank(question, &pairs)?;
        if reranked.is_empty() {
            return Ok((fallback(), false));
        }

        let sources = reranked
            .into_iter()
            .map(|r| Source {
                primary: r.primary,
                secondary: r.secondary,
                score: None,
                confidence: Some(r.confidence),
            })
            .collect();
        Ok((sources, true))
    }
}
