//! Browser front end: a single page and a JSON endpoint over the pipeline.


use anyhow::Context;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::pipeline::{RagPipeline, Source};

const INDEX_HTML: &str = include_str!("index.html");

pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
    pub default_collection: String,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub collection: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<AskSource>,
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AskSource {
    pub primary: String,
    pub secondary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl From<&Source> for AskSource {
    fn from(source: &Source) -> Self {
        Self {
            primary: source.primary.clone(),
            secondary: source.secondary.clone(),
            score: source.score,
            confidence: source.confidence,
        }
    }
}

impl AskResponse {
    fn failure(message: String) -> Self {
        Self {
            outcome: "error".to_string(),
            error: Some(message),
            ..Self::default()
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/ask", post(ask))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> anyhow::Result<()> {
    let bind_addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;

    info!("Web UI listening on http://{}", bind_addr);
    axum::serve(listener, router(state))
        .await
        .context("Server error")?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Failures are reported in the body so the page can show them inline.
async fn ask(State(state): State<Arc<AppState>>, Json(request): Json<AskRequest>) -> Json<AskResponse> {
    let collection = request
        .collection
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| state.default_collection.clone());
    let pipeline = Arc::clone(&state.pipeline);
    let question = request.question;

    let result =
        tokio::task::spawn_blocking(move || pipeline.answer(&question, &collection)).await;

    let response = match result {
        Ok(Ok(answer)) => AskResponse {
            answer: answer.message().to_string(),
            sources: answer.sources().iter().map(AskSource::from).collect(),
            outcome: answer.outcome().to_string(),
            error: None,
        },
        Ok(Err(e)) => {
            error!("Question failed: {}", e);
            AskResponse::failure(e.to_string())
        }
        Err(e) => {
            error!("Pipeline task failed: {}", e);
            AskResponse::failure("internal error while answering".to_string())
        }
    };
    Json(response)
}
