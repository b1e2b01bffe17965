//! HTTP handlers for the job submission surface.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use clipforge_core::{
    FeedSource, Job, JobPayload, Script, ScriptConfig, Topic, TopicPatch, TopicStatus,
};
use clipforge_store::Store;

use crate::state::AppState;

/// Collapse store failures to a 500 with a log line.
fn internal<E: std::fmt::Display>(err: E) -> StatusCode {
    error!(error = %err, "request failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

// ── Health ────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ── Jobs ──────────────────────────────────────────────────────────

pub async fn jobs_create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<JobPayload>,
) -> Result<(StatusCode, Json<Job>), StatusCode> {
    let job = clipforge_queue::enqueue(state.store.as_ref(), payload)
        .await
        .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn jobs_list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Job>>, StatusCode> {
    state.store.jobs().await.map(Json).map_err(internal)
}

pub async fn jobs_get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, StatusCode> {
    state
        .store
        .job(id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

// ── Topics ────────────────────────────────────────────────────────

pub async fn topics_list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Topic>>, StatusCode> {
    state.store.topics().await.map(Json).map_err(internal)
}

#[derive(Deserialize, Default)]
pub struct SelectTopicRequest {
    #[serde(default)]
    pub config: Option<ScriptConfig>,
}

/// Select a topic for generation: create its draft artifact (once) and
/// enqueue a generate-all job for it.
pub async fn topics_select(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    body: Option<Json<SelectTopicRequest>>,
) -> Result<(StatusCode, Json<Script>), StatusCode> {
    let topic = state
        .store
        .topic(id)
        .await
        .map_err(internal)?
        .ok_or(StatusCode::NOT_FOUND)?;

    // One artifact per selected topic.
    let existing = state
        .store
        .scripts()
        .await
        .map_err(internal)?
        .into_iter()
        .find(|s| s.topic_id == topic.id);
    if let Some(existing) = existing {
        return Ok((StatusCode::OK, Json(existing)));
    }

    let config = body
        .and_then(|Json(req)| req.config)
        .unwrap_or_else(|| ScriptConfig {
            language: topic.language.clone(),
            ..Default::default()
        });

    let script = Script::new(topic.id, config);
    state
        .store
        .create_script(script.clone())
        .await
        .map_err(internal)?;
    state
        .store
        .update_topic(
            topic.id,
            TopicPatch {
                status: Some(TopicStatus::Selected),
                ..Default::default()
            },
        )
        .await
        .map_err(internal)?;
    clipforge_queue::enqueue(
        state.store.as_ref(),
        JobPayload::GenerateAll {
            script_id: script.id,
        },
    )
    .await
    .map_err(internal)?;

    Ok((StatusCode::CREATED, Json(script)))
}

// ── Scripts ───────────────────────────────────────────────────────

pub async fn scripts_list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Script>>, StatusCode> {
    state.store.scripts().await.map(Json).map_err(internal)
}

pub async fn scripts_get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Script>, StatusCode> {
    state
        .store
        .script(id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

// ── Feed sources ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateSourceRequest {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub language: Option<String>,
}

pub async fn sources_list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<FeedSource>>, StatusCode> {
    state.store.sources().await.map(Json).map_err(internal)
}

pub async fn sources_create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSourceRequest>,
) -> Result<(StatusCode, Json<FeedSource>), StatusCode> {
    let language = req
        .language
        .unwrap_or_else(|| state.config.ingest.default_language.clone());
    let source = FeedSource::new(req.name, req.url, language);
    state
        .store
        .create_source(source.clone())
        .await
        .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(source)))
}

/// Removing a source cascades to its topics.
pub async fn sources_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    match state.store.delete_source(id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(clipforge_store::StoreError::NotFound { .. }) => Err(StatusCode::NOT_FOUND),
        Err(e) => Err(internal(e)),
    }
}
