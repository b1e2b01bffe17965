//! Persistence collaborator boundary.
//!
//! The pipeline assumes per-entity CRUD with partial-field merge updates, a
//! small set of filtered list queries, and read-after-write consistency.
//! [`MemoryStore`] is the reference implementation and the test substrate;
//! storage mechanics beyond this boundary are out of scope.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use clipforge_core::{
    FeedSource, Job, JobPatch, QuotaState, Script, ScriptPatch, SourcePatch, Topic, TopicPatch,
    TrendSnapshot,
};

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("storage failure: {0}")]
    Internal(String),
}

impl From<StoreError> for clipforge_core::PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => {
                clipforge_core::PipelineError::not_found(entity, id)
            }
            other => clipforge_core::PipelineError::Store(other.to_string()),
        }
    }
}

/// Per-entity CRUD plus the filtered queries the pipeline needs.
#[async_trait]
pub trait Store: Send + Sync {
    // ── Feed sources ────────────────────────────────────────────────
    async fn create_source(&self, source: FeedSource) -> Result<(), StoreError>;
    async fn source(&self, id: Uuid) -> Result<Option<FeedSource>, StoreError>;
    async fn sources(&self) -> Result<Vec<FeedSource>, StoreError>;
    async fn enabled_sources(&self) -> Result<Vec<FeedSource>, StoreError>;
    async fn update_source(&self, id: Uuid, patch: SourcePatch) -> Result<(), StoreError>;
    /// Removes the source and cascades to every topic it produced.
    async fn delete_source(&self, id: Uuid) -> Result<(), StoreError>;

    // ── Topics ──────────────────────────────────────────────────────
    async fn create_topic(&self, topic: Topic) -> Result<(), StoreError>;
    async fn topic(&self, id: Uuid) -> Result<Option<Topic>, StoreError>;
    /// Topics created at or after `cutoff`, oldest first.
    async fn topics_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Topic>, StoreError>;
    async fn topics(&self) -> Result<Vec<Topic>, StoreError>;
    async fn update_topic(&self, id: Uuid, patch: TopicPatch) -> Result<(), StoreError>;

    // ── Scripts ─────────────────────────────────────────────────────
    async fn create_script(&self, script: Script) -> Result<(), StoreError>;
    async fn script(&self, id: Uuid) -> Result<Option<Script>, StoreError>;
    async fn scripts(&self) -> Result<Vec<Script>, StoreError>;
    async fn update_script(&self, id: Uuid, patch: ScriptPatch) -> Result<(), StoreError>;

    // ── Jobs ────────────────────────────────────────────────────────
    async fn create_job(&self, job: Job) -> Result<(), StoreError>;
    async fn job(&self, id: Uuid) -> Result<Option<Job>, StoreError>;
    async fn jobs(&self) -> Result<Vec<Job>, StoreError>;
    /// Oldest queued job by creation time (strict FIFO).
    async fn next_queued_job(&self) -> Result<Option<Job>, StoreError>;
    async fn running_jobs(&self) -> Result<Vec<Job>, StoreError>;
    async fn update_job(&self, id: Uuid, patch: JobPatch) -> Result<(), StoreError>;

    // ── Quota state ─────────────────────────────────────────────────
    async fn quota_state(&self) -> Result<Option<QuotaState>, StoreError>;
    async fn put_quota_state(&self, state: QuotaState) -> Result<(), StoreError>;

    // ── Trend snapshot ──────────────────────────────────────────────
    async fn latest_trends(&self) -> Result<Option<TrendSnapshot>, StoreError>;
    async fn put_trends(&self, snapshot: TrendSnapshot) -> Result<(), StoreError>;
}
