//! In-memory [`Store`] implementation.
//!
//! Insertion-ordered maps keep list queries deterministic. Lock sections are
//! short and never held across an await.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use uuid::Uuid;

use clipforge_core::{
    FeedSource, Job, JobPatch, JobStatus, QuotaState, Script, ScriptPatch, SourcePatch, Topic,
    TopicPatch, TrendSnapshot,
};

use crate::{Store, StoreError};

#[derive(Default)]
struct Inner {
    sources: IndexMap<Uuid, FeedSource>,
    topics: IndexMap<Uuid, Topic>,
    scripts: IndexMap<Uuid, Script>,
    jobs: IndexMap<Uuid, Job>,
    quota: Option<QuotaState>,
    trends: Option<TrendSnapshot>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Store for MemoryStore {
    // ── Feed sources ────────────────────────────────────────────────

    async fn create_source(&self, source: FeedSource) -> Result<(), StoreError> {
        self.write().sources.insert(source.id, source);
        Ok(())
    }

    async fn source(&self, id: Uuid) -> Result<Option<FeedSource>, StoreError> {
        Ok(self.read().sources.get(&id).cloned())
    }

    async fn sources(&self) -> Result<Vec<FeedSource>, StoreError> {
        Ok(self.read().sources.values().cloned().collect())
    }

    async fn enabled_sources(&self) -> Result<Vec<FeedSource>, StoreError> {
        Ok(self
            .read()
            .sources
            .values()
            .filter(|s| s.enabled)
            .cloned()
            .collect())
    }

    async fn update_source(&self, id: Uuid, patch: SourcePatch) -> Result<(), StoreError> {
        let mut inner = self.write();
        let source = inner
            .sources
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "source", id })?;
        patch.apply(source);
        Ok(())
    }

    async fn delete_source(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.write();
        if inner.sources.shift_remove(&id).is_none() {
            return Err(StoreError::NotFound { entity: "source", id });
        }
        inner.topics.retain(|_, t| t.source_id != id);
        Ok(())
    }

    // ── Topics ──────────────────────────────────────────────────────

    async fn create_topic(&self, topic: Topic) -> Result<(), StoreError> {
        self.write().topics.insert(topic.id, topic);
        Ok(())
    }

    async fn topic(&self, id: Uuid) -> Result<Option<Topic>, StoreError> {
        Ok(self.read().topics.get(&id).cloned())
    }

    async fn topics_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Topic>, StoreError> {
        Ok(self
            .read()
            .topics
            .values()
            .filter(|t| t.created_at >= cutoff)
            .cloned()
            .collect())
    }

    async fn topics(&self) -> Result<Vec<Topic>, StoreError> {
        Ok(self.read().topics.values().cloned().collect())
    }

    async fn update_topic(&self, id: Uuid, patch: TopicPatch) -> Result<(), StoreError> {
        let mut inner = self.write();
        let topic = inner
            .topics
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "topic", id })?;
        patch.apply(topic);
        Ok(())
    }

    // ── Scripts ─────────────────────────────────────────────────────

    async fn create_script(&self, script: Script) -> Result<(), StoreError> {
        self.write().scripts.insert(script.id, script);
        Ok(())
    }

    async fn script(&self, id: Uuid) -> Result<Option<Script>, StoreError> {
        Ok(self.read().scripts.get(&id).cloned())
    }

    async fn scripts(&self) -> Result<Vec<Script>, StoreError> {
        Ok(self.read().scripts.values().cloned().collect())
    }

    async fn update_script(&self, id: Uuid, patch: ScriptPatch) -> Result<(), StoreError> {
        let mut inner = self.write();
        let script = inner
            .scripts
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "script", id })?;
        patch.apply(script);
        Ok(())
    }

    // ── Jobs ────────────────────────────────────────────────────────

    async fn create_job(&self, job: Job) -> Result<(), StoreError> {
        self.write().jobs.insert(job.id, job);
        Ok(())
    }

    async fn job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.read().jobs.get(&id).cloned())
    }

    async fn jobs(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self.read().jobs.values().cloned().collect())
    }

    async fn next_queued_job(&self) -> Result<Option<Job>, StoreError> {
        Ok(self
            .read()
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Queued)
            .min_by_key(|j| j.created_at)
            .cloned())
    }

    async fn running_jobs(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self
            .read()
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Running)
            .cloned()
            .collect())
    }

    async fn update_job(&self, id: Uuid, patch: JobPatch) -> Result<(), StoreError> {
        let mut inner = self.write();
        let job = inner
            .jobs
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "job", id })?;
        patch.apply(job);
        Ok(())
    }

    // ── Quota state ─────────────────────────────────────────────────

    async fn quota_state(&self) -> Result<Option<QuotaState>, StoreError> {
        Ok(self.read().quota.clone())
    }

    async fn put_quota_state(&self, state: QuotaState) -> Result<(), StoreError> {
        self.write().quota = Some(state);
        Ok(())
    }

    // ── Trend snapshot ──────────────────────────────────────────────

    async fn latest_trends(&self) -> Result<Option<TrendSnapshot>, StoreError> {
        Ok(self.read().trends.clone())
    }

    async fn put_trends(&self, snapshot: TrendSnapshot) -> Result<(), StoreError> {
        self.write().trends = Some(snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use clipforge_core::{JobPayload, ScriptConfig};

    fn topic_for(source_id: Uuid, title: &str) -> Topic {
        Topic::new(
            source_id,
            title,
            "https://example.com/a",
            "some body text here",
            vec![],
            60.0,
            "en",
            None,
        )
    }

    #[tokio::test]
    async fn delete_source_cascades_to_topics() {
        let store = MemoryStore::new();
        let source = FeedSource::new("news", "https://example.com/feed", "en");
        let source_id = source.id;
        store.create_source(source).await.unwrap();
        store
            .create_topic(topic_for(source_id, "kept by another source"))
            .await
            .unwrap();

        let other = FeedSource::new("other", "https://example.com/other", "en");
        let other_id = other.id;
        store.create_source(other).await.unwrap();
        store
            .create_topic(topic_for(other_id, "survivor"))
            .await
            .unwrap();

        store.delete_source(source_id).await.unwrap();

        let topics = store.topics().await.unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].title, "survivor");
    }

    #[tokio::test]
    async fn next_queued_job_is_fifo_by_creation() {
        let store = MemoryStore::new();
        let mut first = Job::new(JobPayload::FetchTopics);
        first.created_at = Utc::now() - Duration::seconds(10);
        let mut second = Job::new(JobPayload::HealthCheckAll);
        second.created_at = Utc::now() - Duration::seconds(5);
        // Insert out of order to prove ordering comes from created_at.
        store.create_job(second.clone()).await.unwrap();
        store.create_job(first.clone()).await.unwrap();

        let next = store.next_queued_job().await.unwrap().unwrap();
        assert_eq!(next.id, first.id);
    }

    #[tokio::test]
    async fn next_queued_job_skips_non_queued() {
        let store = MemoryStore::new();
        let mut running = Job::new(JobPayload::FetchTopics);
        running.status = JobStatus::Running;
        store.create_job(running).await.unwrap();
        assert!(store.next_queued_job().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn topics_since_filters_by_cutoff() {
        let store = MemoryStore::new();
        let source_id = Uuid::new_v4();
        let mut old = topic_for(source_id, "old");
        old.created_at = Utc::now() - Duration::days(10);
        let fresh = topic_for(source_id, "fresh");
        store.create_topic(old).await.unwrap();
        store.create_topic(fresh).await.unwrap();

        let cutoff = Utc::now() - Duration::days(7);
        let recent = store.topics_since(cutoff).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].title, "fresh");
    }

    #[tokio::test]
    async fn update_missing_entity_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_script(Uuid::new_v4(), ScriptPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "script", .. }));
    }

    #[tokio::test]
    async fn script_patch_merges_into_stored_row() {
        let store = MemoryStore::new();
        let script = Script::new(Uuid::new_v4(), ScriptConfig::default());
        let id = script.id;
        store.create_script(script).await.unwrap();

        store
            .update_script(
                id,
                ScriptPatch {
                    hook: Some("a hook".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = store.script(id).await.unwrap().unwrap();
        assert_eq!(stored.hook.as_deref(), Some("a hook"));
        assert!(stored.script_text.is_none());
    }
}
