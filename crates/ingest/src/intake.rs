//! The topic intake pipeline: concurrent feed fetches, then one sequential
//! admission pass applying the content heuristic, the quota gate and the
//! topic-scope dedup check.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use clipforge_core::config::{IngestConfig, QuotaConfig};
use clipforge_core::{FeedItem, FeedSource, PipelineError, ProgressHandle, Topic, TopicPatch};
use clipforge_similarity::{topic_similarity, TOPIC_THRESHOLD};
use clipforge_store::Store;

use crate::fetcher::FeedFetcher;
use crate::text::{extract_tags, is_too_thin, strip_markup};
use crate::throttle::Throttle;

/// Outcome of one intake run. Skips and exhausted quotas are successful
/// outcomes — the job that drove the run still completes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntakeReport {
    pub fetched: usize,
    pub added: u32,
    pub skipped_thin: u32,
    pub skipped_duplicate: u32,
    pub quota_exhausted: bool,
}

pub struct IntakePipeline {
    store: Arc<dyn Store>,
    fetcher: Arc<dyn FeedFetcher>,
    throttle: Throttle,
    quota: QuotaConfig,
    config: IngestConfig,
}

impl IntakePipeline {
    pub fn new(
        store: Arc<dyn Store>,
        fetcher: Arc<dyn FeedFetcher>,
        quota: QuotaConfig,
        config: IngestConfig,
    ) -> Self {
        Self {
            throttle: Throttle::new(store.clone(), quota),
            store,
            fetcher,
            quota,
            config,
        }
    }

    /// Run one full intake pass at the given instant.
    pub async fn run(
        &self,
        progress: &ProgressHandle,
        now: DateTime<Utc>,
    ) -> Result<IntakeReport, PipelineError> {
        let mut report = IntakeReport::default();

        let sources = self.store.enabled_sources().await.map_err(PipelineError::from)?;
        if sources.is_empty() {
            info!("no enabled feed sources — nothing to do");
            return Ok(report);
        }

        let admission = self
            .throttle
            .can_admit(now)
            .await
            .map_err(PipelineError::from)?;
        if !admission.allowed {
            info!(
                remaining_daily = admission.remaining_daily,
                remaining_hourly = admission.remaining_hourly,
                "ingestion quota exhausted — skipping run"
            );
            report.quota_exhausted = true;
            return Ok(report);
        }
        let budget = admission
            .remaining_daily
            .min(admission.remaining_hourly)
            .min(self.quota.per_run_cap);
        progress.set(10);

        // Network latency dominates: fetch all sources concurrently, bounded.
        let items = self.fetch_all(&sources).await?;
        report.fetched = items.len();
        progress.set(30);

        // Sequential admission pass keeps the dedup comparison set consistent
        // across one run.
        let cutoff = now - Duration::days(self.config.dedup_window_days);
        let mut recent = self
            .store
            .topics_since(cutoff)
            .await
            .map_err(PipelineError::from)?;

        let total = items.len().max(1);
        for (index, (source, item)) in items.into_iter().enumerate() {
            if report.added >= budget {
                report.quota_exhausted = true;
                info!(budget, "admission budget reached — stopping the pass");
                break;
            }

            let title = strip_markup(&item.title);
            let body = strip_markup(&item.description);

            let combined = format!("{} {}", title, body);
            if is_too_thin(combined.trim(), self.config.min_chars, self.config.min_words) {
                report.skipped_thin += 1;
                continue;
            }

            if let Some(existing) = recent
                .iter()
                .find(|t| topic_similarity(&title, &body, &t.title, t.body_text()) >= TOPIC_THRESHOLD)
            {
                // Repair-on-duplicate: adopt the image instead of the item.
                if existing.image_url.is_none() && item.image_url.is_some() {
                    self.store
                        .update_topic(
                            existing.id,
                            TopicPatch {
                                image_url: item.image_url.clone(),
                                ..Default::default()
                            },
                        )
                        .await
                        .map_err(PipelineError::from)?;
                }
                report.skipped_duplicate += 1;
                continue;
            }

            let tags = extract_tags(&title, &body);
            let score = rand::thread_rng().gen_range(self.config.score_min..self.config.score_max);
            let topic = Topic::new(
                source.id,
                title,
                item.link.clone(),
                body,
                tags,
                score,
                source.language.clone(),
                item.image_url.clone(),
            );
            self.store
                .create_topic(topic.clone())
                .await
                .map_err(PipelineError::from)?;
            recent.push(topic);
            report.added += 1;

            progress.set(30 + (65 * (index + 1) / total) as u8);
        }

        if report.added > 0 {
            self.throttle
                .record_admitted(report.added, now)
                .await
                .map_err(PipelineError::from)?;
        }

        info!(
            fetched = report.fetched,
            added = report.added,
            thin = report.skipped_thin,
            duplicate = report.skipped_duplicate,
            quota_exhausted = report.quota_exhausted,
            "intake run finished"
        );
        Ok(report)
    }

    /// Fetch every source concurrently; a failing source is logged and
    /// skipped, but if every fetch fails the run is an upstream failure.
    async fn fetch_all(
        &self,
        sources: &[FeedSource],
    ) -> Result<Vec<(FeedSource, FeedItem)>, PipelineError> {
        let fetches = stream::iter(sources.iter().cloned())
            .map(|source| {
                let fetcher = self.fetcher.clone();
                async move {
                    let result = fetcher.fetch(&source).await;
                    (source, result)
                }
            })
            .buffer_unordered(self.config.fetch_concurrency)
            .collect::<Vec<_>>()
            .await;

        let mut items = Vec::new();
        let mut failures = 0usize;
        for (source, result) in fetches {
            match result {
                Ok(fetched) => {
                    items.extend(fetched.into_iter().map(|item| (source.clone(), item)));
                }
                Err(e) => {
                    warn!(source = %source.name, error = %e, "feed fetch failed");
                    failures += 1;
                }
            }
        }

        if items.is_empty() && failures == sources.len() && failures > 0 {
            return Err(PipelineError::Upstream(format!(
                "all {failures} feed fetches failed"
            )));
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use clipforge_store::MemoryStore;
    use std::collections::HashMap;

    use crate::fetcher::FetchError;

    /// Scripted fetcher: url → items.
    struct StaticFetcher {
        feeds: HashMap<String, Vec<FeedItem>>,
    }

    #[async_trait]
    impl FeedFetcher for StaticFetcher {
        async fn fetch(&self, source: &FeedSource) -> Result<Vec<FeedItem>, FetchError> {
            self.feeds
                .get(&source.url)
                .cloned()
                .ok_or(FetchError::Status { status: 404 })
        }

        async fn fetch_article(&self, _url: &str) -> Result<String, FetchError> {
            Ok("article body".into())
        }
    }

    fn item(title: &str, description: &str) -> FeedItem {
        FeedItem {
            title: title.into(),
            link: format!("https://example.com/{}", title.len()),
            description: description.into(),
            image_url: None,
            published_at: None,
        }
    }

    fn configs() -> (QuotaConfig, IngestConfig) {
        (
            QuotaConfig {
                daily_limit: 300,
                hourly_limit: 30,
                per_run_cap: 10,
            },
            IngestConfig {
                fetch_concurrency: 2,
                fetch_timeout_secs: 5,
                dedup_window_days: 7,
                min_chars: 30,
                min_words: 4,
                score_min: 55.0,
                score_max: 90.0,
                default_language: "en".into(),
            },
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    async fn pipeline_with(
        feeds: HashMap<String, Vec<FeedItem>>,
    ) -> (Arc<MemoryStore>, IntakePipeline) {
        let store = Arc::new(MemoryStore::new());
        let mut source = FeedSource::new("world", "https://example.com/feed", "en");
        source.enabled = true;
        store.create_source(source).await.unwrap();
        let (quota, config) = configs();
        let pipeline = IntakePipeline::new(
            store.clone(),
            Arc::new(StaticFetcher { feeds }),
            quota,
            config,
        );
        (store, pipeline)
    }

    #[tokio::test]
    async fn admits_fresh_items_as_new_topics() {
        let feeds = HashMap::from([(
            "https://example.com/feed".to_string(),
            vec![item(
                "Parliament votes on climate bill",
                "The long-debated climate bill passed its final reading today.",
            )],
        )]);
        let (store, pipeline) = pipeline_with(feeds).await;

        let report = pipeline.run(&ProgressHandle::new(), now()).await.unwrap();
        assert_eq!(report.added, 1);

        let topics = store.topics().await.unwrap();
        assert_eq!(topics.len(), 1);
        assert!(topics[0].tags.len() >= 2);
        assert!((55.0..90.0).contains(&topics[0].score));
    }

    #[tokio::test]
    async fn near_duplicate_title_is_rejected() {
        // No bodies → the title-only fallback path decides.
        let feeds = HashMap::from([(
            "https://example.com/feed".to_string(),
            vec![
                item("Moscow court rules on the case", ""),
                item("Moscow court rules on this case", ""),
            ],
        )]);
        let (store, pipeline) = pipeline_with(feeds).await;

        let report = pipeline.run(&ProgressHandle::new(), now()).await.unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(report.skipped_duplicate, 1);
        assert_eq!(store.topics().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_with_image_backfills_existing_topic() {
        let mut second = item("Moscow court rules on this case", "");
        second.image_url = Some("https://img.example.com/court.jpg".into());
        let feeds = HashMap::from([(
            "https://example.com/feed".to_string(),
            vec![item("Moscow court rules on the case", ""), second],
        )]);
        let (store, pipeline) = pipeline_with(feeds).await;

        pipeline.run(&ProgressHandle::new(), now()).await.unwrap();
        let topics = store.topics().await.unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(
            topics[0].image_url.as_deref(),
            Some("https://img.example.com/court.jpg")
        );
    }

    #[tokio::test]
    async fn thin_items_are_skipped_not_failed() {
        let feeds = HashMap::from([(
            "https://example.com/feed".to_string(),
            vec![item("Hi", "")],
        )]);
        let (store, pipeline) = pipeline_with(feeds).await;

        let report = pipeline.run(&ProgressHandle::new(), now()).await.unwrap();
        assert_eq!(report.added, 0);
        assert_eq!(report.skipped_thin, 1);
        assert!(store.topics().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn exhausted_quota_ends_run_successfully_with_zero_added() {
        let feeds = HashMap::from([(
            "https://example.com/feed".to_string(),
            vec![item(
                "Parliament votes on climate bill",
                "The long-debated climate bill passed its final reading today.",
            )],
        )]);
        let (store, pipeline) = pipeline_with(feeds).await;

        // Spend the last daily slot, as in a 299/300 state plus one admit.
        let throttle = Throttle::new(
            store.clone() as Arc<dyn Store>,
            QuotaConfig {
                daily_limit: 300,
                hourly_limit: 30,
                per_run_cap: 10,
            },
        );
        let mut state = clipforge_core::QuotaState::empty(now());
        state.daily_count = 299;
        store.put_quota_state(state).await.unwrap();
        throttle.record_admitted(1, now()).await.unwrap();

        let report = pipeline.run(&ProgressHandle::new(), now()).await.unwrap();
        assert!(report.quota_exhausted);
        assert_eq!(report.added, 0);
        assert!(store.topics().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn per_run_cap_bounds_admissions() {
        // Pairwise-disjoint word sets so nothing trips the dedup check.
        let many: Vec<FeedItem> = (0..20)
            .map(|i| {
                item(
                    &format!("alpha{i} bravo{i} charlie{i} delta{i} echo{i}"),
                    "",
                )
            })
            .collect();
        let feeds = HashMap::from([("https://example.com/feed".to_string(), many)]);
        let (_, pipeline) = pipeline_with(feeds).await;

        let report = pipeline.run(&ProgressHandle::new(), now()).await.unwrap();
        assert_eq!(report.added, 10, "per_run_cap must bound the pass");
        assert!(report.quota_exhausted);
    }

    #[tokio::test]
    async fn all_fetches_failing_is_an_upstream_error() {
        let (_, pipeline) = pipeline_with(HashMap::new()).await;
        let err = pipeline.run(&ProgressHandle::new(), now()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Upstream(_)));
    }

    #[tokio::test]
    async fn no_enabled_sources_is_a_successful_noop() {
        let store = Arc::new(MemoryStore::new());
        let (quota, config) = configs();
        let pipeline = IntakePipeline::new(
            store,
            Arc::new(StaticFetcher {
                feeds: HashMap::new(),
            }),
            quota,
            config,
        );
        let report = pipeline.run(&ProgressHandle::new(), now()).await.unwrap();
        assert_eq!(report.added, 0);
        assert!(!report.quota_exhausted);
    }
}
