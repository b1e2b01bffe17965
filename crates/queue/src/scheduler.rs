//! Fixed-interval scheduler that enqueues an automatic fetch-topics job,
//! gated by the same ingestion throttle a manual trigger passes through.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use clipforge_core::config::{QuotaConfig, WorkerConfig};
use clipforge_core::{JobPayload, PipelineError};
use clipforge_ingest::Throttle;
use clipforge_store::Store;

use crate::enqueue;

pub struct AutoFetchScheduler {
    store: Arc<dyn Store>,
    throttle: Throttle,
    interval: std::time::Duration,
    shutdown: Notify,
}

impl AutoFetchScheduler {
    pub fn new(store: Arc<dyn Store>, quota: QuotaConfig, config: WorkerConfig) -> Arc<Self> {
        Arc::new(Self {
            throttle: Throttle::new(store.clone(), quota),
            store,
            interval: std::time::Duration::from_secs(config.auto_fetch_interval_secs),
            shutdown: Notify::new(),
        })
    }

    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            info!(
                interval_secs = scheduler.interval.as_secs(),
                "auto-fetch scheduler started"
            );
            loop {
                tokio::select! {
                    _ = scheduler.shutdown.notified() => {
                        info!("auto-fetch scheduler stopping");
                        break;
                    }
                    _ = tokio::time::sleep(scheduler.interval) => {
                        if let Err(e) = scheduler.tick_at(Utc::now()).await {
                            error!(error = %e, "auto-fetch tick failed");
                        }
                    }
                }
            }
        })
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }

    /// Enqueue one fetch-topics job, unless the quota is already exhausted
    /// or an unfinished fetch job is still in the queue.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<Option<Uuid>, PipelineError> {
        if !self.throttle.can_admit(now).await?.allowed {
            debug!("quota exhausted — not scheduling a fetch");
            return Ok(None);
        }

        let pending_fetch = self
            .store
            .jobs()
            .await?
            .into_iter()
            .any(|j| j.payload == JobPayload::FetchTopics && !j.status.is_terminal());
        if pending_fetch {
            debug!("a fetch job is already pending — skipping");
            return Ok(None);
        }

        let job = enqueue(self.store.as_ref(), JobPayload::FetchTopics).await?;
        Ok(Some(job.id))
    }
}
