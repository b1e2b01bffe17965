//! Staleness sweep: the only backstop against a crashed or hung worker
//! permanently blocking the single-flight queue. A running job whose last
//! progress update is older than the staleness window is marked `error` and
//! never auto-retried.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use clipforge_core::config::WorkerConfig;
use clipforge_core::{JobPatch, JobStatus, PipelineError, ScriptPatch, ScriptStatus};
use clipforge_store::Store;

pub struct Sweeper {
    store: Arc<dyn Store>,
    stale_after: chrono::Duration,
    interval: std::time::Duration,
    shutdown: Notify,
}

impl Sweeper {
    pub fn new(store: Arc<dyn Store>, config: WorkerConfig) -> Arc<Self> {
        Arc::new(Self {
            store,
            stale_after: chrono::Duration::seconds(config.stale_after_secs),
            interval: std::time::Duration::from_secs(config.sweep_interval_secs),
            shutdown: Notify::new(),
        })
    }

    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let sweeper = self.clone();
        tokio::spawn(async move {
            info!(
                stale_after_secs = sweeper.stale_after.num_seconds(),
                "staleness sweeper started"
            );
            loop {
                tokio::select! {
                    _ = sweeper.shutdown.notified() => {
                        info!("staleness sweeper stopping");
                        break;
                    }
                    _ = tokio::time::sleep(sweeper.interval) => {
                        if let Err(e) = sweeper.sweep_at(Utc::now()).await {
                            error!(error = %e, "sweep failed");
                        }
                    }
                }
            }
        })
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }

    /// Reclaim every running job with no progress update since `now` minus
    /// the staleness window. Returns the reclaimed job ids.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, PipelineError> {
        let running = self.store.running_jobs().await?;
        let mut reclaimed = Vec::new();

        for job in running {
            if now.signed_duration_since(job.updated_at) <= self.stale_after {
                continue;
            }
            let message = format!(
                "stale job: no progress update for over {}s",
                self.stale_after.num_seconds()
            );
            warn!(job_id = %job.id, kind = job.payload.kind(), "reclaiming stale job");
            self.store
                .update_job(
                    job.id,
                    JobPatch {
                        status: Some(JobStatus::Error),
                        error: Some(message.clone()),
                        updated_at: Some(now),
                        ..Default::default()
                    },
                )
                .await?;

            if let Some(script_id) = job.payload.script_id() {
                let patch = ScriptPatch {
                    status: Some(ScriptStatus::Error),
                    error: Some(Some(message.clone())),
                    updated_at: Some(now),
                    ..Default::default()
                };
                if let Err(e) = self.store.update_script(script_id, patch).await {
                    warn!(script_id = %script_id, error = %e, "could not propagate staleness to artifact");
                }
            }
            reclaimed.push(job.id);
        }

        Ok(reclaimed)
    }
}
