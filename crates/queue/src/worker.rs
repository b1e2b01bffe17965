//! Single-flight job executor.
//!
//! One background loop polls at a short interval; a capacity-1 permit
//! guarantees at most one job runs system-wide. Every handler failure is
//! caught here — the single execution boundary — recorded on the job and,
//! when the payload names an owning artifact, propagated onto it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use clipforge_core::config::{IngestConfig, QuotaConfig, WorkerConfig};
use clipforge_core::{
    Job, JobPatch, JobPayload, JobStatus, PipelineError, ProgressHandle, ScriptPatch, ScriptStatus,
};
use clipforge_generate::stages::run_single_stage;
use clipforge_generate::{Orchestrator, Stage, StageContext};
use clipforge_ingest::{EnrichContext, FeedFetcher, IntakePipeline};
use clipforge_llm::ModelHandle;
use clipforge_store::Store;

/// How often the in-flight progress value is persisted.
const PROGRESS_FLUSH_INTERVAL: Duration = Duration::from_millis(250);

pub struct Worker {
    store: Arc<dyn Store>,
    intake: IntakePipeline,
    enrich: EnrichContext,
    gen_ctx: StageContext,
    config: WorkerConfig,
    /// The single-flight guard: one permit, never replenished elsewhere.
    slot: Semaphore,
    shutdown: Notify,
}

impl Worker {
    pub fn new(
        store: Arc<dyn Store>,
        fetcher: Arc<dyn FeedFetcher>,
        model: ModelHandle,
        quota: QuotaConfig,
        ingest: IngestConfig,
        config: WorkerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            intake: IntakePipeline::new(store.clone(), fetcher.clone(), quota, ingest),
            enrich: EnrichContext {
                store: store.clone(),
                fetcher,
                model: model.clone(),
            },
            gen_ctx: StageContext::new(store.clone(), model),
            store,
            config,
            slot: Semaphore::new(1),
            shutdown: Notify::new(),
        })
    }

    /// Start the polling loop. Stop it with [`Worker::shutdown`].
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let worker = self.clone();
        tokio::spawn(async move {
            info!(
                poll_secs = worker.config.poll_interval_secs,
                "worker loop started"
            );
            loop {
                tokio::select! {
                    _ = worker.shutdown.notified() => {
                        info!("worker loop stopping");
                        break;
                    }
                    _ = tokio::time::sleep(worker.sleep_with_jitter()) => {
                        if let Err(e) = worker.tick().await {
                            error!(error = %e, "worker tick failed");
                        }
                    }
                }
            }
        })
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }

    fn sleep_with_jitter(&self) -> Duration {
        let jitter = if self.config.poll_jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.config.poll_jitter_ms)
        };
        Duration::from_secs(self.config.poll_interval_secs) + Duration::from_millis(jitter)
    }

    /// Run at most one job: if the slot is free and a job is queued, execute
    /// it to completion. Returns the executed job's id, if any.
    pub async fn tick(&self) -> Result<Option<Uuid>, PipelineError> {
        let Ok(_permit) = self.slot.try_acquire() else {
            // Another job is mid-flight.
            return Ok(None);
        };

        let Some(job) = self.store.next_queued_job().await? else {
            return Ok(None);
        };
        debug!(job_id = %job.id, kind = job.payload.kind(), "dequeued job");
        self.execute(&job).await;
        Ok(Some(job.id))
    }

    /// The per-job execution contract: running/0 → handler → done/100, or
    /// error + propagation onto the owning artifact.
    async fn execute(&self, job: &Job) {
        if let Err(e) = self
            .store
            .update_job(
                job.id,
                JobPatch {
                    status: Some(JobStatus::Running),
                    progress: Some(0),
                    updated_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await
        {
            error!(job_id = %job.id, error = %e, "failed to mark job running");
            return;
        }

        let progress = ProgressHandle::new();
        let stop_flush = Arc::new(Notify::new());
        let flusher = spawn_progress_flusher(
            self.store.clone(),
            job.id,
            progress.clone(),
            stop_flush.clone(),
        );

        let result = self.dispatch(&job.payload, &progress).await;

        stop_flush.notify_waiters();
        let _ = flusher.await;

        match result {
            Ok(()) => {
                info!(job_id = %job.id, kind = job.payload.kind(), "job done");
                if let Err(e) = self
                    .store
                    .update_job(
                        job.id,
                        JobPatch {
                            status: Some(JobStatus::Done),
                            progress: Some(100),
                            updated_at: Some(Utc::now()),
                            ..Default::default()
                        },
                    )
                    .await
                {
                    error!(job_id = %job.id, error = %e, "failed to mark job done");
                }
            }
            Err(err) => {
                let message = err.to_string();
                warn!(job_id = %job.id, kind = job.payload.kind(), error = %message, "job failed");
                if let Err(e) = self
                    .store
                    .update_job(
                        job.id,
                        JobPatch {
                            status: Some(JobStatus::Error),
                            error: Some(message.clone()),
                            updated_at: Some(Utc::now()),
                            ..Default::default()
                        },
                    )
                    .await
                {
                    error!(job_id = %job.id, error = %e, "failed to record job failure");
                }
                self.propagate_to_artifact(&job.payload, &message).await;
            }
        }
    }

    /// A consumer watching the artifact rather than the job must still
    /// observe the failure.
    async fn propagate_to_artifact(&self, payload: &JobPayload, message: &str) {
        let Some(script_id) = payload.script_id() else {
            return;
        };
        let patch = ScriptPatch {
            status: Some(ScriptStatus::Error),
            error: Some(Some(message.to_string())),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        if let Err(e) = self.store.update_script(script_id, patch).await {
            warn!(script_id = %script_id, error = %e, "could not propagate failure to artifact");
        }
    }

    /// Exhaustive dispatch: adding a job kind is a compile-time-checked
    /// change.
    async fn dispatch(
        &self,
        payload: &JobPayload,
        progress: &ProgressHandle,
    ) -> Result<(), PipelineError> {
        match payload {
            JobPayload::FetchTopics => {
                self.intake.run(progress, Utc::now()).await?;
                Ok(())
            }
            JobPayload::ExtractContent { topic_id } => {
                self.enrich.extract_content(*topic_id, progress).await
            }
            JobPayload::TranslateTopic { topic_id, language } => {
                self.enrich
                    .translate_topic(*topic_id, language, progress)
                    .await
            }
            JobPayload::GenerateHook { script_id } => {
                run_single_stage(&self.gen_ctx, Stage::Hook, *script_id, progress).await
            }
            JobPayload::GenerateScript { script_id } => {
                run_single_stage(&self.gen_ctx, Stage::ScriptText, *script_id, progress).await
            }
            JobPayload::GenerateStoryboard { script_id } => {
                run_single_stage(&self.gen_ctx, Stage::Storyboard, *script_id, progress).await
            }
            JobPayload::GenerateVoice { script_id } => {
                run_single_stage(&self.gen_ctx, Stage::Voice, *script_id, progress).await
            }
            JobPayload::PickMusic { script_id } => {
                run_single_stage(&self.gen_ctx, Stage::Music, *script_id, progress).await
            }
            JobPayload::ExportPackage { script_id } => {
                run_single_stage(&self.gen_ctx, Stage::Export, *script_id, progress).await
            }
            JobPayload::GenerateAll { script_id } => {
                Orchestrator::new(self.gen_ctx.clone())
                    .run(*script_id, progress)
                    .await
            }
            JobPayload::HealthCheck { source_id } => self.enrich.health_check(*source_id).await,
            JobPayload::HealthCheckAll => self.enrich.health_check_all(progress).await,
            JobPayload::AutoDiscovery => {
                self.enrich.auto_discovery(progress).await?;
                Ok(())
            }
            JobPayload::ExtractTrends => self.enrich.extract_trends(Utc::now(), progress).await,
        }
    }
}

/// Persist the in-flight progress value whenever it advances. Best-effort:
/// these writes are observability, and they are what keeps a healthy job
/// from looking stale.
fn spawn_progress_flusher(
    store: Arc<dyn Store>,
    job_id: Uuid,
    progress: ProgressHandle,
    cancel: Arc<Notify>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last = 0u8;
        let mut interval = tokio::time::interval(PROGRESS_FLUSH_INTERVAL);
        interval.tick().await; // skip the immediate tick
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let current = progress.get();
                    if current > last {
                        let patch = JobPatch {
                            progress: Some(current),
                            updated_at: Some(Utc::now()),
                            ..Default::default()
                        };
                        if let Err(e) = store.update_job(job_id, patch).await {
                            warn!(job_id = %job_id, error = %e, "progress flush failed");
                        }
                        last = current;
                    }
                }
                _ = cancel.notified() => break,
            }
        }
    })
}
