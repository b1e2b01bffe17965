//! The durable job queue and its single-flight executor, the staleness
//! sweeper, and the fixed-interval auto-fetch scheduler.

pub mod scheduler;
pub mod sweeper;
pub mod worker;

use clipforge_core::{Job, JobPayload};
use clipforge_store::{Store, StoreError};

pub use scheduler::AutoFetchScheduler;
pub use sweeper::Sweeper;
pub use worker::Worker;

/// Create a queued job. Producers (the HTTP surface, the scheduler) call
/// this; only the worker mutates jobs afterwards.
pub async fn enqueue(store: &dyn Store, payload: JobPayload) -> Result<Job, StoreError> {
    let job = Job::new(payload);
    store.create_job(job.clone()).await?;
    tracing::info!(job_id = %job.id, kind = job.payload.kind(), "job enqueued");
    Ok(job)
}
