use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

// ── Payload (tagged union) ───────────────────────────────────────────

/// Kind plus kind-specific payload as one sum type, matched exhaustively at
/// dispatch. The id references are weak: handlers must treat a missing
/// referent as a distinct, non-retriable failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobPayload {
    FetchTopics,
    ExtractContent { topic_id: Uuid },
    TranslateTopic { topic_id: Uuid, language: String },
    GenerateHook { script_id: Uuid },
    GenerateScript { script_id: Uuid },
    GenerateStoryboard { script_id: Uuid },
    GenerateVoice { script_id: Uuid },
    PickMusic { script_id: Uuid },
    ExportPackage { script_id: Uuid },
    GenerateAll { script_id: Uuid },
    HealthCheck { source_id: Uuid },
    HealthCheckAll,
    AutoDiscovery,
    ExtractTrends,
}

impl JobPayload {
    /// Stable kind name used in logs and the HTTP surface.
    pub fn kind(&self) -> &'static str {
        match self {
            JobPayload::FetchTopics => "fetch_topics",
            JobPayload::ExtractContent { .. } => "extract_content",
            JobPayload::TranslateTopic { .. } => "translate_topic",
            JobPayload::GenerateHook { .. } => "generate_hook",
            JobPayload::GenerateScript { .. } => "generate_script",
            JobPayload::GenerateStoryboard { .. } => "generate_storyboard",
            JobPayload::GenerateVoice { .. } => "generate_voice",
            JobPayload::PickMusic { .. } => "pick_music",
            JobPayload::ExportPackage { .. } => "export_package",
            JobPayload::GenerateAll { .. } => "generate_all",
            JobPayload::HealthCheck { .. } => "health_check",
            JobPayload::HealthCheckAll => "health_check_all",
            JobPayload::AutoDiscovery => "auto_discovery",
            JobPayload::ExtractTrends => "extract_trends",
        }
    }

    /// The owning artifact, when the payload names one. A failure of such a
    /// job is propagated onto that artifact's status.
    pub fn script_id(&self) -> Option<Uuid> {
        match self {
            JobPayload::GenerateHook { script_id }
            | JobPayload::GenerateScript { script_id }
            | JobPayload::GenerateStoryboard { script_id }
            | JobPayload::GenerateVoice { script_id }
            | JobPayload::PickMusic { script_id }
            | JobPayload::ExportPackage { script_id }
            | JobPayload::GenerateAll { script_id } => Some(*script_id),
            _ => None,
        }
    }
}

// ── Job ──────────────────────────────────────────────────────────────

/// A unit of asynchronous work. Never deleted — only transitioned to a
/// terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub payload: JobPayload,
    pub status: JobStatus,
    /// 0–100, monotonic non-decreasing within one run.
    pub progress: u8,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(payload: JobPayload) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            payload,
            status: JobStatus::Queued,
            progress: 0,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial-field merge for [`Job`]. Only the worker and the staleness sweep
/// produce these.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl JobPatch {
    pub fn apply(self, job: &mut Job) {
        let starts_run = self.status == Some(JobStatus::Running);
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(progress) = self.progress {
            // Monotonic within one run; a fresh transition to running resets.
            job.progress = if starts_run {
                progress.min(100)
            } else {
                job.progress.max(progress.min(100))
            };
        }
        if let Some(error) = self.error {
            job.error = Some(error);
        }
        if let Some(at) = self.updated_at {
            job.updated_at = at;
        }
    }
}

// ── Progress reporting ───────────────────────────────────────────────

/// Shared, lock-free progress counter a handler bumps while it works.
///
/// Best-effort observability: the worker's monitor task persists the value;
/// nothing about correctness depends on it. Monotonic by construction.
#[derive(Debug, Clone, Default)]
pub struct ProgressHandle {
    value: Arc<AtomicU8>,
}

impl ProgressHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise progress to `percent` (clamped to 100). Lower values are ignored.
    pub fn set(&self, percent: u8) {
        self.value.fetch_max(percent.min(100), Ordering::Relaxed);
    }

    pub fn get(&self) -> u8 {
        self.value.load(Ordering::Relaxed)
    }
}
