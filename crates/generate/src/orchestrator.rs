//! Drives every stage for one artifact, in order, skipping stages whose
//! output already exists. Re-running after a partial failure is therefore a
//! resume, not a redo — the pipeline's core idempotence property.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use clipforge_core::{PipelineError, ProgressHandle, ScriptPatch, ScriptStatus};
use clipforge_store::Store;

use crate::context::StageContext;
use crate::stages;
use crate::Stage;

pub struct Orchestrator {
    ctx: StageContext,
}

impl Orchestrator {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }

    /// Run the artifact to completion. Any stage failure bubbles up with the
    /// fields produced so far already persisted, so the next run resumes
    /// where this one stopped.
    pub async fn run(
        &self,
        script_id: Uuid,
        progress: &ProgressHandle,
    ) -> Result<(), PipelineError> {
        let (mut script, topic) = stages::load_pair(&self.ctx, script_id).await?;

        self.ctx
            .store
            .update_script(
                script_id,
                ScriptPatch {
                    status: Some(ScriptStatus::Generating),
                    error: Some(None),
                    updated_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;

        let total = Stage::ORDER.len();
        for (index, stage) in Stage::ORDER.into_iter().enumerate() {
            if stage.is_populated(&script) {
                info!(stage = stage.label(), script_id = %script_id, "already populated — resuming past it");
                progress.set((100 * (index + 1) / total) as u8);
                continue;
            }

            let patch = stages::run_stage(&self.ctx, stage, &topic, &script).await?;
            self.ctx.store.update_script(script_id, patch).await?;
            script = self
                .ctx
                .store
                .script(script_id)
                .await?
                .ok_or_else(|| PipelineError::not_found("script", script_id))?;
            progress.set((100 * (index + 1) / total) as u8);
        }

        stages::settle_status(&self.ctx, script_id).await?;
        info!(script_id = %script_id, "generation complete");
        Ok(())
    }
}
