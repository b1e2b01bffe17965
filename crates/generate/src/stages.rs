//! One handler per generation stage. Each reads the owning topic/artifact,
//! makes at most one model call (none for export), and returns a patch with
//! only the field(s) it owns. Handlers never write job or artifact status —
//! that belongs to the orchestrator and the worker boundary.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use clipforge_core::{
    ExportBundle, PipelineError, ProgressHandle, Script, ScriptPatch, ScriptStatus, Topic,
};
use clipforge_store::Store;

use crate::anticopy::{self, MAX_ATTEMPTS};
use crate::context::StageContext;
use crate::prompts;
use crate::Stage;

/// Run one stage and return its patch.
pub async fn run_stage(
    ctx: &StageContext,
    stage: Stage,
    topic: &Topic,
    script: &Script,
) -> Result<ScriptPatch, PipelineError> {
    debug!(stage = stage.label(), script_id = %script.id, "running stage");
    match stage {
        Stage::Hook => hook(ctx, topic, script).await,
        Stage::ScriptText => script_text(ctx, topic, script).await,
        Stage::Storyboard => storyboard(ctx, topic, script).await,
        Stage::Voice => voice(ctx, script).await,
        Stage::Music => music(ctx, topic, script).await,
        Stage::Seo => seo(ctx, topic, script).await,
        Stage::Export => export(script),
    }
}

/// Execute a single-stage job: load the pair, skip if already populated,
/// apply the patch and settle the artifact status.
pub async fn run_single_stage(
    ctx: &StageContext,
    stage: Stage,
    script_id: Uuid,
    progress: &ProgressHandle,
) -> Result<(), PipelineError> {
    let (script, topic) = load_pair(ctx, script_id).await?;

    if stage.is_populated(&script) {
        info!(stage = stage.label(), script_id = %script_id, "stage output present — skipping");
        return Ok(());
    }

    ctx.store
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
    progress.set(10);

    let patch = run_stage(ctx, stage, &topic, &script).await?;
    ctx.store.update_script(script_id, patch).await?;
    progress.set(90);

    settle_status(ctx, script_id).await
}

/// Resolve the weakly-referenced script and its owning topic.
pub(crate) async fn load_pair(
    ctx: &StageContext,
    script_id: Uuid,
) -> Result<(Script, Topic), PipelineError> {
    let script = ctx
        .store
        .script(script_id)
        .await?
        .ok_or_else(|| PipelineError::not_found("script", script_id))?;
    let topic = ctx
        .store
        .topic(script.topic_id)
        .await?
        .ok_or_else(|| PipelineError::not_found("topic", script.topic_id))?;
    Ok((script, topic))
}

/// Re-derive the artifact status from which fields are populated.
pub(crate) async fn settle_status(
    ctx: &StageContext,
    script_id: Uuid,
) -> Result<(), PipelineError> {
    let script = ctx
        .store
        .script(script_id)
        .await?
        .ok_or_else(|| PipelineError::not_found("script", script_id))?;
    let status = if script.export.is_some() {
        ScriptStatus::Exported
    } else if script.content_complete() {
        ScriptStatus::Ready
    } else {
        ScriptStatus::Draft
    };
    ctx.store
        .update_script(script_id, ScriptPatch::status(status))
        .await?;
    Ok(())
}

// ── Stage handlers ───────────────────────────────────────────────────

async fn hook(
    ctx: &StageContext,
    topic: &Topic,
    script: &Script,
) -> Result<ScriptPatch, PipelineError> {
    let grounding = ctx.grounding(topic).await;
    let messages = [
        prompts::system_prompt(&script.config),
        prompts::hook_prompt(topic, grounding.block.as_deref()),
    ];
    let hook = match ctx.chat(&messages).await? {
        Some(reply) => reply.lines().next().unwrap_or(&reply).trim().to_string(),
        None => prompts::fallback_hook(topic),
    };
    Ok(ScriptPatch {
        hook: Some(hook),
        updated_at: Some(Utc::now()),
        ..Default::default()
    })
}

/// The anti-copy gated stage: generate, validate, retry a bounded number of
/// times, then fail hard with the offending percentage.
async fn script_text(
    ctx: &StageContext,
    topic: &Topic,
    script: &Script,
) -> Result<ScriptPatch, PipelineError> {
    let grounding = ctx.grounding(topic).await;

    // Seeds are the titles that fed the prompt; the corpus is every other
    // script ever generated.
    let mut seeds = vec![topic.title.clone()];
    seeds.extend(grounding.trend_keywords.iter().cloned());
    let corpus: Vec<String> = ctx
        .store
        .scripts()
        .await?
        .into_iter()
        .filter(|s| s.id != script.id)
        .filter_map(|s| s.script_text)
        .collect();

    let mut last_rejection = None;
    for attempt in 1..=MAX_ATTEMPTS {
        let messages = [
            prompts::system_prompt(&script.config),
            prompts::script_prompt(topic, grounding.block.as_deref(), attempt),
        ];
        let candidate = match ctx.chat(&messages).await? {
            Some(reply) => reply.trim().to_string(),
            None => prompts::fallback_script(topic),
        };

        match anticopy::check(&candidate, &seeds, &corpus) {
            Ok(()) => {
                return Ok(ScriptPatch {
                    script_text: Some(candidate),
                    updated_at: Some(Utc::now()),
                    ..Default::default()
                });
            }
            Err(rejection) => {
                info!(
                    script_id = %script.id,
                    attempt,
                    percent = rejection.percent(),
                    "anti-copy check rejected candidate"
                );
                last_rejection = Some(rejection);
            }
        }
    }

    let percent = last_rejection.map(|r| r.percent()).unwrap_or(100);
    Err(PipelineError::TooSimilar { percent })
}

async fn storyboard(
    ctx: &StageContext,
    topic: &Topic,
    script: &Script,
) -> Result<ScriptPatch, PipelineError> {
    let narration = script
        .script_text
        .clone()
        .unwrap_or_else(|| prompts::fallback_script(topic));
    let messages = [
        prompts::system_prompt(&script.config),
        prompts::storyboard_prompt(topic, &narration, &script.config),
    ];
    let scenes = match ctx.chat(&messages).await? {
        Some(reply) => prompts::parse_scenes(&reply, script.config.duration_secs)
            .unwrap_or_else(|| prompts::fallback_scenes(topic, &narration, &script.config)),
        None => prompts::fallback_scenes(topic, &narration, &script.config),
    };
    Ok(ScriptPatch {
        scenes: Some(scenes),
        updated_at: Some(Utc::now()),
        ..Default::default()
    })
}

async fn voice(ctx: &StageContext, script: &Script) -> Result<ScriptPatch, PipelineError> {
    let narration = script.script_text.clone().unwrap_or_default();
    if narration.is_empty() {
        return Err(PipelineError::Invalid(
            "voice stage requires the script text to exist".into(),
        ));
    }
    let messages = [
        prompts::system_prompt(&script.config),
        prompts::voice_prompt(&narration),
    ];
    let (voice_text, onscreen_text) = match ctx.chat(&messages).await? {
        Some(reply) => prompts::parse_voice(&reply)
            .unwrap_or_else(|| prompts::fallback_voice(script.hook.as_deref(), &narration)),
        None => prompts::fallback_voice(script.hook.as_deref(), &narration),
    };
    Ok(ScriptPatch {
        voice_text: Some(voice_text),
        onscreen_text: Some(onscreen_text),
        updated_at: Some(Utc::now()),
        ..Default::default()
    })
}

async fn music(
    ctx: &StageContext,
    topic: &Topic,
    script: &Script,
) -> Result<ScriptPatch, PipelineError> {
    let messages = [
        prompts::system_prompt(&script.config),
        prompts::music_prompt(topic, &script.config),
    ];
    let pick = match ctx.chat(&messages).await? {
        Some(reply) => {
            prompts::parse_music(&reply).unwrap_or_else(|| prompts::fallback_music(&script.config))
        }
        None => prompts::fallback_music(&script.config),
    };
    Ok(ScriptPatch {
        music: Some(pick),
        updated_at: Some(Utc::now()),
        ..Default::default()
    })
}

async fn seo(
    ctx: &StageContext,
    topic: &Topic,
    script: &Script,
) -> Result<ScriptPatch, PipelineError> {
    let messages = [
        prompts::system_prompt(&script.config),
        prompts::seo_prompt(topic, &script.config),
    ];
    let block = match ctx.chat(&messages).await? {
        Some(reply) => prompts::parse_seo(&reply).unwrap_or_else(|| prompts::fallback_seo(topic)),
        None => prompts::fallback_seo(topic),
    };
    Ok(ScriptPatch {
        seo: Some(block),
        updated_at: Some(Utc::now()),
        ..Default::default()
    })
}

/// Export makes no model call: it assembles the bundle from the populated
/// stage fields.
fn export(script: &Script) -> Result<ScriptPatch, PipelineError> {
    let (Some(music), Some(seo)) = (script.music.clone(), script.seo.clone()) else {
        return Err(PipelineError::Invalid(
            "export requires every content stage output".into(),
        ));
    };
    if !script.content_complete() {
        return Err(PipelineError::Invalid(
            "export requires every content stage output".into(),
        ));
    }
    let bundle = ExportBundle {
        hook: script.hook.clone().unwrap_or_default(),
        voice_text: script.voice_text.clone().unwrap_or_default(),
        onscreen_text: script.onscreen_text.clone().unwrap_or_default(),
        scenes: script.scenes.clone().unwrap_or_default(),
        music,
        seo,
        assembled_at: Utc::now(),
    };
    Ok(ScriptPatch {
        export: Some(bundle),
        status: Some(ScriptStatus::Exported),
        updated_at: Some(Utc::now()),
        ..Default::default()
    })
}
