//! End-to-end stage/orchestrator behavior against the in-memory store and a
//! scripted model.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use clipforge_core::{
    PipelineError, ProgressHandle, Script, ScriptConfig, ScriptStatus, Topic,
};
use clipforge_generate::stages::run_single_stage;
use clipforge_generate::{Orchestrator, Stage, StageContext};
use clipforge_llm::{LanguageModel, LlmError, Message, ModelHandle};
use clipforge_store::{MemoryStore, Store};

/// Counts calls and always answers with the same text.
struct ScriptedModel {
    reply: String,
    calls: AtomicU32,
}

impl ScriptedModel {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn chat(
        &self,
        _model: &str,
        _messages: &[Message],
        _temperature: f32,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        Ok(vec![])
    }
}

async fn seed(store: &MemoryStore, title: &str) -> (Uuid, Uuid) {
    let topic = Topic::new(
        Uuid::new_v4(),
        title,
        "https://example.com/a",
        "Background reporting on the event in question.",
        vec!["events".into()],
        60.0,
        "en",
        None,
    );
    let topic_id = topic.id;
    store.create_topic(topic).await.unwrap();

    let script = Script::new(topic_id, ScriptConfig::default());
    let script_id = script.id;
    store.create_script(script).await.unwrap();
    (topic_id, script_id)
}

fn ctx_with(store: Arc<MemoryStore>, model: Option<Arc<dyn LanguageModel>>) -> StageContext {
    StageContext::new(store, ModelHandle::new(model, "test-model", 0.2))
}

#[tokio::test]
async fn orchestrator_runs_every_stage_to_exported() {
    let store = Arc::new(MemoryStore::new());
    let (_, script_id) = seed(&store, "Storm hits the coast").await;
    let model = ScriptedModel::new("A fresh look at events unfolding across the region this week.");
    let ctx = ctx_with(store.clone(), Some(model.clone() as Arc<dyn LanguageModel>));

    Orchestrator::new(ctx)
        .run(script_id, &ProgressHandle::new())
        .await
        .unwrap();

    let script = store.script(script_id).await.unwrap().unwrap();
    assert_eq!(script.status, ScriptStatus::Exported);
    assert!(script.content_complete());
    assert!(script.export.is_some());
    // hook, script, storyboard, voice, music, seo — export makes no call.
    assert_eq!(model.calls(), 6);
}

#[tokio::test]
async fn second_run_issues_no_additional_model_calls() {
    let store = Arc::new(MemoryStore::new());
    let (_, script_id) = seed(&store, "Storm hits the coast").await;
    let model = ScriptedModel::new("A fresh look at events unfolding across the region this week.");
    let ctx = ctx_with(store.clone(), Some(model.clone() as Arc<dyn LanguageModel>));
    let orchestrator = Orchestrator::new(ctx);

    orchestrator
        .run(script_id, &ProgressHandle::new())
        .await
        .unwrap();
    let after_first = model.calls();

    orchestrator
        .run(script_id, &ProgressHandle::new())
        .await
        .unwrap();
    assert_eq!(
        model.calls(),
        after_first,
        "populated stages must be skipped without touching the model"
    );
}

#[tokio::test]
async fn offline_pipeline_completes_on_templates() {
    let store = Arc::new(MemoryStore::new());
    let (_, script_id) = seed(&store, "Storm hits the coast").await;
    let ctx = ctx_with(store.clone(), None);

    Orchestrator::new(ctx)
        .run(script_id, &ProgressHandle::new())
        .await
        .unwrap();

    let script = store.script(script_id).await.unwrap().unwrap();
    assert_eq!(script.status, ScriptStatus::Exported);
    assert!(!script.hook.unwrap().is_empty());
    assert!(!script.scenes.unwrap().is_empty());
}

#[tokio::test]
async fn similar_candidate_fails_after_three_attempts_with_percent() {
    let store = Arc::new(MemoryStore::new());
    // Existing corpus script.
    let (_, existing_id) = seed(&store, "An older unrelated story").await;
    store
        .update_script(
            existing_id,
            clipforge_core::ScriptPatch {
                script_text: Some("theta iota alpha beta gamma delta".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Candidate scores 2/5 = 0.40 against the corpus on every attempt.
    let (_, script_id) = seed(&store, "A second story entirely").await;
    let model = ScriptedModel::new("alpha beta gamma delta epsilon");
    let ctx = ctx_with(store.clone(), Some(model.clone() as Arc<dyn LanguageModel>));

    let err = run_single_stage(&ctx, Stage::ScriptText, script_id, &ProgressHandle::new())
        .await
        .unwrap_err();

    match err {
        PipelineError::TooSimilar { percent } => assert_eq!(percent, 40),
        other => panic!("expected TooSimilar, got {other}"),
    }
    assert!(err.to_string().contains("40%"));
    assert_eq!(model.calls(), 3, "one initial attempt plus two retries");

    let script = store.script(script_id).await.unwrap().unwrap();
    assert!(script.script_text.is_none(), "rejected text is never persisted");
}

#[tokio::test]
async fn title_echo_is_hard_blocked_on_every_attempt() {
    let store = Arc::new(MemoryStore::new());
    let (_, script_id) = seed(&store, "Moscow court rules on the case").await;
    let model =
        ScriptedModel::new("Moscow court rules on the whole matter in a new way today.");
    let ctx = ctx_with(store.clone(), Some(model.clone() as Arc<dyn LanguageModel>));

    let err = run_single_stage(&ctx, Stage::ScriptText, script_id, &ProgressHandle::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::TooSimilar { percent: 100 }));
    assert_eq!(model.calls(), 3);

    let script = store.script(script_id).await.unwrap().unwrap();
    assert_ne!(script.status, ScriptStatus::Ready);
    assert!(script.script_text.is_none());
}

#[tokio::test]
async fn single_stage_on_populated_field_is_a_noop() {
    let store = Arc::new(MemoryStore::new());
    let (_, script_id) = seed(&store, "Storm hits the coast").await;
    store
        .update_script(
            script_id,
            clipforge_core::ScriptPatch {
                hook: Some("existing hook".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let model = ScriptedModel::new("anything");
    let ctx = ctx_with(store.clone(), Some(model.clone() as Arc<dyn LanguageModel>));
    run_single_stage(&ctx, Stage::Hook, script_id, &ProgressHandle::new())
        .await
        .unwrap();

    assert_eq!(model.calls(), 0);
    let script = store.script(script_id).await.unwrap().unwrap();
    assert_eq!(script.hook.as_deref(), Some("existing hook"));
}

#[tokio::test]
async fn missing_script_is_a_not_found_failure() {
    let store = Arc::new(MemoryStore::new());
    let ctx = ctx_with(store, None);
    let err = Orchestrator::new(ctx)
        .run(Uuid::new_v4(), &ProgressHandle::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NotFound { .. }));
}

#[tokio::test]
async fn export_without_content_is_invalid() {
    let store = Arc::new(MemoryStore::new());
    let (_, script_id) = seed(&store, "Storm hits the coast").await;
    let ctx = ctx_with(store, None);
    let err = run_single_stage(&ctx, Stage::Export, script_id, &ProgressHandle::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Invalid(_)));
}
