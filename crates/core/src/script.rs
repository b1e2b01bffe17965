use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStatus {
    Draft,
    Generating,
    Ready,
    Error,
    Exported,
}

/// Generation parameters chosen when the topic is selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    pub style: String,
    pub duration_secs: u32,
    pub language: String,
    pub platform: String,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            style: "informative".into(),
            duration_secs: 60,
            language: "en".into(),
            platform: "shorts".into(),
        }
    }
}

/// One storyboard scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub index: u32,
    pub visual: String,
    pub caption: String,
    pub duration_secs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicPick {
    pub track: String,
    pub mood: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeoBlock {
    pub title: String,
    pub description: String,
    pub hashtags: Vec<String>,
}

/// The assembled deliverable produced by the export stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportBundle {
    pub hook: String,
    pub voice_text: String,
    pub onscreen_text: String,
    pub scenes: Vec<Scene>,
    pub music: MusicPick,
    pub seo: SeoBlock,
    pub assembled_at: DateTime<Utc>,
}

// ── Script ───────────────────────────────────────────────────────────

/// The multi-stage generation artifact owned by one selected topic.
///
/// Each stage handler writes only the field(s) it owns; a populated field is
/// both the stage's result and its "already done" marker, which is what makes
/// re-running the orchestrator a resume instead of a redo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub config: ScriptConfig,
    pub hook: Option<String>,
    /// Main narration text — the anti-copy gated stage output.
    pub script_text: Option<String>,
    pub scenes: Option<Vec<Scene>>,
    /// TTS-ready narration, derived from `script_text`.
    pub voice_text: Option<String>,
    /// Caption overlay lines shown on screen.
    pub onscreen_text: Option<String>,
    pub music: Option<MusicPick>,
    pub seo: Option<SeoBlock>,
    pub export: Option<ExportBundle>,
    pub status: ScriptStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Script {
    pub fn new(topic_id: Uuid, config: ScriptConfig) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            topic_id,
            config,
            hook: None,
            script_text: None,
            scenes: None,
            voice_text: None,
            onscreen_text: None,
            music: None,
            seo: None,
            export: None,
            status: ScriptStatus::Draft,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether every content stage has produced its output.
    pub fn content_complete(&self) -> bool {
        self.hook.is_some()
            && self.script_text.is_some()
            && self.scenes.is_some()
            && self.voice_text.is_some()
            && self.onscreen_text.is_some()
            && self.music.is_some()
            && self.seo.is_some()
    }
}

/// Partial-field merge for [`Script`]. A stage handler returns a patch
/// containing only the fields that stage owns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptPatch {
    pub hook: Option<String>,
    pub script_text: Option<String>,
    pub scenes: Option<Vec<Scene>>,
    pub voice_text: Option<String>,
    pub onscreen_text: Option<String>,
    pub music: Option<MusicPick>,
    pub seo: Option<SeoBlock>,
    pub export: Option<ExportBundle>,
    pub status: Option<ScriptStatus>,
    pub error: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ScriptPatch {
    pub fn status(status: ScriptStatus) -> Self {
        Self {
            status: Some(status),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn apply(self, script: &mut Script) {
        if let Some(hook) = self.hook {
            script.hook = Some(hook);
        }
        if let Some(text) = self.script_text {
            script.script_text = Some(text);
        }
        if let Some(scenes) = self.scenes {
            script.scenes = Some(scenes);
        }
        if let Some(text) = self.voice_text {
            script.voice_text = Some(text);
        }
        if let Some(text) = self.onscreen_text {
            script.onscreen_text = Some(text);
        }
        if let Some(music) = self.music {
            script.music = Some(music);
        }
        if let Some(seo) = self.seo {
            script.seo = Some(seo);
        }
        if let Some(export) = self.export {
            script.export = Some(export);
        }
        if let Some(status) = self.status {
            script.status = status;
        }
        if let Some(error) = self.error {
            script.error = error;
        }
        if let Some(at) = self.updated_at {
            script.updated_at = at;
        }
    }
}
