//! The generation half of the pipeline: one handler per stage, the
//! fixed-order resuming orchestrator, and the anti-copy validator gating the
//! script-text stage.

pub mod anticopy;
pub mod context;
pub mod orchestrator;
pub mod prompts;
pub mod stages;

use clipforge_core::Script;

pub use context::StageContext;
pub use orchestrator::Orchestrator;

/// The pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Hook,
    ScriptText,
    Storyboard,
    Voice,
    Music,
    Seo,
    Export,
}

impl Stage {
    pub const ORDER: [Stage; 7] = [
        Stage::Hook,
        Stage::ScriptText,
        Stage::Storyboard,
        Stage::Voice,
        Stage::Music,
        Stage::Seo,
        Stage::Export,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Stage::Hook => "hook",
            Stage::ScriptText => "script",
            Stage::Storyboard => "storyboard",
            Stage::Voice => "voice",
            Stage::Music => "music",
            Stage::Seo => "seo",
            Stage::Export => "export",
        }
    }

    /// Whether this stage's output field is already present — the marker
    /// that lets a re-run resume instead of redo.
    pub fn is_populated(self, script: &Script) -> bool {
        match self {
            Stage::Hook => script.hook.is_some(),
            Stage::ScriptText => script.script_text.is_some(),
            Stage::Storyboard => script.scenes.is_some(),
            Stage::Voice => script.voice_text.is_some() && script.onscreen_text.is_some(),
            Stage::Music => script.music.is_some(),
            Stage::Seo => script.seo.is_some(),
            Stage::Export => script.export.is_some(),
        }
    }
}
