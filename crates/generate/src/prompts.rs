//! Prompt builders and their deterministic template fallbacks.
//!
//! Every content stage must stay operable without a configured model, so
//! each builder here is paired with a pure fallback that produces non-empty,
//! deterministic output from the topic alone.

use clipforge_core::{MusicPick, Scene, ScriptConfig, SeoBlock, Topic};
use clipforge_llm::Message;
use serde::Deserialize;

/// (style keyword, track, mood) — the offline music catalogue.
const MUSIC_LIBRARY: &[(&str, &str, &str)] = &[
    ("dramatic", "iron-resolve", "tense"),
    ("informative", "paper-lanterns", "neutral"),
    ("upbeat", "citrus-drive", "energetic"),
    ("calm", "aurora-dawn", "calm"),
];

pub fn system_prompt(config: &ScriptConfig) -> Message {
    Message::system(format!(
        "You write {} short-video scripts for {} in {}. Target length {} seconds. \
         Reply with only what is asked for, no preamble.",
        config.style, config.platform, config.language, config.duration_secs
    ))
}

// ── Hook ─────────────────────────────────────────────────────────────

pub fn hook_prompt(topic: &Topic, grounding: Option<&str>) -> Message {
    let mut prompt = format!(
        "Write one attention-grabbing opening line (under 15 words) for a video \
         about: {}",
        topic.title
    );
    if let Some(block) = grounding {
        prompt.push_str("\n\n");
        prompt.push_str(block);
    }
    Message::user(prompt)
}

pub fn fallback_hook(topic: &Topic) -> String {
    format!("Here is what nobody tells you about {}.", topic.title.trim())
}

// ── Script text ──────────────────────────────────────────────────────

pub fn script_prompt(topic: &Topic, grounding: Option<&str>, attempt: u32) -> Message {
    let mut prompt = format!(
        "Write the narration script for a short video about: {}\n\
         Plain sentences, no scene directions, no headings.",
        topic.title
    );
    if let Some(block) = grounding {
        prompt.push_str("\n\n");
        prompt.push_str(block);
    }
    if attempt > 1 {
        prompt.push_str(
            "\n\nYour previous draft was too close to existing material. \
             Rewrite it in your own words with a different opening.",
        );
    }
    Message::user(prompt)
}

pub fn fallback_script(topic: &Topic) -> String {
    let detail = topic
        .insights
        .as_deref()
        .map(|i| i.replace("- ", ""))
        .unwrap_or_else(|| topic.raw_text.clone());
    format!(
        "Today we look at a story worth your next minute: {}. {} \
         That is the picture so far, and it is moving fast. Follow for the \
         next development.",
        topic.title.trim(),
        detail.trim()
    )
}

// ── Storyboard ───────────────────────────────────────────────────────

pub fn storyboard_prompt(topic: &Topic, script_text: &str, config: &ScriptConfig) -> Message {
    Message::user(format!(
        "Break this narration into 3-5 scenes for a {}-second video about \
         \"{}\". Reply with a JSON array of objects with keys \"visual\", \
         \"caption\" and \"duration_secs\".\n\nNarration:\n{}",
        config.duration_secs, topic.title, script_text
    ))
}

#[derive(Deserialize)]
struct SceneSpec {
    visual: String,
    caption: String,
    #[serde(default)]
    duration_secs: Option<u32>,
}

/// Tolerant scene parsing: accepts a bare JSON array, or one wrapped in a
/// code fence. Returns `None` when the reply is not usable.
pub fn parse_scenes(reply: &str, total_duration: u32) -> Option<Vec<Scene>> {
    let body = strip_code_fence(reply);
    let specs: Vec<SceneSpec> = serde_json::from_str(body.trim()).ok()?;
    if specs.is_empty() {
        return None;
    }
    let per_scene = (total_duration / specs.len() as u32).max(1);
    Some(
        specs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| Scene {
                index: i as u32,
                visual: spec.visual,
                caption: spec.caption,
                duration_secs: spec.duration_secs.unwrap_or(per_scene),
            })
            .collect(),
    )
}

pub fn fallback_scenes(topic: &Topic, script_text: &str, config: &ScriptConfig) -> Vec<Scene> {
    let sentences = split_sentences(script_text);
    let chunks: Vec<&str> = if sentences.is_empty() {
        vec![topic.title.as_str()]
    } else {
        sentences.iter().take(5).map(String::as_str).collect()
    };
    let per_scene = (config.duration_secs / chunks.len() as u32).max(1);
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, caption)| Scene {
            index: i as u32,
            visual: if i == 0 {
                format!("Title card: {}", topic.title)
            } else {
                format!("B-roll related to: {}", topic.title)
            },
            caption: caption.to_string(),
            duration_secs: per_scene,
        })
        .collect()
}

// ── Voice + on-screen text ───────────────────────────────────────────

pub fn voice_prompt(script_text: &str) -> Message {
    Message::user(format!(
        "Adapt this narration for text-to-speech and overlay captions. Reply \
         with a line 'VOICE:' followed by the spoken text, then a line \
         'ONSCREEN:' followed by 2-3 short caption lines.\n\n{}",
        script_text
    ))
}

/// Split a `VOICE:`/`ONSCREEN:` reply. `None` when either section is missing
/// or empty.
pub fn parse_voice(reply: &str) -> Option<(String, String)> {
    let voice_at = reply.find("VOICE:")?;
    let onscreen_at = reply.find("ONSCREEN:")?;
    if onscreen_at < voice_at {
        return None;
    }
    let voice = reply[voice_at + "VOICE:".len()..onscreen_at].trim();
    let onscreen = reply[onscreen_at + "ONSCREEN:".len()..].trim();
    if voice.is_empty() || onscreen.is_empty() {
        return None;
    }
    Some((voice.to_string(), onscreen.to_string()))
}

pub fn fallback_voice(hook: Option<&str>, script_text: &str) -> (String, String) {
    let voice = match hook {
        Some(hook) => format!("{} {}", hook.trim(), script_text.trim()),
        None => script_text.trim().to_string(),
    };
    let onscreen = split_sentences(script_text)
        .into_iter()
        .take(2)
        .collect::<Vec<_>>()
        .join("\n");
    let onscreen = if onscreen.is_empty() {
        voice.chars().take(80).collect()
    } else {
        onscreen
    };
    (voice, onscreen)
}

// ── Music ────────────────────────────────────────────────────────────

pub fn music_prompt(topic: &Topic, config: &ScriptConfig) -> Message {
    let catalogue: Vec<String> = MUSIC_LIBRARY
        .iter()
        .map(|(_, track, mood)| format!("{track} ({mood})"))
        .collect();
    Message::user(format!(
        "Pick one backing track for a {} video about \"{}\". Catalogue:\n{}\n\
         Reply with 'track | mood' only.",
        config.style,
        topic.title,
        catalogue.join("\n")
    ))
}

pub fn parse_music(reply: &str) -> Option<MusicPick> {
    let (track, mood) = reply.lines().next()?.split_once('|')?;
    let pick = MusicPick {
        track: track.trim().to_string(),
        mood: mood.trim().to_string(),
    };
    if pick.track.is_empty() || pick.mood.is_empty() {
        return None;
    }
    Some(pick)
}

pub fn fallback_music(config: &ScriptConfig) -> MusicPick {
    let (_, track, mood) = MUSIC_LIBRARY
        .iter()
        .find(|(style, _, _)| config.style.contains(style))
        .unwrap_or(&MUSIC_LIBRARY[1]);
    MusicPick {
        track: (*track).to_string(),
        mood: (*mood).to_string(),
    }
}

// ── SEO ──────────────────────────────────────────────────────────────

pub fn seo_prompt(topic: &Topic, config: &ScriptConfig) -> Message {
    Message::user(format!(
        "Write platform metadata for a {} video about \"{}\". Reply with \
         three lines: 'TITLE: …', 'DESCRIPTION: …' and 'HASHTAGS: …' \
         (space-separated, each starting with #).",
        config.platform, topic.title
    ))
}

pub fn parse_seo(reply: &str) -> Option<SeoBlock> {
    let mut title = None;
    let mut description = None;
    let mut hashtags = Vec::new();
    for line in reply.lines() {
        if let Some(rest) = line.strip_prefix("TITLE:") {
            title = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("DESCRIPTION:") {
            description = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("HASHTAGS:") {
            hashtags = rest
                .split_whitespace()
                .filter(|t| t.starts_with('#'))
                .map(String::from)
                .collect();
        }
    }
    match (title, description) {
        (Some(title), Some(description)) if !title.is_empty() => Some(SeoBlock {
            title,
            description,
            hashtags,
        }),
        _ => None,
    }
}

pub fn fallback_seo(topic: &Topic) -> SeoBlock {
    let description = if topic.raw_text.is_empty() {
        topic.title.clone()
    } else {
        topic.raw_text.chars().take(160).collect()
    };
    let hashtags = topic
        .tags
        .iter()
        .take(5)
        .map(|t| format!("#{}", t.replace(' ', "")))
        .collect();
    SeoBlock {
        title: topic.title.chars().take(80).collect(),
        description,
        hashtags,
    }
}

// ── Shared helpers ───────────────────────────────────────────────────

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    rest.trim_end_matches('`').trim()
}

fn split_sentences(text: &str) -> Vec<String> {
    text.split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn topic() -> Topic {
        Topic::new(
            Uuid::new_v4(),
            "Storm hits the coast",
            "https://example.com/storm",
            "A powerful storm made landfall overnight.",
            vec!["storm".into(), "coast".into()],
            60.0,
            "en",
            None,
        )
    }

    #[test]
    fn fallbacks_are_deterministic_and_non_empty() {
        let t = topic();
        let config = ScriptConfig::default();
        assert_eq!(fallback_hook(&t), fallback_hook(&t));
        assert!(!fallback_hook(&t).is_empty());
        assert!(!fallback_script(&t).is_empty());
        assert!(!fallback_scenes(&t, &fallback_script(&t), &config).is_empty());
        let (voice, onscreen) = fallback_voice(None, &fallback_script(&t));
        assert!(!voice.is_empty() && !onscreen.is_empty());
        assert!(!fallback_music(&config).track.is_empty());
        assert!(!fallback_seo(&t).title.is_empty());
    }

    #[test]
    fn fallback_hook_does_not_lead_with_the_title() {
        // The anti-copy hard block compares leading words against seed
        // titles; the template must never start with them.
        let t = topic();
        assert!(!fallback_hook(&t).starts_with("Storm"));
        assert!(!fallback_script(&t).starts_with("Storm"));
    }

    #[test]
    fn parse_scenes_accepts_fenced_json() {
        let reply = "```json\n[{\"visual\":\"waves\",\"caption\":\"landfall\"}]\n```";
        let scenes = parse_scenes(reply, 60).unwrap();
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].visual, "waves");
        assert_eq!(scenes[0].duration_secs, 60);
    }

    #[test]
    fn parse_scenes_rejects_garbage() {
        assert!(parse_scenes("not json at all", 60).is_none());
        assert!(parse_scenes("[]", 60).is_none());
    }

    #[test]
    fn parse_voice_requires_both_sections() {
        let (voice, onscreen) =
            parse_voice("VOICE: hello there\nONSCREEN: HELLO\nTHERE").unwrap();
        assert_eq!(voice, "hello there");
        assert!(onscreen.contains("HELLO"));
        assert!(parse_voice("VOICE: only voice").is_none());
    }

    #[test]
    fn parse_music_splits_track_and_mood() {
        let pick = parse_music("citrus-drive | energetic").unwrap();
        assert_eq!(pick.track, "citrus-drive");
        assert_eq!(pick.mood, "energetic");
        assert!(parse_music("no separator").is_none());
    }

    #[test]
    fn parse_seo_collects_hashtags() {
        let reply = "TITLE: Storm!\nDESCRIPTION: What happened.\nHASHTAGS: #storm #coast";
        let seo = parse_seo(reply).unwrap();
        assert_eq!(seo.hashtags, vec!["#storm", "#coast"]);
        assert!(parse_seo("TITLE: only a title").is_none());
    }

    #[test]
    fn fallback_seo_builds_hashtags_from_tags() {
        let seo = fallback_seo(&topic());
        assert!(seo.hashtags.contains(&"#storm".to_string()));
    }

    #[test]
    fn fallback_music_matches_style() {
        let config = ScriptConfig {
            style: "dramatic".into(),
            ..Default::default()
        };
        assert_eq!(fallback_music(&config).track, "iron-resolve");
    }
}
