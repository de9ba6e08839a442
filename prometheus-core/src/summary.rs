//! Context summarization.
//!
//! Renders the resolved part of a story into a short, human-readable block.
//! The same text conditions the next generation request and is shown to the
//! reader as "Story so far".

use crate::story::{Action, Scene, Turn};

/// Characters of each past scene kept in the story recap.
pub const SCENE_EXCERPT_CHARS: usize = 150;

/// Characters of each past scene kept in image prompts.
pub const IMAGE_EXCERPT_CHARS: usize = 100;

/// First `max_chars` characters of `text` on a single line, with `...`
/// appended when cut. Runs of whitespace, paragraph breaks included,
/// collapse to one space.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let cut = text.char_indices().nth(max_chars).map(|(i, _)| i);
    match cut {
        Some(cut) => format!("{}...", text[..cut].trim_end()),
        None => text,
    }
}

/// Summarize parallel scene and action histories.
///
/// - both present: one `Scene n:` / `Your choice:` pair per scene
/// - actions only: a numbered list of the actions
/// - neither: empty string
pub fn summarize(scenes: &[&Scene], actions: &[&Action]) -> String {
    if !scenes.is_empty() && !actions.is_empty() {
        scenes
            .iter()
            .enumerate()
            .map(|(i, scene)| {
                let choice = actions.get(i).map(|a| a.text.as_str()).unwrap_or("None");
                format!(
                    "Scene {}: {}\nYour choice: {choice}",
                    i + 1,
                    excerpt(&scene.narrative, SCENE_EXCERPT_CHARS)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    } else if !actions.is_empty() {
        format!("Your previous choices:\n{}", numbered_actions(actions))
    } else {
        String::new()
    }
}

/// [`summarize`] over a turn list.
pub fn summarize_turns(turns: &[Turn]) -> String {
    let scenes: Vec<&Scene> = turns.iter().map(|t| &t.scene).collect();
    let actions: Vec<&Action> = turns.iter().map(|t| &t.action).collect();
    summarize(&scenes, &actions)
}

/// `1. text` lines, one per action.
pub fn numbered_actions(actions: &[&Action]) -> String {
    actions
        .iter()
        .enumerate()
        .map(|(i, a)| format!("{}. {}", i + 1, a.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Shorter timeline used when composing image prompts.
pub fn image_timeline(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| {
            format!(
                "Scene: {}\nChoice: {}",
                excerpt(&t.scene.narrative, IMAGE_EXCERPT_CHARS),
                t.action.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
