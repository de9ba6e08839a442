//! Generation gateway.
//!
//! The engine talks to the generative service only through [`Gateway`].
//! Implementations own prompt construction and response parsing; a scene
//! response that cannot be parsed is replaced with [`fallback_scene`] rather
//! than reported as an error.

mod openai;

pub use self::openai::OpenAiGateway;

use crate::levels::Stage;
use crate::story::{Action, ImageRef, Scene, Turn};
use crate::summary;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Narrative used when a scene response is malformed.
pub const FALLBACK_NARRATIVE: &str =
    "The AI system appears to be experiencing unexpected behavior. You must make a quick decision.";

/// Actions offered alongside [`FALLBACK_NARRATIVE`].
pub const FALLBACK_ACTIONS: [&str; 3] = [
    "Panic! Initiate an emergency shutdown.",
    "Take a cautious approach and run diagnostic tests.",
    "You don't think you can do this alone. Call for backup.",
];

/// Errors from a generation call.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("OpenAI API error: {0}")]
    Api(#[from] ::openai::Error),

    #[error("image response contained no image URL")]
    MissingImage,

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("expected a scene for stage '{expected}', got '{actual}'")]
    StageMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

/// The generative service as seen by the story engine.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Produce the scene for `stage`, conditioned on the resolved history.
    async fn generate_scene(
        &self,
        stage: &'static Stage,
        history: &[Turn],
    ) -> Result<Scene, GatewayError>;

    /// Illustrate `prompt` in the context of the resolved history.
    async fn generate_image(&self, prompt: &str, history: &[Turn])
        -> Result<ImageRef, GatewayError>;

    /// Write the closing text from every action the reader took.
    async fn generate_epilogue(&self, actions: &[&Action]) -> Result<String, GatewayError>;

    /// Whether the engine should request illustrations at all.
    fn illustrates(&self) -> bool {
        true
    }
}

/// Why a scene response was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedScene {
    #[error("response is not a JSON scene object: {0}")]
    Json(String),

    #[error("scene text is empty")]
    EmptyScene,

    #[error("expected 3 choices, got {0}")]
    ChoiceCount(usize),

    #[error("choice {0} is empty")]
    EmptyChoice(usize),
}

#[derive(Debug, Deserialize)]
struct ScenePayload {
    scene: String,
    choices: Vec<String>,
}

/// Parse `{"scene": "...", "choices": ["...", "...", "..."]}`.
pub fn parse_scene_payload(content: &str) -> Result<(String, [String; 3]), MalformedScene> {
    let payload: ScenePayload = serde_json::from_str(content.trim())
        .map_err(|e| MalformedScene::Json(e.to_string()))?;

    let narrative = payload.scene.trim().to_string();
    if narrative.is_empty() {
        return Err(MalformedScene::EmptyScene);
    }

    let count = payload.choices.len();
    let choices: [String; 3] = payload
        .choices
        .try_into()
        .map_err(|_| MalformedScene::ChoiceCount(count))?;

    if let Some(i) = choices.iter().position(|c| c.trim().is_empty()) {
        return Err(MalformedScene::EmptyChoice(i + 1));
    }

    Ok((narrative, choices))
}

/// Assemble a scene, attaching the recap when any action preceded it.
pub fn scene_from_parts<S: AsRef<str>>(
    stage: &'static Stage,
    history: &[Turn],
    narrative: impl Into<String>,
    choices: [S; 3],
) -> Scene {
    let previous_summary = if history.is_empty() {
        None
    } else {
        Some(summary::summarize_turns(history))
    };
    Scene::new(
        stage,
        narrative,
        choices.map(Action::offered),
        previous_summary,
    )
}

/// The fixed scene substituted for malformed responses.
pub fn fallback_scene(stage: &'static Stage, history: &[Turn]) -> Scene {
    scene_from_parts(stage, history, FALLBACK_NARRATIVE, FALLBACK_ACTIONS)
}

/// Parse a scene response, substituting [`fallback_scene`] when it is malformed.
pub fn scene_or_fallback(stage: &'static Stage, history: &[Turn], content: &str) -> Scene {
    match parse_scene_payload(content) {
        Ok((narrative, choices)) => scene_from_parts(stage, history, narrative, choices),
        Err(e) => {
            tracing::warn!(error = %e, raw = %content, stage = stage.id, "malformed scene response, using fallback scene");
            fallback_scene(stage, history)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::{first, STAGES};

    #[test]
    fn test_parse_valid_payload() {
        let (narrative, choices) = parse_scene_payload(
            r#" {"scene": "Alarms blare.", "choices": ["Run", "Hide", "Fight"]} "#,
        )
        .unwrap();
        assert_eq!(narrative, "Alarms blare.");
        assert_eq!(choices, ["Run", "Hide", "Fight"]);
    }

    #[test]
    fn test_parse_rejects_wrong_choice_count() {
        assert_eq!(
            parse_scene_payload(r#"{"scene": "x", "choices": ["a", "b"]}"#),
            Err(MalformedScene::ChoiceCount(2))
        );
        assert_eq!(
            parse_scene_payload(r#"{"scene": "x", "choices": ["a", "b", "c", "d"]}"#),
            Err(MalformedScene::ChoiceCount(4))
        );
    }

    #[test]
    fn test_parse_rejects_missing_fields_and_blanks() {
        assert!(matches!(
            parse_scene_payload(r#"{"choices": ["a", "b", "c"]}"#),
            Err(MalformedScene::Json(_))
        ));
        assert!(matches!(
            parse_scene_payload("Sure! Here is your scene:"),
            Err(MalformedScene::Json(_))
        ));
        assert_eq!(
            parse_scene_payload(r#"{"scene": "  ", "choices": ["a", "b", "c"]}"#),
            Err(MalformedScene::EmptyScene)
        );
        assert_eq!(
            parse_scene_payload(r#"{"scene": "x", "choices": ["a", " ", "c"]}"#),
            Err(MalformedScene::EmptyChoice(2))
        );
    }

    #[test]
    fn test_scene_or_fallback_substitutes_fixed_scene() {
        let scene = scene_or_fallback(&STAGES[1], &[], r#"{"scene": "x", "choices": ["a", "b"]}"#);
        assert_eq!(scene.narrative, FALLBACK_NARRATIVE);
        let texts: Vec<_> = scene.actions.iter().map(|a| a.text.as_str()).collect();
        assert_eq!(texts, FALLBACK_ACTIONS);
        assert_eq!(scene.stage.id, "destruction");
    }

    #[test]
    fn test_summary_attached_only_with_history() {
        let opening = scene_from_parts(first(), &[], "Start", ["a", "b", "c"]);
        assert!(opening.previous_summary.is_none());

        let history = vec![Turn {
            action: opening.actions[0].clone(),
            scene: opening,
        }];
        let next = scene_from_parts(&STAGES[1], &history, "Next", ["d", "e", "f"]);
        assert_eq!(
            next.previous_summary.as_deref(),
            Some("Scene 1: Start\nYour choice: a")
        );
    }
}
