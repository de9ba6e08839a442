//! Story data model: actions, scenes, turns and the progress aggregate.

use crate::levels::Stage;
use crate::summary;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneId(pub Uuid);

impl SceneId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SceneId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(pub Uuid);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Consequence note attached to actions the reader writes themselves.
pub const CUSTOM_CONSEQUENCE: &str = "Your choice will shape the future in ways yet unknown...";

/// Where an action came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOrigin {
    /// One of the three actions offered by a scene.
    Offered,
    /// Free text written by the reader.
    Custom,
}

/// An action the reader can take (or took) in response to a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub id: ActionId,
    pub text: String,
    pub consequence_note: String,
    pub origin: ActionOrigin,
}

impl Action {
    /// An offered action. Surrounding whitespace is trimmed.
    pub fn offered(text: impl AsRef<str>) -> Self {
        Self {
            id: ActionId::new(),
            text: text.as_ref().trim().to_string(),
            consequence_note: String::new(),
            origin: ActionOrigin::Offered,
        }
    }

    /// A reader-authored action, or `None` if the text is blank.
    pub fn custom(text: impl AsRef<str>) -> Option<Self> {
        let text = text.as_ref().trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            id: ActionId::new(),
            text: text.to_string(),
            consequence_note: CUSTOM_CONSEQUENCE.to_string(),
            origin: ActionOrigin::Custom,
        })
    }

    pub fn is_custom(&self) -> bool {
        self.origin == ActionOrigin::Custom
    }
}

// ============================================================================
// Scenes
// ============================================================================

/// A generated scene: narrative plus exactly three offered actions.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub id: SceneId,
    pub stage: &'static Stage,
    pub narrative: String,
    /// "Story so far" recap, present when at least one action preceded this scene.
    pub previous_summary: Option<String>,
    pub actions: [Action; 3],
}

impl Scene {
    pub fn new(
        stage: &'static Stage,
        narrative: impl Into<String>,
        actions: [Action; 3],
        previous_summary: Option<String>,
    ) -> Self {
        Self {
            id: SceneId::new(),
            stage,
            narrative: narrative.into(),
            previous_summary,
            actions,
        }
    }

    /// The offered action at a one-based position, as shown to the reader.
    pub fn choice(&self, number: usize) -> Option<&Action> {
        number
            .checked_sub(1)
            .and_then(|i| self.actions.get(i))
    }
}

/// A resolved scene together with the action taken on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub scene: Scene,
    pub action: Action,
}

/// Locator of a generated image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef(pub String);

impl ImageRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Epilogue
// ============================================================================

/// How the closing text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpilogueSource {
    /// Generated after the final stage, as planned.
    Generated,
    /// Generated early because the next scene could not be produced.
    Recovered,
    /// Fixed text used when epilogue generation itself failed.
    Fallback,
}

/// The story's closing text.
#[derive(Debug, Clone, PartialEq)]
pub struct Epilogue {
    pub text: String,
    pub source: EpilogueSource,
    pub image: Option<ImageRef>,
}

// ============================================================================
// Progress
// ============================================================================

/// What the reader is currently looking at.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    AwaitingChoice {
        scene: Scene,
        image: Option<ImageRef>,
    },
    Complete(Epilogue),
}

/// The mutable state of one story session.
///
/// Scene and action history are both projections of `turns`, so they can
/// never disagree in length.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    current_stage: &'static Stage,
    phase: Phase,
    turns: Vec<Turn>,
}

impl Progress {
    pub(crate) fn new(stage: &'static Stage, scene: Scene, image: Option<ImageRef>) -> Self {
        Self {
            current_stage: stage,
            phase: Phase::AwaitingChoice { scene, image },
            turns: Vec::new(),
        }
    }

    pub fn current_stage(&self) -> &'static Stage {
        self.current_stage
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// The scene awaiting a choice, or `None` once the story is complete.
    pub fn current_scene(&self) -> Option<&Scene> {
        match &self.phase {
            Phase::AwaitingChoice { scene, .. } => Some(scene),
            Phase::Complete(_) => None,
        }
    }

    /// Image for whatever is currently shown (scene or epilogue).
    pub fn current_image(&self) -> Option<&ImageRef> {
        match &self.phase {
            Phase::AwaitingChoice { image, .. } => image.as_ref(),
            Phase::Complete(epilogue) => epilogue.image.as_ref(),
        }
    }

    pub fn epilogue(&self) -> Option<&Epilogue> {
        match &self.phase {
            Phase::Complete(epilogue) => Some(epilogue),
            Phase::AwaitingChoice { .. } => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.phase, Phase::Complete(_))
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn action_history(&self) -> Vec<&Action> {
        self.turns.iter().map(|t| &t.action).collect()
    }

    pub fn scene_history(&self) -> Vec<&Scene> {
        self.turns.iter().map(|t| &t.scene).collect()
    }

    /// Human-readable recap of every resolved turn.
    pub fn story_so_far(&self) -> String {
        summary::summarize_turns(&self.turns)
    }

    /// Close out the current scene with the reader's action.
    ///
    /// Returns `false` (and records nothing) when the story is already complete.
    pub(crate) fn record_turn(&mut self, action: Action) -> bool {
        let Phase::AwaitingChoice { scene, .. } = &self.phase else {
            return false;
        };
        self.turns.push(Turn {
            scene: scene.clone(),
            action,
        });
        true
    }

    /// Move to `stage`, which must directly follow the current one.
    pub(crate) fn enter(&mut self, stage: &'static Stage, scene: Scene, image: Option<ImageRef>) {
        debug_assert_eq!(
            stage.index(),
            self.current_stage.index() + 1,
            "stages must advance one at a time"
        );
        self.current_stage = stage;
        self.phase = Phase::AwaitingChoice { scene, image };
    }

    pub(crate) fn conclude(&mut self, epilogue: Epilogue) {
        self.phase = Phase::Complete(epilogue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::{first, STAGES};

    fn scene_at(stage: &'static Stage, narrative: &str) -> Scene {
        Scene::new(
            stage,
            narrative,
            [Action::offered("a"), Action::offered("b"), Action::offered("c")],
            None,
        )
    }

    #[test]
    fn test_custom_action_trims_and_rejects_blank() {
        let action = Action::custom("  pull the plug  ").unwrap();
        assert_eq!(action.text, "pull the plug");
        assert_eq!(action.consequence_note, CUSTOM_CONSEQUENCE);
        assert!(action.is_custom());

        assert!(Action::custom("   ").is_none());
        assert!(!Action::offered("x").is_custom());
    }

    #[test]
    fn test_choice_is_one_based() {
        let scene = scene_at(first(), "n");
        assert_eq!(scene.choice(1).map(|a| a.text.as_str()), Some("a"));
        assert_eq!(scene.choice(3).map(|a| a.text.as_str()), Some("c"));
        assert!(scene.choice(0).is_none());
        assert!(scene.choice(4).is_none());
    }

    #[test]
    fn test_record_turn_keeps_histories_aligned() {
        let mut progress = Progress::new(first(), scene_at(first(), "opening"), None);
        assert!(progress.turns().is_empty());

        assert!(progress.record_turn(Action::offered("a")));
        progress.enter(&STAGES[1], scene_at(&STAGES[1], "second"), None);

        assert_eq!(progress.action_history().len(), 1);
        assert_eq!(progress.scene_history().len(), 1);
        assert_eq!(progress.scene_history()[0].narrative, "opening");
        assert_eq!(progress.current_stage().id, "destruction");
    }

    #[test]
    fn test_complete_rejects_further_turns() {
        let mut progress = Progress::new(first(), scene_at(first(), "opening"), None);
        progress.record_turn(Action::offered("a"));
        progress.conclude(Epilogue {
            text: "The end.".to_string(),
            source: EpilogueSource::Generated,
            image: Some(ImageRef("https://img/end.png".to_string())),
        });

        assert!(progress.is_complete());
        assert!(progress.current_scene().is_none());
        assert_eq!(progress.current_image().map(ImageRef::as_str), Some("https://img/end.png"));
        assert!(!progress.record_turn(Action::offered("b")));
        assert_eq!(progress.turns().len(), 1);
    }
}
