//! Story progression state machine.
//!
//! `StoryEngine` owns one [`Progress`] and moves it through the catalog:
//! `Initializing -> AwaitingChoice(stage 0..3) -> Complete`. Once a story has
//! started, every failure degrades toward an ending; only [`StoryEngine::start`]
//! can fail outright.

use crate::gateway::{Gateway, GatewayError};
use crate::levels::{self, Stage};
use crate::story::{Action, Epilogue, EpilogueSource, ImageRef, Progress, Scene, Turn};
use thiserror::Error;

/// Closing text used when the epilogue itself cannot be generated.
pub const FALLBACK_EPILOGUE: &str = include_str!("gateway/prompts/fallback_epilogue.txt");

/// Characters of the epilogue used to key the closing image.
const CLOSING_IMAGE_CHARS: usize = 200;

/// Errors from the story engine.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("Failed to initialize story: {0}")]
    Initialization(#[source] GatewayError),

    #[error("The story has not been started")]
    NotStarted,

    #[error("The story is already complete")]
    SessionComplete,
}

impl StoryError {
    /// Whether calling [`StoryEngine::start`] again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoryError::Initialization(_))
    }
}

/// Outcome of a successful [`StoryEngine::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The story moved on to the next stage.
    Continued(&'static Stage),
    /// The story ended; the source says how the epilogue was obtained.
    Concluded(EpilogueSource),
}

/// Ways of producing an epilogue, tried in order until one yields text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EpilogueStrategy {
    Generate,
    FixedText,
}

const EPILOGUE_CHAIN: [EpilogueStrategy; 2] =
    [EpilogueStrategy::Generate, EpilogueStrategy::FixedText];

impl EpilogueStrategy {
    async fn attempt<G: Gateway>(
        self,
        gateway: &G,
        actions: &[&Action],
        source: EpilogueSource,
    ) -> Option<Epilogue> {
        match self {
            EpilogueStrategy::Generate => match gateway.generate_epilogue(actions).await {
                Ok(text) => Some(Epilogue {
                    text,
                    source,
                    image: None,
                }),
                Err(e) => {
                    tracing::warn!(error = %e, "epilogue generation failed");
                    None
                }
            },
            EpilogueStrategy::FixedText => {
                tracing::error!("using fixed epilogue text");
                Some(fixed_epilogue())
            }
        }
    }
}

fn fixed_epilogue() -> Epilogue {
    Epilogue {
        text: FALLBACK_EPILOGUE.trim().to_string(),
        source: EpilogueSource::Fallback,
        image: None,
    }
}

/// Run the epilogue chain over the resolved history. Never fails.
async fn conclude<G: Gateway>(gateway: &G, turns: &[Turn], source: EpilogueSource) -> Epilogue {
    let actions: Vec<&Action> = turns.iter().map(|t| &t.action).collect();
    for strategy in EPILOGUE_CHAIN {
        if let Some(epilogue) = strategy.attempt(gateway, &actions, source).await {
            return epilogue;
        }
    }
    // EPILOGUE_CHAIN ends with FixedText
    fixed_epilogue()
}

/// Generate the scene for `stage` and, if enabled, its illustration.
async fn illustrated_scene<G: Gateway>(
    gateway: &G,
    stage: &'static Stage,
    history: &[Turn],
) -> Result<(Scene, Option<ImageRef>), GatewayError> {
    let scene = gateway.generate_scene(stage, history).await?;
    if scene.stage.id != stage.id {
        return Err(GatewayError::StageMismatch {
            expected: stage.id,
            actual: scene.stage.id,
        });
    }
    let image = if gateway.illustrates() {
        Some(gateway.generate_image(&scene.narrative, history).await?)
    } else {
        None
    };
    Ok((scene, image))
}

/// The story engine.
pub struct StoryEngine<G> {
    gateway: G,
    progress: Option<Progress>,
}

impl<G: Gateway> StoryEngine<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            progress: None,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Current session state, `None` until [`start`](Self::start) succeeds.
    pub fn progress(&self) -> Option<&Progress> {
        self.progress.as_ref()
    }

    pub fn current_stage(&self) -> Option<&'static Stage> {
        self.progress.as_ref().map(Progress::current_stage)
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.progress.as_ref().and_then(Progress::current_scene)
    }

    pub fn is_complete(&self) -> bool {
        self.progress.as_ref().is_some_and(Progress::is_complete)
    }

    /// Recap of the resolved turns, empty before the first choice.
    pub fn story_so_far(&self) -> String {
        self.progress
            .as_ref()
            .map(Progress::story_so_far)
            .unwrap_or_default()
    }

    /// Begin a new story at the first stage, discarding any previous one.
    ///
    /// On failure no story exists and `start` may simply be called again.
    pub async fn start(&mut self) -> Result<&Progress, StoryError> {
        self.progress = None;
        let stage = levels::first();
        tracing::info!(stage = stage.id, "starting story");

        let (scene, image) = illustrated_scene(&self.gateway, stage, &[])
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "story initialization failed");
                StoryError::Initialization(e)
            })?;

        Ok(self.progress.insert(Progress::new(stage, scene, image)))
    }

    /// Resolve the current scene with `action` and move the story forward.
    ///
    /// At the last stage this concludes the story. Earlier, a failure to
    /// produce the next scene also concludes it, so once started the story
    /// always reaches [`Progress::is_complete`].
    pub async fn advance(&mut self, action: Action) -> Result<Advance, StoryError> {
        let progress = self.progress.as_mut().ok_or(StoryError::NotStarted)?;
        if !progress.record_turn(action) {
            return Err(StoryError::SessionComplete);
        }

        let stage = progress.current_stage();
        if stage.is_last() {
            let mut epilogue =
                conclude(&self.gateway, progress.turns(), EpilogueSource::Generated).await;
            if self.gateway.illustrates() {
                let key: String = epilogue.text.chars().take(CLOSING_IMAGE_CHARS).collect();
                match self.gateway.generate_image(&key, progress.turns()).await {
                    Ok(image) => epilogue.image = Some(image),
                    Err(e) => tracing::warn!(error = %e, "closing image generation failed"),
                }
            }
            let source = epilogue.source;
            progress.conclude(epilogue);
            tracing::info!(?source, turns = progress.turns().len(), "story concluded");
            return Ok(Advance::Concluded(source));
        }

        let next = stage.next().unwrap_or_else(|| {
            panic!("stage '{}' is not last but has no successor", stage.id)
        });

        match illustrated_scene(&self.gateway, next, progress.turns()).await {
            Ok((scene, image)) => {
                progress.enter(next, scene, image);
                tracing::info!(stage = next.id, "advanced");
                Ok(Advance::Continued(next))
            }
            Err(e) => {
                tracing::warn!(error = %e, stage = next.id, "scene generation failed, concluding story early");
                let epilogue =
                    conclude(&self.gateway, progress.turns(), EpilogueSource::Recovered).await;
                let source = epilogue.source;
                progress.conclude(epilogue);
                Ok(Advance::Concluded(source))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{GatewayCall, MockGateway};

    fn pick(engine: &StoryEngine<MockGateway>, number: usize) -> Action {
        engine
            .current_scene()
            .and_then(|s| s.choice(number))
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_start_yields_three_actions_and_empty_history() {
        let mut engine = StoryEngine::new(MockGateway::new());
        let progress = engine.start().await.unwrap();

        assert_eq!(progress.current_stage().id, "intro");
        assert_eq!(progress.current_scene().unwrap().actions.len(), 3);
        assert!(progress.turns().is_empty());
        assert!(progress.current_image().is_some());
        assert!(!progress.is_complete());
    }

    #[tokio::test]
    async fn test_start_failure_is_retryable() {
        let mut engine = StoryEngine::new(MockGateway::new().fail_scene());

        let err = engine.start().await.unwrap_err();
        assert!(err.is_retryable());
        assert!(engine.progress().is_none());

        engine.start().await.unwrap();
        assert_eq!(engine.current_stage().map(|s| s.id), Some("intro"));
    }

    #[tokio::test]
    async fn test_start_fails_when_opening_image_fails() {
        let mut engine = StoryEngine::new(MockGateway::new().fail_image());
        assert!(matches!(
            engine.start().await,
            Err(StoryError::Initialization(_))
        ));
        assert!(engine.progress().is_none());
    }

    #[tokio::test]
    async fn test_advance_before_start() {
        let mut engine = StoryEngine::new(MockGateway::new());
        assert!(matches!(
            engine.advance(Action::offered("x")).await,
            Err(StoryError::NotStarted)
        ));
    }

    #[tokio::test]
    async fn test_advance_moves_one_stage() {
        let mut engine = StoryEngine::new(MockGateway::new());
        engine.start().await.unwrap();

        let first_scene = engine.current_scene().cloned().unwrap();
        let choice = pick(&engine, 2);
        let outcome = engine.advance(choice.clone()).await.unwrap();

        assert_eq!(outcome, Advance::Continued(&levels::STAGES[1]));
        let progress = engine.progress().unwrap();
        assert_eq!(progress.scene_history(), vec![&first_scene]);
        assert_eq!(progress.action_history(), vec![&choice]);
        assert!(!progress.is_complete());
        assert!(progress.current_scene().unwrap().previous_summary.is_some());
    }

    #[tokio::test]
    async fn test_last_stage_concludes_with_closing_image() {
        let mut engine = StoryEngine::new(MockGateway::new().with_epilogue("It is over."));
        engine.start().await.unwrap();
        for _ in 0..3 {
            let action = pick(&engine, 1);
            engine.advance(action).await.unwrap();
        }
        assert!(engine.current_stage().unwrap().is_last());

        let action = pick(&engine, 3);
        let outcome = engine.advance(action).await.unwrap();

        assert_eq!(outcome, Advance::Concluded(EpilogueSource::Generated));
        let progress = engine.progress().unwrap();
        let epilogue = progress.epilogue().unwrap();
        assert_eq!(epilogue.text, "It is over.");
        assert!(epilogue.image.is_some());
        assert_eq!(progress.turns().len(), 4);

        let calls = engine.gateway().calls();
        match calls.last() {
            Some(GatewayCall::Image { prompt, turns }) => {
                assert_eq!(prompt, "It is over.");
                assert_eq!(*turns, 4);
            }
            other => panic!("expected closing image call, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_closing_image_failure_keeps_epilogue() {
        let gateway = MockGateway::new()
            .with_image("mock://1")
            .with_image("mock://2")
            .with_image("mock://3")
            .with_image("mock://4")
            .fail_image();
        let mut engine = StoryEngine::new(gateway);
        engine.start().await.unwrap();
        for _ in 0..4 {
            let action = pick(&engine, 1);
            engine.advance(action).await.unwrap();
        }

        let epilogue = engine.progress().unwrap().epilogue().unwrap();
        assert_eq!(epilogue.source, EpilogueSource::Generated);
        assert!(epilogue.image.is_none());
    }

    #[tokio::test]
    async fn test_scene_failure_recovers_with_epilogue() {
        let gateway = MockGateway::new()
            .with_scene("Opening", ["a", "b", "c"])
            .fail_scene();
        let mut engine = StoryEngine::new(gateway);
        engine.start().await.unwrap();

        let outcome = engine.advance(pick(&engine, 1)).await.unwrap();
        assert_eq!(outcome, Advance::Concluded(EpilogueSource::Recovered));
        assert!(engine.is_complete());
        assert_eq!(engine.progress().unwrap().turns().len(), 1);
        assert_eq!(engine.current_stage().map(|s| s.id), Some("intro"));
    }

    #[tokio::test]
    async fn test_epilogue_failure_uses_fixed_text() {
        let gateway = MockGateway::new()
            .with_scene("Opening", ["a", "b", "c"])
            .fail_scene()
            .fail_epilogue();
        let mut engine = StoryEngine::new(gateway);
        engine.start().await.unwrap();

        let outcome = engine.advance(pick(&engine, 1)).await.unwrap();
        assert_eq!(outcome, Advance::Concluded(EpilogueSource::Fallback));
        let epilogue = engine.progress().unwrap().epilogue().unwrap();
        assert_eq!(epilogue.text, FALLBACK_EPILOGUE.trim());
        assert!(epilogue.image.is_none());
    }

    #[tokio::test]
    async fn test_scene_for_wrong_stage_is_not_entered() {
        let gateway = MockGateway::new()
            .with_scene("Opening", ["a", "b", "c"])
            .with_scene_at(&levels::STAGES[3], "Too far ahead", ["x", "y", "z"]);
        let mut engine = StoryEngine::new(gateway);
        engine.start().await.unwrap();

        let outcome = engine.advance(pick(&engine, 1)).await.unwrap();
        assert_eq!(outcome, Advance::Concluded(EpilogueSource::Recovered));
        assert_eq!(engine.current_stage().map(|s| s.id), Some("intro"));
        assert_eq!(engine.progress().unwrap().turns().len(), 1);
        let images = engine
            .gateway()
            .calls()
            .into_iter()
            .filter(|c| matches!(c, GatewayCall::Image { .. }))
            .count();
        assert_eq!(images, 1, "only the opening scene is illustrated");
    }

    #[tokio::test]
    async fn test_opening_scene_for_wrong_stage_fails_start() {
        let gateway =
            MockGateway::new().with_scene_at(&levels::STAGES[1], "Skipped intro", ["x", "y", "z"]);
        let mut engine = StoryEngine::new(gateway);

        let err = engine.start().await.unwrap_err();
        assert!(matches!(
            err,
            StoryError::Initialization(GatewayError::StageMismatch {
                expected: "intro",
                actual: "destruction",
            })
        ));
        assert!(engine.progress().is_none());
    }

    #[tokio::test]
    async fn test_closing_image_keyed_on_epilogue_prefix() {
        let long = "The servers hum on without you. ".repeat(20);
        let mut engine = StoryEngine::new(MockGateway::new().with_epilogue(long.clone()));
        engine.start().await.unwrap();
        for _ in 0..4 {
            engine.advance(pick(&engine, 1)).await.unwrap();
        }

        let calls = engine.gateway().calls();
        let Some(GatewayCall::Image { prompt, .. }) = calls.last() else {
            panic!("expected closing image call, got {:?}", calls.last());
        };
        assert_eq!(prompt.chars().count(), CLOSING_IMAGE_CHARS);
        assert!(long.starts_with(prompt.as_str()));
        assert_eq!(engine.progress().unwrap().epilogue().unwrap().text, long);
    }

    #[tokio::test]
    async fn test_complete_rejects_advance() {
        let mut engine = StoryEngine::new(
            MockGateway::new()
                .with_scene("Opening", ["a", "b", "c"])
                .fail_scene(),
        );
        engine.start().await.unwrap();
        engine.advance(pick(&engine, 1)).await.unwrap();
        assert!(engine.is_complete());

        let before = engine.progress().cloned();
        let calls_before = engine.gateway().calls().len();
        assert!(matches!(
            engine.advance(Action::offered("again")).await,
            Err(StoryError::SessionComplete)
        ));
        assert_eq!(engine.progress().cloned(), before);
        assert_eq!(engine.gateway().calls().len(), calls_before);
    }

    #[tokio::test]
    async fn test_restart_discards_previous_story() {
        let mut engine = StoryEngine::new(MockGateway::new());
        engine.start().await.unwrap();
        engine.advance(pick(&engine, 1)).await.unwrap();

        engine.start().await.unwrap();
        assert_eq!(engine.current_stage().map(|s| s.id), Some("intro"));
        assert!(engine.progress().unwrap().turns().is_empty());
        assert_eq!(engine.story_so_far(), "");
    }

    #[tokio::test]
    async fn test_images_disabled_skips_image_calls() {
        let mut engine = StoryEngine::new(MockGateway::new().without_images());
        engine.start().await.unwrap();
        for _ in 0..4 {
            engine.advance(pick(&engine, 1)).await.unwrap();
        }

        assert!(engine.is_complete());
        assert!(engine
            .gateway()
            .calls()
            .iter()
            .all(|c| !matches!(c, GatewayCall::Image { .. })));
    }
}
