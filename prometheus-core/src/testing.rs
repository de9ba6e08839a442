//! Testing utilities for the story engine.
//!
//! This module provides tools for integration testing:
//! - `MockGateway` for deterministic testing without API calls
//! - Assertion helpers for verifying engine state

use crate::engine::StoryEngine;
use crate::gateway::{scene_from_parts, scene_or_fallback, Gateway, GatewayError};
use crate::levels::Stage;
use crate::story::{Action, ImageRef, Scene, Turn};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// A scripted scene response.
#[derive(Debug, Clone)]
pub enum SceneScript {
    /// A well-formed scene, tagged with `stage` when set instead of the
    /// stage that was requested.
    Scene {
        stage: Option<&'static Stage>,
        narrative: String,
        choices: [String; 3],
    },
    /// Raw model output, parsed the way a real gateway would.
    Raw(String),
    /// A transport failure.
    Fail,
}

/// A scripted image or epilogue response.
#[derive(Debug, Clone)]
pub enum TextScript {
    Ok(String),
    Fail,
}

/// A call the engine made on the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Scene { stage: &'static str, turns: usize },
    Image { prompt: String, turns: usize },
    Epilogue { actions: Vec<String> },
}

/// A gateway that returns scripted responses in order.
///
/// Once a script runs out, defaults are returned: a numbered scene per
/// stage, `mock://image/{n}` images, and the epilogue "The end.".
pub struct MockGateway {
    scenes: Mutex<VecDeque<SceneScript>>,
    images: Mutex<VecDeque<TextScript>>,
    epilogues: Mutex<VecDeque<TextScript>>,
    calls: Mutex<Vec<GatewayCall>>,
    illustrate: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn scripted_failure() -> GatewayError {
    GatewayError::Api(::openai::Error::Network("scripted failure".to_string()))
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            scenes: Mutex::new(VecDeque::new()),
            images: Mutex::new(VecDeque::new()),
            epilogues: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            illustrate: true,
        }
    }

    /// Queue a well-formed scene.
    pub fn with_scene(self, narrative: impl Into<String>, choices: [&str; 3]) -> Self {
        lock(&self.scenes).push_back(SceneScript::Scene {
            stage: None,
            narrative: narrative.into(),
            choices: choices.map(str::to_string),
        });
        self
    }

    /// Queue a scene that claims to belong to `stage`, whatever was requested.
    pub fn with_scene_at(
        self,
        stage: &'static Stage,
        narrative: impl Into<String>,
        choices: [&str; 3],
    ) -> Self {
        lock(&self.scenes).push_back(SceneScript::Scene {
            stage: Some(stage),
            narrative: narrative.into(),
            choices: choices.map(str::to_string),
        });
        self
    }

    /// Queue raw model output for the next scene.
    pub fn with_raw_scene(self, content: impl Into<String>) -> Self {
        lock(&self.scenes).push_back(SceneScript::Raw(content.into()));
        self
    }

    /// Make the next scene request fail.
    pub fn fail_scene(self) -> Self {
        lock(&self.scenes).push_back(SceneScript::Fail);
        self
    }

    /// Queue an image URL.
    pub fn with_image(self, url: impl Into<String>) -> Self {
        lock(&self.images).push_back(TextScript::Ok(url.into()));
        self
    }

    /// Make the next image request fail.
    pub fn fail_image(self) -> Self {
        lock(&self.images).push_back(TextScript::Fail);
        self
    }

    /// Queue an epilogue text.
    pub fn with_epilogue(self, text: impl Into<String>) -> Self {
        lock(&self.epilogues).push_back(TextScript::Ok(text.into()));
        self
    }

    /// Make the next epilogue request fail.
    pub fn fail_epilogue(self) -> Self {
        lock(&self.epilogues).push_back(TextScript::Fail);
        self
    }

    /// Report that illustrations are disabled.
    pub fn without_images(mut self) -> Self {
        self.illustrate = false;
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<GatewayCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: GatewayCall) {
        lock(&self.calls).push(call);
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn generate_scene(
        &self,
        stage: &'static Stage,
        history: &[Turn],
    ) -> Result<Scene, GatewayError> {
        self.record(GatewayCall::Scene {
            stage: stage.id,
            turns: history.len(),
        });

        let script = lock(&self.scenes).pop_front();
        match script {
            Some(SceneScript::Scene {
                stage: tagged,
                narrative,
                choices,
            }) => Ok(scene_from_parts(
                tagged.unwrap_or(stage),
                history,
                narrative,
                choices,
            )),
            Some(SceneScript::Raw(content)) => Ok(scene_or_fallback(stage, history, &content)),
            Some(SceneScript::Fail) => Err(scripted_failure()),
            None => Ok(scene_from_parts(
                stage,
                history,
                format!("Scene {} of the story: {}.", stage.index() + 1, stage.description),
                [
                    format!("{} option 1", stage.name),
                    format!("{} option 2", stage.name),
                    format!("{} option 3", stage.name),
                ],
            )),
        }
    }

    async fn generate_image(
        &self,
        prompt: &str,
        history: &[Turn],
    ) -> Result<ImageRef, GatewayError> {
        self.record(GatewayCall::Image {
            prompt: prompt.to_string(),
            turns: history.len(),
        });

        let script = lock(&self.images).pop_front();
        match script {
            Some(TextScript::Ok(url)) => Ok(ImageRef(url)),
            Some(TextScript::Fail) => Err(scripted_failure()),
            None => {
                let n = lock(&self.calls)
                    .iter()
                    .filter(|c| matches!(c, GatewayCall::Image { .. }))
                    .count();
                Ok(ImageRef(format!("mock://image/{n}")))
            }
        }
    }

    async fn generate_epilogue(&self, actions: &[&Action]) -> Result<String, GatewayError> {
        self.record(GatewayCall::Epilogue {
            actions: actions.iter().map(|a| a.text.clone()).collect(),
        });

        let script = lock(&self.epilogues).pop_front();
        match script {
            Some(TextScript::Ok(text)) => Ok(text),
            Some(TextScript::Fail) => Err(scripted_failure()),
            None => Ok("The end.".to_string()),
        }
    }

    fn illustrates(&self) -> bool {
        self.illustrate
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the engine is awaiting a choice at the stage with `stage_id`.
#[track_caller]
pub fn assert_awaiting<G: Gateway>(engine: &StoryEngine<G>, stage_id: &str) {
    let stage = engine.current_stage().map(|s| s.id);
    assert_eq!(stage, Some(stage_id), "Expected to be at stage '{stage_id}'");
    assert!(
        engine.current_scene().is_some() && !engine.is_complete(),
        "Expected a scene awaiting a choice"
    );
}

/// Assert the story is complete with non-empty epilogue text.
#[track_caller]
pub fn assert_complete<G: Gateway>(engine: &StoryEngine<G>) {
    assert!(engine.is_complete(), "Expected the story to be complete");
    let text = engine
        .progress()
        .and_then(|p| p.epilogue())
        .map(|e| e.text.as_str())
        .unwrap_or("");
    assert!(!text.trim().is_empty(), "Expected a non-empty epilogue");
}

/// Assert exactly `count` turns have been resolved.
#[track_caller]
pub fn assert_turns<G: Gateway>(engine: &StoryEngine<G>, count: usize) {
    let progress = engine.progress().expect("story not started");
    assert_eq!(progress.action_history().len(), count, "action history length");
    assert_eq!(progress.scene_history().len(), count, "scene history length");
}
