//! OpenAI-backed gateway.

use super::{scene_or_fallback, Gateway, GatewayError};
use crate::config::StoryConfig;
use crate::levels::Stage;
use crate::story::{Action, ImageRef, Scene, Turn};
use crate::summary;
use ::openai::{ChatRequest, ImageRequest, Message, OpenAi};
use async_trait::async_trait;

const SYSTEM_PROMPT: &str = include_str!("prompts/system.txt");
const PREMISE: &str = include_str!("prompts/premise.txt");
const SCENE_PROMPT: &str = include_str!("prompts/scene.txt");
const EPILOGUE_PROMPT: &str = include_str!("prompts/epilogue.txt");

/// Gateway that generates scenes, images and epilogues with the OpenAI API.
#[derive(Debug, Clone)]
pub struct OpenAiGateway {
    client: OpenAi,
    config: StoryConfig,
}

impl OpenAiGateway {
    pub fn new(client: OpenAi, config: StoryConfig) -> Self {
        Self { client, config }
    }

    /// Build a gateway from `OPENAI_API_KEY` (and optional `OPENAI_BASE_URL`).
    pub fn from_env(config: StoryConfig) -> Result<Self, GatewayError> {
        Ok(Self::new(OpenAi::from_env()?, config))
    }

    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    fn text_request(&self, messages: Vec<Message>) -> ChatRequest {
        let mut request = ChatRequest::new(messages);
        if let Some(ref model) = self.config.text_model {
            request = request.with_model(model);
        }
        if let Some(tokens) = self.config.max_completion_tokens {
            request = request.with_max_completion_tokens(tokens);
        }
        request
    }
}

/// User prompt for the scene at `stage`.
pub(crate) fn scene_prompt(stage: &Stage, history: &[Turn]) -> String {
    let context = summary::summarize_turns(history);
    let context = if context.is_empty() {
        "This is the opening scene. Nothing has happened yet.".to_string()
    } else {
        context
    };
    SCENE_PROMPT
        .replace("{{stage_name}}", stage.name)
        .replace("{{stage_theme}}", stage.theme)
        .replace("{{stage_description}}", stage.description)
        .replace("{{context}}", &context)
}

/// Prompt for an illustration of `current` given the resolved history.
pub(crate) fn image_prompt(current: &str, history: &[Turn]) -> String {
    let mut prompt = format!("A cinematic scene from {}\n\n", PREMISE.trim());
    let timeline = summary::image_timeline(history);
    if !timeline.is_empty() {
        prompt.push_str("Story so far:\n");
        prompt.push_str(&timeline);
        prompt.push_str("\n\n");
    }
    prompt.push_str("Current scene: ");
    prompt.push_str(current);
    prompt
}

/// Prompt for the epilogue, listing every action taken.
pub(crate) fn epilogue_prompt(actions: &[&Action]) -> String {
    EPILOGUE_PROMPT.replace("{{choices}}", &summary::numbered_actions(actions))
}

#[async_trait]
impl Gateway for OpenAiGateway {
    async fn generate_scene(
        &self,
        stage: &'static Stage,
        history: &[Turn],
    ) -> Result<Scene, GatewayError> {
        let prompt = scene_prompt(stage, history);
        tracing::debug!(stage = stage.id, turns = history.len(), %prompt, "requesting scene");

        let request = self
            .text_request(vec![Message::system(SYSTEM_PROMPT.trim()), Message::user(prompt)])
            .json();
        let response = self.client.complete(request).await?;

        Ok(scene_or_fallback(stage, history, response.text()))
    }

    async fn generate_image(
        &self,
        prompt: &str,
        history: &[Turn],
    ) -> Result<ImageRef, GatewayError> {
        let prompt = image_prompt(prompt, history);
        tracing::debug!(%prompt, "requesting image");

        let mut request = ImageRequest::new(prompt)
            .with_size(self.config.image_size)
            .with_quality(self.config.image_quality);
        if let Some(ref model) = self.config.image_model {
            request = request.with_model(model);
        }

        let response = self.client.generate_image(request).await?;
        response
            .first_url()
            .map(|url| ImageRef(url.to_string()))
            .ok_or(GatewayError::MissingImage)
    }

    async fn generate_epilogue(&self, actions: &[&Action]) -> Result<String, GatewayError> {
        let prompt = epilogue_prompt(actions);
        tracing::debug!(actions = actions.len(), "requesting epilogue");

        let response = self
            .client
            .complete(self.text_request(vec![Message::user(prompt)]))
            .await?;

        let text = response.text().trim();
        if text.is_empty() {
            return Err(GatewayError::EmptyResponse);
        }
        Ok(text.to_string())
    }

    fn illustrates(&self) -> bool {
        self.config.images
    }
}
