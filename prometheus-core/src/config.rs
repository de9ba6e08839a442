//! Generation settings shared by the gateway and the engine.

use openai::{ImageQuality, ImageSize};

/// Configuration for story generation.
#[derive(Debug, Clone)]
pub struct StoryConfig {
    /// Chat model for scenes and epilogues (client default when `None`).
    pub text_model: Option<String>,

    /// Image model (client default when `None`).
    pub image_model: Option<String>,

    /// Resolution of generated illustrations.
    pub image_size: ImageSize,

    /// Quality of generated illustrations.
    pub image_quality: ImageQuality,

    /// Whether scenes and the epilogue get an illustration.
    pub images: bool,

    /// Upper bound on completion tokens per text request.
    pub max_completion_tokens: Option<usize>,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            text_model: None,
            image_model: None,
            image_size: ImageSize::Square1024,
            image_quality: ImageQuality::Standard,
            images: true,
            max_completion_tokens: None,
        }
    }
}

impl StoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chat model.
    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = Some(model.into());
        self
    }

    /// Set the image model.
    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = Some(model.into());
        self
    }

    /// Enable or disable illustrations.
    pub fn with_images(mut self, enabled: bool) -> Self {
        self.images = enabled;
        self
    }

    pub fn with_image_size(mut self, size: ImageSize) -> Self {
        self.image_size = size;
        self
    }

    pub fn with_image_quality(mut self, quality: ImageQuality) -> Self {
        self.image_quality = quality;
        self
    }

    /// Cap completion tokens per text request.
    pub fn with_max_completion_tokens(mut self, tokens: usize) -> Self {
        self.max_completion_tokens = Some(tokens);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixed_image_parameters() {
        let config = StoryConfig::default();
        assert!(config.images);
        assert_eq!(config.image_size, ImageSize::Square1024);
        assert_eq!(config.image_quality, ImageQuality::Standard);
        assert!(config.text_model.is_none());
    }

    #[test]
    fn test_builder() {
        let config = StoryConfig::new()
            .with_text_model("gpt-4o-mini")
            .with_image_model("dall-e-2")
            .with_images(false)
            .with_max_completion_tokens(2048);

        assert_eq!(config.text_model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.image_model.as_deref(), Some("dall-e-2"));
        assert!(!config.images);
        assert_eq!(config.max_completion_tokens, Some(2048));
    }
}
