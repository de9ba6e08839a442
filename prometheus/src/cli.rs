use clap::Parser;
use openai::{ImageQuality, ImageSize};
use prometheus_core::StoryConfig;

#[derive(Debug, Parser)]
#[command(
    name = "prometheus",
    version,
    about = "Prometheus Rising: an interactive AI-apocalypse story"
)]
pub struct Args {
    /// Chat model used for scenes and the epilogue
    #[arg(long, env = "PROMETHEUS_MODEL")]
    pub model: Option<String>,

    /// Model used for illustrations
    #[arg(long, env = "PROMETHEUS_IMAGE_MODEL")]
    pub image_model: Option<String>,

    /// Skip image generation entirely
    #[arg(long)]
    pub no_images: bool,

    /// Illustration resolution: 1024x1024, 1792x1024 or 1024x1792
    #[arg(long, default_value = "1024x1024")]
    pub image_size: ImageSize,

    /// Render illustrations at HD quality
    #[arg(long)]
    pub hd: bool,

    /// Override the API base URL
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub base_url: Option<String>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Args {
    pub fn story_config(&self) -> StoryConfig {
        let quality = if self.hd {
            ImageQuality::Hd
        } else {
            ImageQuality::Standard
        };
        let mut config = StoryConfig::new()
            .with_images(!self.no_images)
            .with_image_size(self.image_size)
            .with_image_quality(quality);
        if let Some(ref model) = self.model {
            config = config.with_text_model(model);
        }
        if let Some(ref model) = self.image_model {
            config = config.with_image_model(model);
        }
        config
    }
}
