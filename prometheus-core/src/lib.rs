//! Branching AI-apocalypse story engine.
//!
//! This crate provides:
//! - A fixed four-stage story catalog
//! - A state machine that tracks scenes and the reader's choices
//! - Context summarization that feeds the story so far back into prompts
//! - A generation gateway backed by the OpenAI API
//!
//! # Quick Start
//!
//! ```ignore
//! use prometheus_core::{Action, OpenAiGateway, StoryConfig, StoryEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = OpenAiGateway::from_env(StoryConfig::default())?;
//!     let mut engine = StoryEngine::new(gateway);
//!
//!     let progress = engine.start().await?;
//!     println!("{}", progress.current_scene().unwrap().narrative);
//!
//!     engine.advance(Action::custom("I unplug the cluster").unwrap()).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod gateway;
pub mod levels;
pub mod story;
pub mod summary;
pub mod testing;

// Primary public API
pub use config::StoryConfig;
pub use engine::{Advance, StoryEngine, StoryError, FALLBACK_EPILOGUE};
pub use gateway::{Gateway, GatewayError, OpenAiGateway};
pub use levels::{Stage, STAGES};
pub use story::{Action, ActionOrigin, Epilogue, EpilogueSource, ImageRef, Phase, Progress, Scene, Turn};
pub use testing::MockGateway;
