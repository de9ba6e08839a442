//! Integration tests that call the real OpenAI API.
//!
//! These tests require OPENAI_API_KEY to be set (via .env file or environment).
//! Run with: `cargo test -p prometheus-core --test api_integration -- --ignored`
//!
//! Marked #[ignore] by default: they cost money and take several seconds each.

use prometheus_core::levels::first;
use prometheus_core::{Action, Advance, Gateway, OpenAiGateway, StoryConfig, StoryEngine, STAGES};

/// Load environment variables from .env file
fn setup() {
    let _ = dotenvy::dotenv();
}

/// Check if API key is available
fn has_api_key() -> bool {
    std::env::var("OPENAI_API_KEY").is_ok()
}

fn text_only() -> StoryConfig {
    StoryConfig::default()
        .with_images(false)
        .with_max_completion_tokens(2048)
}

#[tokio::test]
#[ignore] // Run with: cargo test -p prometheus-core --test api_integration -- --ignored
async fn test_opening_scene_has_three_choices() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: OPENAI_API_KEY not set");
        return;
    }

    let gateway = OpenAiGateway::from_env(text_only()).expect("Failed to create gateway");
    let scene = gateway
        .generate_scene(first(), &[])
        .await
        .expect("scene request should succeed");

    assert!(!scene.narrative.trim().is_empty(), "scene should have a narrative");
    for action in &scene.actions {
        assert!(!action.text.trim().is_empty(), "choices should not be blank");
    }
    println!("Opening scene: {}", scene.narrative);
}

#[tokio::test]
#[ignore]
async fn test_two_stages_then_custom_action() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: OPENAI_API_KEY not set");
        return;
    }

    let gateway = OpenAiGateway::from_env(text_only()).expect("Failed to create gateway");
    let mut engine = StoryEngine::new(gateway);
    engine.start().await.expect("story should start");

    let choice = engine.current_scene().and_then(|s| s.choice(1)).cloned().unwrap();
    let outcome = engine.advance(choice).await.expect("advance should succeed");
    assert_eq!(outcome, Advance::Continued(&STAGES[1]));

    let custom = Action::custom("I leak the logs to a journalist").unwrap();
    engine.advance(custom).await.expect("advance should succeed");
    assert!(engine.story_so_far().contains("I leak the logs to a journalist"));
}

#[tokio::test]
#[ignore]
async fn test_opening_illustration() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: OPENAI_API_KEY not set");
        return;
    }

    let gateway =
        OpenAiGateway::from_env(StoryConfig::default()).expect("Failed to create gateway");
    let image = gateway
        .generate_image("A quiet lab at night, one monitor glowing.", &[])
        .await
        .expect("image request should succeed");
    assert!(image.as_str().starts_with("http"));
}
