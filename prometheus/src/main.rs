//! Prometheus Rising terminal front end.
//!
//! ```bash
//! cargo run -p prometheus -- --no-images
//! ```

mod cli;
mod display;
mod play;

use anyhow::Context;
use clap::Parser;
use openai::OpenAi;
use prometheus_core::{OpenAiGateway, StoryEngine};
use tracing_subscriber::EnvFilter;

use cli::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level);

    // Check for API key
    if std::env::var("OPENAI_API_KEY").is_err() {
        eprintln!("Error: OPENAI_API_KEY environment variable not set.");
        eprintln!("Please set it in .env file or with: export OPENAI_API_KEY=your_key_here");
        std::process::exit(1);
    }

    let mut client = OpenAi::from_env().context("failed to create OpenAI client")?;
    if let Some(ref url) = args.base_url {
        client = client.with_base_url(url);
    }

    let config = args.story_config();
    tracing::info!(?config, "starting");
    let engine = StoryEngine::new(OpenAiGateway::new(client, config));

    play::run(engine).await
}

/// Logs go to stderr so they never interleave with the story on stdout.
fn init_tracing(fallback_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
