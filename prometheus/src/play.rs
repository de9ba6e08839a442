//! Line-oriented game loop.
//!
//! - Lines `1`-`3` take an offered action
//! - Lines starting with `#` are commands (status, history, restart, quit)
//! - Any other text is taken as the reader's own action

use crate::display::{self, Command, Input};
use prometheus_core::{Action, Advance, Gateway, StoryEngine, StoryError};
use std::io::{self, BufRead, Write};

pub async fn run<G: Gateway>(mut engine: StoryEngine<G>) -> anyhow::Result<()> {
    println!("=== Prometheus Rising ===");
    println!("A story about an AI apocalypse, in four stages.");
    println!();
    println!("{}", display::HELP);
    println!();

    start(&mut engine).await;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        match display::parse_input(&line) {
            Input::Empty => continue,
            Input::Command(Command::Quit) => {
                println!("Goodbye!");
                break;
            }
            Input::Command(Command::Help) => println!("{}", display::HELP),
            Input::Command(Command::Status) => {
                println!("{}", display::render_status(engine.progress()))
            }
            Input::Command(Command::History) => {
                println!("{}", display::render_history(engine.progress()))
            }
            Input::Command(Command::Restart) => start(&mut engine).await,
            Input::Command(Command::Unknown(name)) => {
                println!("[ERROR] Unknown command '#{name}'. Type #help for help.")
            }
            Input::Choice(n) => {
                let offered = engine.current_scene().and_then(|s| s.choice(n)).cloned();
                match offered {
                    Some(action) => advance(&mut engine, action).await,
                    None if engine.current_scene().is_some() => {
                        println!("[ERROR] Choose 1, 2 or 3, or type your own action.")
                    }
                    None => advance_rejected(&engine),
                }
            }
            Input::Custom(text) => match Action::custom(&text) {
                Some(action) => advance(&mut engine, action).await,
                None => continue,
            },
        }
        println!();
        stdout.flush().ok();
    }

    Ok(())
}

async fn start<G: Gateway>(engine: &mut StoryEngine<G>) {
    match display::with_elapsed("Writing the opening scene...", engine.start()).await {
        Ok(progress) => {
            println!("{}", display::render_scene(progress));
        }
        Err(e) => {
            tracing::error!(error = %e, "story initialization failed");
            println!("[ERROR] Failed to initialize story. Please try again.");
            println!("Type #restart to retry or #quit to exit.");
        }
    }
}

async fn advance<G: Gateway>(engine: &mut StoryEngine<G>, action: Action) {
    if engine.current_scene().is_none() {
        advance_rejected(engine);
        return;
    }

    println!("[YOU] {}", action.text);
    if action.is_custom() {
        println!("{}", action.consequence_note);
    }

    let result = display::with_elapsed("The story unfolds...", engine.advance(action)).await;
    match result {
        Ok(Advance::Continued(_)) => {
            if let Some(progress) = engine.progress() {
                println!("{}", display::render_scene(progress));
            }
        }
        Ok(Advance::Concluded(source)) => {
            tracing::info!(?source, "story concluded");
            if let Some(epilogue) = engine.progress().and_then(|p| p.epilogue()) {
                println!("{}", display::render_epilogue(epilogue));
            }
        }
        Err(StoryError::NotStarted | StoryError::SessionComplete) => advance_rejected(engine),
        Err(e) => println!("[ERROR] {e}"),
    }
}

fn advance_rejected<G: Gateway>(engine: &StoryEngine<G>) {
    if engine.is_complete() {
        println!("[INFO] The story is over. Type #restart to play again or #quit to exit.");
    } else {
        println!("[INFO] No story in progress. Type #restart to begin.");
    }
}
