//! Text rendering for the line-mode front end.

use prometheus_core::{Epilogue, Progress, STAGES};
use std::future::Future;
use std::io::{self, Write};
use std::time::{Duration, Instant};

pub const HELP: &str = "\
[HELP]
  1, 2, 3      - Take one of the offered actions
  <any text>   - Take your own action
  #status      - Show where you are in the story
  #history     - Show every choice so far
  #restart     - Start a new story
  #quit        - Exit
  #help        - Show this help";

/// A parsed line of reader input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Choice(usize),
    Custom(String),
    Command(Command),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Status,
    History,
    Restart,
    Quit,
    Unknown(String),
}

pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }

    if let Some(rest) = line.strip_prefix('#') {
        let name = rest.split_whitespace().next().unwrap_or("").to_lowercase();
        let command = match name.as_str() {
            "help" => Command::Help,
            "status" => Command::Status,
            "history" => Command::History,
            "restart" | "new" => Command::Restart,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(name),
        };
        return Input::Command(command);
    }

    match line.parse::<usize>() {
        Ok(n) => Input::Choice(n),
        Err(_) => Input::Custom(line.to_string()),
    }
}

/// Format an elapsed duration as `mm:ss`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Drive `task` to completion while printing an elapsed-time indicator.
pub async fn with_elapsed<F: Future>(label: &str, task: F) -> F::Output {
    let started = Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut stdout = io::stdout();
    tokio::pin!(task);

    let output = loop {
        tokio::select! {
            output = &mut task => break output,
            _ = ticker.tick() => {
                print!("\r[PROCESSING] {label} {}", format_elapsed(started.elapsed()));
                stdout.flush().ok();
            }
        }
    };

    print!("\r{:width$}\r", "", width = label.len() + 20);
    stdout.flush().ok();
    output
}

/// The current scene with its recap, illustration and choices.
pub fn render_scene(progress: &Progress) -> String {
    let stage = progress.current_stage();
    let mut out = format!(
        "=== Stage {}/{}: {} ===\n",
        stage.index() + 1,
        STAGES.len(),
        stage
    );

    let Some(scene) = progress.current_scene() else {
        return out;
    };

    if let Some(ref summary) = scene.previous_summary {
        out.push_str("\n[STORY SO FAR]\n");
        out.push_str(summary);
        out.push('\n');
    }

    out.push_str("\n[SCENE]\n");
    for para in scene.narrative.split("\n\n") {
        out.push_str(para.trim());
        out.push('\n');
    }

    if let Some(image) = progress.current_image() {
        out.push_str(&format!("\n[IMAGE] {image}\n"));
    }

    out.push_str("\n[CHOICES]\n");
    for (i, action) in scene.actions.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, action.text));
    }
    out.push_str("\nPick 1-3 or type your own action.");
    out
}

pub fn render_epilogue(epilogue: &Epilogue) -> String {
    let mut out = String::from("=== Epilogue ===\n\n");
    out.push_str(epilogue.text.trim());
    out.push('\n');
    if let Some(ref image) = epilogue.image {
        out.push_str(&format!("\n[IMAGE] {image}\n"));
    }
    out.push_str("\nThe story is over. Type #restart to play again or #quit to exit.");
    out
}

pub fn render_status(progress: Option<&Progress>) -> String {
    let Some(progress) = progress else {
        return "[STATUS] No story in progress. Type #restart to begin.".to_string();
    };

    let stage = progress.current_stage();
    let mut out = String::from("[STATUS]\n");
    out.push_str(&format!(
        "  Stage: {}/{} {}\n",
        stage.index() + 1,
        STAGES.len(),
        stage
    ));
    out.push_str(&format!("  Choices made: {}\n", progress.turns().len()));
    let state = if progress.is_complete() {
        "complete"
    } else {
        "awaiting your choice"
    };
    out.push_str(&format!("  State: {state}"));
    out
}

pub fn render_history(progress: Option<&Progress>) -> String {
    let recap = progress.map(Progress::story_so_far).unwrap_or_default();
    if recap.is_empty() {
        "[HISTORY] No choices yet.".to_string()
    } else {
        format!("[HISTORY]\n{recap}")
    }
}
