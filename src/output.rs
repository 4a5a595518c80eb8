//! Rendering of outcomes for the command-line front end.

use crate::config::OutputFormat;
use crate::core::{FileEvent, Outcome};

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Emit one event in the requested format.
///
/// Text output goes through `tracing` so it shares the log formatting;
/// json and compact output go to stdout.
pub fn emit(event: &FileEvent, format: OutputFormat, no_color: bool) -> serde_json::Result<()> {
    match format {
        OutputFormat::Text => {
            for line in text_lines(&event.outcome, no_color) {
                tracing::info!("{}", line);
            }
        }
        OutputFormat::Json => {
            if let Some(line) = json_line(event)? {
                println!("{}", line);
            }
        }
        OutputFormat::Compact => {
            if let Some(line) = compact_line(&event.outcome) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

/// Log lines for an outcome; empty for outcomes that are not reported.
pub fn text_lines(outcome: &Outcome, no_color: bool) -> Vec<String> {
    let paint = |color: &str, text: &str| {
        if no_color {
            text.to_string()
        } else {
            format!("{}{}{}", color, text, RESET)
        }
    };

    match outcome {
        Outcome::Created { path, .. } => {
            vec![format!("{} {}", paint(GREEN, "File created:"), path.display())]
        }
        Outcome::Modified {
            path,
            old_size,
            new_size,
            ..
        } => vec![
            format!("{} {}", paint(YELLOW, "File modified:"), path.display()),
            format!("Size changed from {} to {} bytes", old_size, new_size),
        ],
        Outcome::Deleted { path, .. } => {
            vec![format!("{} {}", paint(RED, "File deleted:"), path.display())]
        }
        Outcome::Unchanged { .. } | Outcome::Baseline { .. } | Outcome::Ignored { .. } => {
            Vec::new()
        }
    }
}

pub fn json_line(event: &FileEvent) -> serde_json::Result<Option<String>> {
    if matches!(event.outcome, Outcome::Ignored { .. }) {
        return Ok(None);
    }
    serde_json::to_string(event).map(Some)
}

pub fn compact_line(outcome: &Outcome) -> Option<String> {
    let tag = match outcome {
        Outcome::Created { .. } => "C",
        Outcome::Modified { .. } => "M",
        Outcome::Deleted { .. } => "D",
        _ => return None,
    };
    Some(format!("{} {}", tag, outcome.path().display()))
}
