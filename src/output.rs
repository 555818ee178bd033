//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.
//!
//! ```text
//! ==> Running default task
//! styles            css/main.min.css (2 sources)
//! template-fallback js/templates.js
//! templates         js/templates.js (1 templates)
//! bundle-vendor     js/vendor.min.js (2 sources)
//! bundle-app        js/scripts.min.js (1 sources)
//! images            4 images
//! fonts             3 fonts
//! ==> 7 steps complete
//! ```

use crate::feed::{FeedOutcome, FeedState};
use crate::pipeline::StepReport;
use crate::watch::WatchEvent;

/// Width of the step-name column.
const STEP_COLUMN: usize = 17;

/// Format a completed run: one line per step, name column aligned.
pub fn format_run_report(task: &str, reports: &[StepReport]) -> Vec<String> {
    let mut lines = Vec::with_capacity(reports.len() + 2);
    lines.push(format!("==> Running {task} task"));
    for report in reports {
        lines.push(format!(
            "{:<width$} {}",
            report.step.name(),
            report.detail,
            width = STEP_COLUMN
        ));
    }
    lines.push(format!("==> {} steps complete", reports.len()));
    lines
}

pub fn print_run_report(task: &str, reports: &[StepReport]) {
    for line in format_run_report(task, reports) {
        println!("{line}");
    }
}

/// Format a feed run outcome for the `feed` command.
pub fn format_feed_outcome(outcome: &FeedOutcome) -> Vec<String> {
    match &outcome.state {
        FeedState::Rendered { count } => {
            vec![format!("==> Rendered {count} repositories")]
        }
        FeedState::Failed { reason } => vec![
            format!("==> Feed failed: {reason}"),
            "==> Wrote empty container".to_string(),
        ],
        // run() always reaches a terminal state
        FeedState::Idle | FeedState::Fetching => Vec::new(),
    }
}

pub fn print_feed_outcome(outcome: &FeedOutcome) {
    for line in format_feed_outcome(outcome) {
        println!("{line}");
    }
}

/// Format one watch loop milestone.
pub fn format_watch_event(event: &WatchEvent) -> Vec<String> {
    match event {
        WatchEvent::Started { dirs } => {
            let mut lines = vec!["==> Watching for changes".to_string()];
            for dir in dirs {
                lines.push(format!("    {}", dir.display()));
            }
            lines
        }
        WatchEvent::Changed { path } => vec![format!("changed: {}", path.display())],
        WatchEvent::RunComplete { steps } => {
            let names: Vec<&str> = steps.iter().map(|s| s.name()).collect();
            vec![format!("re-ran: {}", names.join(", "))]
        }
        WatchEvent::RunFailed { message } => vec![format!("run failed: {message}")],
        WatchEvent::Shutdown => vec!["==> Watch stopped".to_string()],
    }
}

pub fn print_watch_event(event: &WatchEvent) {
    for line in format_watch_event(event) {
        println!("{line}");
    }
}
