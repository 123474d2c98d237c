//! Progress display for long-running searches and index builds.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

use crate::index::BuildSummary;
use crate::io::location;
use crate::search::SearchProgress;

/// Create a spinner for indeterminate progress.
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_draw_target(ProgressDrawTarget::stderr());
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Verbose-mode progress line. Does nothing when disabled.
pub struct ProgressReporter {
    spinner: Option<ProgressBar>,
    started: Instant,
}

impl ProgressReporter {
    pub fn new(enabled: bool) -> Self {
        Self {
            spinner: enabled.then(|| create_spinner("starting")),
            started: Instant::now(),
        }
    }

    /// `[N docs done in Ts, R docs/s] cur top-1: ...`
    pub fn search(&self, progress: SearchProgress<'_>) {
        let Some(spinner) = &self.spinner else {
            return;
        };
        let mut message = self.rate(progress.documents);
        if let Some(best) = progress.best {
            message.push_str(&format!(
                " cur top-1: {:.4} {} {}",
                best.score,
                best.chars,
                location(best)
            ));
        }
        spinner.set_message(message);
    }

    pub fn build(&self, summary: &BuildSummary) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(format!(
                "{} {} records",
                self.rate(summary.documents),
                summary.records
            ));
        }
    }

    fn rate(&self, documents: usize) -> String {
        let elapsed = self.started.elapsed().as_secs_f64().max(1e-3);
        format!(
            "[{documents} docs done in {elapsed:.0}s, {:.2} docs/s]",
            documents as f64 / elapsed
        )
    }

    /// Clears the progress line.
    pub fn finish(&self) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.finish();
    }
}
