//! Terminal progress for the `build` command.

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use source_reader_core::contract::ProgressReporter;

/// Drives a single indicatif spinner from pipeline events.
pub struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    /// A spinner that draws nothing; used when stderr is not a terminal.
    pub fn hidden() -> Self {
        Self {
            spinner: ProgressBar::hidden(),
        }
    }
}

impl Default for CliProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, description: &str, fraction: f32) {
        self.spinner
            .set_message(format!("[{:>3.0}%] {description}", fraction * 100.0));
    }

    fn file_processed(&self, path: &Path, current: usize, total: usize) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.spinner
            .set_message(format!("Processing files [{current}/{total}] {name}"));
    }

    fn finished(&self, _success: bool) {
        self.spinner.finish_and_clear();
    }
}
