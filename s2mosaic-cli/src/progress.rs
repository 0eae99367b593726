//! Terminal progress line for mosaic runs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use s2mosaic::mosaic::{format_progress, MosaicProgress, ProgressReporter};

const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {msg}";
const TICK: Duration = Duration::from_millis(120);

/// Single updating line showing scene count and remaining no-data share.
pub struct ProgressLine {
    bar: ProgressBar,
}

impl ProgressLine {
    pub fn new() -> Self {
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let bar = ProgressBar::new(0).with_style(style);
        bar.set_message("Searching catalog...");
        bar.enable_steady_tick(TICK);
        Self { bar }
    }
}

impl Default for ProgressLine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ProgressLine {
    fn start(&self, scenes_total: usize) {
        self.bar.set_length(scenes_total as u64);
        self.bar.set_message(format_progress(0, scenes_total, 100.0));
    }

    fn scene_done(&self, progress: &MosaicProgress) {
        self.bar.set_position(progress.scenes_done as u64);
        self.bar.set_message(progress.to_string());
    }

    fn finish(&self) {
        self.bar.finish();
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
