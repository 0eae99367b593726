//! Progress reporting for mosaic runs.

use std::sync::Arc;

use tracing::info;

use super::MosaicProgress;

/// Receives progress events from the pipeline.
///
/// Called from the thread driving [`mosaic`](super::mosaic); implementations
/// must be cheap since they run between scenes.
pub trait ProgressReporter: Send + Sync {
    /// Scenes are about to be composited.
    fn start(&self, _scenes_total: usize) {}

    /// A scene has been composited.
    fn scene_done(&self, progress: &MosaicProgress);

    /// Compositing ended, either exhausted or stopped early.
    fn finish(&self) {}
}

/// Shared progress reporter.
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// Reporter that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn scene_done(&self, _progress: &MosaicProgress) {}
}

/// Reporter that logs each event at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn start(&self, scenes_total: usize) {
        info!(scenes = scenes_total, "Compositing scenes");
    }

    fn scene_done(&self, progress: &MosaicProgress) {
        info!("{}", progress);
    }
}
