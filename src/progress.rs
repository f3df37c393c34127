//! Progress-callback trait for per-document extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractorConfigBuilder::progress_callback`] to be told
//! when each pipeline stage starts, finishes or fails. The CLI uses it to
//! drive a spinner; the library itself never prints.
//!
//! # Example
//!
//! ```rust
//! use policy_extract::{ExtractionProgressCallback, ExtractorConfig, Stage};
//! use std::sync::Arc;
//!
//! struct StderrProgress;
//!
//! impl ExtractionProgressCallback for StderrProgress {
//!     fn on_stage_start(&self, stage: Stage) {
//!         eprintln!("{}...", stage.label());
//!     }
//! }
//!
//! let config = ExtractorConfig::builder()
//!     .progress_callback(Arc::new(StderrProgress))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Pipeline stages, in the order they run for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Reading the local file or downloading the URL.
    Fetch,
    /// Extracting page text.
    ReadPdf,
    /// Waiting on the completion endpoint.
    Complete,
    /// Stripping fences and validating the reply.
    Parse,
    /// Appending to and restyling the report.
    Report,
}

impl Stage {
    /// Short present-tense label for progress displays.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Fetch => "Fetching document",
            Stage::ReadPdf => "Extracting text",
            Stage::Complete => "Waiting for the model",
            Stage::Parse => "Validating reply",
            Stage::Report => "Updating report",
        }
    }
}

/// Called by the pipeline as a document moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called just before `stage` runs.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when `stage` finished without error.
    fn on_stage_complete(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when `stage` failed; the document is abandoned afterwards.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractorConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

/// Run `f` as `stage`, reporting start, completion or failure to `callback`.
pub(crate) async fn observe<T, E, F>(
    callback: Option<&ProgressCallback>,
    stage: Stage,
    f: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: std::future::Future<Output = Result<T, E>>,
{
    if let Some(cb) = callback {
        cb.on_stage_start(stage);
    }
    let result = f.await;
    if let Some(cb) = callback {
        match &result {
            Ok(_) => cb.on_stage_complete(stage),
            Err(e) => cb.on_stage_error(stage, &e.to_string()),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCallback {
        events: Mutex<Vec<String>>,
    }

    impl ExtractionProgressCallback for RecordingCallback {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start {stage:?}"));
        }

        fn on_stage_complete(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("done {stage:?}"));
        }

        fn on_stage_error(&self, stage: Stage, error: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("error {stage:?}: {error}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Fetch);
        cb.on_stage_complete(Stage::Fetch);
        cb.on_stage_error(Stage::Complete, "timeout");
    }

    #[tokio::test]
    async fn observe_reports_success_and_failure() {
        let recorder = Arc::new(RecordingCallback::default());
        let cb: ProgressCallback = recorder.clone();

        let ok: Result<u32, String> = observe(Some(&cb), Stage::ReadPdf, async { Ok(3) }).await;
        assert_eq!(ok, Ok(3));

        let err: Result<u32, String> =
            observe(Some(&cb), Stage::Complete, async { Err("boom".to_string()) }).await;
        assert!(err.is_err());

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "start ReadPdf",
                "done ReadPdf",
                "start Complete",
                "error Complete: boom",
            ]
        );
    }

    #[tokio::test]
    async fn observe_without_callback_passes_result_through() {
        let result: Result<&str, String> = observe(None, Stage::Parse, async { Ok("x") }).await;
        assert_eq!(result, Ok("x"));
    }

    #[test]
    fn labels_are_distinct() {
        let stages = [Stage::Fetch, Stage::ReadPdf, Stage::Complete, Stage::Parse, Stage::Report];
        let labels: std::collections::HashSet<&str> = stages.iter().map(|s| s.label()).collect();
        assert_eq!(labels.len(), stages.len());
    }
}
