//! Progress events emitted by the loading and geocoding stages.
//!
//! The CLI renders them with `indicatif` bars; tests and library callers
//! pass [`null_progress`].

use std::sync::Arc;

/// Receives progress from a stage that works through a known number of
/// units (workbooks, unique addresses).
pub trait ProgressCallback: Send + Sync {
    /// Announces how many units the stage will process.
    fn set_total(&self, total: u64);

    /// Marks `delta` more units as done.
    fn inc(&self, delta: u64);

    /// Names the unit currently being processed.
    fn set_message(&self, msg: String);

    /// Ends the stage, leaving a final message.
    fn finish(&self, msg: String);

    /// Ends a stage that did no work, leaving nothing behind.
    fn finish_and_clear(&self);
}

/// Discards every event.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Shared [`NullProgress`] for callers that do not display progress.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
