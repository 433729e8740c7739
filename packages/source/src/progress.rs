//! Progress reporting for part-by-part and file-by-file work.
//!
//! Extraction advances once per core POI part and aggregation once per
//! weekly file. The library only talks to [`ProgressCallback`]; the CLI
//! supplies an `indicatif` bar and tests pass [`NullProgress`].

/// Receives progress updates from a long-running job.
pub trait ProgressCallback: Send + Sync {
    /// Sets the number of units (parts, files) the job will process.
    fn set_total(&self, total: u64);

    /// Advances by `delta` units.
    fn inc(&self, delta: u64);

    /// Replaces the label shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Marks the job finished with a closing message.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}
