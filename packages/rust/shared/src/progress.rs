//! Progress reporting seam.
//!
//! The crawler and pipeline report progress through this trait so the CLI
//! can render spinners/bars without the library crates knowing about them.

/// Receives progress events during ingestion.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline phase has started.
    fn phase(&self, name: &str);

    /// The document stream fetch has started. `total_bytes` comes from
    /// Content-Length when the server sends one.
    fn stream_started(&self, total_bytes: Option<u64>);

    /// A chunk of the document stream has been read.
    fn stream_advanced(&self, bytes: u64);

    /// Asset downloads are starting.
    fn download_started(&self, total: usize);

    /// One asset finished downloading (or was dropped).
    fn download_advanced(&self, filename: &str);

    /// The whole ingestion run is done.
    fn finished(&self);
}

/// No-op reporter for library use and tests.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn stream_started(&self, _total_bytes: Option<u64>) {}
    fn stream_advanced(&self, _bytes: u64) {}
    fn download_started(&self, _total: usize) {}
    fn download_advanced(&self, _filename: &str) {}
    fn finished(&self) {}
}
