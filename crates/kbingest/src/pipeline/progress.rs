/// Receives embed progress for individual files.
///
/// Called from the task that owns the file's request, so implementations
/// must be cheap and must not block.
pub trait EmbedObserver: Send + Sync {
    /// `progress` is 0 when the request starts and 100 once it is acknowledged.
    fn on_progress(&self, file_id: &str, progress: u8);

    fn on_failed(&self, _file_id: &str, _error: &str) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl EmbedObserver for NoopObserver {
    fn on_progress(&self, _file_id: &str, _progress: u8) {}
}
