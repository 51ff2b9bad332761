// Performance metrics module
//
// Lightweight counters for extraction and resource loading

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Shared performance metrics
///
/// Uses atomic operations for thread-safe tracking without locks. One
/// instance is created by the entry point and shared by the extractor, the
/// completion gate and the resource manager.
#[derive(Debug)]
pub struct Metrics {
    /// Locale paks copied out of the asset source
    pub files_copied: AtomicUsize,

    /// Total bytes written by extraction
    pub bytes_copied: AtomicU64,

    /// Stale paks and legacy files removed
    pub files_deleted: AtomicUsize,

    /// Extraction runs that found everything already in place
    pub fast_path_runs: AtomicUsize,

    /// Completion callbacks posted by the gate
    pub callbacks_dispatched: AtomicU64,

    /// Resources stored in the registry
    pub resources_loaded: AtomicU64,

    /// Loads that produced nothing (silently dropped)
    pub resources_dropped: AtomicU64,

    /// Resource-ready notifications delivered to the native consumer
    pub native_notifications: AtomicU64,

    /// Application start time
    start_time: Instant,
}

/// Point-in-time copy of [`Metrics`] counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub files_copied: usize,
    pub bytes_copied: u64,
    pub files_deleted: usize,
    pub fast_path_runs: usize,
    pub callbacks_dispatched: u64,
    pub resources_loaded: u64,
    pub resources_dropped: u64,
    pub native_notifications: u64,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self {
            files_copied: AtomicUsize::new(0),
            bytes_copied: AtomicU64::new(0),
            files_deleted: AtomicUsize::new(0),
            fast_path_runs: AtomicUsize::new(0),
            callbacks_dispatched: AtomicU64::new(0),
            resources_loaded: AtomicU64::new(0),
            resources_dropped: AtomicU64::new(0),
            native_notifications: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record one extracted file of `bytes` bytes
    pub fn record_file_copied(&self, bytes: u64) {
        self.files_copied.fetch_add(1, Ordering::Relaxed);
        self.bytes_copied.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_file_deleted(&self) {
        self.files_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fast_path(&self) {
        self.fast_path_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_callback_dispatched(&self) {
        self.callbacks_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resource_loaded(&self) {
        self.resources_loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resource_dropped(&self) {
        self.resources_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_native_notification(&self) {
        self.native_notifications.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_copied: self.files_copied.load(Ordering::Relaxed),
            bytes_copied: self.bytes_copied.load(Ordering::Relaxed),
            files_deleted: self.files_deleted.load(Ordering::Relaxed),
            fast_path_runs: self.fast_path_runs.load(Ordering::Relaxed),
            callbacks_dispatched: self.callbacks_dispatched.load(Ordering::Relaxed),
            resources_loaded: self.resources_loaded.load(Ordering::Relaxed),
            resources_dropped: self.resources_dropped.load(Ordering::Relaxed),
            native_notifications: self.native_notifications.load(Ordering::Relaxed),
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        let s = self.snapshot();
        tracing::info!("=== Performance Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Extraction: {} copied ({} bytes), {} deleted, {} fast-path run(s)",
            s.files_copied,
            s.bytes_copied,
            s.files_deleted,
            s.fast_path_runs
        );
        tracing::info!(
            "Resources: {} loaded, {} dropped, {} native notifications",
            s.resources_loaded,
            s.resources_dropped,
            s.native_notifications
        );
        tracing::info!("Completion callbacks dispatched: {}", s.callbacks_dispatched);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
