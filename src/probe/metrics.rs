use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counters describing how the capability probe has behaved
#[derive(Debug, Default)]
pub struct ProbeMetrics {
    probes_run: AtomicU64,
    probes_coalesced: AtomicU64,
    xr_timeouts: AtomicU64,
    xr_rejections: AtomicU64,
    xr_cache_hits: AtomicU64,
    results_discarded: AtomicU64,
    last_probe_time: RwLock<Option<Duration>>,
}

impl ProbeMetrics {
    /// Create a new instance of ProbeMetrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed probe and how long it took
    pub fn record_probe(&self, duration: Duration) {
        self.probes_run.fetch_add(1, Ordering::Relaxed);
        *self.last_probe_time.write() = Some(duration);
    }

    /// Record a detect call ignored because another was in flight
    pub fn record_coalesced(&self) {
        self.probes_coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_xr_timeout(&self) {
        self.xr_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_xr_rejection(&self) {
        self.xr_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an XR answer served from the re-probe interval cache
    pub fn record_xr_cache_hit(&self) {
        self.xr_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a result dropped because the probe was disposed
    pub fn record_discarded(&self) {
        self.results_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn probes_run(&self) -> u64 {
        self.probes_run.load(Ordering::Relaxed)
    }

    pub fn probes_coalesced(&self) -> u64 {
        self.probes_coalesced.load(Ordering::Relaxed)
    }

    pub fn xr_timeouts(&self) -> u64 {
        self.xr_timeouts.load(Ordering::Relaxed)
    }

    pub fn xr_rejections(&self) -> u64 {
        self.xr_rejections.load(Ordering::Relaxed)
    }

    pub fn xr_cache_hits(&self) -> u64 {
        self.xr_cache_hits.load(Ordering::Relaxed)
    }

    pub fn results_discarded(&self) -> u64 {
        self.results_discarded.load(Ordering::Relaxed)
    }

    /// Duration of the most recent completed probe
    pub fn last_probe_time(&self) -> Option<Duration> {
        *self.last_probe_time.read()
    }
}

/// A thread-safe wrapper around ProbeMetrics
#[derive(Debug, Clone, Default)]
pub struct ProbeMetricsHandle(Arc<ProbeMetrics>);

impl ProbeMetricsHandle {
    /// Create a new metrics handle
    pub fn new() -> Self {
        Self(Arc::new(ProbeMetrics::new()))
    }

    /// Get a reference to the underlying metrics
    pub fn inner(&self) -> &ProbeMetrics {
        &self.0
    }
}

impl std::ops::Deref for ProbeMetricsHandle {
    type Target = ProbeMetrics;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
