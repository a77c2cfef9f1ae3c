//! Global atomic counters for ODAVL observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a pipeline cycle).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters: no allocations, no locking.
pub struct Metrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    adapter_invocations: AtomicU64,
    rotations: AtomicU64,
    pipeline_runs: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            adapter_invocations: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
            pipeline_runs: AtomicU64::new(0),
        }
    }

    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "cache_hits", "counter incremented");
    }

    pub fn inc_cache_misses(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "cache_misses", "counter incremented");
    }

    /// Increment once per real call into a collaborator adapter.
    pub fn inc_adapter_invocations(&self) {
        self.adapter_invocations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "adapter_invocations", "counter incremented");
    }

    pub fn inc_rotations(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "rotations", "counter incremented");
    }

    pub fn inc_pipeline_runs(&self) {
        self.pipeline_runs.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "pipeline_runs", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            cache_hits = self.cache_hits(),
            cache_misses = self.cache_misses(),
            adapter_invocations = self.adapter_invocations(),
            rotations = self.rotations(),
            pipeline_runs = self.pipeline_runs(),
        );
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn adapter_invocations(&self) -> u64 {
        self.adapter_invocations.load(Ordering::Relaxed)
    }

    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    pub fn pipeline_runs(&self) -> u64 {
        self.pipeline_runs.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.adapter_invocations.store(0, Ordering::Relaxed);
        self.rotations.store(0, Ordering::Relaxed);
        self.pipeline_runs.store(0, Ordering::Relaxed);
    }
}
