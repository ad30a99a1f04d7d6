//! Global atomic counters for pipeline observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. when the CLI exits).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Atomic counters for pipeline outcomes.
pub struct Metrics {
    extractions_succeeded: AtomicU64,
    extractions_failed: AtomicU64,
    comparisons: AtomicU64,
    metric_scores: AtomicU64,
    metric_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            extractions_succeeded: AtomicU64::new(0),
            extractions_failed: AtomicU64::new(0),
            comparisons: AtomicU64::new(0),
            metric_scores: AtomicU64::new(0),
            metric_failures: AtomicU64::new(0),
        }
    }

    pub fn inc_extraction(&self, succeeded: bool) {
        if succeeded {
            self.extractions_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.extractions_failed.fetch_add(1, Ordering::Relaxed);
        }
        tracing::trace!(metric = "extractions", succeeded, "counter incremented");
    }

    pub fn inc_comparisons(&self) {
        self.comparisons.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "comparisons", "counter incremented");
    }

    pub fn inc_metric(&self, scored: bool) {
        if scored {
            self.metric_scores.fetch_add(1, Ordering::Relaxed);
        } else {
            self.metric_failures.fetch_add(1, Ordering::Relaxed);
        }
        tracing::trace!(metric = "metric_results", scored, "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            extractions_succeeded = self.extractions_succeeded(),
            extractions_failed = self.extractions_failed(),
            comparisons = self.comparisons(),
            metric_scores = self.metric_scores(),
            metric_failures = self.metric_failures(),
        );
    }

    pub fn extractions_succeeded(&self) -> u64 {
        self.extractions_succeeded.load(Ordering::Relaxed)
    }

    pub fn extractions_failed(&self) -> u64 {
        self.extractions_failed.load(Ordering::Relaxed)
    }

    pub fn comparisons(&self) -> u64 {
        self.comparisons.load(Ordering::Relaxed)
    }

    pub fn metric_scores(&self) -> u64 {
        self.metric_scores.load(Ordering::Relaxed)
    }

    pub fn metric_failures(&self) -> u64 {
        self.metric_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.extractions_succeeded.store(0, Ordering::Relaxed);
        self.extractions_failed.store(0, Ordering::Relaxed);
        self.comparisons.store(0, Ordering::Relaxed);
        self.metric_scores.store(0, Ordering::Relaxed);
        self.metric_failures.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_extraction(true);
        m.inc_extraction(true);
        m.inc_extraction(false);
        assert_eq!(m.extractions_succeeded(), 2);
        assert_eq!(m.extractions_failed(), 1);

        m.inc_metric(false);
        m.inc_comparisons();
        assert_eq!(m.metric_failures(), 1);
        assert_eq!(m.metric_scores(), 0);
        assert_eq!(m.comparisons(), 1);
    }

    #[test]
    fn reset_zeroes_everything() {
        let m = Metrics::new();
        m.inc_extraction(true);
        m.inc_metric(true);
        m.reset();
        assert_eq!(m.extractions_succeeded(), 0);
        assert_eq!(m.metric_scores(), 0);
    }
}
