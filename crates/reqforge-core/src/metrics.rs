//! Global atomic counters for reqforge observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a batch).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations and no locking.
pub struct Metrics {
    validations_started: AtomicU64,
    validations_passed: AtomicU64,
    validation_errors: AtomicU64,
    evaluations_run: AtomicU64,
    evaluator_failures: AtomicU64,
    fix_attempts: AtomicU64,
    fixes_applied: AtomicU64,
    splits: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            validations_started: AtomicU64::new(0),
            validations_passed: AtomicU64::new(0),
            validation_errors: AtomicU64::new(0),
            evaluations_run: AtomicU64::new(0),
            evaluator_failures: AtomicU64::new(0),
            fix_attempts: AtomicU64::new(0),
            fixes_applied: AtomicU64::new(0),
            splits: AtomicU64::new(0),
        }
    }

    pub fn inc_validations_started(&self) {
        self.validations_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_validations_passed(&self) {
        self.validations_passed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_validation_errors(&self) {
        self.validation_errors.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "validation_errors", "counter incremented");
    }

    /// Count `n` criterion evaluations (one fan-out round).
    pub fn add_evaluations(&self, n: u64) {
        self.evaluations_run.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_evaluator_failures(&self) {
        self.evaluator_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "evaluator_failures", "counter incremented");
    }

    pub fn inc_fix_attempts(&self) {
        self.fix_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fixes_applied(&self) {
        self.fixes_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_splits(&self) {
        self.splits.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (end of a batch, service tick, etc.)
    /// rather than on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            validations_started = self.validations_started(),
            validations_passed = self.validations_passed(),
            validation_errors = self.validation_errors(),
            evaluations_run = self.evaluations_run(),
            evaluator_failures = self.evaluator_failures(),
            fix_attempts = self.fix_attempts(),
            fixes_applied = self.fixes_applied(),
            splits = self.splits(),
            "metrics snapshot"
        );
    }

    pub fn validations_started(&self) -> u64 {
        self.validations_started.load(Ordering::Relaxed)
    }

    pub fn validations_passed(&self) -> u64 {
        self.validations_passed.load(Ordering::Relaxed)
    }

    pub fn validation_errors(&self) -> u64 {
        self.validation_errors.load(Ordering::Relaxed)
    }

    pub fn evaluations_run(&self) -> u64 {
        self.evaluations_run.load(Ordering::Relaxed)
    }

    pub fn evaluator_failures(&self) -> u64 {
        self.evaluator_failures.load(Ordering::Relaxed)
    }

    pub fn fix_attempts(&self) -> u64 {
        self.fix_attempts.load(Ordering::Relaxed)
    }

    pub fn fixes_applied(&self) -> u64 {
        self.fixes_applied.load(Ordering::Relaxed)
    }

    pub fn splits(&self) -> u64 {
        self.splits.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_independent() {
        let metrics = Metrics::new();
        metrics.add_evaluations(9);
        metrics.inc_evaluator_failures();
        metrics.inc_fix_attempts();
        metrics.inc_fix_attempts();
        metrics.inc_fixes_applied();

        assert_eq!(metrics.evaluations_run(), 9);
        assert_eq!(metrics.evaluator_failures(), 1);
        assert_eq!(metrics.fix_attempts(), 2);
        assert_eq!(metrics.fixes_applied(), 1);
        assert_eq!(metrics.splits(), 0);
        metrics.flush();
    }
}
