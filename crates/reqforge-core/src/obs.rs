//! Structured observability hooks for the validation lifecycle.
//!
//! - `requirement_span` scoping all logs of one `process` call
//! - `emit_*` helpers for the lifecycle points operators grep for
//!
//! These are log events only; the caller-facing progress stream is the
//! [`crate::events`] sink.

use tracing::{info, warn};

use crate::domain::CriterionKind;

/// Requirement-scoped span for one processing run. Attach it to the run's
/// future with `tracing::Instrument`; an entered span must not be held
/// across `.await`.
pub fn requirement_span(requirement_id: &str, run_id: &str) -> tracing::Span {
    tracing::info_span!(
        "reqforge.validate",
        requirement_id = %requirement_id,
        run_id = %run_id,
    )
}

/// Emit event: validation started.
pub fn emit_validation_started(requirement_id: &str, word_count: usize, max_iterations: u32) {
    info!(
        event = "validation.started",
        requirement_id = %requirement_id,
        word_count,
        max_iterations,
    );
}

/// Emit event: validation finished with its terminal outcome.
pub fn emit_validation_finished(
    requirement_id: &str,
    passed: bool,
    split: bool,
    iterations: usize,
    total_fixes: usize,
    final_score: f64,
) {
    info!(
        event = "validation.finished",
        requirement_id = %requirement_id,
        passed,
        split,
        iterations,
        total_fixes,
        final_score,
    );
}

/// Emit event: an evaluator failed and its score was replaced.
pub fn emit_evaluator_degraded(criterion: CriterionKind, neutral: f64, error: &dyn std::fmt::Display) {
    warn!(
        event = "evaluator.degraded",
        criterion = %criterion,
        neutral_score = neutral,
        error = %error,
    );
}

/// Emit event: one fix attempt finished.
pub fn emit_fix_attempted(
    criterion: CriterionKind,
    score_before: f64,
    score_after: f64,
    improved: bool,
) {
    info!(
        event = "fix.attempted",
        criterion = %criterion,
        score_before,
        score_after,
        improved,
    );
}

/// Emit event: requirement split into children.
pub fn emit_split_performed(requirement_id: &str, children: usize) {
    info!(event = "split.performed", requirement_id = %requirement_id, children);
}

/// Emit event: unexpected error aborted processing (warning level).
pub fn emit_validation_aborted(requirement_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "validation.aborted", requirement_id = %requirement_id, error = %error);
}
