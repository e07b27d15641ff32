//! Iteration history and the terminal validation record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::criterion::CriterionKind;
use crate::domain::snapshot::EvaluationSnapshot;
use crate::health::HealthReport;

/// One attempted repair of a single criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixRecord {
    pub criterion: CriterionKind,
    pub old_text: String,
    pub new_text: String,
    pub suggestion: String,
    pub score_before: f64,
    pub score_after: f64,
}

impl FixRecord {
    pub fn improvement(&self) -> f64 {
        self.score_after - self.score_before
    }
}

/// One evaluate → split/fix → re-evaluate pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Iteration {
    /// 1-based iteration number.
    pub index: u32,
    /// Repair phases worked on in this pass (`"split"` when the pass split).
    pub phase_label: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub text_at_start: String,
    /// Fan-out scores for `text_at_start`.
    pub scores: EvaluationSnapshot,
    pub overall_score: f64,
    pub fixes_applied: Vec<FixRecord>,
    pub split_occurred: bool,
    pub split_children: Vec<String>,
    /// Text after the fix pass.
    pub text_at_end: String,
    /// Fan-out scores for `text_at_end`, present when fixes were applied.
    pub rescored: Option<EvaluationSnapshot>,
    pub rescored_overall: Option<f64>,
}

impl Iteration {
    pub(crate) fn begin(
        index: u32,
        text_at_start: String,
        scores: EvaluationSnapshot,
        overall_score: f64,
    ) -> Self {
        Self {
            index,
            phase_label: None,
            timestamp: Utc::now(),
            text_at_end: text_at_start.clone(),
            text_at_start,
            scores,
            overall_score,
            fixes_applied: Vec::new(),
            split_occurred: false,
            split_children: Vec::new(),
            rescored: None,
            rescored_overall: None,
        }
    }

    /// The most recent scores of this pass and the text they describe.
    pub fn latest_evaluation(&self) -> (&str, &EvaluationSnapshot, f64) {
        match (&self.rescored, self.rescored_overall) {
            (Some(scores), Some(overall)) => (&self.text_at_end, scores, overall),
            _ => (&self.text_at_start, &self.scores, self.overall_score),
        }
    }
}

/// Terminal artifact of one `process` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub run_id: Uuid,
    pub requirement_id: String,
    pub original_text: String,
    pub final_text: String,
    pub iterations: Vec<Iteration>,
    pub passed: bool,
    pub final_score: f64,
    pub final_scores: EvaluationSnapshot,
    pub split_occurred: bool,
    pub split_children: Vec<String>,
    pub total_fixes: usize,
    pub health: Option<HealthReport>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ValidationResult {
    pub fn new(requirement_id: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            run_id: Uuid::new_v4(),
            requirement_id: requirement_id.into(),
            final_text: text.clone(),
            original_text: text,
            iterations: Vec::new(),
            passed: false,
            final_score: 0.0,
            final_scores: EvaluationSnapshot::default(),
            split_occurred: false,
            split_children: Vec::new(),
            total_fixes: 0,
            health: None,
            error_message: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Append a finished iteration and account for its fixes.
    pub(crate) fn record(&mut self, iteration: Iteration) {
        self.total_fixes += iteration.fixes_applied.len();
        self.iterations.push(iteration);
    }

    pub fn last_iteration(&self) -> Option<&Iteration> {
        self.iterations.last()
    }

    pub fn fixes(&self) -> impl Iterator<Item = &FixRecord> {
        self.iterations.iter().flat_map(|i| i.fixes_applied.iter())
    }

    pub fn is_error(&self) -> bool {
        self.error_message.is_some()
    }

    /// One-line human-readable outcome.
    pub fn summary(&self) -> String {
        let outcome = if let Some(err) = &self.error_message {
            format!("error ({err})")
        } else if self.split_occurred {
            format!("split into {} requirements", self.split_children.len())
        } else if self.passed {
            "passed".to_string()
        } else {
            "not passed".to_string()
        };
        format!(
            "{}: {} after {} iteration(s), score {:.2}, {} fix(es)",
            self.requirement_id,
            outcome,
            self.iterations.len(),
            self.final_score,
            self.total_fixes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(criterion: CriterionKind) -> FixRecord {
        FixRecord {
            criterion,
            old_text: "a".to_string(),
            new_text: "b".to_string(),
            suggestion: "do b".to_string(),
            score_before: 0.4,
            score_after: 0.8,
        }
    }

    #[test]
    fn new_result_starts_from_original_text() {
        let result = ValidationResult::new("REQ-1", "The system must log in users.");
        assert_eq!(result.final_text, result.original_text);
        assert!(!result.passed);
        assert!(result.iterations.is_empty());
        assert_eq!(result.total_fixes, 0);
    }

    #[test]
    fn record_accumulates_fix_count() {
        let mut result = ValidationResult::new("REQ-1", "text");
        let mut first = Iteration::begin(1, "text".to_string(), EvaluationSnapshot::default(), 0.5);
        first.fixes_applied = vec![fix(CriterionKind::Clarity), fix(CriterionKind::Testability)];
        result.record(first);
        let second = Iteration::begin(2, "text".to_string(), EvaluationSnapshot::default(), 0.5);
        result.record(second);

        assert_eq!(result.total_fixes, 2);
        assert_eq!(result.fixes().count(), 2);
        assert_eq!(result.last_iteration().map(|i| i.index), Some(2));
    }

    #[test]
    fn latest_evaluation_prefers_rescored_snapshot() {
        let start: EvaluationSnapshot = [(CriterionKind::Clarity, 0.4)].into_iter().collect();
        let after: EvaluationSnapshot = [(CriterionKind::Clarity, 0.9)].into_iter().collect();
        let mut iteration = Iteration::begin(1, "old".to_string(), start, 0.4);
        assert_eq!(iteration.latest_evaluation().0, "old");

        iteration.text_at_end = "new".to_string();
        iteration.rescored = Some(after.clone());
        iteration.rescored_overall = Some(0.9);
        let (text, scores, overall) = iteration.latest_evaluation();
        assert_eq!(text, "new");
        assert_eq!(scores, &after);
        assert_eq!(overall, 0.9);
    }

    #[test]
    fn summary_mentions_outcome() {
        let mut result = ValidationResult::new("REQ-7", "text");
        result.split_occurred = true;
        result.split_children = vec!["a".to_string(), "b".to_string()];
        assert!(result.summary().contains("split into 2"));

        result.error_message = Some("boom".to_string());
        assert!(result.summary().contains("error (boom)"));
    }
}
