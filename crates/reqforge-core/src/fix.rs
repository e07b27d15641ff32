//! Fix engine: suggest → apply → re-score for a single criterion.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Context, CriterionKind, EvaluatorError, FixRecord};
use crate::evaluation::{sanitize_score, CriterionEvaluator};
use crate::obs::emit_fix_attempted;

/// Outcome of one repair attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixOutcome {
    /// `true` only when `score_after > score_before`.
    pub fixed: bool,
    pub old_text: String,
    pub new_text: String,
    pub suggestion: String,
    pub score_before: f64,
    pub score_after: f64,
}

impl FixOutcome {
    pub fn into_record(self, criterion: CriterionKind) -> FixRecord {
        FixRecord {
            criterion,
            old_text: self.old_text,
            new_text: self.new_text,
            suggestion: self.suggestion,
            score_before: self.score_before,
            score_after: self.score_after,
        }
    }
}

/// Repair `criterion` on `text` and verify the repair.
///
/// Only the targeted criterion is re-scored. A rewrite identical to the
/// input is not re-scored and counts as no improvement. An empty rewrite is
/// an application error. Both texts are recorded trimmed.
pub async fn attempt_fix(
    evaluator: &dyn CriterionEvaluator,
    criterion: CriterionKind,
    text: &str,
    current_score: f64,
    context: &Context,
) -> Result<FixOutcome, EvaluatorError> {
    let suggestion = evaluator
        .suggest_fix(text, criterion, current_score, context)
        .await?;

    let new_text = evaluator
        .apply_fix(text, criterion, &suggestion, context)
        .await?;
    let old_text = text.trim();
    let new_text = new_text.trim().to_string();
    if new_text.is_empty() {
        return Err(EvaluatorError::Application {
            criterion,
            reason: "rewrite is empty".to_string(),
        });
    }

    let score_after = if new_text == old_text {
        debug!(criterion = %criterion, "rewrite left text unchanged");
        current_score
    } else {
        let raw = evaluator.evaluate(&new_text, criterion, context).await?;
        sanitize_score(criterion, raw)?
    };

    let fixed = score_after > current_score;
    emit_fix_attempted(criterion, current_score, score_after, fixed);

    Ok(FixOutcome {
        fixed,
        old_text: old_text.to_string(),
        new_text,
        suggestion,
        score_before: current_score,
        score_after,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Appends a marker on apply and scores marked text at `after`.
    struct Rewriter {
        after: f64,
        apply_result: Option<String>,
    }

    #[async_trait]
    impl CriterionEvaluator for Rewriter {
        async fn evaluate(
            &self,
            text: &str,
            _criterion: CriterionKind,
            _context: &Context,
        ) -> Result<f64, EvaluatorError> {
            Ok(if text.ends_with("[fixed]") { self.after } else { 0.4 })
        }

        async fn suggest_fix(
            &self,
            _text: &str,
            criterion: CriterionKind,
            _score: f64,
            _context: &Context,
        ) -> Result<String, EvaluatorError> {
            Ok(format!("improve {criterion}"))
        }

        async fn apply_fix(
            &self,
            text: &str,
            _criterion: CriterionKind,
            _suggestion: &str,
            _context: &Context,
        ) -> Result<String, EvaluatorError> {
            Ok(self
                .apply_result
                .clone()
                .unwrap_or_else(|| format!("{text} [fixed]")))
        }
    }

    #[tokio::test]
    async fn improvement_is_fixed() {
        let evaluator = Rewriter {
            after: 0.8,
            apply_result: None,
        };
        let ctx = Context::new();
        let outcome = attempt_fix(&evaluator, CriterionKind::Clarity, "The app must be fast", 0.4, &ctx)
            .await
            .unwrap();
        assert!(outcome.fixed);
        assert_eq!(outcome.new_text, "The app must be fast [fixed]");
        assert_eq!(outcome.suggestion, "improve clarity");
        assert_eq!(outcome.score_after, 0.8);

        let record = outcome.into_record(CriterionKind::Clarity);
        assert!((record.improvement() - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn equal_score_is_not_fixed() {
        let evaluator = Rewriter {
            after: 0.4,
            apply_result: None,
        };
        let outcome = attempt_fix(&evaluator, CriterionKind::Clarity, "text", 0.4, &Context::new())
            .await
            .unwrap();
        assert!(!outcome.fixed);
    }

    #[tokio::test]
    async fn unchanged_rewrite_is_not_rescored() {
        let evaluator = Rewriter {
            after: 1.0,
            apply_result: Some("same text".to_string()),
        };
        let ctx = Context::new();
        let outcome = attempt_fix(&evaluator, CriterionKind::Clarity, "same text", 0.3, &ctx)
            .await
            .unwrap();
        assert!(!outcome.fixed);
        assert_eq!(outcome.score_after, 0.3);
    }

    #[tokio::test]
    async fn padded_input_is_recorded_trimmed() {
        let evaluator = Rewriter {
            after: 0.8,
            apply_result: Some("  The app must respond in 2s \n".to_string()),
        };
        let ctx = Context::new();
        let text = "\tThe app must respond in 2s  ";
        let outcome = attempt_fix(&evaluator, CriterionKind::Clarity, text, 0.4, &ctx)
            .await
            .unwrap();
        assert_eq!(outcome.old_text, "The app must respond in 2s");
        assert_eq!(outcome.new_text, outcome.old_text);
        assert!(!outcome.fixed);
        assert_eq!(outcome.score_after, 0.4);
    }

    #[tokio::test]
    async fn empty_rewrite_is_an_error() {
        let evaluator = Rewriter {
            after: 1.0,
            apply_result: Some("   ".to_string()),
        };
        let err = attempt_fix(&evaluator, CriterionKind::Clarity, "text", 0.3, &Context::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluatorError::Application { .. }));
    }
}
