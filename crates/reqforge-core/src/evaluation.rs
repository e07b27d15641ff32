//! Criterion evaluators and the concurrent evaluation fan-out.
//!
//! Evaluators are registered once per criterion in an [`EvaluatorTable`].
//! [`evaluate_all`] scores a text against every requested criterion in
//! parallel tokio tasks; a failing, panicking, or missing evaluator yields
//! the neutral score for its criterion and never affects its siblings.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, instrument};

use crate::domain::{Context, CriterionKind, EvaluationSnapshot, EvaluatorError};
use crate::metrics::METRICS;
use crate::obs::emit_evaluator_degraded;

/// Score substituted for a criterion whose evaluation failed.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// External judge for one or more criteria.
///
/// Implementations are typically LLM-backed. All three operations may fail;
/// the orchestration layer absorbs every failure.
#[async_trait]
pub trait CriterionEvaluator: Send + Sync {
    /// Score `text` on `criterion`, in [0, 1].
    async fn evaluate(
        &self,
        text: &str,
        criterion: CriterionKind,
        context: &Context,
    ) -> Result<f64, EvaluatorError>;

    /// Suggest how to raise `criterion` from `score`.
    async fn suggest_fix(
        &self,
        text: &str,
        criterion: CriterionKind,
        score: f64,
        context: &Context,
    ) -> Result<String, EvaluatorError>;

    /// Rewrite `text` following `suggestion`.
    async fn apply_fix(
        &self,
        text: &str,
        criterion: CriterionKind,
        suggestion: &str,
        context: &Context,
    ) -> Result<String, EvaluatorError>;
}

/// Registration table from criterion kind to evaluator, built once.
#[derive(Clone, Default)]
pub struct EvaluatorTable {
    handlers: HashMap<CriterionKind, Arc<dyn CriterionEvaluator>>,
    fallback: Option<Arc<dyn CriterionEvaluator>>,
}

impl EvaluatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table where one judge handles every criterion.
    pub fn uniform(evaluator: Arc<dyn CriterionEvaluator>) -> Self {
        Self::new().with_default(evaluator)
    }

    /// Register `evaluator` for `criterion`, replacing any previous entry.
    pub fn with(mut self, criterion: CriterionKind, evaluator: Arc<dyn CriterionEvaluator>) -> Self {
        self.handlers.insert(criterion, evaluator);
        self
    }

    /// Evaluator for criteria without a dedicated entry.
    pub fn with_default(mut self, evaluator: Arc<dyn CriterionEvaluator>) -> Self {
        self.fallback = Some(evaluator);
        self
    }

    pub fn get(&self, criterion: CriterionKind) -> Option<Arc<dyn CriterionEvaluator>> {
        self.handlers
            .get(&criterion)
            .or(self.fallback.as_ref())
            .cloned()
    }

    pub fn is_registered(&self, criterion: CriterionKind) -> bool {
        self.handlers.contains_key(&criterion) || self.fallback.is_some()
    }
}

impl std::fmt::Debug for EvaluatorTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut registered: Vec<CriterionKind> = self.handlers.keys().copied().collect();
        registered.sort();
        f.debug_struct("EvaluatorTable")
            .field("registered", &registered)
            .field("has_default", &self.fallback.is_some())
            .finish()
    }
}

/// Fan-out limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanOutConfig {
    /// Maximum evaluator calls in flight at once.
    pub max_concurrent: usize,
    /// Score substituted for failed evaluations.
    pub neutral_score: f64,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            neutral_score: NEUTRAL_SCORE,
        }
    }
}

/// Validate a raw evaluator score. Non-finite scores are rejected; finite
/// scores are clamped into [0, 1].
pub(crate) fn sanitize_score(criterion: CriterionKind, raw: f64) -> Result<f64, EvaluatorError> {
    if !raw.is_finite() {
        return Err(EvaluatorError::Evaluation {
            criterion,
            reason: format!("non-finite score {raw}"),
        });
    }
    let clamped = raw.clamp(0.0, 1.0);
    if clamped != raw {
        debug!(criterion = %criterion, raw, clamped, "evaluator score clamped");
    }
    Ok(clamped)
}

/// Evaluate `text` against every criterion in `criteria` concurrently.
///
/// The returned snapshot always contains every requested criterion.
#[instrument(skip(table, criteria, text, context), fields(criteria = criteria.len()))]
pub async fn evaluate_all(
    table: &EvaluatorTable,
    criteria: &[CriterionKind],
    text: &str,
    context: &Arc<Context>,
    config: FanOutConfig,
) -> EvaluationSnapshot {
    let sem = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
    let text: Arc<str> = Arc::from(text);

    let mut tasks = Vec::with_capacity(criteria.len());
    for &criterion in criteria {
        let evaluator = table.get(criterion);
        let sem = Arc::clone(&sem);
        let text = Arc::clone(&text);
        let context = Arc::clone(context);

        let task = tokio::spawn(async move {
            let Some(evaluator) = evaluator else {
                return Err(EvaluatorError::Unregistered(criterion));
            };
            let _permit = sem.acquire_owned().await.ok();
            let raw = evaluator.evaluate(&text, criterion, &context).await?;
            sanitize_score(criterion, raw)
        });
        tasks.push((criterion, task));
    }

    let (kinds, handles): (Vec<CriterionKind>, Vec<_>) = tasks.into_iter().unzip();
    let outcomes = join_all(handles).await;
    METRICS.add_evaluations(kinds.len() as u64);

    kinds
        .into_iter()
        .zip(outcomes)
        .map(|(criterion, outcome)| {
            let score = match outcome {
                Ok(Ok(score)) => score,
                Ok(Err(e)) => {
                    METRICS.inc_evaluator_failures();
                    emit_evaluator_degraded(criterion, config.neutral_score, &e);
                    config.neutral_score
                }
                Err(join_err) => {
                    METRICS.inc_evaluator_failures();
                    let e = EvaluatorError::TaskAborted {
                        criterion,
                        reason: join_err.to_string(),
                    };
                    emit_evaluator_degraded(criterion, config.neutral_score, &e);
                    config.neutral_score
                }
            };
            (criterion, score)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(f64);

    #[async_trait]
    impl CriterionEvaluator for Fixed {
        async fn evaluate(
            &self,
            _text: &str,
            _criterion: CriterionKind,
            _context: &Context,
        ) -> Result<f64, EvaluatorError> {
            Ok(self.0)
        }

        async fn suggest_fix(
            &self,
            _text: &str,
            _criterion: CriterionKind,
            _score: f64,
            _context: &Context,
        ) -> Result<String, EvaluatorError> {
            Ok(String::new())
        }

        async fn apply_fix(
            &self,
            text: &str,
            _criterion: CriterionKind,
            _suggestion: &str,
            _context: &Context,
        ) -> Result<String, EvaluatorError> {
            Ok(text.to_string())
        }
    }

    #[test]
    fn sanitize_clamps_and_rejects_nan() {
        assert_eq!(sanitize_score(CriterionKind::Clarity, 1.4).unwrap(), 1.0);
        assert_eq!(sanitize_score(CriterionKind::Clarity, -0.2).unwrap(), 0.0);
        assert!(sanitize_score(CriterionKind::Clarity, f64::NAN).is_err());
    }

    #[test]
    fn table_prefers_dedicated_entry() {
        let table = EvaluatorTable::new()
            .with(CriterionKind::Clarity, Arc::new(Fixed(0.9)))
            .with_default(Arc::new(Fixed(0.1)));
        assert!(table.is_registered(CriterionKind::Testability));
        assert!(format!("{table:?}").contains("Clarity"));
    }

    #[tokio::test]
    async fn unregistered_criteria_score_neutral() {
        let table = EvaluatorTable::new().with(CriterionKind::Clarity, Arc::new(Fixed(0.9)));
        let context = Arc::new(Context::new());
        let snapshot = evaluate_all(
            &table,
            &[CriterionKind::Clarity, CriterionKind::Testability],
            "The system must export reports.",
            &context,
            FanOutConfig::default(),
        )
        .await;

        assert_eq!(snapshot.get(CriterionKind::Clarity), Some(0.9));
        assert_eq!(snapshot.get(CriterionKind::Testability), Some(NEUTRAL_SCORE));
    }

    #[tokio::test]
    async fn out_of_range_scores_are_clamped() {
        let table = EvaluatorTable::uniform(Arc::new(Fixed(3.0)));
        let context = Arc::new(Context::new());
        let snapshot = evaluate_all(
            &table,
            &CriterionKind::ALL,
            "text",
            &context,
            FanOutConfig {
                max_concurrent: 2,
                neutral_score: NEUTRAL_SCORE,
            },
        )
        .await;
        assert_eq!(snapshot.len(), 9);
        assert!(snapshot.iter().all(|(_, s)| s == 1.0));
    }
}
