//! The validation loop.
//!
//! [`Orchestrator::process`] drives one requirement through
//! health check → evaluate → split or fix → re-evaluate, bounded by
//! `max_iterations`, and reports progress to an [`EventSink`].
//!
//! Processing never fails outward: collaborator failures degrade to neutral
//! scores or skipped fixes, and anything unexpected (including a panic)
//! ends up in `ValidationResult::error_message`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tracing::{debug, info, warn, Instrument};

use crate::config::OrchestratorConfig;
use crate::domain::{
    Context, CriterionKind, EvaluationSnapshot, FixRecord, Iteration, RepairPhase, ReqforgeError,
    Result, ValidationResult,
};
use crate::evaluation::{self, EvaluatorTable};
use crate::events::{EventSink, ValidationEvent};
use crate::fix::attempt_fix;
use crate::health::check_health;
use crate::metrics::METRICS;
use crate::obs::{
    emit_split_performed, emit_validation_aborted, emit_validation_finished,
    emit_validation_started, requirement_span,
};
use crate::registry::CriteriaRegistry;
use crate::scoring::{score_tiers, TierResult};
use crate::splitter::{attempt_split, Splitter};

/// Phase label recorded on an iteration that split.
pub const SPLIT_PHASE_LABEL: &str = "split";

/// Sink wrapper that never lets observer failures reach the loop.
struct Emitter<'a> {
    sink: &'a dyn EventSink,
}

impl Emitter<'_> {
    fn emit(&self, event: ValidationEvent) {
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| self.sink.emit(&event)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(event_type = event.event_type(), error = %e, "event sink rejected event");
            }
            Err(payload) => {
                warn!(
                    event_type = event.event_type(),
                    panic = %panic_message(payload.as_ref()),
                    "event sink panicked"
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Result of one sequential fix pass.
struct FixPass {
    text: String,
    fixes: Vec<FixRecord>,
    phases: Vec<RepairPhase>,
}

/// Drives requirements through the evaluate/split/fix loop.
///
/// Holds only immutable, shared state; one orchestrator may process many
/// requirements concurrently.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<CriteriaRegistry>,
    evaluators: Arc<EvaluatorTable>,
    splitter: Option<Arc<dyn Splitter>>,
    config: OrchestratorConfig,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("evaluators", &self.evaluators)
            .field("has_splitter", &self.splitter.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(
        registry: Arc<CriteriaRegistry>,
        evaluators: EvaluatorTable,
        config: OrchestratorConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry,
            evaluators: Arc::new(evaluators),
            splitter: None,
            config,
        })
    }

    pub fn with_splitter(mut self, splitter: Arc<dyn Splitter>) -> Self {
        self.splitter = Some(splitter);
        self
    }

    pub fn registry(&self) -> &CriteriaRegistry {
        &self.registry
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Score `text` on every active criterion.
    pub async fn evaluate_all(&self, text: &str, context: &Context) -> EvaluationSnapshot {
        let context = Arc::new(context.clone());
        self.fan_out(text, &context).await
    }

    async fn fan_out(&self, text: &str, context: &Arc<Context>) -> EvaluationSnapshot {
        let criteria: Vec<CriterionKind> = self.registry.active_criteria().collect();
        evaluation::evaluate_all(&self.evaluators, &criteria, text, context, self.config.fan_out())
            .await
    }

    /// Validate and repair one requirement.
    ///
    /// Always returns a result. Unexpected failures set `error_message` and
    /// emit `validation_error`; whatever history was gathered is kept.
    pub async fn process(
        &self,
        requirement_id: &str,
        text: &str,
        context: Context,
        sink: &dyn EventSink,
    ) -> ValidationResult {
        let mut result = ValidationResult::new(requirement_id, text);
        let span = requirement_span(requirement_id, &result.run_id.to_string());
        let emitter = Emitter { sink };
        let context = Arc::new(context);

        METRICS.inc_validations_started();

        let outcome = AssertUnwindSafe(self.run(&mut result, &context, &emitter))
            .catch_unwind()
            .instrument(span.clone())
            .await;

        let _entered = span.enter();
        let error = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(payload) => Some(ReqforgeError::Internal(format!(
                "processing panicked: {}",
                panic_message(payload.as_ref())
            ))),
        };

        if let Some(e) = error {
            METRICS.inc_validation_errors();
            emit_validation_aborted(requirement_id, &e);
            result.passed = false;
            result.error_message = Some(e.to_string());
            emitter.emit(ValidationEvent::ValidationError {
                requirement_id: requirement_id.to_string(),
                error: e.to_string(),
            });
        } else if result.passed {
            METRICS.inc_validations_passed();
        }

        result.finished_at = Some(Utc::now());
        emit_validation_finished(
            requirement_id,
            result.passed,
            result.split_occurred,
            result.iterations.len(),
            result.total_fixes,
            result.final_score,
        );
        result
    }

    async fn run(
        &self,
        result: &mut ValidationResult,
        context: &Arc<Context>,
        emitter: &Emitter<'_>,
    ) -> Result<()> {
        let requirement_id = result.requirement_id.clone();

        let health = check_health(&result.original_text);
        emit_validation_started(&requirement_id, health.word_count, self.config.max_iterations);
        if !health.passed {
            info!(issues = health.issues.len(), "health check flagged critical issues; continuing");
        }
        result.health = Some(health.clone());
        emitter.emit(ValidationEvent::HealthCheckCompleted {
            requirement_id: requirement_id.clone(),
            report: health,
        });

        if self.registry.is_empty() {
            return Err(ReqforgeError::NoActiveCriteria);
        }

        let mut current_text = result.original_text.clone();

        for index in 1..=self.config.max_iterations {
            emitter.emit(ValidationEvent::EvaluationStarted {
                requirement_id: requirement_id.clone(),
                iteration: index,
                text: current_text.clone(),
            });

            let scores = self.fan_out(&current_text, context).await;
            let verdict = score_tiers(&scores, &self.registry);
            debug!(
                iteration = index,
                overall = verdict.overall_score,
                failing = verdict.failing_criteria.len(),
                "iteration scored"
            );
            emitter.emit(ValidationEvent::EvaluationCompleted {
                requirement_id: requirement_id.clone(),
                iteration: index,
                scores: scores.clone(),
                overall_score: verdict.overall_score,
                tier_averages: verdict.tier_averages,
                passed: verdict.passed,
                feedback: verdict.feedback.clone(),
            });

            let mut iteration =
                Iteration::begin(index, current_text.clone(), scores, verdict.overall_score);

            if verdict.passed {
                result.record(iteration);
                result.passed = true;
                emitter.emit(ValidationEvent::ValidationSuccess {
                    requirement_id: requirement_id.clone(),
                    iteration: index,
                    final_text: current_text.clone(),
                    final_score: verdict.overall_score,
                });
                break;
            }

            if verdict.is_failing(CriterionKind::Atomic) {
                let outcome = attempt_split(
                    self.splitter.as_deref(),
                    &current_text,
                    context,
                    self.config.max_splits,
                )
                .await;

                if outcome.split_occurred {
                    METRICS.inc_splits();
                    emit_split_performed(&requirement_id, outcome.children.len());

                    iteration.phase_label = Some(SPLIT_PHASE_LABEL.to_string());
                    iteration.split_occurred = true;
                    iteration.split_children = outcome.children.clone();
                    result.split_occurred = true;
                    result.split_children = outcome.children.clone();
                    result.record(iteration);

                    emitter.emit(ValidationEvent::RequirementSplit {
                        requirement_id: requirement_id.clone(),
                        iteration: index,
                        children: outcome.children,
                    });
                    break;
                }
            }

            let pass = self
                .fix_pass(
                    &requirement_id,
                    index,
                    &current_text,
                    &iteration.scores,
                    &verdict,
                    context,
                    emitter,
                )
                .await;

            if !pass.phases.is_empty() {
                let labels: Vec<&str> = pass.phases.iter().map(|p| p.label()).collect();
                iteration.phase_label = Some(labels.join(","));
            }
            iteration.text_at_end = pass.text.clone();
            iteration.fixes_applied = pass.fixes;
            current_text = pass.text;

            let fixed_any = !iteration.fixes_applied.is_empty();
            if fixed_any {
                let rescored = self.fan_out(&current_text, context).await;
                let reverdict = score_tiers(&rescored, &self.registry);
                iteration.rescored = Some(rescored);
                iteration.rescored_overall = Some(reverdict.overall_score);

                if reverdict.passed {
                    result.record(iteration);
                    result.passed = true;
                    emitter.emit(ValidationEvent::ValidationSuccess {
                        requirement_id: requirement_id.clone(),
                        iteration: index,
                        final_text: current_text.clone(),
                        final_score: reverdict.overall_score,
                    });
                    break;
                }
            }

            result.record(iteration);

            if !fixed_any {
                debug!(iteration = index, "no fix improved any criterion; stopping");
                break;
            }
        }

        self.finalize(result, emitter);
        Ok(())
    }

    /// Repair failing criteria one at a time in repair-phase order.
    ///
    /// `atomic` is never repaired here; it is the splitter's concern.
    #[allow(clippy::too_many_arguments)]
    async fn fix_pass(
        &self,
        requirement_id: &str,
        index: u32,
        text: &str,
        scores: &EvaluationSnapshot,
        verdict: &TierResult,
        context: &Arc<Context>,
        emitter: &Emitter<'_>,
    ) -> FixPass {
        let order = self.registry.repair_order(
            verdict
                .failing_criteria
                .iter()
                .copied()
                .filter(|c| *c != CriterionKind::Atomic),
        );

        let mut pass = FixPass {
            text: text.to_string(),
            fixes: Vec::new(),
            phases: Vec::new(),
        };

        for criterion in order {
            let Some(evaluator) = self.evaluators.get(criterion) else {
                debug!(criterion = %criterion, "no evaluator registered; skipping fix");
                continue;
            };
            let config = self.registry.resolve(criterion);
            let score = scores.get(criterion).unwrap_or(self.config.neutral_score);

            if !pass.phases.contains(&criterion.phase()) {
                pass.phases.push(criterion.phase());
            }
            METRICS.inc_fix_attempts();

            let attempt =
                attempt_fix(evaluator.as_ref(), criterion, &pass.text, score, context).await;
            let improved = match attempt {
                Ok(outcome) if outcome.fixed => {
                    METRICS.inc_fixes_applied();
                    pass.text = outcome.new_text.clone();
                    let fix = outcome.into_record(criterion);
                    emitter.emit(ValidationEvent::RequirementUpdated {
                        requirement_id: requirement_id.to_string(),
                        iteration: index,
                        fix: fix.clone(),
                    });
                    pass.fixes.push(fix);
                    true
                }
                Ok(outcome) => {
                    if self.config.keep_non_improving_fixes {
                        pass.text = outcome.new_text;
                    }
                    false
                }
                Err(e) => {
                    warn!(criterion = %criterion, error = %e, "fix attempt failed; text unchanged");
                    false
                }
            };

            if !improved && config.fail_fast {
                info!(criterion = %criterion, "fail-fast criterion not repaired; ending fix pass");
                break;
            }
        }

        pass
    }

    fn finalize(&self, result: &mut ValidationResult, emitter: &Emitter<'_>) {
        let Some(last) = result.last_iteration() else {
            return;
        };

        if result.split_occurred {
            let (score, scores) = (last.overall_score, last.scores.clone());
            result.final_score = score;
            result.final_scores = scores;
            result.passed = false;
            return;
        }

        let (text, scores, _) = last.latest_evaluation();
        let (text, scores) = (text.to_string(), scores.clone());
        let verdict = score_tiers(&scores, &self.registry);

        result.final_text = text;
        result.final_scores = scores;
        result.final_score = verdict.overall_score;
        result.passed = verdict.passed;

        emitter.emit(ValidationEvent::ValidationComplete {
            requirement_id: result.requirement_id.clone(),
            passed: result.passed,
            final_text: result.final_text.clone(),
            final_score: result.final_score,
            iterations: result.iterations.len(),
            total_fixes: result.total_fixes,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoopSink;
    use crate::fakes::{RecordingSink, ScriptedEvaluator, ScriptedSplitter};

    fn orchestrator(evaluator: ScriptedEvaluator, max_iterations: u32) -> Orchestrator {
        Orchestrator::new(
            Arc::new(CriteriaRegistry::builtin()),
            EvaluatorTable::uniform(Arc::new(evaluator)),
            OrchestratorConfig::default().with_max_iterations(max_iterations),
        )
        .unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = Orchestrator::new(
            Arc::new(CriteriaRegistry::builtin()),
            EvaluatorTable::new(),
            OrchestratorConfig::default().with_max_iterations(0),
        )
        .unwrap_err();
        assert!(matches!(err, ReqforgeError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn passing_requirement_stops_after_first_iteration() {
        let orch = orchestrator(ScriptedEvaluator::uniform(0.95), 3);
        let result = orch
            .process("REQ-1", "The system shall export reports.", Context::new(), &NoopSink)
            .await;
        assert!(result.passed);
        assert_eq!(result.iterations.len(), 1);
        assert!(result.finished_at.is_some());
        assert!(!result.is_error());
    }

    #[tokio::test]
    async fn fix_then_pass_reports_rewritten_text() {
        let evaluator = ScriptedEvaluator::uniform(0.9).with_score(CriterionKind::Clarity, 0.4);
        let orch = orchestrator(evaluator, 3);
        let sink = RecordingSink::new();
        let result = orch
            .process("REQ-2", "The system shall export reports.", Context::new(), &sink)
            .await;

        assert!(result.passed);
        assert_eq!(result.total_fixes, 1);
        assert!(result.final_text.contains("[clarity]"));
        assert_eq!(result.final_scores.get(CriterionKind::Clarity), Some(0.9));
        assert_eq!(
            result.iterations[0].phase_label.as_deref(),
            Some("language_quality")
        );
        assert_eq!(sink.count("validation_success"), 1);
        assert_eq!(sink.count("validation_complete"), 1);
    }

    #[tokio::test]
    async fn split_result_carries_scores_of_the_split_iteration() {
        let evaluator = ScriptedEvaluator::uniform(0.9).with_score(CriterionKind::Atomic, 0.2);
        let splitter = Arc::new(ScriptedSplitter::new(["A must X", "B must Y"]));
        let orch = orchestrator(evaluator, 3).with_splitter(splitter);
        let sink = RecordingSink::new();
        let result = orch
            .process("REQ-3", "A must X and B must Y", Context::new(), &sink)
            .await;

        assert!(result.split_occurred);
        assert!(!result.passed);
        let iteration = &result.iterations[0];
        assert_eq!(result.final_score, iteration.overall_score);
        assert_eq!(result.final_scores, iteration.scores);
        assert_eq!(result.final_scores.get(CriterionKind::Atomic), Some(0.2));
        assert_eq!(sink.count("validation_complete"), 0);
    }

    #[test]
    fn panic_payloads_are_readable() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
