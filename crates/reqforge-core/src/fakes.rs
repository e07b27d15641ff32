//! In-memory fakes for the collaborator traits (testing only)
//!
//! Provides `ScriptedEvaluator`, `FailingEvaluator`, `ScriptedSplitter`,
//! `RecordingSink`, and `FailingSink`, which satisfy the trait contracts
//! deterministically and without any external service.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{Context, CriterionKind, EvaluatorError, SinkError, SplitError};
use crate::evaluation::CriterionEvaluator;
use crate::events::{EventSink, ValidationEvent};
use crate::splitter::{SplitChild, Splitter};

// ---------------------------------------------------------------------------
// ScriptedEvaluator
// ---------------------------------------------------------------------------

/// How a [`ScriptedEvaluator`] responds to a fix request for one criterion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixBehavior {
    /// Append a `[key]` marker; marked text scores `to` on that criterion.
    Improve { to: f64 },
    /// Return the text unchanged.
    NoOp,
    /// Rewrite the text without changing its score.
    Reword,
    /// Fail the suggestion call.
    Fail,
}

/// One collaborator call observed by a [`ScriptedEvaluator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluatorCall {
    Evaluate(CriterionKind),
    Suggest(CriterionKind),
    Apply(CriterionKind),
}

/// Deterministic evaluator driven by per-criterion scripts.
#[derive(Debug)]
pub struct ScriptedEvaluator {
    default_score: f64,
    scores: HashMap<CriterionKind, f64>,
    default_fix: FixBehavior,
    fixes: HashMap<CriterionKind, FixBehavior>,
    failing: HashSet<CriterionKind>,
    panicking: HashSet<CriterionKind>,
    calls: Mutex<Vec<EvaluatorCall>>,
}

impl ScriptedEvaluator {
    /// Every criterion scores `score`; every fix improves to 0.9.
    pub fn uniform(score: f64) -> Self {
        Self {
            default_score: score,
            scores: HashMap::new(),
            default_fix: FixBehavior::Improve { to: 0.9 },
            fixes: HashMap::new(),
            failing: HashSet::new(),
            panicking: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_score(mut self, criterion: CriterionKind, score: f64) -> Self {
        self.scores.insert(criterion, score);
        self
    }

    pub fn with_fix(mut self, criterion: CriterionKind, behavior: FixBehavior) -> Self {
        self.fixes.insert(criterion, behavior);
        self
    }

    /// Behaviour for criteria without an explicit `with_fix`.
    pub fn with_default_fix(mut self, behavior: FixBehavior) -> Self {
        self.default_fix = behavior;
        self
    }

    /// `evaluate` returns an error for `criterion`.
    pub fn failing_on(mut self, criterion: CriterionKind) -> Self {
        self.failing.insert(criterion);
        self
    }

    /// `evaluate` panics for `criterion`.
    pub fn panicking_on(mut self, criterion: CriterionKind) -> Self {
        self.panicking.insert(criterion);
        self
    }

    pub fn marker(criterion: CriterionKind) -> String {
        format!("[{}]", criterion.key())
    }

    pub fn calls(&self) -> Vec<EvaluatorCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Criteria whose fix was requested, in request order.
    pub fn fix_order(&self) -> Vec<CriterionKind> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EvaluatorCall::Suggest(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn evaluation_count(&self, criterion: CriterionKind) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == EvaluatorCall::Evaluate(criterion))
            .count()
    }

    fn fix_behavior(&self, criterion: CriterionKind) -> FixBehavior {
        self.fixes
            .get(&criterion)
            .copied()
            .unwrap_or(self.default_fix)
    }

    fn record(&self, call: EvaluatorCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CriterionEvaluator for ScriptedEvaluator {
    async fn evaluate(
        &self,
        text: &str,
        criterion: CriterionKind,
        _context: &Context,
    ) -> Result<f64, EvaluatorError> {
        self.record(EvaluatorCall::Evaluate(criterion));
        if self.panicking.contains(&criterion) {
            panic!("scripted evaluator panic on {criterion}");
        }
        if self.failing.contains(&criterion) {
            return Err(EvaluatorError::Evaluation {
                criterion,
                reason: "scripted failure".to_string(),
            });
        }
        if let FixBehavior::Improve { to } = self.fix_behavior(criterion) {
            if text.contains(&Self::marker(criterion)) {
                return Ok(to);
            }
        }
        Ok(self
            .scores
            .get(&criterion)
            .copied()
            .unwrap_or(self.default_score))
    }

    async fn suggest_fix(
        &self,
        _text: &str,
        criterion: CriterionKind,
        score: f64,
        _context: &Context,
    ) -> Result<String, EvaluatorError> {
        self.record(EvaluatorCall::Suggest(criterion));
        match self.fix_behavior(criterion) {
            FixBehavior::Fail => Err(EvaluatorError::Suggestion {
                criterion,
                reason: "scripted failure".to_string(),
            }),
            _ => Ok(format!("raise {criterion} above {score:.2}")),
        }
    }

    async fn apply_fix(
        &self,
        text: &str,
        criterion: CriterionKind,
        _suggestion: &str,
        _context: &Context,
    ) -> Result<String, EvaluatorError> {
        self.record(EvaluatorCall::Apply(criterion));
        match self.fix_behavior(criterion) {
            FixBehavior::Improve { .. } => Ok(format!("{text} {}", Self::marker(criterion))),
            FixBehavior::NoOp => Ok(text.to_string()),
            FixBehavior::Reword => Ok(format!("{text} ({} reworded)", criterion.key())),
            FixBehavior::Fail => Err(EvaluatorError::Application {
                criterion,
                reason: "scripted failure".to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// FailingEvaluator
// ---------------------------------------------------------------------------

/// Evaluator whose every call fails.
#[derive(Debug, Clone)]
pub struct FailingEvaluator {
    reason: String,
}

impl FailingEvaluator {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl CriterionEvaluator for FailingEvaluator {
    async fn evaluate(
        &self,
        _text: &str,
        criterion: CriterionKind,
        _context: &Context,
    ) -> Result<f64, EvaluatorError> {
        Err(EvaluatorError::Evaluation {
            criterion,
            reason: self.reason.clone(),
        })
    }

    async fn suggest_fix(
        &self,
        _text: &str,
        criterion: CriterionKind,
        _score: f64,
        _context: &Context,
    ) -> Result<String, EvaluatorError> {
        Err(EvaluatorError::Suggestion {
            criterion,
            reason: self.reason.clone(),
        })
    }

    async fn apply_fix(
        &self,
        _text: &str,
        criterion: CriterionKind,
        _suggestion: &str,
        _context: &Context,
    ) -> Result<String, EvaluatorError> {
        Err(EvaluatorError::Application {
            criterion,
            reason: self.reason.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// ScriptedSplitter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum SplitScript {
    Children(Vec<String>),
    Fail(String),
    Panic,
}

/// Splitter returning a canned answer and counting its calls.
#[derive(Debug)]
pub struct ScriptedSplitter {
    script: SplitScript,
    calls: AtomicUsize,
}

impl ScriptedSplitter {
    pub fn new<I, S>(children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::scripted(SplitScript::Children(
            children.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self::scripted(SplitScript::Fail(reason.into()))
    }

    pub fn panicking() -> Self {
        Self::scripted(SplitScript::Panic)
    }

    fn scripted(script: SplitScript) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Splitter for ScriptedSplitter {
    async fn split(
        &self,
        _text: &str,
        _context: &Context,
        _max_splits: usize,
    ) -> Result<Vec<SplitChild>, SplitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            SplitScript::Children(children) => {
                Ok(children.iter().map(SplitChild::new).collect())
            }
            SplitScript::Fail(reason) => Err(SplitError::Failed(reason.clone())),
            SplitScript::Panic => panic!("scripted splitter panic"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ValidationEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ValidationEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type())
            .collect()
    }

    pub fn count(&self, event_type: &str) -> usize {
        self.event_types()
            .into_iter()
            .filter(|t| *t == event_type)
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &ValidationEvent) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Sink that rejects (or panics on) every event, counting attempts.
#[derive(Debug, Default)]
pub struct FailingSink {
    panic: bool,
    attempts: AtomicUsize,
}

impl FailingSink {
    pub fn rejecting() -> Self {
        Self::default()
    }

    pub fn panicking() -> Self {
        Self {
            panic: true,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl EventSink for FailingSink {
    fn emit(&self, event: &ValidationEvent) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.panic {
            panic!("scripted sink panic on {}", event.event_type());
        }
        Err(SinkError::Rejected(event.event_type().to_string()))
    }
}
