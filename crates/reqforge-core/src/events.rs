//! Progress events and observer sinks.
//!
//! The orchestrator reports progress through an [`EventSink`]. Emission is
//! a side channel: a sink that fails or panics is logged and ignored.
//!
//! Any `Fn(&str, &serde_json::Value)` closure is a sink, receiving the
//! event type name and its data object (which always carries
//! `requirement_id`).

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::domain::{EvaluationSnapshot, FixRecord, SinkError};
use crate::health::HealthReport;
use crate::scoring::{CriterionFeedback, TierAverages};

/// Everything a consumer may subscribe to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ValidationEvent {
    HealthCheckCompleted {
        requirement_id: String,
        report: HealthReport,
    },
    EvaluationStarted {
        requirement_id: String,
        iteration: u32,
        text: String,
    },
    EvaluationCompleted {
        requirement_id: String,
        iteration: u32,
        scores: EvaluationSnapshot,
        overall_score: f64,
        tier_averages: TierAverages,
        passed: bool,
        feedback: Vec<CriterionFeedback>,
    },
    RequirementSplit {
        requirement_id: String,
        iteration: u32,
        children: Vec<String>,
    },
    RequirementUpdated {
        requirement_id: String,
        iteration: u32,
        #[serde(flatten)]
        fix: FixRecord,
    },
    ValidationSuccess {
        requirement_id: String,
        iteration: u32,
        final_text: String,
        final_score: f64,
    },
    ValidationComplete {
        requirement_id: String,
        passed: bool,
        final_text: String,
        final_score: f64,
        iterations: usize,
        total_fixes: usize,
    },
    ValidationError {
        requirement_id: String,
        error: String,
    },
}

impl ValidationEvent {
    /// Subscription name of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            ValidationEvent::HealthCheckCompleted { .. } => "health_check_completed",
            ValidationEvent::EvaluationStarted { .. } => "evaluation_started",
            ValidationEvent::EvaluationCompleted { .. } => "evaluation_completed",
            ValidationEvent::RequirementSplit { .. } => "requirement_split",
            ValidationEvent::RequirementUpdated { .. } => "requirement_updated",
            ValidationEvent::ValidationSuccess { .. } => "validation_success",
            ValidationEvent::ValidationComplete { .. } => "validation_complete",
            ValidationEvent::ValidationError { .. } => "validation_error",
        }
    }

    pub fn requirement_id(&self) -> &str {
        match self {
            ValidationEvent::HealthCheckCompleted { requirement_id, .. }
            | ValidationEvent::EvaluationStarted { requirement_id, .. }
            | ValidationEvent::EvaluationCompleted { requirement_id, .. }
            | ValidationEvent::RequirementSplit { requirement_id, .. }
            | ValidationEvent::RequirementUpdated { requirement_id, .. }
            | ValidationEvent::ValidationSuccess { requirement_id, .. }
            | ValidationEvent::ValidationComplete { requirement_id, .. }
            | ValidationEvent::ValidationError { requirement_id, .. } => requirement_id,
        }
    }

    /// Event payload as a JSON object, without the `event_type` tag.
    pub fn data(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => {
                map.remove("event_type");
                Value::Object(map)
            }
            _ => serde_json::json!({ "requirement_id": self.requirement_id() }),
        }
    }
}

/// Observer of validation progress.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ValidationEvent) -> Result<(), SinkError>;
}

impl<F> EventSink for F
where
    F: Fn(&str, &Value) + Send + Sync,
{
    fn emit(&self, event: &ValidationEvent) -> Result<(), SinkError> {
        self(event.event_type(), &event.data());
        Ok(())
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &ValidationEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Forwards events into an unbounded tokio channel, e.g. for an SSE stream.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ValidationEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<ValidationEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with its receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ValidationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &ValidationEvent) -> Result<(), SinkError> {
        self.tx.send(event.clone()).map_err(|_| SinkError::Closed)
    }
}
