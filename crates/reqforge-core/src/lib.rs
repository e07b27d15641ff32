//! reqforge core library
//!
//! Scores natural-language requirements against a tiered set of quality
//! criteria and repairs them through an evaluate → split/fix loop.
//! Evaluators and splitters are injected collaborators (typically
//! LLM-backed); this crate owns the orchestration, scoring, and reporting.

pub mod config;
pub mod domain;
pub mod evaluation;
pub mod events;
pub mod fakes;
pub mod fix;
pub mod health;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod registry;
pub mod reporting;
pub mod scoring;
pub mod splitter;
pub mod telemetry;

pub use config::{OrchestratorConfig, ReqforgeConfig, TomlCriteriaSource};

pub use domain::{
    default_criteria, Context, CriterionConfig, CriterionKind, EvaluationSnapshot, EvaluatorError,
    FixRecord, Iteration, RepairPhase, ReqforgeError, Result, SinkError, SplitError, Tier,
    ValidationResult, MIN_OVERALL_SCORE,
};

pub use evaluation::{evaluate_all, CriterionEvaluator, EvaluatorTable, FanOutConfig, NEUTRAL_SCORE};
pub use events::{ChannelSink, EventSink, NoopSink, ValidationEvent};
pub use fix::{attempt_fix, FixOutcome};
pub use health::{check_health, HealthIssue, HealthIssueKind, HealthReport, HealthSeverity};
pub use orchestrator::Orchestrator;
pub use registry::{BuiltinCriteria, CriteriaRegistry, CriteriaSource, StaticCriteria};
pub use reporting::{read_validation_artifact, write_validation_artifact};
pub use scoring::{score_tiers, CriterionFeedback, TierAverages, TierResult};
pub use splitter::{attempt_split, SplitChild, SplitOutcome, Splitter};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
