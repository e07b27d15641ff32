//! Domain models for reqforge.
//!
//! Canonical definitions for the core entities:
//! - `CriterionConfig`: Immutable per-criterion scoring policy
//! - `EvaluationSnapshot`: Scores from one evaluator fan-out round
//! - `Iteration` / `FixRecord`: Loop history
//! - `ValidationResult`: Terminal artifact of a processing run

pub mod criterion;
pub mod error;
pub mod result;
pub mod snapshot;

// Re-export main types and errors
pub use criterion::{
    default_criteria, CriterionConfig, CriterionKind, RepairPhase, Tier, DEFAULT_THRESHOLD,
    DEFAULT_WEIGHT, MIN_OVERALL_SCORE,
};
pub use error::{EvaluatorError, ReqforgeError, Result, SinkError, SplitError};
pub use result::{FixRecord, Iteration, ValidationResult};
pub use snapshot::EvaluationSnapshot;

/// Free-form caller context forwarded to every collaborator call.
pub type Context = serde_json::Map<String, serde_json::Value>;
