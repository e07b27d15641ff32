//! Error taxonomy for reqforge.
//!
//! Collaborator failures ([`EvaluatorError`], [`SplitError`], [`SinkError`])
//! are absorbed inside the orchestration loop. Only [`ReqforgeError`]
//! reaches the outer `process` boundary, where it is recorded on the
//! result instead of being returned.

use crate::domain::criterion::CriterionKind;

/// reqforge domain errors.
#[derive(Debug, thiserror::Error)]
pub enum ReqforgeError {
    #[error("unknown criterion: {0}")]
    UnknownCriterion(String),

    #[error("invalid criterion {key}: {reason}")]
    InvalidCriterion { key: String, reason: String },

    #[error("duplicate criterion: {0}")]
    DuplicateCriterion(String),

    #[error("no active criteria configured")]
    NoActiveCriteria,

    #[error("invalid orchestrator config: {0}")]
    InvalidConfig(String),

    #[error("criteria source error: {0}")]
    Source(String),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for reqforge domain operations.
pub type Result<T> = std::result::Result<T, ReqforgeError>;

/// Failures reported by a criterion evaluator collaborator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluatorError {
    #[error("evaluation of {criterion} failed: {reason}")]
    Evaluation {
        criterion: CriterionKind,
        reason: String,
    },

    #[error("fix suggestion for {criterion} failed: {reason}")]
    Suggestion {
        criterion: CriterionKind,
        reason: String,
    },

    #[error("applying fix for {criterion} failed: {reason}")]
    Application {
        criterion: CriterionKind,
        reason: String,
    },

    #[error("evaluator task for {criterion} aborted: {reason}")]
    TaskAborted {
        criterion: CriterionKind,
        reason: String,
    },

    #[error("no evaluator registered for {0}")]
    Unregistered(CriterionKind),
}

/// Failures reported by the splitter collaborator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SplitError {
    #[error("split failed: {0}")]
    Failed(String),

    #[error("split produced {count} usable children, need at least 2")]
    InsufficientChildren { count: usize },

    #[error("splitter unavailable")]
    Unavailable,
}

/// Failures reported by an event sink.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SinkError {
    #[error("event sink closed")]
    Closed,

    #[error("event rejected: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reqforge_error_display() {
        let err = ReqforgeError::InvalidCriterion {
            key: "clarity".to_string(),
            reason: "threshold 1.5 outside [0, 1]".to_string(),
        };
        assert!(err.to_string().contains("invalid criterion clarity"));

        let err = ReqforgeError::NoActiveCriteria;
        assert_eq!(err.to_string(), "no active criteria configured");
    }

    #[test]
    fn test_digest_mismatch_error() {
        let err = ReqforgeError::DigestMismatch {
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("def456"));
    }

    #[test]
    fn test_evaluator_error_names_criterion() {
        let err = EvaluatorError::Evaluation {
            criterion: CriterionKind::Testability,
            reason: "timeout".to_string(),
        };
        assert!(err.to_string().contains("testability"));
        assert!(err.to_string().contains("timeout"));
    }
}
