//! Requirement splitting.
//!
//! Invoked when the `atomic` criterion fails. A split only counts when it
//! yields at least two non-empty children; anything less falls through to
//! ordinary per-criterion repair.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{Context, SplitError};

/// Minimum number of children for a split to take effect.
pub const MIN_SPLIT_CHILDREN: usize = 2;

/// One decomposed child requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitChild {
    pub text: String,
    #[serde(default)]
    pub rationale: Option<String>,
}

impl SplitChild {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rationale: None,
        }
    }
}

/// Decomposes a compound requirement into independent ones.
#[async_trait]
pub trait Splitter: Send + Sync {
    async fn split(
        &self,
        text: &str,
        context: &Context,
        max_splits: usize,
    ) -> Result<Vec<SplitChild>, SplitError>;
}

/// Result of a split attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitOutcome {
    pub split_occurred: bool,
    pub children: Vec<String>,
    pub error: Option<String>,
}

impl SplitOutcome {
    fn declined(error: SplitError) -> Self {
        Self {
            split_occurred: false,
            children: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Attempt to split `text`. Never fails: an unavailable splitter, a
/// collaborator error, or too few children all yield `split_occurred = false`.
///
/// Children are trimmed, empty ones dropped, and at most `max_splits` kept.
pub async fn attempt_split(
    splitter: Option<&dyn Splitter>,
    text: &str,
    context: &Context,
    max_splits: usize,
) -> SplitOutcome {
    let Some(splitter) = splitter else {
        warn!("atomic criterion failed but no splitter is configured; skipping split");
        return SplitOutcome::declined(SplitError::Unavailable);
    };

    let children = match splitter.split(text, context, max_splits).await {
        Ok(children) => children,
        Err(e) => {
            warn!(error = %e, "splitter failed; falling back to per-criterion repair");
            return SplitOutcome::declined(e);
        }
    };

    let children: Vec<String> = children
        .into_iter()
        .map(|c| c.text.trim().to_string())
        .filter(|t| !t.is_empty())
        .take(max_splits.max(MIN_SPLIT_CHILDREN))
        .collect();

    if children.len() < MIN_SPLIT_CHILDREN {
        debug!(children = children.len(), "split declined: too few children");
        return SplitOutcome::declined(SplitError::InsufficientChildren {
            count: children.len(),
        });
    }

    SplitOutcome {
        split_occurred: true,
        children,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(Result<Vec<SplitChild>, SplitError>);

    #[async_trait]
    impl Splitter for Canned {
        async fn split(
            &self,
            _text: &str,
            _context: &Context,
            _max_splits: usize,
        ) -> Result<Vec<SplitChild>, SplitError> {
            self.0.clone()
        }
    }

    async fn run(splitter: &dyn Splitter, text: &str, max_splits: usize) -> SplitOutcome {
        attempt_split(Some(splitter), text, &Context::new(), max_splits).await
    }

    #[tokio::test]
    async fn two_children_split() {
        let splitter = Canned(Ok(vec![
            SplitChild::new("A must X"),
            SplitChild::new("B must Y"),
        ]));
        let outcome = run(&splitter, "A must X and B must Y", 5).await;
        assert!(outcome.split_occurred);
        assert_eq!(outcome.children, vec!["A must X", "B must Y"]);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn blank_children_do_not_count() {
        let splitter = Canned(Ok(vec![SplitChild::new("A must X"), SplitChild::new("   ")]));
        let outcome = run(&splitter, "A must X", 5).await;
        assert!(!outcome.split_occurred);
        assert!(outcome.children.is_empty());
        assert!(outcome.error.unwrap().contains("1 usable"));
    }

    #[tokio::test]
    async fn missing_or_failing_splitter_is_non_fatal() {
        let outcome = attempt_split(None, "text", &Context::new(), 5).await;
        assert!(!outcome.split_occurred);
        assert_eq!(outcome.error.as_deref(), Some("splitter unavailable"));

        let failing = Canned(Err(SplitError::Failed("llm timeout".to_string())));
        let outcome = run(&failing, "text", 5).await;
        assert!(!outcome.split_occurred);
        assert!(outcome.error.unwrap().contains("llm timeout"));
    }

    #[tokio::test]
    async fn children_are_capped_at_max_splits() {
        let children = (0..6)
            .map(|i| SplitChild::new(format!("R{i} must hold")))
            .collect();
        let outcome = run(&Canned(Ok(children)), "text", 3).await;
        assert!(outcome.split_occurred);
        assert_eq!(outcome.children.len(), 3);
    }
}
