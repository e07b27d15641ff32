//! Per-iteration evaluation snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::criterion::CriterionKind;

/// Scores produced by one evaluator fan-out round, keyed by criterion.
///
/// Snapshots are built once (via `FromIterator`) and never mutated; a new
/// round produces a new snapshot. Iteration order follows the repair-phase
/// table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationSnapshot(BTreeMap<CriterionKind, f64>);

impl EvaluationSnapshot {
    pub fn get(&self, criterion: CriterionKind) -> Option<f64> {
        self.0.get(&criterion).copied()
    }

    pub fn contains(&self, criterion: CriterionKind) -> bool {
        self.0.contains_key(&criterion)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CriterionKind, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn criteria(&self) -> impl Iterator<Item = CriterionKind> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowest score in the snapshot, if any.
    pub fn min_score(&self) -> Option<f64> {
        self.0.values().copied().reduce(f64::min)
    }
}

impl FromIterator<(CriterionKind, f64)> for EvaluationSnapshot {
    fn from_iter<I: IntoIterator<Item = (CriterionKind, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
