//! Tier scorer.
//!
//! Aggregates an [`EvaluationSnapshot`] into a [`TierResult`]: weighted
//! overall score, per-tier averages, pass/fail verdict, and ranked feedback
//! for every failing criterion. Pure function of its inputs.

use serde::{Deserialize, Serialize};

use crate::domain::{CriterionKind, EvaluationSnapshot, Tier, MIN_OVERALL_SCORE};
use crate::registry::CriteriaRegistry;

/// Mean score per tier. An empty tier averages to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierAverages {
    pub gating: f64,
    pub priority: f64,
    pub polish: f64,
}

impl TierAverages {
    pub fn get(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Gating => self.gating,
            Tier::Priority => self.priority,
            Tier::Polish => self.polish,
        }
    }
}

/// Actionable feedback for one failing criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionFeedback {
    pub criterion: CriterionKind,
    pub score: f64,
    pub threshold: f64,
    pub tier: Tier,
    pub action: String,
    /// 1 = gating, 2 = priority, 3 = polish.
    pub priority_rank: u8,
}

/// Aggregated verdict over one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierResult {
    pub overall_score: f64,
    pub tier_averages: TierAverages,
    pub passed: bool,
    /// Failing criteria, in feedback order.
    pub failing_criteria: Vec<CriterionKind>,
    pub feedback: Vec<CriterionFeedback>,
}

impl TierResult {
    pub fn is_failing(&self, criterion: CriterionKind) -> bool {
        self.failing_criteria.contains(&criterion)
    }

    pub fn gating_failures(&self) -> impl Iterator<Item = &CriterionFeedback> {
        self.feedback.iter().filter(|f| f.tier == Tier::Gating)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        1.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Score `scores` against the registry's criterion policies.
///
/// Criteria missing from the registry use the fallback policy
/// (priority tier, weight 0.10, threshold 0.70).
pub fn score_tiers(scores: &EvaluationSnapshot, registry: &CriteriaRegistry) -> TierResult {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    let mut gating = Vec::new();
    let mut priority = Vec::new();
    let mut polish = Vec::new();
    let mut feedback = Vec::new();

    for (criterion, score) in scores.iter() {
        let config = registry.resolve(criterion);

        weighted_sum += score * config.weight;
        total_weight += config.weight;

        match config.tier {
            Tier::Gating => gating.push(score),
            Tier::Priority => priority.push(score),
            Tier::Polish => polish.push(score),
        }

        if score < config.threshold {
            feedback.push(CriterionFeedback {
                criterion,
                score,
                threshold: config.threshold,
                tier: config.tier,
                action: config.remediation_action.clone(),
                priority_rank: config.tier.priority_rank(),
            });
        }
    }

    let overall_score = if total_weight > 0.0 {
        weighted_sum / total_weight
    } else {
        0.0
    };

    // Most urgent tier first; within a tier, lowest score first.
    feedback.sort_by(|a, b| {
        a.priority_rank
            .cmp(&b.priority_rank)
            .then(a.score.total_cmp(&b.score))
            .then(a.criterion.cmp(&b.criterion))
    });

    let gating_failed = feedback.iter().any(|f| f.tier == Tier::Gating);
    let passed = !gating_failed && overall_score >= MIN_OVERALL_SCORE;

    TierResult {
        overall_score,
        tier_averages: TierAverages {
            gating: mean(&gating),
            priority: mean(&priority),
            polish: mean(&polish),
        },
        passed,
        failing_criteria: feedback.iter().map(|f| f.criterion).collect(),
        feedback,
    }
}
