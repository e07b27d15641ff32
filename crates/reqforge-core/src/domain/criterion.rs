//! Criterion kinds, tiers, repair phases and per-criterion configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::ReqforgeError;

/// Overall score a requirement must reach (in addition to clearing every
/// gating criterion) to pass.
pub const MIN_OVERALL_SCORE: f64 = 0.70;

/// Threshold used for criteria without explicit configuration.
pub const DEFAULT_THRESHOLD: f64 = 0.70;

/// Weight used for criteria without explicit configuration.
pub const DEFAULT_WEIGHT: f64 = 0.10;

/// The closed set of quality criteria a requirement is scored against.
///
/// Declaration order is the repair-phase table order, so the derived `Ord`
/// sorts criteria the way they are repaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    Atomic,
    Concise,
    FollowsTemplate,
    DesignIndependent,
    Clarity,
    Unambiguous,
    ConsistentLanguage,
    Measurability,
    Testability,
}

impl CriterionKind {
    pub const ALL: [CriterionKind; 9] = [
        CriterionKind::Atomic,
        CriterionKind::Concise,
        CriterionKind::FollowsTemplate,
        CriterionKind::DesignIndependent,
        CriterionKind::Clarity,
        CriterionKind::Unambiguous,
        CriterionKind::ConsistentLanguage,
        CriterionKind::Measurability,
        CriterionKind::Testability,
    ];

    /// Stable configuration key.
    pub fn key(&self) -> &'static str {
        match self {
            CriterionKind::Atomic => "atomic",
            CriterionKind::Concise => "concise",
            CriterionKind::FollowsTemplate => "follows_template",
            CriterionKind::DesignIndependent => "design_independent",
            CriterionKind::Clarity => "clarity",
            CriterionKind::Unambiguous => "unambiguous",
            CriterionKind::ConsistentLanguage => "consistent_language",
            CriterionKind::Measurability => "measurability",
            CriterionKind::Testability => "testability",
        }
    }

    /// Repair phase this criterion belongs to.
    pub fn phase(&self) -> RepairPhase {
        match self {
            CriterionKind::Atomic
            | CriterionKind::Concise
            | CriterionKind::FollowsTemplate
            | CriterionKind::DesignIndependent => RepairPhase::Structure,
            CriterionKind::Clarity
            | CriterionKind::Unambiguous
            | CriterionKind::ConsistentLanguage => RepairPhase::LanguageQuality,
            CriterionKind::Measurability | CriterionKind::Testability => RepairPhase::Verification,
        }
    }
}

impl fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CriterionKind {
    type Err = ReqforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        CriterionKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.key() == normalized)
            .ok_or_else(|| ReqforgeError::UnknownCriterion(s.to_string()))
    }
}

/// Priority class of a criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Must pass; any failure blocks the overall verdict.
    Gating,
    /// Should pass; contributes with regular weight.
    Priority,
    /// Nice to have; lightly weighted.
    Polish,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Gating, Tier::Priority, Tier::Polish];

    /// Feedback rank: 1 for gating, 2 for priority, 3 for polish.
    pub fn priority_rank(&self) -> u8 {
        match self {
            Tier::Gating => 1,
            Tier::Priority => 2,
            Tier::Polish => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Gating => "gating",
            Tier::Priority => "priority",
            Tier::Polish => "polish",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered repair phases. Failing criteria are always repaired structure
/// first, then language quality, then verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairPhase {
    Structure,
    LanguageQuality,
    Verification,
}

impl RepairPhase {
    pub const ALL: [RepairPhase; 3] = [
        RepairPhase::Structure,
        RepairPhase::LanguageQuality,
        RepairPhase::Verification,
    ];

    /// Fixed criterion sequence within the phase.
    pub fn criteria(&self) -> &'static [CriterionKind] {
        match self {
            RepairPhase::Structure => &[
                CriterionKind::Atomic,
                CriterionKind::Concise,
                CriterionKind::FollowsTemplate,
                CriterionKind::DesignIndependent,
            ],
            RepairPhase::LanguageQuality => &[
                CriterionKind::Clarity,
                CriterionKind::Unambiguous,
                CriterionKind::ConsistentLanguage,
            ],
            RepairPhase::Verification => {
                &[CriterionKind::Measurability, CriterionKind::Testability]
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RepairPhase::Structure => "structure",
            RepairPhase::LanguageQuality => "language_quality",
            RepairPhase::Verification => "verification",
        }
    }
}

impl fmt::Display for RepairPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Configuration of a single criterion, loaded once from a criteria source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionConfig {
    pub key: CriterionKind,
    #[serde(default = "default_tier")]
    pub tier: Tier,
    /// Minimum passing score in [0, 1].
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Relative weight in the overall score (non-negative).
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Guidance surfaced in feedback when the criterion fails.
    #[serde(default)]
    pub remediation_action: String,
    /// Stop the current fix pass when a repair of this criterion does not help.
    #[serde(default)]
    pub fail_fast: bool,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_tier() -> Tier {
    Tier::Priority
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_weight() -> f64 {
    DEFAULT_WEIGHT
}

fn default_active() -> bool {
    true
}

impl CriterionConfig {
    pub fn new(key: CriterionKind, tier: Tier, threshold: f64, weight: f64) -> Self {
        Self {
            key,
            tier,
            threshold,
            weight,
            remediation_action: String::new(),
            fail_fast: false,
            active: true,
        }
    }

    /// Configuration assumed for a criterion that has none.
    pub fn fallback(key: CriterionKind) -> Self {
        Self {
            remediation_action: format!("Improve {}", key),
            ..Self::new(key, Tier::Priority, DEFAULT_THRESHOLD, DEFAULT_WEIGHT)
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.remediation_action = action.into();
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Check threshold and weight ranges.
    pub fn validate(&self) -> Result<(), ReqforgeError> {
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(ReqforgeError::InvalidCriterion {
                key: self.key.to_string(),
                reason: format!("threshold {} outside [0, 1]", self.threshold),
            });
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(ReqforgeError::InvalidCriterion {
                key: self.key.to_string(),
                reason: format!("weight {} must be a non-negative number", self.weight),
            });
        }
        Ok(())
    }
}

/// The built-in criterion table.
pub fn default_criteria() -> Vec<CriterionConfig> {
    use CriterionKind::*;

    vec![
        CriterionConfig::new(Atomic, Tier::Gating, 0.70, 0.20)
            .with_action("Split the requirement into independent single-statement requirements"),
        CriterionConfig::new(Concise, Tier::Priority, 0.70, 0.10)
            .with_action("Remove filler and move details into acceptance criteria"),
        CriterionConfig::new(FollowsTemplate, Tier::Priority, 0.70, 0.10)
            .with_action("Rephrase as '<actor> <modal verb> <action> <object> <condition>'"),
        CriterionConfig::new(DesignIndependent, Tier::Polish, 0.70, 0.05)
            .with_action("Describe what is needed, not how it is implemented"),
        CriterionConfig::new(Clarity, Tier::Gating, 0.70, 0.20)
            .with_action("Use plain, direct wording a reviewer can read once"),
        CriterionConfig::new(Unambiguous, Tier::Priority, 0.70, 0.10)
            .with_action("Replace vague terms (fast, easy, user-friendly) with concrete ones"),
        CriterionConfig::new(ConsistentLanguage, Tier::Polish, 0.70, 0.05)
            .with_action("Use the project glossary terms consistently"),
        CriterionConfig::new(Measurability, Tier::Priority, 0.70, 0.10)
            .with_action("Add a quantified target with unit and bound"),
        CriterionConfig::new(Testability, Tier::Gating, 0.70, 0.20)
            .with_action("State an observable outcome a test can verify"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_from_str() {
        for kind in CriterionKind::ALL {
            assert_eq!(kind.key().parse::<CriterionKind>().unwrap(), kind);
        }
        assert_eq!(" Clarity ".parse::<CriterionKind>().unwrap(), CriterionKind::Clarity);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = "readability".parse::<CriterionKind>().unwrap_err();
        assert!(err.to_string().contains("readability"));
    }

    #[test]
    fn phase_table_covers_every_criterion_once() {
        let mut seen: Vec<CriterionKind> = RepairPhase::ALL
            .iter()
            .flat_map(|p| p.criteria().iter().copied())
            .collect();
        assert_eq!(seen.len(), CriterionKind::ALL.len());
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), CriterionKind::ALL.len());
        for phase in RepairPhase::ALL {
            for kind in phase.criteria() {
                assert_eq!(kind.phase(), phase);
            }
        }
    }

    #[test]
    fn enum_order_matches_phase_table() {
        let table: Vec<CriterionKind> = RepairPhase::ALL
            .iter()
            .flat_map(|p| p.criteria().iter().copied())
            .collect();
        let mut sorted = table.clone();
        sorted.sort();
        assert_eq!(table, sorted);
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let bad_threshold = CriterionConfig::new(CriterionKind::Clarity, Tier::Gating, 1.2, 0.2);
        assert!(bad_threshold.validate().is_err());

        let bad_weight = CriterionConfig::new(CriterionKind::Clarity, Tier::Gating, 0.7, -0.1);
        assert!(bad_weight.validate().is_err());

        let nan_weight = CriterionConfig::new(CriterionKind::Clarity, Tier::Gating, 0.7, f64::NAN);
        assert!(nan_weight.validate().is_err());

        for config in default_criteria() {
            config.validate().unwrap();
        }
    }

    #[test]
    fn fallback_is_priority_tier() {
        let config = CriterionConfig::fallback(CriterionKind::Measurability);
        assert_eq!(config.tier, Tier::Priority);
        assert_eq!(config.weight, DEFAULT_WEIGHT);
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
    }
}
