//! Orchestrator settings and TOML configuration files.
//!
//! A settings file may carry an `[orchestrator]` table and any number of
//! `[[criteria]]` entries:
//!
//! ```toml
//! [orchestrator]
//! max_iterations = 4
//!
//! [[criteria]]
//! key = "clarity"
//! tier = "gating"
//! threshold = 0.75
//! weight = 0.2
//! remediation_action = "Use plain wording"
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{default_criteria, CriterionConfig, ReqforgeError, Result};
use crate::evaluation::{FanOutConfig, NEUTRAL_SCORE};
use crate::registry::CriteriaSource;

/// Loop limits and policies for one orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Hard cap on evaluate/fix passes.
    pub max_iterations: u32,
    /// Upper bound on children requested from the splitter.
    pub max_splits: usize,
    /// Maximum evaluator calls in flight during a fan-out.
    pub max_concurrent_evaluations: usize,
    /// Score substituted for a failed evaluation.
    pub neutral_score: f64,
    /// Keep rewrites that did not improve their own criterion.
    pub keep_non_improving_fixes: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            max_splits: 5,
            max_concurrent_evaluations: 8,
            neutral_score: NEUTRAL_SCORE,
            keep_non_improving_fixes: true,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(ReqforgeError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_evaluations == 0 {
            return Err(ReqforgeError::InvalidConfig(
                "max_concurrent_evaluations must be at least 1".to_string(),
            ));
        }
        if !self.neutral_score.is_finite() || !(0.0..=1.0).contains(&self.neutral_score) {
            return Err(ReqforgeError::InvalidConfig(format!(
                "neutral_score {} outside [0, 1]",
                self.neutral_score
            )));
        }
        Ok(())
    }

    pub fn fan_out(&self) -> FanOutConfig {
        FanOutConfig {
            max_concurrent: self.max_concurrent_evaluations,
            neutral_score: self.neutral_score,
        }
    }
}

/// Contents of a reqforge settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReqforgeConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub criteria: Vec<CriterionConfig>,
}

impl ReqforgeConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: ReqforgeConfig = toml::from_str(raw)?;
        config.orchestrator.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        debug!(path = %path.display(), criteria = config.criteria.len(), "settings file loaded");
        Ok(config)
    }

    /// Criteria from the file, or the built-in table when the file has none.
    pub fn criteria_or_default(&self) -> Vec<CriterionConfig> {
        if self.criteria.is_empty() {
            default_criteria()
        } else {
            self.criteria.clone()
        }
    }
}

/// Criteria read from a TOML settings file on every `load`.
#[derive(Debug, Clone)]
pub struct TomlCriteriaSource {
    path: PathBuf,
}

impl TomlCriteriaSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CriteriaSource for TomlCriteriaSource {
    async fn load(&self) -> Result<Vec<CriterionConfig>> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ReqforgeError::Source(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(ReqforgeConfig::from_toml_str(&raw)?.criteria_or_default())
    }
}
