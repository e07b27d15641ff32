//! Criterion registry and criteria sources.
//!
//! The registry is built once from a [`CriteriaSource`], keeps only active
//! criteria, and is shared read-only by every orchestration.

use std::borrow::Cow;
use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::{
    default_criteria, CriterionConfig, CriterionKind, RepairPhase, ReqforgeError, Result,
};

/// Supplier of criterion definitions.
#[async_trait]
pub trait CriteriaSource: Send + Sync {
    /// Load all criterion definitions, active or not.
    async fn load(&self) -> Result<Vec<CriterionConfig>>;
}

/// The built-in nine-criterion table.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCriteria;

#[async_trait]
impl CriteriaSource for BuiltinCriteria {
    async fn load(&self) -> Result<Vec<CriterionConfig>> {
        Ok(default_criteria())
    }
}

/// A caller-supplied list of criteria.
#[derive(Debug, Clone, Default)]
pub struct StaticCriteria(pub Vec<CriterionConfig>);

#[async_trait]
impl CriteriaSource for StaticCriteria {
    async fn load(&self) -> Result<Vec<CriterionConfig>> {
        Ok(self.0.clone())
    }
}

/// Immutable lookup of active criterion configurations.
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaRegistry {
    configs: BTreeMap<CriterionKind, CriterionConfig>,
}

impl CriteriaRegistry {
    /// Validate `configs` and keep the active ones.
    ///
    /// Rejects out-of-range values and duplicate keys (inactive duplicates
    /// included). An empty active set is allowed here; processing with it
    /// fails at the orchestration boundary.
    pub fn from_configs(configs: Vec<CriterionConfig>) -> Result<Self> {
        let mut seen = BTreeMap::new();
        for config in configs {
            config.validate()?;
            if seen.contains_key(&config.key) {
                return Err(ReqforgeError::DuplicateCriterion(config.key.to_string()));
            }
            seen.insert(config.key, config);
        }

        let total = seen.len();
        let configs: BTreeMap<CriterionKind, CriterionConfig> =
            seen.into_iter().filter(|(_, c)| c.active).collect();
        debug!(total, active = configs.len(), "criteria registry built");

        Ok(Self { configs })
    }

    /// Load from a source.
    pub async fn load(source: &dyn CriteriaSource) -> Result<Self> {
        let registry = Self::from_configs(source.load().await?)?;
        info!(active = registry.len(), "criteria loaded");
        Ok(registry)
    }

    /// Registry over the built-in table.
    pub fn builtin() -> Self {
        Self {
            configs: default_criteria()
                .into_iter()
                .map(|c| (c.key, c))
                .collect(),
        }
    }

    pub fn get(&self, criterion: CriterionKind) -> Option<&CriterionConfig> {
        self.configs.get(&criterion)
    }

    /// Config for `criterion`, falling back to the default policy when the
    /// criterion is not registered.
    pub fn resolve(&self, criterion: CriterionKind) -> Cow<'_, CriterionConfig> {
        match self.configs.get(&criterion) {
            Some(config) => Cow::Borrowed(config),
            None => Cow::Owned(CriterionConfig::fallback(criterion)),
        }
    }

    pub fn contains(&self, criterion: CriterionKind) -> bool {
        self.configs.contains_key(&criterion)
    }

    /// Active criteria in repair-phase order.
    pub fn active_criteria(&self) -> impl Iterator<Item = CriterionKind> + '_ {
        self.configs.keys().copied()
    }

    pub fn configs(&self) -> impl Iterator<Item = &CriterionConfig> {
        self.configs.values()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Active criteria grouped by repair phase, phases in order.
    pub fn phases(&self) -> Vec<(RepairPhase, Vec<CriterionKind>)> {
        RepairPhase::ALL
            .iter()
            .map(|phase| {
                let members = phase
                    .criteria()
                    .iter()
                    .copied()
                    .filter(|c| self.contains(*c))
                    .collect();
                (*phase, members)
            })
            .collect()
    }

    /// Order `failing` criteria by the repair-phase table.
    ///
    /// Only criteria present in `failing` are returned; duplicates collapse.
    pub fn repair_order<I>(&self, failing: I) -> Vec<CriterionKind>
    where
        I: IntoIterator<Item = CriterionKind>,
    {
        let failing: Vec<CriterionKind> = failing.into_iter().collect();
        RepairPhase::ALL
            .iter()
            .flat_map(|phase| phase.criteria().iter().copied())
            .filter(|c| failing.contains(c))
            .collect()
    }
}

impl Default for CriteriaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
