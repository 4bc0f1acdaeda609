use serde::{Serialize, Deserialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{DqnError, Result};
use crate::network::NetworkConfig;
use crate::optimizer::SolverConfig;
use crate::types::{Action, OUTPUT_COUNT};

/// Agent configuration, fixed for the agent's lifetime.
///
/// Loadable from JSON; missing fields take their defaults.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DqnConfig {
    /// Distinct action indices; each names one network output column
    pub legal_actions: Vec<Action>,
    pub replay_memory_capacity: usize,
    /// Discount factor in `[0, 1]`
    pub gamma: f32,
    /// Number of `update()` calls between target network refreshes
    pub clone_frequency: usize,
    /// Seed of the agent-owned random source
    pub seed: u64,
    pub network: NetworkConfig,
    pub solver: SolverConfig,
}

impl Default for DqnConfig {
    fn default() -> Self {
        DqnConfig {
            legal_actions: (0..OUTPUT_COUNT).collect(),
            replay_memory_capacity: 500_000,
            gamma: 0.99,
            clone_frequency: 10_000,
            seed: 0,
            network: NetworkConfig::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl DqnConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: DqnConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Report the first invariant violation. Values are never clamped.
    pub fn validate(&self) -> Result<()> {
        if self.legal_actions.is_empty() {
            return Err(DqnError::invalid_parameter("legal_actions", "must not be empty"));
        }
        let mut seen = HashSet::with_capacity(self.legal_actions.len());
        for &action in &self.legal_actions {
            if !seen.insert(action) {
                return Err(DqnError::invalid_parameter(
                    "legal_actions".to_string(),
                    format!("action {} appears more than once", action),
                ));
            }
            if action >= self.legal_actions.len() {
                return Err(DqnError::InvalidAction {
                    action,
                    max_actions: self.legal_actions.len(),
                });
            }
        }

        if self.replay_memory_capacity == 0 {
            return Err(DqnError::invalid_parameter("replay_memory_capacity", "must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(DqnError::invalid_parameter(
                "gamma".to_string(),
                format!("must be within [0, 1], got {}", self.gamma),
            ));
        }
        if self.clone_frequency == 0 {
            return Err(DqnError::invalid_parameter("clone_frequency", "must be greater than 0"));
        }

        self.network.validate()?;
        self.solver.validate()
    }
}
