use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

use crate::config::DqnConfig;
use crate::error::{DqnError, Result};
use crate::network::{NetworkConfig, QNetwork, TargetNetwork, TrainableValueFunction, ValueFunction};
use crate::optimizer::SolverConfig;
use crate::policy::EpsilonGreedy;
use crate::replay_buffer::ReplayMemory;
use crate::types::{Action, InputHistory, Transition};
use super::update::train_on_batch;

/// Outcome of one [`DqnAgent::update`] call
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateStats {
    /// Masked Euclidean loss before the parameter update
    pub loss: f32,
    /// Iteration counter after the update
    pub iteration: usize,
    /// Whether the target network was refreshed by this update
    pub target_refreshed: bool,
}

struct Networks {
    primary: QNetwork,
    target: TargetNetwork,
}

/// Deep Q-Network agent with a replay memory and a periodically refreshed
/// target network.
///
/// The agent owns its random source, seeded from the configuration, so a run
/// is reproducible. Networks exist only after [`initialize`](Self::initialize);
/// every method that needs them fails with [`DqnError::NotInitialized`] before.
///
/// # Example
///
/// ```rust,no_run
/// use hfo_dqn::agent::DqnAgent;
/// use hfo_dqn::config::DqnConfig;
/// use hfo_dqn::types::{InputHistory, StateObservation, Transition, STATE_DATA_SIZE};
///
/// let mut agent = DqnAgent::new(DqnConfig::default()).unwrap();
/// agent.initialize().unwrap();
///
/// let history = InputHistory::repeat(StateObservation::zeros(STATE_DATA_SIZE)).unwrap();
/// let action = agent.select_action(&history, 1.0).unwrap();
/// agent.add_transition(Transition::terminal(history, action, -1.0)).unwrap();
///
/// if agent.memory_size() >= 32 {
///     let stats = agent.update().unwrap();
///     println!("loss {}", stats.loss);
/// }
/// ```
pub struct DqnAgent {
    config: DqnConfig,
    policy: EpsilonGreedy,
    memory: ReplayMemory,
    networks: Option<Networks>,
    update_step_counter: usize,
    rng: StdRng,
}

impl DqnAgent {
    /// Validate `config` and create an agent without networks.
    pub fn new(config: DqnConfig) -> Result<Self> {
        config.validate()?;
        Ok(DqnAgent {
            policy: EpsilonGreedy::new(config.legal_actions.clone()),
            memory: ReplayMemory::new(config.replay_memory_capacity),
            networks: None,
            update_step_counter: 0,
            rng: StdRng::seed_from_u64(config.seed),
            config,
        })
    }

    /// Build the primary network and clone it into the target network.
    ///
    /// Calling this again discards the networks and the replay memory.
    pub fn initialize(&mut self) -> Result<()> {
        let primary = QNetwork::new(
            &self.config.network,
            self.config.legal_actions.len(),
            self.config.solver.clone(),
            &mut self.rng,
        )?;
        let target = TargetNetwork::from_primary(&primary);
        self.update_step_counter = primary.iteration();
        self.memory.clear();

        info!(
            "Initialized DQN agent: {} inputs, {} actions, batch width {}",
            primary.input_size(),
            primary.output_size(),
            primary.batch_width()
        );
        self.networks = Some(Networks { primary, target });
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.networks.is_some()
    }

    fn networks(&self) -> Result<&Networks> {
        self.networks.as_ref().ok_or(DqnError::NotInitialized)
    }

    fn networks_mut(&mut self) -> Result<&mut Networks> {
        self.networks.as_mut().ok_or(DqnError::NotInitialized)
    }

    /// Overwrite the primary parameters from a model file and re-clone the
    /// target. Optimizer state and the iteration counter are kept.
    pub fn load_trained_model(&mut self, path: &Path) -> Result<()> {
        let networks = self.networks_mut()?;
        networks.primary.load_parameters(path)?;
        networks.target.refresh_from(&networks.primary);
        Ok(())
    }

    /// Resume training from a solver state file written by [`snapshot`](Self::snapshot).
    ///
    /// The iteration counter resumes from the saved value and the target
    /// network is re-cloned from the restored primary.
    pub fn restore_solver(&mut self, path: &Path) -> Result<()> {
        let networks = self.networks_mut()?;
        networks.primary.restore(path)?;
        networks.target.refresh_from(&networks.primary);
        let iteration = networks.primary.iteration();
        self.update_step_counter = iteration;
        Ok(())
    }

    /// Persist the primary network and its optimizer state.
    ///
    /// Returns `(model_path, solver_state_path)`.
    pub fn snapshot(&self) -> Result<(PathBuf, PathBuf)> {
        self.networks()?.primary.snapshot()
    }

    /// Choose an action for one history with exploration rate `epsilon`.
    pub fn select_action(&mut self, history: &InputHistory, epsilon: f64) -> Result<Action> {
        let networks = self.networks.as_ref().ok_or(DqnError::NotInitialized)?;
        self.check_history(history)?;
        self.policy.select_action(&networks.primary, history, epsilon, &mut self.rng)
    }

    /// Choose one action per history; the result has the same length and order.
    pub fn select_actions(&mut self, histories: &[InputHistory], epsilon: f64) -> Result<Vec<Action>> {
        let networks = self.networks.as_ref().ok_or(DqnError::NotInitialized)?;
        for history in histories {
            self.check_history(history)?;
        }
        self.policy.select_actions(&networks.primary, histories, epsilon, &mut self.rng)
    }

    fn check_history(&self, history: &InputHistory) -> Result<()> {
        let expected = self.config.network.state_dim;
        if history.observation_dim() != expected {
            return Err(DqnError::dimension_mismatch(
                format!("observations of length {}", expected),
                format!("observations of length {}", history.observation_dim()),
            ));
        }
        Ok(())
    }

    /// Store a transition, evicting the oldest when the memory is full.
    pub fn add_transition(&mut self, transition: Transition) -> Result<()> {
        self.networks()?;
        let num_actions = self.config.legal_actions.len();
        if transition.action >= num_actions {
            return Err(DqnError::InvalidAction {
                action: transition.action,
                max_actions: num_actions,
            });
        }
        self.check_history(&transition.before)?;
        if let Some(next) = transition.successor.history() {
            self.check_history(next)?;
        }
        self.memory.add(transition);
        Ok(())
    }

    /// One DQN update: sample a minibatch, build Bellman targets from the
    /// target network, take one training step on the primary network, and
    /// refresh the target every `clone_frequency` updates.
    ///
    /// Fails with [`DqnError::InsufficientData`] while the memory holds fewer
    /// transitions than one minibatch.
    pub fn update(&mut self) -> Result<UpdateStats> {
        let networks = self.networks.as_mut().ok_or(DqnError::NotInitialized)?;
        let width = networks.primary.batch_width();
        let batch = self.memory.sample(width, &mut self.rng)?;

        let loss = train_on_batch(&mut networks.primary, &networks.target, &batch, self.config.gamma)?;
        if !loss.is_finite() {
            warn!("Non-finite training loss {} at iteration {}", loss, self.update_step_counter);
        }

        self.update_step_counter += 1;
        let target_refreshed = self.update_step_counter % self.config.clone_frequency == 0;
        if target_refreshed {
            networks.target.refresh_from(&networks.primary);
            info!("Refreshed target network at iteration {}", self.update_step_counter);
        }

        debug!("Update {}: loss {:.6}", self.update_step_counter, loss);
        Ok(UpdateStats {
            loss,
            iteration: self.update_step_counter,
            target_refreshed,
        })
    }

    pub fn clear_replay_memory(&mut self) {
        self.memory.clear();
    }

    pub fn memory_size(&self) -> usize {
        self.memory.len()
    }

    pub fn memory(&self) -> &ReplayMemory {
        &self.memory
    }

    /// Training iteration, including iterations restored from a solver state
    pub fn current_iteration(&self) -> usize {
        self.update_step_counter
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    pub fn legal_actions(&self) -> &[Action] {
        self.policy.legal_actions()
    }

    pub fn primary(&self) -> Result<&QNetwork> {
        Ok(&self.networks()?.primary)
    }

    pub fn target(&self) -> Result<&TargetNetwork> {
        Ok(&self.networks()?.target)
    }
}

/// Builder over [`DqnConfig`]; `build` returns an initialized agent.
pub struct DqnAgentBuilder {
    config: DqnConfig,
}

impl DqnAgentBuilder {
    pub fn new() -> Self {
        DqnAgentBuilder {
            config: DqnConfig::default(),
        }
    }

    pub fn legal_actions(mut self, actions: &[Action]) -> Self {
        self.config.legal_actions = actions.to_vec();
        self
    }

    pub fn replay_memory_capacity(mut self, capacity: usize) -> Self {
        self.config.replay_memory_capacity = capacity;
        self
    }

    pub fn gamma(mut self, gamma: f32) -> Self {
        self.config.gamma = gamma;
        self
    }

    pub fn clone_frequency(mut self, frequency: usize) -> Self {
        self.config.clone_frequency = frequency;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn network(mut self, network: NetworkConfig) -> Self {
        self.config.network = network;
        self
    }

    pub fn solver(mut self, solver: SolverConfig) -> Self {
        self.config.solver = solver;
        self
    }

    pub fn build(self) -> Result<DqnAgent> {
        let mut agent = DqnAgent::new(self.config)?;
        agent.initialize()?;
        Ok(agent)
    }
}

impl Default for DqnAgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
