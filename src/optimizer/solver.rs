use ndarray::{Array1, Array2};
use serde::{Serialize, Deserialize};
use std::path::PathBuf;

use crate::error::{DqnError, Result};
use crate::layers::DenseLayer;
use super::{GradientClipper, LearningRateScheduler, Optimizer, OptimizerKind, OptimizerWrapper};

/// Training configuration of the value network.
///
/// Opaque to the learning algorithm: the agent only hands it to the network.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    pub optimizer: OptimizerKind,
    pub lr_schedule: LearningRateScheduler,
    /// L2 penalty added to weight gradients
    pub weight_decay: f32,
    pub clipper: GradientClipper,
    /// Snapshots are written as `<prefix>_iter_<N>.model` / `.solverstate`
    pub snapshot_prefix: PathBuf,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            optimizer: OptimizerKind::default(),
            lr_schedule: LearningRateScheduler::default(),
            weight_decay: 0.0,
            clipper: GradientClipper::ClipByGlobalNorm { max_norm: 10.0 },
            snapshot_prefix: PathBuf::from("snapshots/dqn"),
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<()> {
        self.lr_schedule.validate()?;

        if !(self.weight_decay.is_finite() && self.weight_decay >= 0.0) {
            return Err(DqnError::invalid_parameter("weight_decay", "must be a finite value >= 0"));
        }

        let unit = |name: &str, value: f32| {
            if (0.0..1.0).contains(&value) {
                Ok(())
            } else {
                Err(DqnError::invalid_parameter(name.to_string(), format!("must be within [0, 1), got {}", value)))
            }
        };
        let positive = |name: &str, value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(DqnError::invalid_parameter(name.to_string(), format!("must be positive, got {}", value)))
            }
        };

        match self.optimizer {
            OptimizerKind::Sgd { momentum } => unit("momentum", momentum)?,
            OptimizerKind::Adam { beta1, beta2, epsilon } => {
                unit("beta1", beta1)?;
                unit("beta2", beta2)?;
                positive("epsilon", epsilon)?;
            }
            OptimizerKind::RmsProp { decay, epsilon } => {
                unit("decay", decay)?;
                positive("epsilon", epsilon)?;
            }
        }

        match self.clipper {
            GradientClipper::None => {}
            GradientClipper::ClipByValue { min, max } => {
                if !(min < max) {
                    return Err(DqnError::invalid_parameter("clipper", "ClipByValue requires min < max"));
                }
            }
            GradientClipper::ClipByGlobalNorm { max_norm } => positive("max_norm", max_norm)?,
        }

        if self.snapshot_prefix.as_os_str().is_empty() {
            return Err(DqnError::invalid_parameter("snapshot_prefix", "must not be empty"));
        }
        Ok(())
    }
}

/// Applies one parameter update per iteration: weight decay, clipping,
/// scheduled learning rate, then the optimizer rule.
#[derive(Clone, Debug)]
pub struct Solver {
    config: SolverConfig,
    optimizer: OptimizerWrapper,
}

impl Solver {
    pub fn new(config: SolverConfig, layers: &[DenseLayer]) -> Self {
        let optimizer = OptimizerWrapper::for_layers(config.optimizer, layers);
        Solver { config, optimizer }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn learning_rate(&self, iteration: usize) -> f32 {
        self.config.lr_schedule.get_lr(iteration)
    }

    /// Update `layers` from per-layer `(weight, bias)` gradients.
    ///
    /// Returns the global gradient norm measured before clipping.
    pub fn apply_update(
        &mut self,
        layers: &mut [DenseLayer],
        mut gradients: Vec<(Array2<f32>, Array1<f32>)>,
        iteration: usize,
    ) -> f32 {
        if self.config.weight_decay > 0.0 {
            let decay = self.config.weight_decay;
            for (layer, (weight_grads, _)) in layers.iter().zip(gradients.iter_mut()) {
                weight_grads.scaled_add(decay, &layer.weights);
            }
        }

        let grad_norm = self.config.clipper.clip(&mut gradients);
        let learning_rate = self.learning_rate(iteration);

        for (index, (layer, (weight_grads, bias_grads))) in layers.iter_mut().zip(gradients).enumerate() {
            self.optimizer.update_weights(index, &mut layer.weights, &weight_grads, learning_rate);
            self.optimizer.update_biases(index, &mut layer.biases, &bias_grads, learning_rate);
        }
        self.optimizer.finish_step();

        grad_norm
    }

    pub fn optimizer_state(&self) -> &OptimizerWrapper {
        &self.optimizer
    }

    /// Replace the optimizer state with one read from a solver state file.
    pub fn restore_optimizer_state(&mut self, state: OptimizerWrapper, layers: &[DenseLayer]) -> Result<()> {
        if !state.matches_layers(layers) {
            return Err(DqnError::dimension_mismatch(
                "optimizer state shaped like the network",
                "optimizer state for a different architecture",
            ));
        }
        self.optimizer = state;
        Ok(())
    }
}
