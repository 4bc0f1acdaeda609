pub mod test_config;
pub mod test_optimizer;

use ndarray::{Array2, ArrayView2};
use std::cell::Cell;

use crate::error::{DqnError, Result};
use crate::network::{NetworkConfig, ValueFunction};
use crate::optimizer::{GradientClipper, LearningRateScheduler, OptimizerKind, SolverConfig};
use crate::types::{InputHistory, StateObservation, Transition};

/// Fixed-width value function scoring action `a` as
/// `first_feature * slopes[a] + offsets[a]`. Counts forward calls.
pub struct StubValues {
    pub state_dim: usize,
    pub width: usize,
    pub slopes: Vec<f32>,
    pub offsets: Vec<f32>,
    pub calls: Cell<usize>,
}

impl StubValues {
    pub fn new(state_dim: usize, width: usize, slopes: Vec<f32>, offsets: Vec<f32>) -> Self {
        assert_eq!(slopes.len(), offsets.len());
        StubValues {
            state_dim,
            width,
            slopes,
            offsets,
            calls: Cell::new(0),
        }
    }

    /// Same value for every input
    pub fn constant(state_dim: usize, width: usize, values: Vec<f32>) -> Self {
        let slopes = vec![0.0; values.len()];
        Self::new(state_dim, width, slopes, values)
    }

    pub fn value(&self, feature: f32, action: usize) -> f32 {
        feature * self.slopes[action] + self.offsets[action]
    }
}

impl ValueFunction for StubValues {
    fn input_size(&self) -> usize {
        self.state_dim * crate::types::INPUT_COUNT
    }

    fn output_size(&self) -> usize {
        self.slopes.len()
    }

    fn batch_width(&self) -> usize {
        self.width
    }

    fn forward(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        if inputs.dim() != (self.width, self.input_size()) {
            return Err(DqnError::dimension_mismatch(
                format!("{:?}", (self.width, self.input_size())),
                format!("{:?}", inputs.dim()),
            ));
        }
        self.calls.set(self.calls.get() + 1);
        Ok(Array2::from_shape_fn((self.width, self.output_size()), |(row, action)| {
            self.value(inputs[[row, 0]], action)
        }))
    }
}

/// History whose observations are all `value`
pub fn history(value: f32, state_dim: usize) -> InputHistory {
    InputHistory::repeat(StateObservation::new(vec![value; state_dim])).unwrap()
}

pub fn continuing(value: f32, action: usize, reward: f32, state_dim: usize) -> Transition {
    Transition::continuing(history(value, state_dim), action, reward, history(value + 1.0, state_dim))
}

pub fn terminal(value: f32, action: usize, reward: f32, state_dim: usize) -> Transition {
    Transition::terminal(history(value, state_dim), action, reward)
}

/// A network small enough for fast tests
pub fn small_network(state_dim: usize, batch_width: usize) -> NetworkConfig {
    NetworkConfig {
        state_dim,
        batch_width,
        hidden_layers: vec![8],
        ..NetworkConfig::default()
    }
}

pub fn sgd_solver(lr: f32) -> SolverConfig {
    SolverConfig {
        optimizer: OptimizerKind::Sgd { momentum: 0.0 },
        lr_schedule: LearningRateScheduler::constant(lr),
        clipper: GradientClipper::None,
        ..SolverConfig::default()
    }
}
