//! Observation, history and transition types shared by the replay memory,
//! the policy and the update engine.

use ndarray::{ArrayViewMut1, s};
use std::fmt;
use std::sync::Arc;

use crate::error::{DqnError, Result};

/// Number of features in one observation of the soccer environment
pub const STATE_DATA_SIZE: usize = 58;

/// Number of consecutive observations stacked into one network input
pub const INPUT_COUNT: usize = 2;

/// Flattened size of one network input
pub const INPUT_DATA_SIZE: usize = STATE_DATA_SIZE * INPUT_COUNT;

/// Fixed batch width of the value network
pub const MINIBATCH_SIZE: usize = 32;

/// Flattened size of one minibatch of network inputs
pub const MINIBATCH_DATA_SIZE: usize = INPUT_DATA_SIZE * MINIBATCH_SIZE;

/// Number of discrete actions (network outputs)
pub const OUTPUT_COUNT: usize = 5;

/// Index into the legal action list
pub type Action = usize;

/// One immutable observation vector.
///
/// Cloning is cheap: clones share the same feature storage, so the
/// overlapping windows of consecutive timesteps never copy features.
#[derive(Clone, PartialEq)]
pub struct StateObservation(Arc<[f32]>);

impl StateObservation {
    pub fn new(features: Vec<f32>) -> Self {
        StateObservation(features.into())
    }

    /// An all-zero observation, used to pad fixed-width batches
    pub fn zeros(dim: usize) -> Self {
        StateObservation(vec![0.0; dim].into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// True when both handles point at the same feature storage
    pub fn ptr_eq(&self, other: &StateObservation) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Vec<f32>> for StateObservation {
    fn from(features: Vec<f32>) -> Self {
        StateObservation::new(features)
    }
}

impl fmt::Debug for StateObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateObservation").field(&self.as_slice()).finish()
    }
}

/// The last `INPUT_COUNT` observations, oldest first.
#[derive(Clone, Debug, PartialEq)]
pub struct InputHistory([StateObservation; INPUT_COUNT]);

impl InputHistory {
    /// Build a history from a full window. All observations must share one dimension.
    pub fn new(observations: [StateObservation; INPUT_COUNT]) -> Result<Self> {
        let dim = observations[0].len();
        if dim == 0 {
            return Err(DqnError::invalid_parameter("observation", "must not be empty"));
        }
        if let Some(bad) = observations.iter().find(|o| o.len() != dim) {
            return Err(DqnError::dimension_mismatch(
                format!("observation of length {}", dim),
                format!("observation of length {}", bad.len()),
            ));
        }
        Ok(InputHistory(observations))
    }

    /// Window for the first step of an episode: every slot holds `first`.
    pub fn repeat(first: StateObservation) -> Result<Self> {
        Self::new(std::array::from_fn(|_| first.clone()))
    }

    /// Dummy all-zero history used to fill unused batch rows
    pub fn zeros(dim: usize) -> Self {
        let zero = StateObservation::zeros(dim);
        InputHistory(std::array::from_fn(|_| zero.clone()))
    }

    /// Slide the window forward by one observation.
    ///
    /// The retained observations are shared with `self`, not copied.
    pub fn push(&self, latest: StateObservation) -> Result<Self> {
        Self::new(std::array::from_fn(|i| {
            if i + 1 < INPUT_COUNT {
                self.0[i + 1].clone()
            } else {
                latest.clone()
            }
        }))
    }

    pub fn observations(&self) -> &[StateObservation; INPUT_COUNT] {
        &self.0
    }

    pub fn latest(&self) -> &StateObservation {
        &self.0[INPUT_COUNT - 1]
    }

    /// Dimension of a single observation
    pub fn observation_dim(&self) -> usize {
        self.0[0].len()
    }

    /// Length of the flattened network input
    pub fn flat_len(&self) -> usize {
        self.observation_dim() * INPUT_COUNT
    }

    /// Copy the window into one network input row, oldest observation first.
    pub fn write_row(&self, mut row: ArrayViewMut1<f32>) -> Result<()> {
        if row.len() != self.flat_len() {
            return Err(DqnError::dimension_mismatch(
                format!("input row of length {}", self.flat_len()),
                format!("input row of length {}", row.len()),
            ));
        }
        let dim = self.observation_dim();
        for (i, observation) in self.0.iter().enumerate() {
            row.slice_mut(s![i * dim..(i + 1) * dim])
                .iter_mut()
                .zip(observation.as_slice())
                .for_each(|(dst, &src)| *dst = src);
        }
        Ok(())
    }
}

/// What followed a transition
#[derive(Clone, Debug, PartialEq)]
pub enum Successor {
    /// The episode ended; no bootstrap term applies
    Terminal,
    /// The episode continued into this window
    Continuing(InputHistory),
}

impl Successor {
    pub fn history(&self) -> Option<&InputHistory> {
        match self {
            Successor::Terminal => None,
            Successor::Continuing(history) => Some(history),
        }
    }
}

/// One recorded step of experience
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub before: InputHistory,
    pub action: Action,
    pub reward: f32,
    pub successor: Successor,
}

impl Transition {
    pub fn new(before: InputHistory, action: Action, reward: f32, successor: Successor) -> Self {
        Transition { before, action, reward, successor }
    }

    pub fn terminal(before: InputHistory, action: Action, reward: f32) -> Self {
        Self::new(before, action, reward, Successor::Terminal)
    }

    pub fn continuing(before: InputHistory, action: Action, reward: f32, next: InputHistory) -> Self {
        Self::new(before, action, reward, Successor::Continuing(next))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.successor, Successor::Terminal)
    }
}
