//! Minibatch construction for one DQN update.

use ndarray::{Array2, Axis};

use crate::error::{DqnError, Result};
use crate::network::{TrainableValueFunction, ValueFunction};
use crate::policy::{forward_padded, greedy_action};
use crate::types::{InputHistory, Transition};

/// The three tensors fed to one training step
#[derive(Clone, Debug, PartialEq)]
pub struct Minibatch {
    /// One flattened `before` history per row
    pub states: Array2<f32>,
    /// Zero except the taken action's column, which holds the TD target
    pub targets: Array2<f32>,
    /// One-hot on the taken action's column
    pub mask: Array2<f32>,
}

/// `reward` for terminal transitions, `reward + gamma * max_next` otherwise.
pub fn td_target(reward: f32, gamma: f32, max_next: Option<f32>) -> f32 {
    match max_next {
        None => reward,
        Some(value) => reward + gamma * value,
    }
}

/// Build states, targets and mask for `batch`.
///
/// Successor values come from `target` only. Terminal transitions get no
/// bootstrap term.
pub fn build_minibatch<V: ValueFunction + ?Sized>(batch: &[&Transition], target: &V, gamma: f32) -> Result<Minibatch> {
    let num_actions = target.output_size();
    let rows = batch.len();

    if let Some(bad) = batch.iter().find(|t| t.action >= num_actions) {
        return Err(DqnError::InvalidAction {
            action: bad.action,
            max_actions: num_actions,
        });
    }

    let successors: Vec<&InputHistory> = batch.iter().filter_map(|t| t.successor.history()).collect();
    let successor_values = forward_padded(target, &successors)?;
    let mut successor_rows = successor_values.axis_iter(Axis(0));

    let mut states = Array2::zeros((rows, target.input_size()));
    let mut targets = Array2::zeros((rows, num_actions));
    let mut mask = Array2::zeros((rows, num_actions));

    for (i, transition) in batch.iter().enumerate() {
        transition.before.write_row(states.row_mut(i))?;

        let max_next = match transition.successor.history() {
            None => None,
            Some(_) => {
                let row = successor_rows
                    .next()
                    .ok_or_else(|| DqnError::Numerical("missing successor values".to_string()))?;
                let (_, value) = greedy_action(row)
                    .ok_or_else(|| DqnError::Numerical("target network produced no comparable Q-values".to_string()))?;
                Some(value)
            }
        };

        targets[[i, transition.action]] = td_target(transition.reward, gamma, max_next);
        mask[[i, transition.action]] = 1.0;
    }

    Ok(Minibatch { states, targets, mask })
}

/// Build the minibatch from `target` and take one training step on `primary`.
///
/// Returns the training loss.
pub fn train_on_batch<T, V>(primary: &mut T, target: &V, batch: &[&Transition], gamma: f32) -> Result<f32>
where
    T: TrainableValueFunction + ?Sized,
    V: ValueFunction + ?Sized,
{
    let minibatch = build_minibatch(batch, target, gamma)?;
    primary.train_step(minibatch.states.view(), minibatch.targets.view(), minibatch.mask.view())
}
