//! Epsilon-greedy action selection over a [`ValueFunction`].

use ndarray::{Array2, ArrayView1, Axis};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::error::{DqnError, Result};
use crate::network::ValueFunction;
use crate::types::{Action, InputHistory};

/// Evaluate any number of histories through a fixed-width network.
///
/// Rows are packed into `batch_width` chunks; unused rows of the last chunk
/// are zero (dummy) histories whose outputs are discarded. The result has
/// exactly one row per history, in order.
pub fn forward_padded<V: ValueFunction + ?Sized>(net: &V, histories: &[&InputHistory]) -> Result<Array2<f32>> {
    let width = net.batch_width();
    let mut values = Array2::zeros((histories.len(), net.output_size()));

    for (chunk_index, chunk) in histories.chunks(width).enumerate() {
        let mut inputs = Array2::zeros((width, net.input_size()));
        for (history, row) in chunk.iter().zip(inputs.axis_iter_mut(Axis(0))) {
            history.write_row(row)?;
        }

        let outputs = net.forward(inputs.view())?;
        let start = chunk_index * width;
        for (i, output_row) in outputs.axis_iter(Axis(0)).take(chunk.len()).enumerate() {
            values.row_mut(start + i).assign(&output_row);
        }
    }

    Ok(values)
}

/// Index and value of the largest entry.
///
/// Ties go to the lowest index; NaN entries never win. `None` when every
/// entry is NaN or the row is empty.
pub fn greedy_action(values: ArrayView1<f32>) -> Option<(Action, f32)> {
    let mut best: Option<(Action, f32)> = None;
    for (action, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((action, value)),
        }
    }
    best
}

fn check_epsilon(epsilon: f64) -> Result<()> {
    if (0.0..=1.0).contains(&epsilon) {
        Ok(())
    } else {
        Err(DqnError::invalid_parameter("epsilon".to_string(), format!("must be within [0, 1], got {}", epsilon)))
    }
}

/// Acts uniformly at random with probability epsilon, greedily otherwise.
#[derive(Clone, Debug)]
pub struct EpsilonGreedy {
    legal_actions: Vec<Action>,
}

impl EpsilonGreedy {
    /// `legal_actions` must be non-empty; each entry names a network output column.
    pub fn new(legal_actions: Vec<Action>) -> Self {
        EpsilonGreedy { legal_actions }
    }

    pub fn legal_actions(&self) -> &[Action] {
        &self.legal_actions
    }

    fn explore<R: Rng + ?Sized>(&self, epsilon: f64, rng: &mut R) -> Option<Action> {
        if rng.gen::<f64>() < epsilon {
            self.legal_actions.choose(rng).copied()
        } else {
            None
        }
    }

    fn greedy_row(&self, values: ArrayView1<f32>) -> Result<Action> {
        if values.len() != self.legal_actions.len() {
            return Err(DqnError::dimension_mismatch(
                format!("{} action values", self.legal_actions.len()),
                format!("{} action values", values.len()),
            ));
        }
        greedy_action(values)
            .map(|(action, _)| action)
            .ok_or_else(|| DqnError::Numerical("network produced no comparable Q-values".to_string()))
    }

    pub fn select_action<V, R>(&self, net: &V, history: &InputHistory, epsilon: f64, rng: &mut R) -> Result<Action>
    where
        V: ValueFunction + ?Sized,
        R: Rng + ?Sized,
    {
        check_epsilon(epsilon)?;
        if let Some(action) = self.explore(epsilon, rng) {
            return Ok(action);
        }
        let values = forward_padded(net, &[history])?;
        self.greedy_row(values.row(0))
    }

    /// Batched form of [`select_action`](Self::select_action).
    ///
    /// Each history gets its own exploration draw; all greedy members share
    /// forward passes.
    pub fn select_actions<V, R>(&self, net: &V, histories: &[InputHistory], epsilon: f64, rng: &mut R) -> Result<Vec<Action>>
    where
        V: ValueFunction + ?Sized,
        R: Rng + ?Sized,
    {
        check_epsilon(epsilon)?;
        let mut actions: Vec<Option<Action>> = histories.iter().map(|_| self.explore(epsilon, rng)).collect();

        let greedy: Vec<(usize, &InputHistory)> = histories
            .iter()
            .enumerate()
            .filter(|(i, _)| actions[*i].is_none())
            .collect();
        if !greedy.is_empty() {
            let inputs: Vec<&InputHistory> = greedy.iter().map(|(_, h)| *h).collect();
            let values = forward_padded(net, &inputs)?;
            for ((position, _), row) in greedy.iter().zip(values.axis_iter(Axis(0))) {
                actions[*position] = Some(self.greedy_row(row)?);
            }
        }

        Ok(actions.into_iter().flatten().collect())
    }
}

/// Exploration rate annealed linearly from `start` to `end` over `anneal_steps`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpsilonSchedule {
    pub start: f64,
    pub end: f64,
    pub anneal_steps: usize,
}

impl Default for EpsilonSchedule {
    fn default() -> Self {
        EpsilonSchedule {
            start: 1.0,
            end: 0.1,
            anneal_steps: 10_000,
        }
    }
}

impl EpsilonSchedule {
    pub fn new(start: f64, end: f64, anneal_steps: usize) -> Result<Self> {
        check_epsilon(start)?;
        check_epsilon(end)?;
        Ok(EpsilonSchedule { start, end, anneal_steps })
    }

    pub fn value(&self, step: usize) -> f64 {
        if self.anneal_steps == 0 || step >= self.anneal_steps {
            return self.end;
        }
        let progress = step as f64 / self.anneal_steps as f64;
        self.start + (self.end - self.start) * progress
    }
}
