use rand::Rng;
use std::collections::VecDeque;

use crate::error::{DqnError, Result};
use crate::types::Transition;

/// Bounded FIFO store of transitions.
///
/// Once `capacity` transitions are held, each insertion evicts the oldest.
#[derive(Clone, Debug)]
pub struct ReplayMemory {
    buffer: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayMemory {
    pub fn new(capacity: usize) -> Self {
        ReplayMemory {
            buffer: VecDeque::new(),
            capacity,
        }
    }

    pub fn add(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Draw `batch_size` transitions uniformly, with replacement.
    ///
    /// Draws are independent, so one transition may appear several times.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Vec<&Transition>> {
        if self.buffer.len() < batch_size || self.buffer.is_empty() {
            return Err(DqnError::InsufficientData {
                required: batch_size.max(1),
                available: self.buffer.len(),
            });
        }
        Ok((0..batch_size)
            .map(|_| &self.buffer[rng.gen_range(0..self.buffer.len())])
            .collect())
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
