use serde::{Serialize, Deserialize};

use crate::error::{DqnError, Result};

/// Learning rate as a function of the solver iteration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LearningRateScheduler {
    /// Constant learning rate
    Constant { lr: f32 },

    /// Step decay: lr = initial_lr * decay_rate^(step / step_size)
    StepDecay {
        initial_lr: f32,
        decay_rate: f32,
        step_size: usize,
    },

    /// Exponential decay: lr = initial_lr * decay_rate^step
    ExponentialDecay {
        initial_lr: f32,
        decay_rate: f32,
    },

    /// Inverse decay: lr = initial_lr * (1 + gamma * step)^(-power)
    Inverse {
        initial_lr: f32,
        gamma: f32,
        power: f32,
    },

    /// Linear decay: lr = initial_lr * (1 - step / max_steps)
    LinearDecay {
        initial_lr: f32,
        final_lr: f32,
        max_steps: usize,
    },

    /// Cosine annealing: lr = min_lr + 0.5 * (max_lr - min_lr) * (1 + cos(pi * step / period))
    CosineAnnealing {
        max_lr: f32,
        min_lr: f32,
        period: usize,
    },
}

impl Default for LearningRateScheduler {
    fn default() -> Self {
        LearningRateScheduler::Constant { lr: 2e-4 }
    }
}

impl LearningRateScheduler {
    /// Get the learning rate for a given step
    pub fn get_lr(&self, step: usize) -> f32 {
        match self {
            LearningRateScheduler::Constant { lr } => *lr,

            LearningRateScheduler::StepDecay { initial_lr, decay_rate, step_size } => {
                let num_decays = (step / step_size) as f32;
                initial_lr * decay_rate.powf(num_decays)
            }

            LearningRateScheduler::ExponentialDecay { initial_lr, decay_rate } => {
                initial_lr * decay_rate.powf(step as f32)
            }

            LearningRateScheduler::Inverse { initial_lr, gamma, power } => {
                initial_lr * (1.0 + gamma * step as f32).powf(-power)
            }

            LearningRateScheduler::LinearDecay { initial_lr, final_lr, max_steps } => {
                if step >= *max_steps {
                    *final_lr
                } else {
                    let progress = step as f32 / *max_steps as f32;
                    initial_lr * (1.0 - progress) + final_lr * progress
                }
            }

            LearningRateScheduler::CosineAnnealing { max_lr, min_lr, period } => {
                let progress = (step % period) as f32 / *period as f32;
                min_lr + 0.5 * (max_lr - min_lr) * (1.0 + (std::f32::consts::PI * progress).cos())
            }
        }
    }

    /// Reject schedules that would divide by zero or produce a non-positive rate.
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(DqnError::invalid_parameter(name.to_string(), format!("must be positive, got {}", value)))
            }
        };
        let nonzero = |name: &str, value: usize| {
            if value > 0 {
                Ok(())
            } else {
                Err(DqnError::invalid_parameter(name, "must be greater than 0"))
            }
        };

        match *self {
            LearningRateScheduler::Constant { lr } => positive("lr", lr),
            LearningRateScheduler::StepDecay { initial_lr, step_size, .. } => {
                positive("initial_lr", initial_lr)?;
                nonzero("step_size", step_size)
            }
            LearningRateScheduler::ExponentialDecay { initial_lr, .. } => positive("initial_lr", initial_lr),
            LearningRateScheduler::Inverse { initial_lr, .. } => positive("initial_lr", initial_lr),
            LearningRateScheduler::LinearDecay { initial_lr, max_steps, .. } => {
                positive("initial_lr", initial_lr)?;
                nonzero("max_steps", max_steps)
            }
            LearningRateScheduler::CosineAnnealing { max_lr, period, .. } => {
                positive("max_lr", max_lr)?;
                nonzero("period", period)
            }
        }
    }

    /// Create a constant learning rate scheduler
    pub fn constant(lr: f32) -> Self {
        LearningRateScheduler::Constant { lr }
    }

    /// Create a step decay scheduler
    pub fn step_decay(initial_lr: f32, decay_rate: f32, step_size: usize) -> Self {
        LearningRateScheduler::StepDecay {
            initial_lr,
            decay_rate,
            step_size,
        }
    }
}
