use ndarray::{Array1, Array2};
use serde::{Serialize, Deserialize};

/// Gradient clipping applied before each parameter update
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum GradientClipper {
    /// No clipping
    #[default]
    None,

    /// Clip every gradient entry into `[min, max]`
    ClipByValue { min: f32, max: f32 },

    /// Rescale all gradients together when their joint L2 norm exceeds `max_norm`
    ClipByGlobalNorm { max_norm: f32 },
}

impl GradientClipper {
    /// Clip the gradients of every layer in place. Returns the global norm before clipping.
    pub fn clip(&self, gradients: &mut [(Array2<f32>, Array1<f32>)]) -> f32 {
        let global_norm = Self::compute_global_norm(gradients);

        match *self {
            GradientClipper::None => {}

            GradientClipper::ClipByValue { min, max } => {
                for (weight_grads, bias_grads) in gradients.iter_mut() {
                    weight_grads.mapv_inplace(|g| g.max(min).min(max));
                    bias_grads.mapv_inplace(|g| g.max(min).min(max));
                }
            }

            GradientClipper::ClipByGlobalNorm { max_norm } => {
                if global_norm > max_norm {
                    let scale = max_norm / global_norm;
                    for (weight_grads, bias_grads) in gradients.iter_mut() {
                        weight_grads.mapv_inplace(|g| g * scale);
                        bias_grads.mapv_inplace(|g| g * scale);
                    }
                }
            }
        }

        global_norm
    }

    /// Compute global norm of all gradients
    pub fn compute_global_norm(gradients: &[(Array2<f32>, Array1<f32>)]) -> f32 {
        gradients
            .iter()
            .map(|(w, b)| {
                w.iter().map(|&x| x * x).sum::<f32>() + b.iter().map(|&x| x * x).sum::<f32>()
            })
            .sum::<f32>()
            .sqrt()
    }
}
