use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::Result;
use super::initialization::WeightInit;

/// A fully connected layer: `activation(inputs · W + b)`.
///
/// The layer holds parameters only. Values needed by the backward pass are
/// returned from `forward_cached` so that read-only evaluation stays `&self`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
}

/// Forward-pass values kept for backpropagation
pub struct LayerCache {
    inputs: Array2<f32>,
    pre_activation_output: Array2<f32>,
}

impl DenseLayer {
    /// Create a layer whose weights are drawn from `init` using `rng`.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Result<Self> {
        Ok(DenseLayer {
            weights: init.initialize_weights((input_size, output_size), rng)?,
            biases: init.initialize_biases(output_size),
            activation,
        })
    }

    pub fn forward_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    pub fn forward_cached(&self, inputs: ArrayView2<f32>) -> (Array2<f32>, LayerCache) {
        let pre_activation_output = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        let mut outputs = pre_activation_output.clone();
        self.activation.apply_batch(&mut outputs);
        let cache = LayerCache {
            inputs: inputs.to_owned(),
            pre_activation_output,
        };
        (outputs, cache)
    }

    /// Returns `(adjusted_error, weight_gradients, bias_gradients)`.
    ///
    /// `adjusted_error` is the error at the pre-activation output; the caller
    /// multiplies it by `W^T` to continue into the previous layer.
    pub fn backward_batch(&self, cache: &LayerCache, output_errors: ArrayView2<f32>) -> (Array2<f32>, Array2<f32>, Array1<f32>) {
        let activation_deriv = self.activation.derivative_batch(cache.pre_activation_output.view());
        let adjusted_error = &output_errors * &activation_deriv;
        let weight_gradients = cache.inputs.t().dot(&adjusted_error);
        let bias_gradients = adjusted_error.sum_axis(Axis(0));

        (adjusted_error, weight_gradients, bias_gradients)
    }

    pub fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }

    pub fn output_size(&self) -> usize {
        self.weights.shape()[1]
    }
}
