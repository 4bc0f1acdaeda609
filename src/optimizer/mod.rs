pub mod gradient_clipper;
pub mod lr_scheduler;
pub mod solver;

use ndarray::{Array1, Array2, Zip};
use serde::{Serialize, Deserialize};

use crate::layers::DenseLayer;

pub use gradient_clipper::GradientClipper;
pub use lr_scheduler::LearningRateScheduler;
pub use solver::{Solver, SolverConfig};

/// Parameter update rule. State is kept per layer, addressed by `layer`.
pub trait Optimizer {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32);
    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32);

    /// Called once after every layer has been updated for one iteration
    fn finish_step(&mut self) {}
}

/// Serializable choice of update rule, resolved against the network shape
/// by [`OptimizerWrapper::for_layers`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum OptimizerKind {
    Sgd { momentum: f32 },
    Adam { beta1: f32, beta2: f32, epsilon: f32 },
    RmsProp { decay: f32, epsilon: f32 },
}

impl Default for OptimizerKind {
    fn default() -> Self {
        OptimizerKind::Adam { beta1: 0.9, beta2: 0.999, epsilon: 1e-8 }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
    RMSProp(RMSProp),
}

impl OptimizerWrapper {
    pub fn for_layers(kind: OptimizerKind, layers: &[DenseLayer]) -> Self {
        match kind {
            OptimizerKind::Sgd { momentum } => OptimizerWrapper::SGD(SGD::new(layers, momentum)),
            OptimizerKind::Adam { beta1, beta2, epsilon } => {
                OptimizerWrapper::Adam(Adam::new(layers, beta1, beta2, epsilon))
            }
            OptimizerKind::RmsProp { decay, epsilon } => {
                OptimizerWrapper::RMSProp(RMSProp::new(layers, decay, epsilon))
            }
        }
    }

    /// True when the per-layer state matches the given network shape
    pub fn matches_layers(&self, layers: &[DenseLayer]) -> bool {
        let (weights, biases) = match self {
            OptimizerWrapper::SGD(o) => (&o.velocity_weights, &o.velocity_biases),
            OptimizerWrapper::Adam(o) => (&o.m_weights, &o.m_biases),
            OptimizerWrapper::RMSProp(o) => (&o.v_weights, &o.v_biases),
        };
        weights.len() == layers.len()
            && layers.iter().zip(weights.iter().zip(biases)).all(|(layer, (w, b))| {
                w.dim() == layer.weights.dim() && b.dim() == layer.biases.dim()
            })
    }
}

impl Optimizer for OptimizerWrapper {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
            OptimizerWrapper::RMSProp(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
        }
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
            OptimizerWrapper::RMSProp(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
        }
    }

    fn finish_step(&mut self) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.finish_step(),
            OptimizerWrapper::Adam(optimizer) => optimizer.finish_step(),
            OptimizerWrapper::RMSProp(optimizer) => optimizer.finish_step(),
        }
    }
}

/// Stochastic gradient descent with momentum: `v = μv + lr·g; w -= v`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SGD {
    pub momentum: f32,
    velocity_weights: Vec<Array2<f32>>,
    velocity_biases: Vec<Array1<f32>>,
}

impl SGD {
    pub fn new(layers: &[DenseLayer], momentum: f32) -> Self {
        SGD {
            momentum,
            velocity_weights: layers.iter().map(|l| Array2::zeros(l.weights.dim())).collect(),
            velocity_biases: layers.iter().map(|l| Array1::zeros(l.biases.dim())).collect(),
        }
    }
}

impl Optimizer for SGD {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        let momentum = self.momentum;
        let v = &mut self.velocity_weights[layer];
        Zip::from(&mut *v).and(gradients).for_each(|v, &g| *v = momentum * *v + learning_rate * g);
        *weights -= &*v;
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        let momentum = self.momentum;
        let v = &mut self.velocity_biases[layer];
        Zip::from(&mut *v).and(gradients).for_each(|v, &g| *v = momentum * *v + learning_rate * g);
        *biases -= &*v;
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m_weights: Vec<Array2<f32>>,
    v_weights: Vec<Array2<f32>>,
    m_biases: Vec<Array1<f32>>,
    v_biases: Vec<Array1<f32>>,
    /// Bias-correction timestep, starts at 1
    pub t: usize,
}

impl Adam {
    pub fn new(layers: &[DenseLayer], beta1: f32, beta2: f32, epsilon: f32) -> Self {
        let m_weights = layers
            .iter()
            .map(|layer| Array2::<f32>::zeros(layer.weights.dim()))
            .collect();
        let v_weights = layers
            .iter()
            .map(|layer| Array2::<f32>::zeros(layer.weights.dim()))
            .collect();
        let m_biases = layers
            .iter()
            .map(|layer| Array1::<f32>::zeros(layer.biases.dim()))
            .collect();
        let v_biases = layers
            .iter()
            .map(|layer| Array1::<f32>::zeros(layer.biases.dim()))
            .collect();

        Adam {
            beta1,
            beta2,
            epsilon,
            m_weights,
            v_weights,
            m_biases,
            v_biases,
            t: 1,
        }
    }

    fn corrections(&self) -> (f32, f32) {
        (
            1.0 - self.beta1.powi(self.t as i32),
            1.0 - self.beta2.powi(self.t as i32),
        )
    }
}

impl Optimizer for Adam {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        let (c1, c2) = self.corrections();
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let m = &mut self.m_weights[layer];
        let v = &mut self.v_weights[layer];

        Zip::from(weights).and(m).and(v).and(gradients).for_each(|w, m, v, &g| {
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * g * g;
            *w -= learning_rate * (*m / c1) / ((*v / c2).sqrt() + epsilon);
        });
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        let (c1, c2) = self.corrections();
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let m = &mut self.m_biases[layer];
        let v = &mut self.v_biases[layer];

        Zip::from(biases).and(m).and(v).and(gradients).for_each(|b, m, v, &g| {
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * g * g;
            *b -= learning_rate * (*m / c1) / ((*v / c2).sqrt() + epsilon);
        });
    }

    fn finish_step(&mut self) {
        self.t += 1;
    }
}

/// RMSProp optimizer
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RMSProp {
    pub decay: f32,
    pub epsilon: f32,
    v_weights: Vec<Array2<f32>>,
    v_biases: Vec<Array1<f32>>,
}

impl RMSProp {
    pub fn new(layers: &[DenseLayer], decay: f32, epsilon: f32) -> Self {
        let v_weights = layers
            .iter()
            .map(|layer| Array2::<f32>::zeros(layer.weights.dim()))
            .collect();
        let v_biases = layers
            .iter()
            .map(|layer| Array1::<f32>::zeros(layer.biases.dim()))
            .collect();

        RMSProp {
            decay,
            epsilon,
            v_weights,
            v_biases,
        }
    }
}

impl Optimizer for RMSProp {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        let (decay, epsilon) = (self.decay, self.epsilon);
        let v = &mut self.v_weights[layer];

        Zip::from(weights).and(v).and(gradients).for_each(|w, v, &g| {
            *v = decay * *v + (1.0 - decay) * g * g;
            *w -= learning_rate * g / (v.sqrt() + epsilon);
        });
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        let (decay, epsilon) = (self.decay, self.epsilon);
        let v = &mut self.v_biases[layer];

        Zip::from(biases).and(v).and(gradients).for_each(|b, v, &g| {
            *v = decay * *v + (1.0 - decay) * g * g;
            *b -= learning_rate * g / (v.sqrt() + epsilon);
        });
    }
}
