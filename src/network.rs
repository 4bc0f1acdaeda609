//! The value network: a multilayer perceptron mapping a flattened input
//! history to one Q-value per legal action.
//!
//! Two capabilities are split at the type level. [`ValueFunction`] is the
//! read-only forward evaluation; [`TrainableValueFunction`] adds the masked
//! training step. [`QNetwork`] implements both. [`TargetNetwork`] is a frozen
//! copy of a `QNetwork`'s parameters and implements only `ValueFunction`, so
//! target generation can never train it.

use log::info;
use ndarray::{Array1, Array2, ArrayView2};
use rand::Rng;
use serde::{Serialize, Deserialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::activations::Activation;
use crate::error::{DqnError, Result};
use crate::layers::{DenseLayer, LayerCache, WeightInit};
use crate::loss::{Loss, MaskedEuclideanLoss};
use crate::optimizer::{OptimizerWrapper, Solver, SolverConfig};
use crate::types::{INPUT_COUNT, MINIBATCH_SIZE, STATE_DATA_SIZE};

/// Shape of the value network.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Features per observation
    pub state_dim: usize,
    /// Rows per forward/training call
    pub batch_width: usize,
    pub hidden_layers: Vec<usize>,
    pub hidden_activation: Activation,
    /// Defaults to the recommendation for `hidden_activation`
    pub weight_init: Option<WeightInit>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            state_dim: STATE_DATA_SIZE,
            batch_width: MINIBATCH_SIZE,
            hidden_layers: vec![256, 128],
            hidden_activation: Activation::Relu,
            weight_init: None,
        }
    }
}

impl NetworkConfig {
    /// Length of one flattened input history
    pub fn input_size(&self) -> usize {
        self.state_dim * INPUT_COUNT
    }

    pub fn validate(&self) -> Result<()> {
        if self.state_dim == 0 {
            return Err(DqnError::invalid_parameter("state_dim", "must be greater than 0"));
        }
        if self.batch_width == 0 {
            return Err(DqnError::invalid_parameter("batch_width", "must be greater than 0"));
        }
        if self.hidden_layers.iter().any(|&size| size == 0) {
            return Err(DqnError::invalid_parameter("hidden_layers", "every layer needs at least one unit"));
        }
        Ok(())
    }
}

/// Read-only forward evaluation over fixed-width batches.
pub trait ValueFunction {
    /// Length of one input row
    fn input_size(&self) -> usize;

    /// Values produced per row, one per legal action
    fn output_size(&self) -> usize;

    /// Exact number of rows `forward` accepts
    fn batch_width(&self) -> usize;

    fn forward(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>>;
}

/// A value function that can be trained in place.
pub trait TrainableValueFunction: ValueFunction {
    /// One forward + backward + parameter update on masked targets.
    ///
    /// Returns the loss measured before the update.
    fn train_step(&mut self, inputs: ArrayView2<f32>, targets: ArrayView2<f32>, mask: ArrayView2<f32>) -> Result<f32>;

    /// Number of training steps taken so far (restored on resume)
    fn iteration(&self) -> usize;
}

/// The learned weights of a network, without any optimizer state.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Parameters {
    pub layers: Vec<DenseLayer>,
}

impl Parameters {
    fn build<R: Rng + ?Sized>(config: &NetworkConfig, output_size: usize, rng: &mut R) -> Result<Self> {
        let mut sizes = Vec::with_capacity(config.hidden_layers.len() + 2);
        sizes.push(config.input_size());
        sizes.extend_from_slice(&config.hidden_layers);
        sizes.push(output_size);

        let output_layer = sizes.len() - 2;
        let layers = sizes
            .windows(2)
            .enumerate()
            .map(|(i, window)| {
                let activation = if i == output_layer { Activation::Linear } else { config.hidden_activation };
                let init = config.weight_init.unwrap_or_else(|| WeightInit::for_activation(&activation));
                DenseLayer::new(window[0], window[1], activation, init, rng)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Parameters { layers })
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::input_size)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, DenseLayer::output_size)
    }

    pub fn forward(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut current_output = inputs.to_owned();
        for layer in &self.layers {
            current_output = layer.forward_batch(current_output.view());
        }
        current_output
    }

    fn same_shape(&self, other: &Parameters) -> bool {
        self.layers.len() == other.layers.len()
            && self.layers.iter().zip(&other.layers).all(|(a, b)| {
                a.weights.dim() == b.weights.dim() && a.biases.dim() == b.biases.dim()
            })
    }

    fn describe(&self) -> String {
        let sizes: Vec<String> = std::iter::once(self.input_size())
            .chain(self.layers.iter().map(DenseLayer::output_size))
            .map(|s| s.to_string())
            .collect();
        format!("layers [{}]", sizes.join(", "))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = bincode::serialize(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(bincode::deserialize(&data)?)
    }
}

fn check_rows(
    inputs: &ArrayView2<f32>,
    what: &str,
    batch_width: usize,
    columns: usize,
) -> Result<()> {
    if inputs.dim() != (batch_width, columns) {
        return Err(DqnError::dimension_mismatch(
            format!("{} of shape ({}, {})", what, batch_width, columns),
            format!("{} of shape {:?}", what, inputs.dim()),
        ));
    }
    Ok(())
}

/// On-disk optimizer state written next to a model snapshot.
#[derive(Serialize, Deserialize)]
struct SolverState {
    iteration: usize,
    optimizer: OptimizerWrapper,
    learned_net: PathBuf,
}

/// The primary, trainable value network.
#[derive(Clone, Debug)]
pub struct QNetwork {
    params: Parameters,
    solver: Solver,
    batch_width: usize,
    iteration: usize,
}

impl QNetwork {
    /// Build a freshly initialized network with `output_size` outputs.
    pub fn new<R: Rng + ?Sized>(
        config: &NetworkConfig,
        output_size: usize,
        solver_config: SolverConfig,
        rng: &mut R,
    ) -> Result<Self> {
        config.validate()?;
        if output_size == 0 {
            return Err(DqnError::invalid_parameter("output_size", "must be greater than 0"));
        }
        let params = Parameters::build(config, output_size, rng)?;
        let solver = Solver::new(solver_config, &params.layers);

        Ok(QNetwork {
            params,
            solver,
            batch_width: config.batch_width,
            iteration: 0,
        })
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    /// Write the parameters only.
    pub fn save_parameters(&self, path: &Path) -> Result<()> {
        self.params.save(path)
    }

    /// Replace the parameters with ones read from `path`.
    ///
    /// Optimizer state and the iteration counter are left untouched.
    pub fn load_parameters(&mut self, path: &Path) -> Result<()> {
        let loaded = Parameters::load(path)?;
        if !loaded.same_shape(&self.params) {
            return Err(DqnError::dimension_mismatch(self.params.describe(), loaded.describe()));
        }
        self.params = loaded;
        info!("Loaded model parameters from {}", path.display());
        Ok(())
    }

    /// Persist parameters and optimizer state under the configured prefix.
    ///
    /// Returns `(model_path, solver_state_path)`.
    pub fn snapshot(&self) -> Result<(PathBuf, PathBuf)> {
        let prefix = &self.solver.config().snapshot_prefix;
        if let Some(dir) = prefix.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let stem = format!("{}_iter_{}", prefix.display(), self.iteration);
        let model_path = PathBuf::from(format!("{}.model", stem));
        let state_path = PathBuf::from(format!("{}.solverstate", stem));

        self.save_parameters(&model_path)?;
        let state = SolverState {
            iteration: self.iteration,
            optimizer: self.solver.optimizer_state().clone(),
            learned_net: model_path.clone(),
        };
        fs::write(&state_path, bincode::serialize(&state)?)?;

        info!("Snapshotted model to {} and solver state to {}", model_path.display(), state_path.display());
        Ok((model_path, state_path))
    }

    /// Resume from a solver state file: parameters, optimizer state and iteration.
    pub fn restore(&mut self, state_path: &Path) -> Result<()> {
        let state: SolverState = bincode::deserialize(&fs::read(state_path)?)?;
        let loaded = Parameters::load(&state.learned_net)?;
        if !loaded.same_shape(&self.params) {
            return Err(DqnError::dimension_mismatch(self.params.describe(), loaded.describe()));
        }
        self.solver.restore_optimizer_state(state.optimizer, &loaded.layers)?;
        self.params = loaded;
        self.iteration = state.iteration;

        info!("Restored solver state from {} at iteration {}", state_path.display(), self.iteration);
        Ok(())
    }

    fn backward(&self, caches: &[LayerCache], output_errors: Array2<f32>) -> Vec<(Array2<f32>, Array1<f32>)> {
        let mut gradients = Vec::with_capacity(self.params.layers.len());
        let mut current_error = output_errors;

        for (i, (layer, cache)) in self.params.layers.iter().zip(caches).enumerate().rev() {
            let (adjusted_error, weight_gradients, bias_gradients) = layer.backward_batch(cache, current_error.view());
            gradients.push((weight_gradients, bias_gradients));
            if i != 0 {
                current_error = adjusted_error.dot(&layer.weights.t());
            }
        }

        gradients.reverse();
        gradients
    }
}

impl ValueFunction for QNetwork {
    fn input_size(&self) -> usize {
        self.params.input_size()
    }

    fn output_size(&self) -> usize {
        self.params.output_size()
    }

    fn batch_width(&self) -> usize {
        self.batch_width
    }

    fn forward(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_rows(&inputs, "inputs", self.batch_width, self.input_size())?;
        Ok(self.params.forward(inputs))
    }
}

impl TrainableValueFunction for QNetwork {
    fn train_step(&mut self, inputs: ArrayView2<f32>, targets: ArrayView2<f32>, mask: ArrayView2<f32>) -> Result<f32> {
        check_rows(&inputs, "inputs", self.batch_width, self.input_size())?;
        check_rows(&targets, "targets", self.batch_width, self.output_size())?;
        check_rows(&mask, "mask", self.batch_width, self.output_size())?;

        let mut caches = Vec::with_capacity(self.params.layers.len());
        let mut current_output = inputs.to_owned();
        for layer in &self.params.layers {
            let (output, cache) = layer.forward_cached(current_output.view());
            caches.push(cache);
            current_output = output;
        }

        let loss_fn = MaskedEuclideanLoss;
        let loss = loss_fn.compute_batch(current_output.view(), targets, mask)?;
        let output_errors = loss_fn.gradient_batch(current_output.view(), targets, mask)?;
        let gradients = self.backward(&caches, output_errors);

        self.solver.apply_update(&mut self.params.layers, gradients, self.iteration);
        self.iteration += 1;

        Ok(loss)
    }

    fn iteration(&self) -> usize {
        self.iteration
    }
}

/// Frozen copy of a [`QNetwork`], used only to generate Bellman targets.
#[derive(Clone, Debug)]
pub struct TargetNetwork {
    params: Parameters,
    batch_width: usize,
}

impl TargetNetwork {
    pub fn from_primary(primary: &QNetwork) -> Self {
        TargetNetwork {
            params: primary.params.clone(),
            batch_width: primary.batch_width,
        }
    }

    /// Overwrite every parameter with the primary's current values.
    pub fn refresh_from(&mut self, primary: &QNetwork) {
        self.params.clone_from(&primary.params);
        self.batch_width = primary.batch_width;
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }
}

impl ValueFunction for TargetNetwork {
    fn input_size(&self) -> usize {
        self.params.input_size()
    }

    fn output_size(&self) -> usize {
        self.params.output_size()
    }

    fn batch_width(&self) -> usize {
        self.batch_width
    }

    fn forward(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_rows(&inputs, "inputs", self.batch_width, self.input_size())?;
        Ok(self.params.forward(inputs))
    }
}
