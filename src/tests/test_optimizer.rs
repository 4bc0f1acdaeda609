use ndarray::{array, Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::activations::Activation;
use crate::layers::{DenseLayer, WeightInit};
use crate::optimizer::{
    GradientClipper, LearningRateScheduler, Optimizer, OptimizerKind, OptimizerWrapper, Solver, SolverConfig, SGD,
};

fn layer(input: usize, output: usize) -> DenseLayer {
    let mut rng = StdRng::seed_from_u64(0);
    DenseLayer::new(input, output, Activation::Linear, WeightInit::XavierUniform, &mut rng).unwrap()
}

#[test]
fn test_sgd_without_momentum() {
    let layers = vec![layer(2, 2)];
    let mut sgd = SGD::new(&layers, 0.0);
    let mut weights = array![[1.0, 2.0], [3.0, 4.0]];
    let gradients = array![[0.5, 0.5], [1.0, -1.0]];

    sgd.update_weights(0, &mut weights, &gradients, 0.1);

    let expected = array![[0.95, 1.95], [2.9, 4.1]];
    for (&w, &e) in weights.iter().zip(expected.iter()) {
        assert!((w - e).abs() < 1e-6, "{} != {}", w, e);
    }
}

#[test]
fn test_sgd_momentum_accumulates() {
    let layers = vec![layer(1, 1)];
    let mut sgd = SGD::new(&layers, 0.5);
    let mut biases = array![0.0];
    let gradients = array![1.0];

    sgd.update_biases(0, &mut biases, &gradients, 1.0);
    assert!((biases[0] + 1.0).abs() < 1e-6);
    sgd.update_biases(0, &mut biases, &gradients, 1.0);
    assert!((biases[0] + 2.5).abs() < 1e-6);
}

#[test]
fn test_adam_first_step_moves_by_learning_rate() {
    let layers = vec![layer(2, 2)];
    let mut optimizer = OptimizerWrapper::for_layers(OptimizerKind::default(), &layers);
    let mut weights = Array2::zeros((2, 2));
    let gradients = array![[2.0, -3.0], [0.5, -0.1]];

    optimizer.update_weights(0, &mut weights, &gradients, 0.01);
    optimizer.finish_step();

    for (&w, &g) in weights.iter().zip(gradients.iter()) {
        assert!((w + 0.01 * g.signum()).abs() < 1e-5, "w {} g {}", w, g);
    }
}

#[test]
fn test_adam_keeps_state_per_layer() {
    let layers = vec![layer(2, 3), layer(3, 1)];
    let mut optimizer = OptimizerWrapper::for_layers(OptimizerKind::default(), &layers);
    let mut w0 = Array2::zeros((2, 3));
    let mut w1 = Array2::zeros((3, 1));

    optimizer.update_weights(0, &mut w0, &Array2::ones((2, 3)), 0.1);
    optimizer.update_weights(1, &mut w1, &Array2::from_elem((3, 1), -1.0), 0.1);
    optimizer.finish_step();

    assert!(w0.iter().all(|&w| (w + 0.1).abs() < 1e-5));
    assert!(w1.iter().all(|&w| (w - 0.1).abs() < 1e-5));
}

#[test]
fn test_rmsprop_step() {
    let layers = vec![layer(1, 1)];
    let mut optimizer = OptimizerWrapper::for_layers(OptimizerKind::RmsProp { decay: 0.0, epsilon: 0.0 }, &layers);
    let mut biases = array![1.0];

    optimizer.update_biases(0, &mut biases, &array![4.0], 0.1);
    assert!((biases[0] - 0.9).abs() < 1e-6);
}

#[test]
fn test_optimizer_state_matches_layers() {
    let layers = vec![layer(4, 3), layer(3, 2)];
    let other = vec![layer(4, 5), layer(5, 2)];

    for kind in [
        OptimizerKind::Sgd { momentum: 0.9 },
        OptimizerKind::default(),
        OptimizerKind::RmsProp { decay: 0.9, epsilon: 1e-8 },
    ] {
        let state = OptimizerWrapper::for_layers(kind, &layers);
        assert!(state.matches_layers(&layers));
        assert!(!state.matches_layers(&other));
        assert!(!state.matches_layers(&layers[..1]));
    }
}

#[test]
fn test_learning_rate_schedules() {
    assert_eq!(LearningRateScheduler::constant(0.1).get_lr(1000), 0.1);

    let step = LearningRateScheduler::step_decay(1.0, 0.5, 10);
    assert_eq!(step.get_lr(0), 1.0);
    assert_eq!(step.get_lr(9), 1.0);
    assert_eq!(step.get_lr(10), 0.5);
    assert_eq!(step.get_lr(25), 0.25);

    let inverse = LearningRateScheduler::Inverse { initial_lr: 1.0, gamma: 1.0, power: 1.0 };
    assert!((inverse.get_lr(1) - 0.5).abs() < 1e-6);

    let linear = LearningRateScheduler::LinearDecay { initial_lr: 1.0, final_lr: 0.0, max_steps: 10 };
    assert!((linear.get_lr(5) - 0.5).abs() < 1e-6);
    assert_eq!(linear.get_lr(20), 0.0);

    let cosine = LearningRateScheduler::CosineAnnealing { max_lr: 1.0, min_lr: 0.0, period: 10 };
    assert!((cosine.get_lr(0) - 1.0).abs() < 1e-6);
    assert!((cosine.get_lr(5) - 0.5).abs() < 1e-6);
}

#[test]
fn test_schedule_validation() {
    assert!(LearningRateScheduler::constant(0.01).validate().is_ok());
    assert!(LearningRateScheduler::constant(0.0).validate().is_err());
    assert!(LearningRateScheduler::step_decay(0.1, 0.5, 0).validate().is_err());
    assert!(LearningRateScheduler::CosineAnnealing { max_lr: 0.1, min_lr: 0.0, period: 0 }.validate().is_err());
}

#[test]
fn test_clip_by_global_norm() {
    let mut gradients = vec![(array![[3.0, 0.0]], array![0.0]), (array![[0.0]], array![4.0])];
    let clipper = GradientClipper::ClipByGlobalNorm { max_norm: 1.0 };

    let norm = clipper.clip(&mut gradients);

    assert!((norm - 5.0).abs() < 1e-6);
    assert!((GradientClipper::compute_global_norm(&gradients) - 1.0).abs() < 1e-6);
    assert!((gradients[0].0[[0, 0]] - 0.6).abs() < 1e-6);
    assert!((gradients[1].1[0] - 0.8).abs() < 1e-6);
}

#[test]
fn test_clip_by_global_norm_leaves_small_gradients() {
    let mut gradients = vec![(array![[0.3, 0.4]], Array1::zeros(1))];
    let norm = GradientClipper::ClipByGlobalNorm { max_norm: 1.0 }.clip(&mut gradients);
    assert!((norm - 0.5).abs() < 1e-6);
    assert_eq!(gradients[0].0, array![[0.3, 0.4]]);
}

#[test]
fn test_clip_by_value() {
    let mut gradients = vec![(array![[-5.0, 0.5, 5.0]], array![-2.0])];
    GradientClipper::ClipByValue { min: -1.0, max: 1.0 }.clip(&mut gradients);
    assert_eq!(gradients[0].0, array![[-1.0, 0.5, 1.0]]);
    assert_eq!(gradients[0].1, array![-1.0]);
}

#[test]
fn test_solver_applies_weight_decay() {
    let mut layers = vec![layer(1, 1)];
    layers[0].weights = array![[2.0]];
    let config = SolverConfig {
        optimizer: OptimizerKind::Sgd { momentum: 0.0 },
        lr_schedule: LearningRateScheduler::constant(0.1),
        weight_decay: 0.5,
        clipper: GradientClipper::None,
        ..SolverConfig::default()
    };
    let mut solver = Solver::new(config, &layers);

    solver.apply_update(&mut layers, vec![(Array2::zeros((1, 1)), Array1::zeros(1))], 0);

    // w -= lr * (g + decay * w)
    assert!((layers[0].weights[[0, 0]] - 1.9).abs() < 1e-6);
}

#[test]
fn test_solver_uses_scheduled_rate() {
    let mut layers = vec![layer(1, 1)];
    layers[0].biases = array![0.0];
    let config = SolverConfig {
        optimizer: OptimizerKind::Sgd { momentum: 0.0 },
        lr_schedule: LearningRateScheduler::step_decay(1.0, 0.1, 5),
        clipper: GradientClipper::None,
        ..SolverConfig::default()
    };
    let mut solver = Solver::new(config, &layers);
    assert_eq!(solver.learning_rate(4), 1.0);
    assert!((solver.learning_rate(5) - 0.1).abs() < 1e-7);

    solver.apply_update(&mut layers, vec![(Array2::zeros((1, 1)), array![1.0])], 5);
    assert!((layers[0].biases[0] + 0.1).abs() < 1e-6);
}

#[test]
fn test_solver_config_validation() {
    assert!(SolverConfig::default().validate().is_ok());

    let bad_momentum = SolverConfig {
        optimizer: OptimizerKind::Sgd { momentum: 1.0 },
        ..SolverConfig::default()
    };
    assert!(bad_momentum.validate().is_err());

    let bad_decay = SolverConfig {
        weight_decay: -0.1,
        ..SolverConfig::default()
    };
    assert!(bad_decay.validate().is_err());

    let bad_clip = SolverConfig {
        clipper: GradientClipper::ClipByValue { min: 1.0, max: -1.0 },
        ..SolverConfig::default()
    };
    assert!(bad_clip.validate().is_err());

    let no_prefix = SolverConfig {
        snapshot_prefix: Default::default(),
        ..SolverConfig::default()
    };
    assert!(no_prefix.validate().is_err());
}
