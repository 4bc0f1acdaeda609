use tempfile::tempdir;

use crate::config::DqnConfig;
use crate::error::DqnError;
use crate::types::{MINIBATCH_SIZE, OUTPUT_COUNT, STATE_DATA_SIZE};

#[test]
fn test_default_config_is_valid() {
    let config = DqnConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.legal_actions, (0..OUTPUT_COUNT).collect::<Vec<_>>());
    assert_eq!(config.network.state_dim, STATE_DATA_SIZE);
    assert_eq!(config.network.batch_width, MINIBATCH_SIZE);
}

#[test]
fn test_invalid_values_are_rejected_not_clamped() {
    let cases: Vec<(&str, DqnConfig)> = vec![
        ("empty actions", DqnConfig { legal_actions: vec![], ..DqnConfig::default() }),
        ("duplicate actions", DqnConfig { legal_actions: vec![0, 1, 1], ..DqnConfig::default() }),
        ("zero capacity", DqnConfig { replay_memory_capacity: 0, ..DqnConfig::default() }),
        ("gamma above one", DqnConfig { gamma: 1.01, ..DqnConfig::default() }),
        ("negative gamma", DqnConfig { gamma: -0.1, ..DqnConfig::default() }),
        ("nan gamma", DqnConfig { gamma: f32::NAN, ..DqnConfig::default() }),
        ("zero clone frequency", DqnConfig { clone_frequency: 0, ..DqnConfig::default() }),
    ];

    for (name, config) in cases {
        assert!(
            matches!(config.validate(), Err(DqnError::InvalidParameter { .. })),
            "{} should be rejected",
            name
        );
    }
}

#[test]
fn test_actions_must_index_output_columns() {
    let config = DqnConfig {
        legal_actions: vec![0, 1, 4],
        ..DqnConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(DqnError::InvalidAction { action: 4, max_actions: 3 })
    ));

    let shuffled = DqnConfig {
        legal_actions: vec![2, 0, 1],
        ..DqnConfig::default()
    };
    assert!(shuffled.validate().is_ok());
}

#[test]
fn test_gamma_bounds_are_inclusive() {
    for gamma in [0.0, 1.0] {
        assert!(DqnConfig { gamma, ..DqnConfig::default() }.validate().is_ok());
    }
}

#[test]
fn test_nested_configs_are_validated() {
    let mut config = DqnConfig::default();
    config.network.batch_width = 0;
    assert!(config.validate().is_err());

    let mut config = DqnConfig::default();
    config.solver.weight_decay = -1.0;
    assert!(config.validate().is_err());
}

#[test]
fn test_json_round_trip_through_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("agent.json");
    let mut config = DqnConfig::default();
    config.gamma = 0.9;
    config.seed = 42;
    config.network.hidden_layers = vec![64];

    config.to_json_file(&path).unwrap();
    let loaded = DqnConfig::from_json_file(&path).unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn test_partial_json_uses_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.json");
    std::fs::write(&path, r#"{ "gamma": 0.5, "legal_actions": [0, 1, 2], "network": { "hidden_layers": [32] } }"#).unwrap();

    let config = DqnConfig::from_json_file(&path).unwrap();

    assert_eq!(config.gamma, 0.5);
    assert_eq!(config.legal_actions, vec![0, 1, 2]);
    assert_eq!(config.network.hidden_layers, vec![32]);
    assert_eq!(config.network.state_dim, STATE_DATA_SIZE);
    assert_eq!(config.clone_frequency, DqnConfig::default().clone_frequency);
}

#[test]
fn test_invalid_json_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(DqnConfig::from_json_file(&path), Err(DqnError::Config(_))));

    let invalid = dir.path().join("invalid.json");
    std::fs::write(&invalid, r#"{ "clone_frequency": 0 }"#).unwrap();
    assert!(matches!(DqnConfig::from_json_file(&invalid), Err(DqnError::InvalidParameter { .. })));

    assert!(matches!(
        DqnConfig::from_json_file(&dir.path().join("missing.json")),
        Err(DqnError::Io(_))
    ));
}
