#[cfg(test)]
mod property_tests {
    use hfo_dqn::agent::update::{build_minibatch, td_target};
    use hfo_dqn::error::Result;
    use hfo_dqn::network::ValueFunction;
    use hfo_dqn::policy::{forward_padded, greedy_action};
    use hfo_dqn::replay_buffer::ReplayMemory;
    use hfo_dqn::types::{InputHistory, StateObservation, Transition, INPUT_COUNT};
    use ndarray::{Array1, Array2, ArrayView2};
    use proptest::prelude::*;

    const DIM: usize = 2;

    /// Returns the same action values for every row
    struct ConstantValues {
        values: Vec<f32>,
        width: usize,
    }

    impl ValueFunction for ConstantValues {
        fn input_size(&self) -> usize {
            DIM * INPUT_COUNT
        }

        fn output_size(&self) -> usize {
            self.values.len()
        }

        fn batch_width(&self) -> usize {
            self.width
        }

        fn forward(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
            assert_eq!(inputs.nrows(), self.width);
            Ok(Array2::from_shape_fn((self.width, self.values.len()), |(_, a)| self.values[a]))
        }
    }

    fn history(value: f32) -> InputHistory {
        InputHistory::repeat(StateObservation::new(vec![value; DIM])).unwrap()
    }

    proptest! {
        #[test]
        fn test_fifo_keeps_last_inserted(capacity in 1usize..20, extra in 0usize..30) {
            let mut memory = ReplayMemory::new(capacity);
            let total = capacity + extra;
            for i in 0..total {
                memory.add(Transition::terminal(history(0.0), 0, i as f32));
            }

            let kept: Vec<f32> = memory.iter().map(|t| t.reward).collect();
            let expected: Vec<f32> = (extra..total).map(|i| i as f32).collect();
            prop_assert_eq!(kept, expected);
        }

        #[test]
        fn test_minibatch_targets_and_mask(
            values in prop::collection::vec(-5.0f32..5.0, 1..6),
            gamma in 0.0f32..=1.0,
            width in 1usize..6,
            seeds in prop::collection::vec(any::<(u8, i16, bool)>(), 1..12),
        ) {
            let num_actions = values.len();
            let target_net = ConstantValues { values: values.clone(), width };
            let v_star = values.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

            let transitions: Vec<Transition> = seeds
                .iter()
                .map(|&(a, r, done)| {
                    let action = a as usize % num_actions;
                    let reward = r as f32 / 100.0;
                    if done {
                        Transition::terminal(history(0.5), action, reward)
                    } else {
                        Transition::continuing(history(0.5), action, reward, history(1.0))
                    }
                })
                .collect();
            let batch: Vec<&Transition> = transitions.iter().collect();

            let minibatch = build_minibatch(&batch, &target_net, gamma).unwrap();

            for (i, transition) in transitions.iter().enumerate() {
                let mask_row = minibatch.mask.row(i);
                prop_assert_eq!(mask_row.iter().filter(|&&m| m != 0.0).count(), 1);
                prop_assert_eq!(mask_row[transition.action], 1.0);

                let target = minibatch.targets[[i, transition.action]];
                if transition.is_terminal() {
                    prop_assert_eq!(target, transition.reward);
                } else {
                    prop_assert!((target - (transition.reward + gamma * v_star)).abs() < 1e-4);
                }
            }
        }

        #[test]
        fn test_td_target_terminal_ignores_gamma(reward in -100.0f32..100.0, gamma in 0.0f32..=1.0) {
            prop_assert_eq!(td_target(reward, gamma, None), reward);
        }

        #[test]
        fn test_padded_forward_returns_one_row_per_history(count in 0usize..40, width in 1usize..9) {
            let net = ConstantValues { values: vec![1.0, 2.0, 3.0], width };
            let histories: Vec<InputHistory> = (0..count).map(|i| history(i as f32)).collect();
            let refs: Vec<&InputHistory> = histories.iter().collect();

            let values = forward_padded(&net, &refs).unwrap();
            prop_assert_eq!(values.dim(), (count, 3));
        }

        #[test]
        fn test_greedy_action_is_first_maximum(values in prop::collection::vec(-1000.0f32..1000.0, 1..10)) {
            let (action, best) = greedy_action(Array1::from(values.clone()).view()).unwrap();
            prop_assert!(values.iter().all(|&v| v <= best));
            prop_assert_eq!(values[action], best);
            prop_assert!(values[..action].iter().all(|&v| v < best));
        }
    }
}
