//! Policy/value evaluation of game states.
//!
//! The search consults an [`Evaluator`] once per expanded node. A learned
//! network lives behind this trait; the crate ships a uniform evaluator and a
//! random-playout evaluator that need no model.

use crate::codec::ACTION_COUNT;
use crate::error::EvaluatorError;
use crate::random::RandomGenerator;
use crate::state::GameState;
use std::collections::HashSet;

/// Output of an evaluator for one state.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Probabilities over the whole action index space, legal or not.
    pub policy: Vec<f64>,
    /// Expected outcome for the side to move, in `[-1, 1]`.
    pub value: f64,
}

impl Evaluation {
    /// Uniform policy over all [`ACTION_COUNT`] slots.
    pub fn uniform(value: f64) -> Self {
        Self {
            policy: vec![1.0 / ACTION_COUNT as f64; ACTION_COUNT],
            value,
        }
    }

    /// Checks the shape of the policy and the range of the value.
    pub fn validate(&self) -> Result<(), EvaluatorError> {
        if self.policy.len() != ACTION_COUNT {
            return Err(EvaluatorError::PolicyLength {
                expected: ACTION_COUNT,
                got: self.policy.len(),
            });
        }
        if !self.value.is_finite() || self.value.abs() > 1.0 {
            return Err(EvaluatorError::InvalidValue(self.value));
        }
        Ok(())
    }
}

/// Trait for position evaluators.
///
/// The evaluator does not need to know which actions are legal: the search
/// masks the policy to the legal actions and renormalises it.
pub trait Evaluator {
    fn evaluate(&mut self, state: &GameState) -> Result<Evaluation, EvaluatorError>;
}

impl<E: Evaluator + ?Sized> Evaluator for &mut E {
    fn evaluate(&mut self, state: &GameState) -> Result<Evaluation, EvaluatorError> {
        (**self).evaluate(state)
    }
}

/// Uniform policy and a neutral value. Search with it is plain PUCT over
/// visit counts, handy for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformEvaluator;

impl UniformEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl Evaluator for UniformEvaluator {
    fn evaluate(&mut self, _state: &GameState) -> Result<Evaluation, EvaluatorError> {
        Ok(Evaluation::uniform(0.0))
    }
}

/// Uniform policy and a value estimated by one random playout.
///
/// The playout never revisits a position; if every continuation leads back to
/// a known position, or `max_depth` plies pass without a result, it counts as
/// a draw.
#[derive(Debug)]
pub struct RolloutEvaluator<K: RandomGenerator> {
    random: K,
    max_depth: u32,
}

impl<K: RandomGenerator> Default for RolloutEvaluator<K> {
    fn default() -> Self {
        RolloutEvaluator::new(K::default(), 100)
    }
}

impl<K: RandomGenerator> RolloutEvaluator<K> {
    pub fn new(random: K, max_depth: u32) -> Self {
        Self { random, max_depth }
    }

    /// Plays random actions from `state` and scores the end position for the
    /// side to move in `state`.
    fn simulate(&mut self, state: &GameState) -> f64 {
        let perspective = state.side_to_move();
        let mut board = state.clone();
        let mut visited_states = HashSet::new();
        visited_states.insert(board.position_hash());

        for _ in 0..self.max_depth {
            let mut all_possible_moves = board.legal_actions();
            if all_possible_moves.is_empty() {
                return board.reward(perspective);
            }

            let mut advanced = false;
            while !all_possible_moves.is_empty() {
                let random_move_index =
                    self.random.next_range(0, all_possible_moves.len() as i32) as usize;
                let new_board = board.apply_unchecked(&all_possible_moves[random_move_index]);
                if visited_states.insert(new_board.position_hash()) {
                    board = new_board;
                    advanced = true;
                    break;
                }
                all_possible_moves.swap_remove(random_move_index);
            }

            if !advanced {
                return 0.0;
            }
        }
        board.reward(perspective)
    }
}

impl<K: RandomGenerator> Evaluator for RolloutEvaluator<K> {
    fn evaluate(&mut self, state: &GameState) -> Result<Evaluation, EvaluatorError> {
        let value = self.simulate(state);
        Ok(Evaluation::uniform(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Color};
    use crate::random::CustomNumberGenerator;
    use crate::state::{DISC_CAPTURES_TO_WIN, Inventory};

    #[test]
    fn uniform_policy_sums_to_one() {
        let evaluation = UniformEvaluator::new()
            .evaluate(&GameState::standard())
            .unwrap();
        assert_eq!(evaluation.policy.len(), ACTION_COUNT);
        let sum: f64 = evaluation.policy.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(evaluation.value, 0.0);
        assert!(evaluation.validate().is_ok());
    }

    #[test]
    fn validate_rejects_malformed_output() {
        let short = Evaluation {
            policy: vec![0.5, 0.5],
            value: 0.0,
        };
        assert_eq!(
            short.validate(),
            Err(EvaluatorError::PolicyLength {
                expected: ACTION_COUNT,
                got: 2
            })
        );
        assert!(matches!(
            Evaluation::uniform(f64::NAN).validate(),
            Err(EvaluatorError::InvalidValue(_))
        ));
        assert_eq!(
            Evaluation::uniform(1.5).validate(),
            Err(EvaluatorError::InvalidValue(1.5))
        );
    }

    #[test]
    fn rollout_is_reproducible() {
        let state = GameState::standard();
        let mut a = RolloutEvaluator::new(CustomNumberGenerator::new(3), 60);
        let mut b = RolloutEvaluator::new(CustomNumberGenerator::new(3), 60);
        for _ in 0..5 {
            let x = a.evaluate(&state).unwrap();
            let y = b.evaluate(&state).unwrap();
            assert_eq!(x, y);
            assert!(x.validate().is_ok());
        }
    }

    #[test]
    fn rollout_of_finished_game_is_its_reward() {
        let white = Inventory {
            captured_discs: DISC_CAPTURES_TO_WIN,
            ..Inventory::full()
        };
        let state = GameState::new(Board::empty(), white, Inventory::full(), Color::Black);
        let mut evaluator = RolloutEvaluator::new(CustomNumberGenerator::default(), 10);
        assert_eq!(evaluator.evaluate(&state).unwrap().value, -1.0);
    }

    #[test]
    fn borrowed_evaluator_delegates() {
        let mut inner = UniformEvaluator::new();
        let mut borrowed = &mut inner;
        assert!(borrowed.evaluate(&GameState::standard()).is_ok());
    }
}
