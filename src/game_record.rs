use crate::action::Action;
use crate::error::GameError;
use crate::hash::MurMurHasher;
use crate::state::GameState;
use std::collections::HashMap;
use tracing::debug;

/// Times a position may occur before recreating it is refused.
pub const DEFAULT_REPETITION_LIMIT: u32 = 3;

/// The actions of one game, with a guard against endless repetition.
///
/// Positions are identified by [`GameState::position_hash`], which includes
/// the side to move. An action is refused once the position it leads to has
/// already occurred `limit` times, counting the starting position.
#[derive(Debug, Clone)]
pub struct GameRecord {
    initial: GameState,
    current: GameState,
    actions: Vec<Action>,
    occurrences: HashMap<u128, u32>,
    limit: u32,
}

impl GameRecord {
    pub fn new(initial: GameState) -> Self {
        GameRecord::with_limit(initial, DEFAULT_REPETITION_LIMIT)
    }

    pub fn with_limit(initial: GameState, limit: u32) -> Self {
        let mut occurrences = HashMap::new();
        occurrences.insert(initial.position_hash(), 1);
        Self {
            current: initial.clone(),
            initial,
            actions: Vec::new(),
            occurrences,
            limit,
        }
    }

    pub fn initial(&self) -> &GameState {
        &self.initial
    }

    pub fn current(&self) -> &GameState {
        &self.current
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// How often `state` has occurred in this game.
    pub fn occurrences(&self, state: &GameState) -> u32 {
        self.occurrences
            .get(&state.position_hash())
            .copied()
            .unwrap_or(0)
    }

    /// Legal actions of the current position that the guard would accept.
    pub fn allowed_actions(&self) -> Vec<Action> {
        self.current
            .legal_actions()
            .into_iter()
            .filter(|action| {
                let next = self.current.apply_unchecked(action);
                self.occurrences(&next) < self.limit
            })
            .collect()
    }

    /// Applies `action` to the current position.
    ///
    /// # Errors
    ///
    /// * [`GameError::IllegalAction`] if the action is not legal.
    /// * [`GameError::RepetitionLimit`] if the resulting position has already
    ///   occurred `limit` times.
    ///
    /// The record is unchanged on error.
    pub fn play(&mut self, action: &Action) -> Result<&GameState, GameError> {
        let next = self.current.apply_action(action)?;
        let hash = next.position_hash();
        let seen = self.occurrences.get(&hash).copied().unwrap_or(0);
        if seen >= self.limit {
            debug!(
                %action,
                position = %MurMurHasher::to_hex(hash),
                occurrences = seen,
                "repetition refused"
            );
            return Err(GameError::RepetitionLimit {
                action: *action,
                occurrences: seen,
            });
        }

        *self.occurrences.entry(hash).or_insert(0) += 1;
        self.actions.push(*action);
        self.current = next;
        Ok(&self.current)
    }
}
