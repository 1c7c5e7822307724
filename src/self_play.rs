//! Self-play game generation.
//!
//! [`play_game`] lets the search play both sides and records, for every
//! position, the root visit distribution and the final result from the
//! perspective of the side to move. Those triples are the training data of
//! a policy/value evaluator; fitting the evaluator happens elsewhere.

use crate::action::Action;
use crate::board::Color;
use crate::codec::{ACTION_COUNT, ActionCodec};
use crate::config::SelfPlayConfig;
use crate::error::{GameError, SearchError};
use crate::evaluator::Evaluator;
use crate::features::encode_planes;
use crate::game_record::GameRecord;
use crate::mcts::MonteCarloTreeSearch;
use crate::random::RandomGenerator;
use crate::state::{GameOutcome, GameState};
use tracing::{debug, info};

/// How a self-play game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEnd {
    Won(Color),
    /// The side to move had no legal action.
    Draw,
    /// The ply limit was reached first.
    MoveLimit,
    /// Every legal action would have repeated a position too often.
    Repetition,
}

impl GameEnd {
    pub fn winner(self) -> Option<Color> {
        match self {
            GameEnd::Won(color) => Some(color),
            _ => None,
        }
    }

    /// Result for `perspective`: 1 win, -1 loss, 0 otherwise.
    pub fn value_for(self, perspective: Color) -> f64 {
        match self.winner() {
            Some(color) if color == perspective => 1.0,
            Some(_) => -1.0,
            None => 0.0,
        }
    }
}

/// One position of a self-play game.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub state: GameState,
    /// Root visit shares of the search run from `state`.
    pub visits: Vec<(Action, f64)>,
    /// Final result for the side to move in `state`.
    pub outcome: f64,
}

impl TrainingExample {
    /// Network input for `state`.
    pub fn features(&self) -> Vec<f32> {
        encode_planes(&self.state)
    }

    /// Visit shares spread over the full action index space. Actions without a
    /// slot are left out.
    pub fn policy_target(&self) -> Vec<f32> {
        let mut target = vec![0.0f32; ACTION_COUNT];
        for (action, share) in &self.visits {
            if let Ok(index) = ActionCodec::encode(action) {
                target[index] = *share as f32;
            }
        }
        target
    }
}

/// A finished self-play game.
#[derive(Debug, Clone)]
pub struct SelfPlayGame {
    pub record: GameRecord,
    pub examples: Vec<TrainingExample>,
    pub end: GameEnd,
}

/// Plays one game from `initial` with the search choosing every move.
///
/// Returns the random generator so consecutive games keep drawing from one
/// stream.
pub fn play_game<E: Evaluator, K: RandomGenerator>(
    initial: GameState,
    evaluator: &mut E,
    random: K,
    config: &SelfPlayConfig,
) -> Result<(SelfPlayGame, K), SearchError> {
    let mut record = GameRecord::with_limit(initial, config.repetition_limit);
    let mut pending: Vec<(GameState, Vec<(Action, f64)>)> = Vec::new();
    let mut random = random;

    let end = loop {
        let state = record.current().clone();
        match state.outcome() {
            GameOutcome::Won(color) => break GameEnd::Won(color),
            GameOutcome::Draw => break GameEnd::Draw,
            GameOutcome::InProgress => {}
        }
        let ply = record.len() as u32;
        if ply >= config.max_moves {
            break GameEnd::MoveLimit;
        }

        let search_config = config
            .search
            .clone()
            .with_temperature(config.temperature_at(ply));
        let mut mcts = MonteCarloTreeSearch::builder(state.clone(), &mut *evaluator)
            .with_random_generator(random)
            .with_config(search_config)
            .build();
        let result = mcts.search()?;
        random = mcts.into_random_generator();

        debug!(ply, action = %result.action, root_value = result.root_value, "self-play move");
        pending.push((state, result.visit_distribution()));
        let played = record.play(&result.action).map(|_| ());
        match played {
            Ok(()) => {}
            Err(GameError::RepetitionLimit { .. }) => {
                let allowed = record.allowed_actions();
                let Some(action) = replacement_action(&result.visits, &allowed, &mut random) else {
                    break GameEnd::Repetition;
                };
                debug!(ply, refused = %result.action, %action, "repetition avoided");
                record.play(&action)?;
            }
            Err(err) => return Err(err.into()),
        }
    };

    let examples = pending
        .into_iter()
        .map(|(state, visits)| {
            let outcome = end.value_for(state.side_to_move());
            TrainingExample {
                state,
                visits,
                outcome,
            }
        })
        .collect::<Vec<_>>();

    info!(
        plies = record.len(),
        examples = examples.len(),
        end = ?end,
        "self-play game finished"
    );
    Ok((
        SelfPlayGame {
            record,
            examples,
            end,
        },
        random,
    ))
}

/// The most visited root action the repetition guard still accepts, first on
/// ties, or a random accepted action when the search visited none of them.
fn replacement_action<K: RandomGenerator>(
    visits: &[(Action, u32)],
    allowed: &[Action],
    random: &mut K,
) -> Option<Action> {
    if allowed.is_empty() {
        return None;
    }
    let mut best: Option<(Action, u32)> = None;
    for &(action, count) in visits {
        if allowed.contains(&action) && best.is_none_or(|(_, most)| count > most) {
            best = Some((action, count));
        }
    }
    Some(best.map_or_else(|| *random.get_random_from_vec(allowed), |(action, _)| action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::evaluator::UniformEvaluator;
    use crate::board::Position;
    use crate::random::CustomNumberGenerator;
    use crate::state::{Inventory, RING_CAPTURES_TO_WIN};

    fn step(from: (usize, usize), to: (usize, usize)) -> Action {
        Action::Move {
            from: Position::new(from.0, from.1).unwrap(),
            to: Position::new(to.0, to.1).unwrap(),
        }
    }

    fn empty_inventory() -> Inventory {
        Inventory {
            tiles: 0,
            discs: 0,
            rings: 0,
            captured_discs: 0,
            captured_rings: 0,
        }
    }

    fn quick_config(max_moves: u32) -> SelfPlayConfig {
        SelfPlayConfig::default()
            .with_search(
                SearchConfig::for_testing()
                    .with_simulations(8)
                    .with_dirichlet_noise(0.3, 0.25),
            )
            .with_max_moves(max_moves)
    }

    #[test]
    fn move_limit_ends_game() {
        // arrange
        let mut evaluator = UniformEvaluator::new();

        // act
        let (game, _) = play_game(
            GameState::standard(),
            &mut evaluator,
            CustomNumberGenerator::new(1),
            &quick_config(6),
        )
        .unwrap();

        // assert
        assert!(game.record.len() <= 6);
        let refused = usize::from(game.end == GameEnd::Repetition);
        assert_eq!(game.examples.len(), game.record.len() + refused);
        assert_eq!(game.examples[0].state, GameState::standard());
        if game.end == GameEnd::MoveLimit {
            assert_eq!(game.record.len(), 6);
            assert!(game.examples.iter().all(|e| e.outcome == 0.0));
        }
        for example in &game.examples {
            let total: f64 = example.visits.iter().map(|(_, p)| p).sum();
            assert!((total - 1.0).abs() < 1e-9);
            assert_eq!(example.features().len(), 400);
            assert_eq!(example.policy_target().len(), ACTION_COUNT);
        }
    }

    #[test]
    fn games_replay_with_same_seed() {
        let play = || {
            let mut evaluator = UniformEvaluator::new();
            let (game, _) = play_game(
                GameState::standard(),
                &mut evaluator,
                CustomNumberGenerator::new(17),
                &quick_config(10),
            )
            .unwrap();
            game.record.actions().to_vec()
        };
        assert_eq!(play(), play());
    }

    #[test]
    fn winner_outcomes_alternate() {
        let end = GameEnd::Won(Color::Black);
        assert_eq!(end.value_for(Color::Black), 1.0);
        assert_eq!(end.value_for(Color::White), -1.0);
        assert_eq!(GameEnd::Repetition.value_for(Color::White), 0.0);
        assert_eq!(GameEnd::Draw.winner(), None);
    }

    #[test]
    fn finished_position_yields_no_examples() {
        let white = Inventory {
            captured_rings: RING_CAPTURES_TO_WIN,
            ..Inventory::full()
        };
        let state = GameState::new(
            *GameState::standard().board(),
            white,
            Inventory::full(),
            Color::Black,
        );
        let mut evaluator = UniformEvaluator::new();

        let (game, _) =
            play_game(state, &mut evaluator, CustomNumberGenerator::new(2), &quick_config(10))
                .unwrap();

        assert_eq!(game.end, GameEnd::Won(Color::White));
        assert!(game.examples.is_empty());
    }

    #[test]
    fn refused_repetition_plays_allowed_action() {
        // arrange
        // the black disc already stepped to (5,5), white to move
        let mut board = *GameState::standard().board();
        let disc = board.take_piece(Position::new(4, 5).unwrap());
        board.set_piece(Position::new(5, 5).unwrap(), disc);
        let state = GameState::new(board, empty_inventory(), empty_inventory(), Color::White);
        let mut config = SelfPlayConfig::default()
            .with_search(SearchConfig::for_testing().with_simulations(1))
            .with_max_moves(8);
        config.temperature = 0.0;
        config.late_temperature = 0.0;
        config.repetition_limit = 1;
        let mut evaluator = UniformEvaluator::new();

        // act
        let (game, _) =
            play_game(state, &mut evaluator, CustomNumberGenerator::new(5), &config).unwrap();

        // assert
        // the fourth ply would return to the start, only the other step is accepted
        assert!(game.record.len() > 3);
        assert_eq!(game.record.actions()[3], step((4, 5), (4, 4)));
        if game.end == GameEnd::Repetition {
            assert!(game.record.allowed_actions().is_empty());
        }
    }

    #[test]
    fn replacement_prefers_most_visited_allowed_action() {
        // arrange
        let refused = step((4, 5), (5, 5));
        let visits = vec![
            (refused, 9),
            (step((4, 5), (4, 4)), 3),
            (step((4, 5), (3, 5)), 3),
        ];
        let allowed = vec![step((4, 5), (3, 5)), step((4, 5), (4, 4))];
        let mut random = CustomNumberGenerator::new(1);

        // act
        let action = replacement_action(&visits, &allowed, &mut random);
        let nothing = replacement_action(&visits, &[], &mut random);
        let unvisited = replacement_action(&[], &allowed, &mut random);

        // assert
        assert_eq!(action, Some(step((4, 5), (4, 4))));
        assert_eq!(nothing, None);
        assert!(unvisited.is_some_and(|a| allowed.contains(&a)));
    }
}
