//! Rules engine and policy/value guided Monte Carlo tree search for Hexaequo.
//!
//! Hexaequo is a two-player game on a hex grid: players lay tiles of their
//! color, place discs and rings on their own tiles, and capture opponent pieces
//! by jumping (discs) or hopping onto them (rings). Six captured discs or three
//! captured rings win.
//!
//! The crate models game states as immutable values, maps actions to a fixed
//! index space of [`codec::ACTION_COUNT`] slots for a learned evaluator, and
//! searches with PUCT guided by any [`evaluator::Evaluator`].
//!
//! # Example
//!
//! ```rust
//! use hexaequo_mcts::config::SearchConfig;
//! use hexaequo_mcts::evaluator::UniformEvaluator;
//! use hexaequo_mcts::mcts::MonteCarloTreeSearch;
//! use hexaequo_mcts::random::CustomNumberGenerator;
//! use hexaequo_mcts::state::GameState;
//!
//! // The standard opening, black to move
//! let state = GameState::standard();
//!
//! // Create and configure a new search instance using the builder
//! let mut mcts = MonteCarloTreeSearch::builder(state.clone(), UniformEvaluator::new())
//!     .with_random_generator(CustomNumberGenerator::default())
//!     .with_config(SearchConfig::default().with_simulations(200))
//!     .build();
//!
//! // Run the search and apply the chosen action
//! let result = mcts.search().unwrap();
//! let next = state.apply_action(&result.action).unwrap();
//!
//! println!("Played {} after {} simulations", result.action, result.simulations);
//! assert_ne!(next.side_to_move(), state.side_to_move());
//! ```

/// Actions a player can take.
pub mod action;
/// Board geometry: cells, positions, hex directions.
pub mod board;
/// Bijection between actions and policy indices.
pub mod codec;
/// Search and self-play parameters, loadable from TOML.
pub mod config;
/// Error types of every component.
pub mod error;
/// The `Evaluator` trait and evaluators that need no model.
pub mod evaluator;
/// Network input encoding of a game state.
pub mod features;
/// Action log with a repetition guard.
pub mod game_record;
/// Position hashing.
pub mod hash;
/// The core module of the library, containing the `MonteCarloTreeSearch` implementation.
pub mod mcts;
/// Contains the `MctsNode` struct, which represents a node in the search tree.
pub mod mcts_node;
/// Contains traits and implementations for random number generation.
pub mod random;
/// Bounded game history, training batches and self-play metrics.
pub mod replay;
/// Self-play game generation.
pub mod self_play;
/// Game states and the rules that move between them.
pub mod state;

pub use action::Action;
pub use board::{Color, Position};
pub use codec::ActionCodec;
pub use config::{HistoryConfig, SearchBudget, SearchConfig, SelfPlayConfig};
pub use error::{CodecError, ConfigError, EvaluatorError, GameError, SearchError};
pub use evaluator::{Evaluation, Evaluator};
pub use mcts::{MonteCarloTreeSearch, SearchResult, search};
pub use replay::{GameHistory, GameMetrics};
pub use state::GameState;
