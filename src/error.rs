use crate::action::Action;
use crate::board::Position;
use thiserror::Error;

/// Errors raised by the rules model when an action cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// The action is not a member of the current legal actions.
    #[error("illegal action {action}")]
    IllegalAction { action: Action },

    /// Applying the action would recreate a position too many times.
    #[error("action {action} repeats a position seen {occurrences} times already")]
    RepetitionLimit { action: Action, occurrences: u32 },
}

/// Errors raised when converting between actions and policy indices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The displacement of a move is not one of the six canonical hex directions.
    #[error("move {from} -> {to} does not follow a canonical direction")]
    UnknownDirection { from: Position, to: Position },

    #[error("action index {0} is outside the action space")]
    IndexOutOfRange(usize),

    /// The index names a move whose destination lies outside the board.
    #[error("action index {0} moves off the board")]
    OffBoard(usize),
}

/// Errors reported by an [`Evaluator`](crate::evaluator::Evaluator) or found in its output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluatorError {
    #[error("evaluation failed: {0}")]
    Failed(String),

    #[error("policy has {got} entries, expected {expected}")]
    PolicyLength { expected: usize, got: usize },

    #[error("value {0} is not a finite number in [-1, 1]")]
    InvalidValue(f64),
}

/// Errors that abort a search.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// The root state is terminal, so there is nothing to choose from.
    #[error("no legal actions available")]
    NoLegalActions,

    #[error("evaluator failure: {0}")]
    EvaluatorFailure(#[from] EvaluatorError),

    #[error(transparent)]
    Game(#[from] GameError),

    #[error("invalid search configuration: {0}")]
    InvalidConfig(String),

    /// A node id did not resolve inside the search tree.
    #[error("search tree has no node for a recorded id")]
    DanglingNode,
}

/// Errors raised while loading a [`SearchConfig`](crate::config::SearchConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse search config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid search configuration: {0}")]
    Invalid(String),
}
