//! Search and self-play parameters.
//!
//! Every struct deserialises from TOML with all fields optional, e.g.
//!
//! ```toml
//! exploration_constant = 1.5
//!
//! [budget]
//! max_simulations = 400
//! max_wall_clock_millis = 250
//!
//! [reward]
//! mode = "shaped"
//! disc_weight = 0.1
//! ring_weight = 0.2
//! discount = 0.9
//! ```

use crate::error::ConfigError;
use crate::mcts::DEFAULT_NODE_CAPACITY;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Limits of one search invocation.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchBudget {
    /// Hard cap on simulations.
    pub max_simulations: u32,
    /// Wall-clock limit, unbounded when `None`.
    pub max_wall_clock_millis: Option<u64>,
    /// Simulations that always run before the clock is consulted.
    pub min_simulations_before_clock_check: u32,
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self {
            max_simulations: 1600,
            max_wall_clock_millis: None,
            min_simulations_before_clock_check: 1,
        }
    }
}

impl SearchBudget {
    pub fn simulations(max_simulations: u32) -> Self {
        Self {
            max_simulations,
            ..Self::default()
        }
    }

    pub fn with_wall_clock_millis(mut self, millis: u64) -> Self {
        self.max_wall_clock_millis = Some(millis);
        self
    }

    pub fn with_min_simulations_before_clock_check(mut self, n: u32) -> Self {
        self.min_simulations_before_clock_check = n;
        self
    }
}

/// Weights of the capture-balance reward.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShapingWeights {
    pub disc_weight: f64,
    pub ring_weight: f64,
    /// Factor applied to the shaped reward before it is added to the
    /// evaluator's value.
    pub discount: f64,
}

impl Default for ShapingWeights {
    fn default() -> Self {
        Self {
            disc_weight: 0.1,
            ring_weight: 0.2,
            discount: 0.9,
        }
    }
}

/// How leaf values are formed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RewardMode {
    /// Only the evaluator's value and terminal results count.
    #[default]
    TerminalOnly,
    /// The capture balance of the leaf is added to the evaluator's value.
    Shaped(ShapingWeights),
}

/// Parameters of [`MonteCarloTreeSearch`](crate::mcts::MonteCarloTreeSearch).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// `c` in the PUCT score `Q + c * P * sqrt(N_parent) / (1 + N)`.
    pub exploration_constant: f64,
    pub budget: SearchBudget,
    pub reward: RewardMode,
    /// Concentration of root Dirichlet noise; 0 disables it.
    pub dirichlet_alpha: f64,
    /// Share of the root prior taken by the noise.
    pub dirichlet_epsilon: f64,
    /// 0 picks the most visited child, otherwise visits are sampled with
    /// weight `N^(1/temperature)`.
    pub temperature: f64,
    pub node_capacity: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            exploration_constant: 2.0,
            budget: SearchBudget::default(),
            reward: RewardMode::TerminalOnly,
            dirichlet_alpha: 0.0,
            dirichlet_epsilon: 0.25,
            temperature: 0.0,
            node_capacity: DEFAULT_NODE_CAPACITY,
        }
    }
}

impl SearchConfig {
    /// Small budget for tests.
    pub fn for_testing() -> Self {
        Self {
            budget: SearchBudget::simulations(50),
            node_capacity: 1024,
            ..Self::default()
        }
    }

    /// Root noise and sampled moves, as used when generating training games.
    pub fn for_self_play() -> Self {
        Self {
            dirichlet_alpha: 0.3,
            temperature: 1.0,
            ..Self::default()
        }
    }

    pub fn with_simulations(mut self, n: u32) -> Self {
        self.budget.max_simulations = n;
        self
    }

    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_exploration_constant(mut self, c: f64) -> Self {
        self.exploration_constant = c;
        self
    }

    pub fn with_reward(mut self, reward: RewardMode) -> Self {
        self.reward = reward;
        self
    }

    pub fn with_dirichlet_noise(mut self, alpha: f64, epsilon: f64) -> Self {
        self.dirichlet_alpha = alpha;
        self.dirichlet_epsilon = epsilon;
        self
    }

    pub fn with_temperature(mut self, t: f64) -> Self {
        self.temperature = t;
        self
    }

    pub fn with_node_capacity(mut self, capacity: usize) -> Self {
        self.node_capacity = capacity;
        self
    }

    /// Rejects values the search cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )))
            }
        }

        non_negative("exploration_constant", self.exploration_constant)?;
        non_negative("dirichlet_alpha", self.dirichlet_alpha)?;
        non_negative("temperature", self.temperature)?;
        if !(0.0..=1.0).contains(&self.dirichlet_epsilon) {
            return Err(ConfigError::Invalid(format!(
                "dirichlet_epsilon must lie in [0, 1], got {}",
                self.dirichlet_epsilon
            )));
        }
        if self.budget.max_simulations == 0 {
            return Err(ConfigError::Invalid(
                "budget.max_simulations must be at least 1".to_string(),
            ));
        }
        if let RewardMode::Shaped(weights) = self.reward {
            if !weights.disc_weight.is_finite() || !weights.ring_weight.is_finite() {
                return Err(ConfigError::Invalid(
                    "shaping weights must be finite".to_string(),
                ));
            }
            if !(0.0..=1.0).contains(&weights.discount) {
                return Err(ConfigError::Invalid(format!(
                    "reward.discount must lie in [0, 1], got {}",
                    weights.discount
                )));
            }
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SearchConfig = toml::from_str(content)?;
        config.validate()?;
        debug!(?config, "parsed search config");
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!("Loading search config from {}", path.display());
        Self::from_toml_str(&content)
    }
}

/// Parameters of [`play_game`](crate::self_play::play_game).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SelfPlayConfig {
    pub search: SearchConfig,
    /// Plies after which an unfinished game is scored as a draw.
    pub max_moves: u32,
    /// Temperature of the opening moves.
    pub temperature: f64,
    /// Ply from which `late_temperature` replaces `temperature`.
    pub temperature_threshold: u32,
    pub late_temperature: f64,
    /// Occurrences of a position after which repeating it is refused.
    pub repetition_limit: u32,
    pub history: HistoryConfig,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::for_self_play(),
            max_moves: 100,
            temperature: 1.0,
            temperature_threshold: 30,
            late_temperature: 0.5,
            repetition_limit: 3,
            history: HistoryConfig::default(),
        }
    }
}

impl SelfPlayConfig {
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    pub fn with_max_moves(mut self, max_moves: u32) -> Self {
        self.max_moves = max_moves;
        self
    }

    /// Temperature used for the move at `ply`.
    pub fn temperature_at(&self, ply: u32) -> f64 {
        if ply > self.temperature_threshold {
            self.late_temperature
        } else {
            self.temperature
        }
    }
}

/// Which stored game gives way when the history is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationStrategy {
    /// The oldest game.
    #[default]
    Fifo,
    /// The game of lowest quality, and only if the newcomer scores higher.
    Quality,
}

/// Parameters of [`GameHistory`](crate::replay::GameHistory).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_games: usize,
    pub rotation: RotationStrategy,
    /// Games scoring below this quality are not stored.
    pub quality_threshold: f64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_games: 100,
            rotation: RotationStrategy::Fifo,
            quality_threshold: 0.6,
        }
    }
}

impl HistoryConfig {
    pub fn with_max_games(mut self, max_games: usize) -> Self {
        self.max_games = max_games;
        self
    }

    pub fn with_rotation(mut self, rotation: RotationStrategy) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_quality_threshold(mut self, threshold: f64) -> Self {
        self.quality_threshold = threshold;
        self
    }
}
