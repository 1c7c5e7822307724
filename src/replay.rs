//! Storage and bookkeeping of finished self-play games.
//!
//! [`GameHistory`] keeps a bounded set of [`SelfPlayGame`]s, scored by
//! [`game_quality`], and draws training batches from them. [`GameMetrics`]
//! summarises the games played so far.

use crate::action::Action;
use crate::board::{CELL_COUNT, Color};
use crate::config::{HistoryConfig, RotationStrategy};
use crate::random::RandomGenerator;
use crate::self_play::{SelfPlayGame, TrainingExample};
use crate::state::{DISCS_PER_COLOR, GameState, RINGS_PER_COLOR};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info};

/// Game length that scores best.
const OPTIMAL_LENGTH: f64 = 30.0;
/// Captures at which the capture score saturates.
const CAPTURES_FOR_FULL_SCORE: f64 = 6.0;
const ACTION_KINDS: f64 = 4.0;

const LENGTH_WEIGHT: f64 = 0.3;
const CAPTURE_WEIGHT: f64 = 0.4;
const DIVERSITY_WEIGHT: f64 = 0.3;

/// Pieces captured by both sides, discs and rings alike.
pub fn total_captures(state: &GameState) -> u32 {
    Color::ALL
        .iter()
        .map(|&color| {
            let inventory = state.inventory(color);
            u32::from(inventory.captured_discs) + u32::from(inventory.captured_rings)
        })
        .sum()
}

/// How varied the played actions are, in `[0, 1]`: the mean of the share of
/// action kinds used and the share of cells targeted.
pub fn action_diversity(actions: &[Action]) -> f64 {
    let mut kinds = HashSet::new();
    let mut cells = HashSet::new();
    for action in actions {
        let (kind, target) = match *action {
            Action::PlaceTile { pos } => (0u8, pos),
            Action::PlaceDisc { pos } => (1, pos),
            Action::PlaceRing { pos } => (2, pos),
            Action::Move { to, .. } => (3, to),
        };
        kinds.insert(kind);
        cells.insert(target);
    }
    (kinds.len() as f64 / ACTION_KINDS + cells.len() as f64 / CELL_COUNT as f64) / 2.0
}

/// Training value of a game in `[0, 1]`.
///
/// Games close to thirty plies, with many captures and varied actions score
/// higher.
pub fn game_quality(game: &SelfPlayGame) -> f64 {
    let length = game.record.len() as f64;
    let length_score = (-(length - OPTIMAL_LENGTH).abs() / 20.0).exp();
    let captures = total_captures(game.record.current()) as f64;
    let capture_score = (captures / CAPTURES_FOR_FULL_SCORE).min(1.0);
    let diversity = action_diversity(game.record.actions());

    length_score * LENGTH_WEIGHT + capture_score * CAPTURE_WEIGHT + diversity * DIVERSITY_WEIGHT
}

/// A bounded collection of self-play games to train on.
#[derive(Debug, Clone)]
pub struct GameHistory {
    games: VecDeque<(SelfPlayGame, f64)>,
    config: HistoryConfig,
}

impl GameHistory {
    pub fn new(config: HistoryConfig) -> Self {
        let config = config.with_max_games(config.max_games.max(1));
        Self {
            games: VecDeque::with_capacity(config.max_games),
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Stored games, oldest first.
    pub fn games(&self) -> impl Iterator<Item = &SelfPlayGame> {
        self.games.iter().map(|(game, _)| game)
    }

    /// Mean quality of the stored games, 0 when empty.
    pub fn average_quality(&self) -> f64 {
        if self.games.is_empty() {
            return 0.0;
        }
        self.games.iter().map(|(_, quality)| quality).sum::<f64>() / self.games.len() as f64
    }

    /// Offers `game` to the history. Returns whether it was stored.
    ///
    /// A game below the quality threshold is dropped without touching the
    /// stored ones. When the history is full, the rotation strategy decides
    /// which game makes room.
    pub fn push(&mut self, game: SelfPlayGame) -> bool {
        let quality = game_quality(&game);
        if quality < self.config.quality_threshold {
            debug!(quality, threshold = self.config.quality_threshold, "game below quality threshold");
            return false;
        }

        if self.games.len() >= self.config.max_games {
            match self.config.rotation {
                RotationStrategy::Fifo => {
                    self.games.pop_front();
                }
                RotationStrategy::Quality => {
                    let worst = self
                        .games
                        .iter()
                        .enumerate()
                        .min_by(|(_, a), (_, b)| a.1.total_cmp(&b.1))
                        .map(|(index, (_, q))| (index, *q));
                    match worst {
                        Some((index, worst_quality)) if worst_quality < quality => {
                            self.games.remove(index);
                        }
                        _ => {
                            debug!(quality, "game not better than any stored one");
                            return false;
                        }
                    }
                }
            }
        }

        self.games.push_back((game, quality));
        true
    }

    /// Draws `batch_size` training examples: a stored game uniformly, then a
    /// position of that game uniformly. Games without examples are skipped.
    ///
    /// Empty when no stored game has examples.
    pub fn sample_batch<K: RandomGenerator>(
        &self,
        batch_size: usize,
        random: &mut K,
    ) -> Vec<&TrainingExample> {
        let candidates: Vec<&SelfPlayGame> = self
            .games()
            .filter(|game| !game.examples.is_empty())
            .collect();
        if candidates.is_empty() {
            return Vec::new();
        }

        (0..batch_size)
            .map(|_| {
                let game = *random.get_random_from_vec(&candidates);
                random.get_random_from_vec(&game.examples)
            })
            .collect()
    }
}

/// Running totals over finished self-play games.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameMetrics {
    game_lengths: Vec<usize>,
    white_wins: u32,
    black_wins: u32,
    draws: u32,
    /// Sum over games of the share of all discs captured.
    disc_capture_share: f64,
    ring_capture_share: f64,
    placements: usize,
    moves: usize,
}

/// Snapshot of [`GameMetrics`]; rates are fractions in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsReport {
    pub games: usize,
    pub average_length: f64,
    pub white_win_rate: f64,
    pub black_win_rate: f64,
    pub draw_rate: f64,
    pub disc_capture_rate: f64,
    pub ring_capture_rate: f64,
    /// Share of placements among all played actions.
    pub placement_rate: f64,
}

impl GameMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn games(&self) -> usize {
        self.game_lengths.len()
    }

    /// Adds a finished game. Every end without a winner counts as a draw.
    pub fn record(&mut self, game: &SelfPlayGame) {
        self.game_lengths.push(game.record.len());
        match game.end.winner() {
            Some(Color::White) => self.white_wins += 1,
            Some(Color::Black) => self.black_wins += 1,
            None => self.draws += 1,
        }

        let last = game.record.current();
        let (discs, rings) = Color::ALL.iter().fold((0u32, 0u32), |(d, r), &color| {
            let inventory = last.inventory(color);
            (
                d + u32::from(inventory.captured_discs),
                r + u32::from(inventory.captured_rings),
            )
        });
        self.disc_capture_share += f64::from(discs) / f64::from(2 * DISCS_PER_COLOR);
        self.ring_capture_share += f64::from(rings) / f64::from(2 * RINGS_PER_COLOR);

        let placements = game
            .record
            .actions()
            .iter()
            .filter(|action| action.is_placement())
            .count();
        self.placements += placements;
        self.moves += game.record.len() - placements;

        debug!(
            game = self.games(),
            plies = game.record.len(),
            winner = ?game.end.winner(),
            discs,
            rings,
            "game recorded"
        );
    }

    pub fn report(&self) -> MetricsReport {
        let games = self.games();
        let per_game = |x: f64| if games == 0 { 0.0 } else { x / games as f64 };
        let actions = self.placements + self.moves;
        MetricsReport {
            games,
            average_length: per_game(self.game_lengths.iter().sum::<usize>() as f64),
            white_win_rate: per_game(f64::from(self.white_wins)),
            black_win_rate: per_game(f64::from(self.black_wins)),
            draw_rate: per_game(f64::from(self.draws)),
            disc_capture_rate: per_game(self.disc_capture_share),
            ring_capture_rate: per_game(self.ring_capture_share),
            placement_rate: if actions == 0 {
                0.0
            } else {
                self.placements as f64 / actions as f64
            },
        }
    }

    pub fn log_report(&self) {
        let report = self.report();
        info!(
            games = report.games,
            average_length = %format!("{:.1}", report.average_length),
            white_wins = %format!("{:.1}%", report.white_win_rate * 100.0),
            black_wins = %format!("{:.1}%", report.black_win_rate * 100.0),
            draws = %format!("{:.1}%", report.draw_rate * 100.0),
            disc_captures = %format!("{:.1}%", report.disc_capture_rate * 100.0),
            ring_captures = %format!("{:.1}%", report.ring_capture_rate * 100.0),
            placements = %format!("{:.1}%", report.placement_rate * 100.0),
            "self-play metrics"
        );
    }
}
