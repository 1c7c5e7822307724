extern crate hexaequo_mcts;

use hexaequo_mcts::config::{SearchConfig, SelfPlayConfig};
use hexaequo_mcts::evaluator::RolloutEvaluator;
use hexaequo_mcts::random::CustomNumberGenerator;
use hexaequo_mcts::replay::{GameHistory, GameMetrics};
use hexaequo_mcts::self_play::play_game;
use hexaequo_mcts::state::GameState;
use std::error::Error;

const GAMES: usize = 3;
const BATCH_SIZE: usize = 32;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hexaequo_mcts=info".parse()?),
        )
        .init();

    // An optional TOML file overrides the search parameters
    let search = match std::env::args().nth(1) {
        Some(path) => SearchConfig::from_path(path)?,
        None => SearchConfig::for_self_play().with_simulations(64),
    };
    let mut config = SelfPlayConfig::default()
        .with_search(search)
        .with_max_moves(40);
    // short demo games rarely reach the default quality bar
    config.history = config.history.with_quality_threshold(0.0);

    // Random playouts stand in for a trained network
    let mut evaluator = RolloutEvaluator::new(CustomNumberGenerator::new(2024), 60);
    let mut random = CustomNumberGenerator::default();
    let mut history = GameHistory::new(config.history);
    let mut metrics = GameMetrics::new();

    for number in 1..=GAMES {
        let (game, next) = play_game(GameState::standard(), &mut evaluator, random, &config)?;
        random = next;

        println!("Game {number}:");
        for (ply, action) in game.record.actions().iter().enumerate() {
            println!("{:>3}. {}", ply + 1, action);
        }
        println!("Game ended: {:?}", game.end);
        if let Some(first) = game.examples.first() {
            let mut visits = first.visits.clone();
            visits.sort_by(|a, b| b.1.total_cmp(&a.1));
            for (action, share) in visits.iter().take(5) {
                println!("Opening move: {} = {:.2}%", action, share * 100.0);
            }
        }

        metrics.record(&game);
        history.push(game);
    }

    metrics.log_report();
    let batch = history.sample_batch(BATCH_SIZE, &mut random);
    println!(
        "Stored games: {} (average quality {:.3}), batch of {} examples",
        history.len(),
        history.average_quality(),
        batch.len()
    );
    Ok(())
}
