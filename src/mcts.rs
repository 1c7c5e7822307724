use crate::action::Action;
use crate::codec::ActionCodec;
use crate::config::{RewardMode, SearchBudget, SearchConfig};
use crate::error::SearchError;
use crate::evaluator::Evaluator;
use crate::mcts_node::MctsNode;
use crate::random::{RandomGenerator, StandardRandomGenerator};
use crate::state::GameState;
use ego_tree::{NodeId, NodeRef, Tree};
use rand_distr::{Distribution, Gamma};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Initial capacity of the node arena.
pub const DEFAULT_NODE_CAPACITY: usize = 4096;

/// Shared flag that stops a running search between two simulations.
///
/// Clones share the flag, so one clone can be handed to another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Outcome of [`MonteCarloTreeSearch::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Chosen action.
    pub action: Action,
    /// Visit count of every root child, in legal-action order.
    pub visits: Vec<(Action, u32)>,
    /// Mean value of the root for its side to move.
    pub root_value: f64,
    /// Simulations run by this call.
    pub simulations: u32,
    pub elapsed: Duration,
}

impl SearchResult {
    /// Visit counts normalised to a probability distribution.
    pub fn visit_distribution(&self) -> Vec<(Action, f64)> {
        let total: u32 = self.visits.iter().map(|(_, n)| n).sum();
        self.visits
            .iter()
            .map(|&(action, n)| {
                let p = if total == 0 { 0.0 } else { n as f64 / total as f64 };
                (action, p)
            })
            .collect()
    }
}

/// The main struct for running the Monte Carlo Tree Search algorithm.
///
/// It holds the search tree, the evaluator that guides it, the random number
/// generator, and the configuration for the search.
pub struct MonteCarloTreeSearch<E: Evaluator, K: RandomGenerator = StandardRandomGenerator> {
    tree: Tree<MctsNode>,
    evaluator: E,
    random: K,
    config: SearchConfig,
    cancel: Option<CancelToken>,
    next_step: SearchStep,
    simulations: u32,
}

/// A builder for creating instances of `MonteCarloTreeSearch`.
pub struct MonteCarloTreeSearchBuilder<E: Evaluator, K: RandomGenerator> {
    state: GameState,
    evaluator: E,
    random_generator: K,
    config: SearchConfig,
    cancel: Option<CancelToken>,
}

impl<E: Evaluator, K: RandomGenerator> MonteCarloTreeSearchBuilder<E, K> {
    /// Sets the random number generator used for root noise and temperature sampling.
    pub fn with_random_generator<R: RandomGenerator>(
        self,
        rg: R,
    ) -> MonteCarloTreeSearchBuilder<E, R> {
        MonteCarloTreeSearchBuilder {
            state: self.state,
            evaluator: self.evaluator,
            random_generator: rg,
            config: self.config,
            cancel: self.cancel,
        }
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.config.budget = budget;
        self
    }

    /// Sets the initial capacity of the node arena.
    pub fn with_node_capacity(mut self, capacity: usize) -> Self {
        self.config.node_capacity = capacity;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Builds the `MonteCarloTreeSearch` instance with the configured parameters.
    pub fn build(self) -> MonteCarloTreeSearch<E, K> {
        let mut mcts = MonteCarloTreeSearch::new(
            self.state,
            self.evaluator,
            self.random_generator,
            self.config,
        );
        mcts.cancel = self.cancel;
        mcts
    }
}

impl<E: Evaluator> MonteCarloTreeSearch<E, StandardRandomGenerator> {
    /// Returns a new builder for `MonteCarloTreeSearch`.
    pub fn builder(state: GameState, evaluator: E) -> MonteCarloTreeSearchBuilder<E, StandardRandomGenerator> {
        MonteCarloTreeSearchBuilder {
            state,
            evaluator,
            random_generator: StandardRandomGenerator,
            config: SearchConfig::default(),
            cancel: None,
        }
    }
}

impl<E: Evaluator, K: RandomGenerator> MonteCarloTreeSearch<E, K> {
    /// Creates a new `MonteCarloTreeSearch` instance rooted at `state`.
    ///
    /// It is recommended to use the builder pattern via `MonteCarloTreeSearch::builder()` instead.
    pub fn new(state: GameState, evaluator: E, rg: K, config: SearchConfig) -> Self {
        let root = MctsNode::new(Box::new(state));
        let tree = Tree::with_capacity(root, config.node_capacity.max(1));

        Self {
            tree,
            evaluator,
            random: rg,
            config,
            cancel: None,
            next_step: SearchStep::Selection { updated: vec![] },
            simulations: 0,
        }
    }

    /// Returns an immutable reference to the underlying search tree.
    pub fn get_tree(&self) -> &Tree<MctsNode> {
        &self.tree
    }

    /// Returns the root node of the search tree.
    pub fn get_root(&self) -> NodeRef<'_, MctsNode> {
        self.tree.root()
    }

    /// Returns the next step to be performed. Useful for debugging and visualization.
    pub fn get_next_step(&self) -> &SearchStep {
        &self.next_step
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Drops the tree and hands back the random generator.
    pub fn into_random_generator(self) -> K {
        self.random
    }

    /// Simulations completed since the tree was created.
    pub fn simulations(&self) -> u32 {
        self.simulations
    }

    /// Executes a single step of the algorithm (Selection, Expansion or Backpropagation).
    ///
    /// A failing step abandons the current simulation: the next step is a
    /// fresh selection and the statistics gathered so far are untouched.
    pub fn execute_step(&mut self) -> Result<(), SearchError> {
        let step = std::mem::replace(
            &mut self.next_step,
            SearchStep::Selection { updated: vec![] },
        );
        match step {
            SearchStep::Selection { .. } => {
                if self.get_root().value().is_terminal {
                    return Err(SearchError::NoLegalActions);
                }
                let leaf = self.select()?;
                self.next_step = SearchStep::Expansion { leaf };
            }
            SearchStep::Expansion { leaf } => {
                let value = self.expand(leaf)?;
                self.next_step = SearchStep::Backpropagation { leaf, value };
            }
            SearchStep::Backpropagation { leaf, value } => {
                let updated = self.backpropagate(leaf, value)?;
                self.simulations += 1;
                trace!(
                    simulation = self.simulations,
                    depth = updated.len(),
                    value,
                    "simulation complete"
                );
                self.next_step = SearchStep::Selection { updated };
            }
        }
        Ok(())
    }

    /// Performs one full simulation (Selection, Expansion, Backpropagation).
    /// Returns the path of nodes that were updated, leaf first.
    pub fn do_iteration(&mut self) -> Result<Vec<NodeId>, SearchError> {
        loop {
            let is_last = matches!(self.next_step, SearchStep::Backpropagation { .. });
            self.execute_step()?;
            if is_last {
                break;
            }
        }

        match &self.next_step {
            SearchStep::Selection { updated } => Ok(updated.clone()),
            _ => Ok(vec![]),
        }
    }

    /// Runs exactly `n` simulations.
    pub fn iterate_n_times(&mut self, n: u32) -> Result<(), SearchError> {
        for _ in 0..n {
            self.do_iteration()?;
        }
        Ok(())
    }

    /// Runs simulations until the configured budget is spent and picks an action.
    ///
    /// The first simulation always runs; the wall clock is consulted only after
    /// `min_simulations_before_clock_check` simulations, and the cancel token
    /// between any two.
    ///
    /// # Errors
    ///
    /// * [`SearchError::NoLegalActions`] if the root state is terminal.
    /// * [`SearchError::EvaluatorFailure`] if the evaluator fails or returns
    ///   malformed output. The tree keeps what was learned before, so
    ///   [`best_action`](Self::best_action) may still answer.
    /// * [`SearchError::InvalidConfig`] if the configuration does not validate.
    pub fn search(&mut self) -> Result<SearchResult, SearchError> {
        self.config
            .validate()
            .map_err(|e| SearchError::InvalidConfig(e.to_string()))?;
        if self.get_root().value().is_terminal {
            return Err(SearchError::NoLegalActions);
        }

        let budget = self.config.budget;
        let min_before_clock = budget.min_simulations_before_clock_check.max(1);
        let started = Instant::now();
        debug!(
            max_simulations = budget.max_simulations,
            max_wall_clock_millis = ?budget.max_wall_clock_millis,
            side = %self.get_root().value().state.side_to_move(),
            "search started"
        );

        let mut run = 0;
        while run < budget.max_simulations {
            if run >= 1 && self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                debug!(simulations = run, "search cancelled");
                break;
            }
            if let Some(limit) = budget.max_wall_clock_millis {
                if run >= min_before_clock && started.elapsed() >= Duration::from_millis(limit) {
                    break;
                }
            }

            if let Err(err) = self.do_iteration() {
                warn!(%err, simulations = run, "search aborted");
                return Err(err);
            }
            run += 1;
        }

        let action = self.choose_action().ok_or(SearchError::NoLegalActions)?;
        let result = SearchResult {
            action,
            visits: self.visit_distribution(),
            root_value: self.get_root().value().mean_value(),
            simulations: run,
            elapsed: started.elapsed(),
        };
        debug!(
            action = %result.action,
            simulations = result.simulations,
            root_value = result.root_value,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "search finished"
        );
        Ok(result)
    }

    /// The most visited root child, the first one in legal-action order on
    /// ties. `None` until the root was expanded.
    pub fn best_action(&self) -> Option<Action> {
        let mut best: Option<(Action, u32)> = None;
        for child in self.get_root().children() {
            let node = child.value();
            if let Some(action) = node.prev_action {
                if best.is_none_or(|(_, visits)| node.visits > visits) {
                    best = Some((action, node.visits));
                }
            }
        }
        best.map(|(action, _)| action)
    }

    /// Visit count of every root child, in legal-action order.
    pub fn visit_distribution(&self) -> Vec<(Action, u32)> {
        self.get_root()
            .children()
            .filter_map(|child| child.value().prev_action.map(|a| (a, child.value().visits)))
            .collect()
    }

    fn node(&self, id: NodeId) -> Result<NodeRef<'_, MctsNode>, SearchError> {
        self.tree.get(id).ok_or(SearchError::DanglingNode)
    }

    fn choose_action(&mut self) -> Option<Action> {
        let temperature = self.config.temperature;
        if temperature < 1e-6 {
            return self.best_action();
        }

        let weights: Vec<(Action, f64)> = self
            .visit_distribution()
            .into_iter()
            .map(|(action, visits)| (action, (visits as f64).powf(1.0 / temperature)))
            .collect();
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        if !total.is_finite() || total <= 0.0 {
            return self.best_action();
        }

        let target = self.random.next_unit() * total;
        let mut cumulative = 0.0;
        for &(action, weight) in &weights {
            cumulative += weight;
            if target < cumulative {
                return Some(action);
            }
        }
        weights
            .iter()
            .rev()
            .find(|(_, w)| *w > 0.0)
            .map(|(action, _)| *action)
    }

    /// Descends from the root along the highest PUCT score until a leaf.
    fn select(&self) -> Result<NodeId, SearchError> {
        let c = self.config.exploration_constant;
        let mut current = self.tree.root().id();
        loop {
            let node = self.node(current)?;
            if node.value().is_leaf() {
                return Ok(current);
            }

            let parent_visits_sqrt = (node.value().visits as f64).sqrt();
            let mut best: Option<(NodeId, f64)> = None;
            for child in node.children() {
                let score = child.value().ucb_score(parent_visits_sqrt, c);
                if best.is_none_or(|(_, max)| score > max) {
                    best = Some((child.id(), score));
                }
            }

            match best {
                Some((child_id, _)) => current = child_id,
                None => return Ok(current),
            }
        }
    }

    /// Evaluates a leaf, creates its children and returns the value to back up,
    /// seen from the leaf's side to move.
    fn expand(&mut self, leaf: NodeId) -> Result<f64, SearchError> {
        let node = self.node(leaf)?.value();
        if node.is_terminal {
            return Ok(node.terminal_value);
        }
        let state = node.state.clone();
        let children_height = node.height + 1;

        let evaluation = self.evaluator.evaluate(&state)?;
        evaluation.validate()?;

        let actions = state.legal_actions();
        let priors = masked_priors(&actions, &evaluation.policy);
        {
            let mut parent = self.tree.get_mut(leaf).ok_or(SearchError::DanglingNode)?;
            for (action, prior) in actions.iter().zip(priors) {
                let child_state = state.apply_unchecked(action);
                parent.append(MctsNode::child(child_state, *action, prior, children_height));
            }
            parent.value().is_expanded = true;
        }

        if leaf == self.tree.root().id() && self.config.dirichlet_alpha > 0.0 {
            self.add_dirichlet_noise()?;
        }

        let value = match self.config.reward {
            RewardMode::TerminalOnly => evaluation.value,
            RewardMode::Shaped(weights) => {
                let shaped = state.shaped_reward(
                    state.side_to_move(),
                    weights.disc_weight,
                    weights.ring_weight,
                );
                (evaluation.value + weights.discount * shaped).clamp(-1.0, 1.0)
            }
        };
        Ok(value)
    }

    /// Mixes Dirichlet noise into the priors of the root children.
    fn add_dirichlet_noise(&mut self) -> Result<(), SearchError> {
        let children: Vec<NodeId> = self.get_root().children().map(|c| c.id()).collect();
        if children.is_empty() {
            return Ok(());
        }

        let gamma = Gamma::new(self.config.dirichlet_alpha, 1.0)
            .map_err(|e| SearchError::InvalidConfig(e.to_string()))?;
        let mut noise: Vec<f64> = (0..children.len())
            .map(|_| gamma.sample(&mut self.random))
            .collect();
        let sum: f64 = noise.iter().sum();
        if sum > 0.0 {
            for n in &mut noise {
                *n /= sum;
            }
        }

        let eps = self.config.dirichlet_epsilon;
        for (child_id, n) in children.into_iter().zip(noise) {
            let mut child = self.tree.get_mut(child_id).ok_or(SearchError::DanglingNode)?;
            let node = child.value();
            node.prior = (1.0 - eps) * node.prior + eps * n;
        }
        Ok(())
    }

    /// Adds `value` to the leaf and alternately negated values to its ancestors.
    fn backpropagate(&mut self, leaf: NodeId, value: f64) -> Result<Vec<NodeId>, SearchError> {
        let mut branch = vec![leaf];
        let mut current = leaf;
        while let Some(parent) = self.node(current)?.parent() {
            current = parent.id();
            branch.push(current);
        }

        let mut value = value;
        for node_id in &branch {
            let mut node = self.tree.get_mut(*node_id).ok_or(SearchError::DanglingNode)?;
            node.value().record(value);
            value = -value;
        }
        Ok(branch)
    }
}

/// Priors of `actions` taken from a full-width `policy`.
///
/// Actions without a policy slot, and slots holding negative or non-finite
/// numbers, get `1/n`. The other actions share the remaining `n_enc/n` in
/// proportion to their policy entries. If those entries sum to zero every
/// action gets `1/n`.
pub fn masked_priors(actions: &[Action], policy: &[f64]) -> Vec<f64> {
    if actions.is_empty() {
        return vec![];
    }

    let n = actions.len() as f64;
    let uniform = 1.0 / n;
    let raw: Vec<Option<f64>> = actions
        .iter()
        .map(|action| {
            ActionCodec::encode(action)
                .ok()
                .and_then(|index| policy.get(index).copied())
                .filter(|p| p.is_finite() && *p >= 0.0)
        })
        .collect();

    let encodable = raw.iter().flatten().count();
    let mass: f64 = raw.iter().flatten().sum();
    if mass <= 0.0 {
        if encodable > 0 {
            warn!(actions = actions.len(), "policy has no mass on legal actions, using uniform priors");
        }
        return vec![uniform; actions.len()];
    }

    let share = encodable as f64 / n;
    raw.into_iter()
        .map(|p| match p {
            Some(p) => share * p / mass,
            None => uniform,
        })
        .collect()
}

/// Runs one search from `state` and returns the chosen action.
pub fn search<E: Evaluator>(
    state: &GameState,
    evaluator: E,
    config: &SearchConfig,
) -> Result<Action, SearchError> {
    let mut mcts = MonteCarloTreeSearch::builder(state.clone(), evaluator)
        .with_config(config.clone())
        .build();
    Ok(mcts.search()?.action)
}

/// Represents the phases of one simulation.
///
/// This enum is used to manage the state of the search process.
#[derive(Debug, PartialEq, Clone)]
pub enum SearchStep {
    /// **Selection**: start from the root and follow the best PUCT score down to a leaf.
    Selection {
        /// The path of nodes updated by the last backpropagation, leaf first.
        updated: Vec<NodeId>,
    },
    /// **Expansion**: evaluate `leaf` and create its children.
    Expansion {
        /// The leaf to be evaluated.
        leaf: NodeId,
    },
    /// **Backpropagation**: update the statistics on the path from `leaf` to the root.
    Backpropagation {
        /// The leaf that was evaluated.
        leaf: NodeId,
        /// Its value for the leaf's side to move.
        value: f64,
    },
}

impl SearchStep {
    /// Returns the name of the step as a string.
    pub fn get_name(&self) -> String {
        match self {
            SearchStep::Selection { .. } => "Selection".to_string(),
            SearchStep::Expansion { .. } => "Expansion".to_string(),
            SearchStep::Backpropagation { .. } => "Backpropagation".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Color, Piece, Position};
    use crate::codec::ACTION_COUNT;
    use crate::config::ShapingWeights;
    use crate::error::EvaluatorError;
    use crate::evaluator::{Evaluation, UniformEvaluator};
    use crate::random::CustomNumberGenerator;
    use crate::state::{DISC_CAPTURES_TO_WIN, Inventory};

    fn at(row: usize, col: usize) -> Position {
        Position::new(row, col).unwrap()
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

    /// White can step north, step south-west, or jump east for its sixth capture.
    fn winning_capture_position() -> GameState {
        let mut board = Board::empty();
        for (row, col, color) in [
            (5, 5, Color::White),
            (4, 5, Color::White),
            (6, 4, Color::White),
            (5, 6, Color::Black),
            (5, 7, Color::Black),
        ] {
            board.set_tile(at(row, col), Some(color));
        }
        board.set_piece(at(5, 5), Some(Piece::disc(Color::White)));
        board.set_piece(at(5, 6), Some(Piece::disc(Color::Black)));
        let white = Inventory {
            captured_discs: DISC_CAPTURES_TO_WIN - 1,
            ..empty_inventory()
        };
        GameState::new(board, white, empty_inventory(), Color::White)
    }

    /// Succeeds a fixed number of times, then fails.
    struct FlakyEvaluator {
        remaining: u32,
    }

    impl Evaluator for FlakyEvaluator {
        fn evaluate(&mut self, _state: &GameState) -> Result<Evaluation, EvaluatorError> {
            if self.remaining == 0 {
                return Err(EvaluatorError::Failed("model unavailable".to_string()));
            }
            self.remaining -= 1;
            Ok(Evaluation::uniform(0.0))
        }
    }

    /// Sound for `remaining` calls, then answers `bad_value`.
    struct NanValueEvaluator {
        remaining: u32,
        bad_value: f64,
    }

    impl Evaluator for NanValueEvaluator {
        fn evaluate(&mut self, _state: &GameState) -> Result<Evaluation, EvaluatorError> {
            if self.remaining == 0 {
                return Ok(Evaluation::uniform(self.bad_value));
            }
            self.remaining -= 1;
            Ok(Evaluation::uniform(0.0))
        }
    }

    struct ShortPolicyEvaluator;

    impl Evaluator for ShortPolicyEvaluator {
        fn evaluate(&mut self, _state: &GameState) -> Result<Evaluation, EvaluatorError> {
            Ok(Evaluation {
                policy: vec![1.0; 10],
                value: 0.0,
            })
        }
    }

    #[test]
    fn search_returns_legal_action() {
        // arrange
        let state = GameState::standard();
        let mut mcts = MonteCarloTreeSearch::builder(state.clone(), UniformEvaluator::new())
            .with_random_generator(CustomNumberGenerator::default())
            .with_config(SearchConfig::for_testing())
            .build();

        // act
        let result = mcts.search().unwrap();

        // assert
        assert!(state.legal_actions().contains(&result.action));
        assert_eq!(result.simulations, 50);
        assert_eq!(result.visits.len(), 13);
        assert_eq!(mcts.get_root().value().visits, 50);
        let child_visits: u32 = result.visits.iter().map(|(_, n)| n).sum();
        // the first simulation stops at the root itself
        assert_eq!(child_visits, 49);
        let distribution: f64 = result.visit_distribution().iter().map(|(_, p)| p).sum();
        assert!((distribution - 1.0).abs() < 1e-9);
    }

    #[test]
    fn single_simulation_picks_first_legal_action() {
        let state = GameState::standard();
        let config = SearchConfig::default().with_simulations(1);

        let action = search(&state, UniformEvaluator::new(), &config).unwrap();

        assert_eq!(action, state.legal_actions()[0]);
    }

    #[test]
    fn terminal_root_has_no_actions() {
        let white = Inventory {
            captured_discs: DISC_CAPTURES_TO_WIN,
            ..Inventory::full()
        };
        let state = GameState::new(Board::empty(), white, Inventory::full(), Color::Black);

        let result = search(&state, UniformEvaluator::new(), &SearchConfig::for_testing());

        assert_eq!(result, Err(SearchError::NoLegalActions));
    }

    #[test]
    fn finds_winning_capture() {
        // arrange
        let state = winning_capture_position();
        let jump = Action::Move {
            from: at(5, 5),
            to: at(5, 7),
        };
        assert_eq!(state.legal_actions().len(), 3);
        assert_eq!(state.legal_actions()[2], jump);

        // act
        let mut mcts = MonteCarloTreeSearch::builder(state, UniformEvaluator::new())
            .with_random_generator(CustomNumberGenerator::new(5))
            .with_config(SearchConfig::for_testing().with_simulations(100))
            .build();
        let result = mcts.search().unwrap();

        // assert
        assert_eq!(result.action, jump);
        assert!(result.root_value > 0.0);
    }

    #[test]
    fn evaluator_failure_keeps_tree() {
        // arrange
        let mut mcts = MonteCarloTreeSearch::builder(
            GameState::standard(),
            FlakyEvaluator { remaining: 5 },
        )
        .with_config(SearchConfig::for_testing())
        .build();

        // act
        let result = mcts.search();

        // assert
        assert!(matches!(
            result,
            Err(SearchError::EvaluatorFailure(EvaluatorError::Failed(_)))
        ));
        assert_eq!(mcts.simulations(), 5);
        assert_eq!(mcts.get_root().value().visits, 5);
        assert!(mcts.best_action().is_some());
        assert!(matches!(
            mcts.get_next_step(),
            SearchStep::Selection { .. }
        ));
    }

    #[test]
    fn malformed_policy_is_a_failure() {
        let mut mcts =
            MonteCarloTreeSearch::builder(GameState::standard(), ShortPolicyEvaluator).build();

        let result = mcts.search();

        assert_eq!(
            result,
            Err(SearchError::EvaluatorFailure(EvaluatorError::PolicyLength {
                expected: ACTION_COUNT,
                got: 10
            }))
        );
        assert_eq!(mcts.best_action(), None);
    }

    #[test]
    fn nan_value_is_a_failure() {
        // arrange
        let evaluator = NanValueEvaluator {
            remaining: 4,
            bad_value: f64::NAN,
        };
        let mut mcts = MonteCarloTreeSearch::builder(GameState::standard(), evaluator)
            .with_config(SearchConfig::for_testing())
            .build();

        // act
        let result = mcts.search();

        // assert
        assert!(matches!(
            result,
            Err(SearchError::EvaluatorFailure(EvaluatorError::InvalidValue(v))) if v.is_nan()
        ));
        assert_eq!(mcts.simulations(), 4);
        // the root and its 13 children, plus the children of three expanded leaves
        assert!(mcts.get_tree().nodes().count() > 14);
        assert!(mcts.best_action().is_some());
    }

    #[test]
    fn out_of_range_value_is_a_failure() {
        let evaluator = NanValueEvaluator {
            remaining: 1,
            bad_value: 1.5,
        };
        let mut mcts = MonteCarloTreeSearch::builder(GameState::standard(), evaluator)
            .with_config(SearchConfig::for_testing())
            .build();

        let result = mcts.search();

        assert_eq!(
            result,
            Err(SearchError::EvaluatorFailure(EvaluatorError::InvalidValue(1.5)))
        );
        assert_eq!(mcts.get_root().children().count(), 13);
        assert_eq!(mcts.best_action(), Some(GameState::standard().legal_actions()[0]));
    }

    #[test]
    fn wall_clock_stops_search() {
        let config = SearchConfig::for_testing().with_budget(
            SearchBudget::simulations(u32::MAX)
                .with_wall_clock_millis(20)
                .with_min_simulations_before_clock_check(3),
        );
        let mut mcts = MonteCarloTreeSearch::builder(GameState::standard(), UniformEvaluator::new())
            .with_config(config)
            .build();

        let result = mcts.search().unwrap();

        assert!(result.simulations >= 3);
        assert!(result.simulations < u32::MAX);
    }

    #[test]
    fn cancel_token_stops_after_first_simulation() {
        let token = CancelToken::new();
        token.cancel();
        let mut mcts = MonteCarloTreeSearch::builder(GameState::standard(), UniformEvaluator::new())
            .with_config(SearchConfig::for_testing())
            .with_cancel_token(token.clone())
            .build();

        let result = mcts.search().unwrap();

        assert!(token.is_cancelled());
        assert_eq!(result.simulations, 1);
        assert_eq!(result.action, GameState::standard().legal_actions()[0]);
    }

    #[test]
    fn steps_cycle_through_phases() {
        // arrange
        let mut mcts = MonteCarloTreeSearch::builder(GameState::standard(), UniformEvaluator::new())
            .with_node_capacity(64)
            .build();
        let root_id = mcts.get_root().id();

        // act & assert
        assert_eq!(mcts.get_next_step().get_name(), "Selection");
        mcts.execute_step().unwrap();
        assert_eq!(mcts.get_next_step(), &SearchStep::Expansion { leaf: root_id });
        mcts.execute_step().unwrap();
        assert_eq!(
            mcts.get_next_step(),
            &SearchStep::Backpropagation {
                leaf: root_id,
                value: 0.0
            }
        );
        mcts.execute_step().unwrap();
        assert_eq!(
            mcts.get_next_step(),
            &SearchStep::Selection {
                updated: vec![root_id]
            }
        );

        let path = mcts.do_iteration().unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[1], root_id);
        assert_eq!(mcts.simulations(), 2);
    }

    #[test]
    fn values_alternate_sign_along_path() {
        // arrange
        let mut mcts = MonteCarloTreeSearch::builder(winning_capture_position(), UniformEvaluator::new())
            .build();
        mcts.iterate_n_times(30).unwrap();

        // assert
        let root = mcts.get_root();
        let winning = root
            .children()
            .find(|c| c.value().is_terminal)
            .unwrap();
        assert!(winning.value().visits > 0);
        assert_eq!(winning.value().mean_value(), -1.0);
        assert!(winning.value().ucb_score(1.0, 0.0) > 0.0);
    }

    #[test]
    fn shaped_reward_adds_capture_balance() {
        // arrange
        let white = Inventory {
            captured_discs: 2,
            ..Inventory::full()
        };
        let state = GameState::new(
            *GameState::standard().board(),
            white,
            Inventory::full(),
            Color::White,
        );
        let config = SearchConfig::default().with_reward(RewardMode::Shaped(ShapingWeights {
            disc_weight: 0.1,
            ring_weight: 0.2,
            discount: 0.5,
        }));
        let mut mcts = MonteCarloTreeSearch::builder(state, UniformEvaluator::new())
            .with_config(config)
            .build();

        // act
        mcts.execute_step().unwrap();
        mcts.execute_step().unwrap();

        // assert
        match mcts.get_next_step() {
            SearchStep::Backpropagation { value, .. } => assert!((value - 0.1).abs() < 1e-12),
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn noise_and_temperature_are_reproducible() {
        let config = SearchConfig::for_testing()
            .with_dirichlet_noise(0.3, 0.25)
            .with_temperature(1.0);
        let run = || {
            let mut mcts =
                MonteCarloTreeSearch::builder(GameState::standard(), UniformEvaluator::new())
                    .with_random_generator(CustomNumberGenerator::new(99))
                    .with_config(config.clone())
                    .build();
            let result = mcts.search().unwrap();
            let priors: f64 = mcts.get_root().children().map(|c| c.value().prior).sum();
            (result.action, result.visits, priors)
        };

        let (action, visits, priors) = run();
        assert_eq!((action, visits.clone()), {
            let (a, v, _) = run();
            (a, v)
        });
        assert!(GameState::standard().legal_actions().contains(&action));
        assert!((priors - 1.0).abs() < 1e-9);
        assert_eq!(visits.len(), 13);
    }

    #[test]
    fn priors_are_masked_and_normalised() {
        let state = winning_capture_position();
        let actions = state.legal_actions();
        let mut policy = vec![0.0; ACTION_COUNT];
        policy[ActionCodec::encode(&actions[0]).unwrap()] = 3.0;
        policy[ActionCodec::encode(&actions[1]).unwrap()] = 1.0;

        let priors = masked_priors(&actions, &policy);

        // the jump has no slot and takes the uniform share
        let third = 1.0 / 3.0;
        assert!((priors[2] - third).abs() < 1e-12);
        assert!((priors[0] - 2.0 * third * 0.75).abs() < 1e-12);
        assert!((priors[1] - 2.0 * third * 0.25).abs() < 1e-12);
        assert!((priors.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_policy_mass_falls_back_to_uniform() {
        let actions = GameState::standard().legal_actions();
        let mut policy = vec![0.0; ACTION_COUNT];
        policy[ActionCodec::encode(&actions[0]).unwrap()] = f64::NAN;
        policy[ActionCodec::encode(&actions[1]).unwrap()] = -1.0;

        let priors = masked_priors(&actions, &policy);

        assert_eq!(priors.len(), 13);
        assert!(priors.iter().all(|p| (p - 1.0 / 13.0).abs() < 1e-12));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SearchConfig::default().with_simulations(0);
        assert!(matches!(
            search(&GameState::standard(), UniformEvaluator::new(), &config),
            Err(SearchError::InvalidConfig(_))
        ));
    }
}
