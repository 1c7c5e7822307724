use crate::action::Action;
use crate::state::GameState;

/// Represents a single node in the Monte Carlo search tree.
///
/// Each node stores the state of the game, the statistics gathered for it,
/// and the action that led to this state. Values are accumulated from the
/// perspective of the player to move in `state`.
#[derive(Debug, Clone)]
pub struct MctsNode {
    /// The depth of the node in the tree.
    pub height: u32,
    /// The game state that this node represents.
    pub state: Box<GameState>,
    /// The action that led to this node's state from its parent. `None` for the root node.
    pub prev_action: Option<Action>,
    /// Prior probability of `prev_action` assigned when the parent was expanded.
    pub prior: f64,
    /// The number of simulations that passed through this node.
    pub visits: u32,
    /// Sum of the values backed up through this node.
    pub value_sum: f64,
    /// Whether the game is over in `state`.
    pub is_terminal: bool,
    /// `state.reward(side to move)` for terminal nodes, 0 otherwise.
    pub terminal_value: f64,
    /// Set once the children of this node were created.
    pub is_expanded: bool,
}

impl Default for MctsNode {
    fn default() -> Self {
        MctsNode::new(Box::new(GameState::default()))
    }
}

impl MctsNode {
    /// Creates an unvisited root node for `state`.
    pub fn new(state: Box<GameState>) -> Self {
        let is_terminal = state.is_terminal();
        let terminal_value = if is_terminal {
            state.reward(state.side_to_move())
        } else {
            0.0
        };
        MctsNode {
            height: 0,
            state,
            prev_action: None,
            prior: 1.0,
            visits: 0,
            value_sum: 0.0,
            is_terminal,
            terminal_value,
            is_expanded: false,
        }
    }

    /// Creates the node reached by `action`.
    pub fn child(state: GameState, action: Action, prior: f64, height: u32) -> Self {
        MctsNode {
            height,
            prev_action: Some(action),
            prior,
            ..MctsNode::new(Box::new(state))
        }
    }

    /// Average backed-up value, 0 while unvisited.
    pub fn mean_value(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.value_sum / self.visits as f64
        }
    }

    /// PUCT score of this node seen from its parent.
    ///
    /// `parent_visits_sqrt` is precomputed by the caller since it is shared by
    /// all siblings. The stored mean is negated because it belongs to the
    /// opponent of the parent's mover.
    pub fn ucb_score(&self, parent_visits_sqrt: f64, exploration_constant: f64) -> f64 {
        let q = -self.mean_value();
        let u = exploration_constant * self.prior * parent_visits_sqrt / (1.0 + self.visits as f64);
        q + u
    }

    /// Whether selection stops here.
    pub fn is_leaf(&self) -> bool {
        self.is_terminal || !self.is_expanded
    }

    pub(crate) fn record(&mut self, value: f64) {
        self.visits += 1;
        self.value_sum += value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Color, Position};
    use crate::state::{DISC_CAPTURES_TO_WIN, Inventory};

    #[test]
    fn new_node_is_unvisited_leaf() {
        let node = MctsNode::default();
        assert_eq!(node.visits, 0);
        assert_eq!(node.mean_value(), 0.0);
        assert!(node.is_leaf());
        assert!(!node.is_terminal);
        assert_eq!(node.prev_action, None);
    }

    #[test]
    fn terminal_value_is_from_side_to_move() {
        // white has won and black is to move: black sees a loss
        let white = Inventory {
            captured_discs: DISC_CAPTURES_TO_WIN,
            ..Inventory::full()
        };
        let state = GameState::new(Board::empty(), white, Inventory::full(), Color::Black);

        let node = MctsNode::new(Box::new(state));

        assert!(node.is_terminal);
        assert_eq!(node.terminal_value, -1.0);
    }

    #[test]
    fn ucb_prefers_prior_then_negated_value() {
        // arrange
        let action = Action::PlaceTile {
            pos: Position::new(3, 4).unwrap(),
        };
        let mut strong = MctsNode::child(GameState::standard(), action, 0.6, 1);
        let mut weak = MctsNode::child(GameState::standard(), action, 0.4, 1);

        // act & assert
        assert!(strong.ucb_score(1.0, 2.0) > weak.ucb_score(1.0, 2.0));

        // a child that is good for the opponent is bad for the parent
        strong.record(1.0);
        weak.record(-1.0);
        let sqrt = 2f64.sqrt();
        assert!((strong.ucb_score(sqrt, 2.0) - (-1.0 + 2.0 * 0.6 * sqrt / 2.0)).abs() < 1e-12);
        assert!(weak.ucb_score(sqrt, 2.0) > strong.ucb_score(sqrt, 2.0));
    }

    #[test]
    fn record_accumulates() {
        let mut node = MctsNode::default();
        node.record(1.0);
        node.record(0.0);
        node.record(-0.5);
        assert_eq!(node.visits, 3);
        assert!((node.mean_value() - 0.5 / 3.0).abs() < 1e-12);
    }
}
