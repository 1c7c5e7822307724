use crate::board::Position;
use std::fmt;

/// A single turn of play.
///
/// Captures are not spelled out: a disc jumping over an opponent piece or a ring
/// landing on one removes that piece as part of the [`Action::Move`].
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Action {
    /// Put a tile from the inventory on an empty cell.
    PlaceTile { pos: Position },
    /// Put a disc from the inventory on a free tile of the mover's color.
    PlaceDisc { pos: Position },
    /// Put a ring on a free tile of the mover's color, paying one captured disc.
    PlaceRing { pos: Position },
    /// Move a piece of the mover.
    Move { from: Position, to: Position },
}

impl Action {
    /// Whether this action puts something new on the board.
    pub fn is_placement(&self) -> bool {
        !matches!(self, Action::Move { .. })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::PlaceTile { pos } => write!(f, "T:{pos}"),
            Action::PlaceDisc { pos } => write!(f, "D:{pos}"),
            Action::PlaceRing { pos } => write!(f, "R:{pos}"),
            Action::Move { from, to } => write!(f, "{from}-{to}"),
        }
    }
}
