//! Dense integer encoding of actions for policy vectors.
//!
//! The index space is split into four consecutive blocks:
//!
//! | block        | size      | index                              |
//! |--------------|-----------|------------------------------------|
//! | place tile   | 100       | `cell`                             |
//! | place disc   | 100       | `100 + cell`                       |
//! | place ring   | 100       | `200 + cell`                       |
//! | move         | 100 × 6   | `300 + from_cell × 6 + direction`  |
//!
//! where `cell = row × 10 + col` and `direction` indexes [`HEX_DIRECTIONS`].
//! Only single-step moves have a slot; disc jumps and ring hops travel two
//! cells and fail with [`CodecError::UnknownDirection`].

use crate::action::Action;
use crate::board::{CELL_COUNT, HEX_DIRECTIONS, Position};
use crate::error::CodecError;

const TILE_BASE: usize = 0;
const DISC_BASE: usize = CELL_COUNT;
const RING_BASE: usize = 2 * CELL_COUNT;
const MOVE_BASE: usize = 3 * CELL_COUNT;

/// Size of the action index space.
pub const ACTION_COUNT: usize = 3 * CELL_COUNT + CELL_COUNT * HEX_DIRECTIONS.len();

/// Converts between [`Action`]s and indices in `[0, ACTION_COUNT)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ActionCodec;

impl ActionCodec {
    /// Returns the policy index of `action`.
    pub fn encode(action: &Action) -> Result<usize, CodecError> {
        match *action {
            Action::PlaceTile { pos } => Ok(TILE_BASE + pos.index()),
            Action::PlaceDisc { pos } => Ok(DISC_BASE + pos.index()),
            Action::PlaceRing { pos } => Ok(RING_BASE + pos.index()),
            Action::Move { from, to } => {
                let (dr, dc) = from.delta_to(to);
                let direction = HEX_DIRECTIONS
                    .iter()
                    .position(|&(r, c)| r as i32 == dr && c as i32 == dc)
                    .ok_or(CodecError::UnknownDirection { from, to })?;
                Ok(MOVE_BASE + from.index() * HEX_DIRECTIONS.len() + direction)
            }
        }
    }

    /// Returns the action stored at `index`.
    pub fn decode(index: usize) -> Result<Action, CodecError> {
        if index >= ACTION_COUNT {
            return Err(CodecError::IndexOutOfRange(index));
        }

        let cell = |i: usize| Position::from_index(i).ok_or(CodecError::IndexOutOfRange(index));
        match index {
            i if i < DISC_BASE => Ok(Action::PlaceTile {
                pos: cell(i - TILE_BASE)?,
            }),
            i if i < RING_BASE => Ok(Action::PlaceDisc {
                pos: cell(i - DISC_BASE)?,
            }),
            i if i < MOVE_BASE => Ok(Action::PlaceRing {
                pos: cell(i - RING_BASE)?,
            }),
            i => {
                let slot = i - MOVE_BASE;
                let from = cell(slot / HEX_DIRECTIONS.len())?;
                let (dr, dc) = HEX_DIRECTIONS[slot % HEX_DIRECTIONS.len()];
                let to = from.offset(dr, dc).ok_or(CodecError::OffBoard(index))?;
                Ok(Action::Move { from, to })
            }
        }
    }
}
