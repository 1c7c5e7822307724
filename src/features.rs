//! Network input encoding of a [`GameState`].
//!
//! Four planes of `10 × 10`, plane-major, each plane row-major:
//!
//! 0. white tiles (1 where present)
//! 1. black tiles
//! 2. white pieces (1 disc, 2 ring)
//! 3. black pieces (1 disc, 2 ring)

use crate::board::{CELL_COUNT, Color, PieceKind};
use crate::state::GameState;

pub const PLANE_COUNT: usize = 4;
/// Length of [`encode_planes`] output.
pub const FEATURE_LEN: usize = PLANE_COUNT * CELL_COUNT;

pub fn encode_planes(state: &GameState) -> Vec<f32> {
    let mut planes = vec![0.0f32; FEATURE_LEN];
    for (index, cell) in state.board().cells().iter().enumerate() {
        match cell.tile {
            Some(Color::White) => planes[index] = 1.0,
            Some(Color::Black) => planes[CELL_COUNT + index] = 1.0,
            None => {}
        }
        if let Some(piece) = cell.piece {
            let plane = match piece.color {
                Color::White => 2,
                Color::Black => 3,
            };
            planes[plane * CELL_COUNT + index] = match piece.kind {
                PieceKind::Disc => 1.0,
                PieceKind::Ring => 2.0,
            };
        }
    }
    planes
}
