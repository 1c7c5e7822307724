use crate::action::Action;
use crate::board::{Board, Color, HEX_DIRECTIONS, Piece, PieceKind, Position, RING_HOPS};
use crate::error::GameError;
use crate::hash::MurMurHasher;
use std::ops::ControlFlow;

/// Tiles each color owns at the start of a game.
pub const TILES_PER_COLOR: u8 = 9;
/// Discs each color owns at the start of a game.
pub const DISCS_PER_COLOR: u8 = 6;
/// Rings each color owns at the start of a game.
pub const RINGS_PER_COLOR: u8 = 3;
/// Captured discs that win the game.
pub const DISC_CAPTURES_TO_WIN: u8 = 6;
/// Captured rings that win the game.
pub const RING_CAPTURES_TO_WIN: u8 = 3;
/// Tiles that may be placed anywhere; from then on a new tile must touch an existing one.
pub const FREE_TILE_PLACEMENTS: usize = 4;

/// Supply of one color: pieces not yet placed and opponent pieces captured.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub struct Inventory {
    pub tiles: u8,
    pub discs: u8,
    pub rings: u8,
    pub captured_discs: u8,
    pub captured_rings: u8,
}

impl Inventory {
    /// A full supply with nothing captured.
    pub const fn full() -> Self {
        Self {
            tiles: TILES_PER_COLOR,
            discs: DISCS_PER_COLOR,
            rings: RINGS_PER_COLOR,
            captured_discs: 0,
            captured_rings: 0,
        }
    }

    fn credit_capture(&mut self, kind: PieceKind) {
        match kind {
            PieceKind::Disc => self.captured_discs += 1,
            PieceKind::Ring => self.captured_rings += 1,
        }
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Inventory::full()
    }
}

/// Represents the possible outcomes of a game.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum GameOutcome {
    /// The game is still ongoing.
    InProgress,
    /// A color reached a capture threshold.
    Won(Color),
    /// The side to move has no legal action and nobody reached a threshold.
    Draw,
}

/// A position of the game: the board, both inventories and the side to move.
///
/// States are values. Every transition returns a new state and leaves the
/// receiver untouched, so a search tree can hold many of them at once.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct GameState {
    board: Board,
    white: Inventory,
    black: Inventory,
    side_to_move: Color,
}

impl Default for GameState {
    /// The standard opening.
    fn default() -> Self {
        GameState::standard()
    }
}

impl GameState {
    /// Builds an arbitrary position.
    pub fn new(board: Board, white: Inventory, black: Inventory, side_to_move: Color) -> Self {
        Self {
            board,
            white,
            black,
            side_to_move,
        }
    }

    /// The standard opening: two tiles and a disc per color in the middle of
    /// the board, black to move.
    pub fn standard() -> Self {
        let mut board = Board::empty();
        let setup = [
            (5, 4, Color::White, true),
            (5, 5, Color::White, false),
            (4, 4, Color::Black, false),
            (4, 5, Color::Black, true),
        ];
        for (row, col, color, with_disc) in setup {
            if let Some(pos) = Position::new(row, col) {
                board.set_tile(pos, Some(color));
                if with_disc {
                    board.set_piece(pos, Some(Piece::disc(color)));
                }
            }
        }

        let opening = Inventory {
            tiles: TILES_PER_COLOR - 2,
            discs: DISCS_PER_COLOR - 1,
            ..Inventory::full()
        };
        GameState::new(board, opening, opening, Color::Black)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn inventory(&self, color: Color) -> &Inventory {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    fn inventory_mut(&mut self, color: Color) -> &mut Inventory {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// Number of tiles of either color on the board.
    pub fn tiles_on_board(&self) -> usize {
        self.board.tile_count()
    }

    /// Returns the color that reached a capture threshold, if any.
    pub fn winner(&self) -> Option<Color> {
        Color::ALL.into_iter().find(|&color| {
            let inventory = self.inventory(color);
            inventory.captured_discs >= DISC_CAPTURES_TO_WIN
                || inventory.captured_rings >= RING_CAPTURES_TO_WIN
        })
    }

    /// Returns the current outcome of the game.
    pub fn outcome(&self) -> GameOutcome {
        if let Some(color) = self.winner() {
            GameOutcome::Won(color)
        } else if !self.has_legal_moves(self.side_to_move) {
            GameOutcome::Draw
        } else {
            GameOutcome::InProgress
        }
    }

    /// Whether the game is over: a capture threshold is reached or the side to
    /// move has no legal action.
    pub fn is_terminal(&self) -> bool {
        self.outcome() != GameOutcome::InProgress
    }

    /// Terminal reward from `perspective`: 1 for a win, -1 for a loss and 0
    /// for a draw or an unfinished game.
    pub fn reward(&self, perspective: Color) -> f64 {
        match self.outcome() {
            GameOutcome::Won(color) if color == perspective => 1.0,
            GameOutcome::Won(_) => -1.0,
            GameOutcome::Draw | GameOutcome::InProgress => 0.0,
        }
    }

    /// Capture balance from `perspective`, weighted per captured piece kind.
    pub fn shaped_reward(&self, perspective: Color, disc_weight: f64, ring_weight: f64) -> f64 {
        let own = self.inventory(perspective);
        let other = self.inventory(perspective.opponent());
        let discs = own.captured_discs as f64 - other.captured_discs as f64;
        let rings = own.captured_rings as f64 - other.captured_rings as f64;
        disc_weight * discs + ring_weight * rings
    }

    /// Returns every legal action of the side to move: tile placements, disc
    /// placements, ring placements, then moves, each in row-major cell order.
    ///
    /// Empty once a capture threshold is reached.
    pub fn legal_actions(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.winner().is_some() {
            return actions;
        }

        let _ = self.visit_actions(self.side_to_move, &mut |action| {
            actions.push(action);
            ControlFlow::Continue(())
        });
        actions
    }

    /// Whether `player` would have any action if it were their turn.
    pub fn has_legal_moves(&self, player: Color) -> bool {
        self.visit_actions(player, &mut |_| ControlFlow::Break(()))
            .is_break()
    }

    /// Whether `action` is a member of [`legal_actions`](Self::legal_actions).
    pub fn is_legal(&self, action: &Action) -> bool {
        if self.winner().is_some() {
            return false;
        }

        let mover = self.side_to_move;
        let inventory = self.inventory(mover);
        match *action {
            Action::PlaceTile { pos } => {
                inventory.tiles > 0 && self.is_tile_target(pos, self.tile_adjacency_required())
            }
            Action::PlaceDisc { pos } => inventory.discs > 0 && self.is_piece_target(mover, pos),
            Action::PlaceRing { pos } => {
                inventory.rings > 0
                    && inventory.captured_discs > 0
                    && self.is_piece_target(mover, pos)
            }
            Action::Move { from, to } => {
                self.board.piece(from).is_some_and(|p| p.color == mover)
                    && self.piece_moves(from).contains(&to)
            }
        }
    }

    /// Applies `action` and returns the resulting state with the turn passed
    /// to the opponent.
    ///
    /// # Errors
    ///
    /// [`GameError::IllegalAction`] if the action is not currently legal; the
    /// receiver is left as it was.
    pub fn apply_action(&self, action: &Action) -> Result<GameState, GameError> {
        if !self.is_legal(action) {
            return Err(GameError::IllegalAction { action: *action });
        }
        Ok(self.apply_unchecked(action))
    }

    /// Applies an action already known to be legal.
    pub(crate) fn apply_unchecked(&self, action: &Action) -> GameState {
        let mut next = self.clone();
        let mover = self.side_to_move;

        match *action {
            Action::PlaceTile { pos } => {
                next.board.set_tile(pos, Some(mover));
                next.inventory_mut(mover).tiles -= 1;
            }
            Action::PlaceDisc { pos } => {
                next.board.set_piece(pos, Some(Piece::disc(mover)));
                next.inventory_mut(mover).discs -= 1;
            }
            Action::PlaceRing { pos } => {
                next.board.set_piece(pos, Some(Piece::ring(mover)));
                let inventory = next.inventory_mut(mover);
                inventory.rings -= 1;
                inventory.captured_discs -= 1;
                // the spent disc goes back to its owner's supply
                next.inventory_mut(mover.opponent()).discs += 1;
            }
            Action::Move { from, to } => {
                if let Some(piece) = next.board.take_piece(from) {
                    if let Some(at) = capture_square(piece.kind, from, to) {
                        if let Some(victim) = next.board.piece(at) {
                            if victim.color != piece.color {
                                next.board.set_piece(at, None);
                                next.inventory_mut(piece.color).credit_capture(victim.kind);
                            }
                        }
                    }
                    next.board.set_piece(to, Some(piece));
                }
            }
        }

        next.side_to_move = mover.opponent();
        next
    }

    /// Destinations of the piece standing on `from`, or nothing if the cell is empty.
    ///
    /// A disc steps to an adjacent free tile, or jumps over an adjacent piece
    /// of either color onto the free tile right behind it. A ring hops to any
    /// tile at distance two that does not hold a piece of its own color.
    pub fn piece_moves(&self, from: Position) -> Vec<Position> {
        let Some(piece) = self.board.piece(from) else {
            return Vec::new();
        };

        let mut moves = Vec::new();
        match piece.kind {
            PieceKind::Disc => {
                for &(dr, dc) in &HEX_DIRECTIONS {
                    if let Some(next) = from.offset(dr, dc) {
                        if self.board.is_free_tile(next) {
                            moves.push(next);
                        }
                    }
                }
                for &(dr, dc) in &HEX_DIRECTIONS {
                    let Some(over) = from.offset(dr, dc) else {
                        continue;
                    };
                    if self.board.piece(over).is_none() {
                        continue;
                    }
                    if let Some(landing) = from.offset(2 * dr, 2 * dc) {
                        if self.board.is_free_tile(landing) {
                            moves.push(landing);
                        }
                    }
                }
            }
            PieceKind::Ring => {
                for &(dr, dc) in &RING_HOPS {
                    let Some(target) = from.offset(dr, dc) else {
                        continue;
                    };
                    let cell = self.board.cell(target);
                    let own_piece = cell.piece.is_some_and(|p| p.color == piece.color);
                    if cell.tile.is_some() && !own_piece {
                        moves.push(target);
                    }
                }
            }
        }
        moves
    }

    /// Canonical byte encoding: one byte per cell, both inventories, the side to move.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.board.cells().len() + 11);
        for cell in self.board.cells() {
            let tile = match cell.tile {
                None => 0u8,
                Some(Color::White) => 1,
                Some(Color::Black) => 2,
            };
            let piece = match cell.piece {
                None => 0u8,
                Some(Piece { color: Color::White, kind: PieceKind::Disc }) => 1,
                Some(Piece { color: Color::White, kind: PieceKind::Ring }) => 2,
                Some(Piece { color: Color::Black, kind: PieceKind::Disc }) => 3,
                Some(Piece { color: Color::Black, kind: PieceKind::Ring }) => 4,
            };
            bytes.push(tile | (piece << 2));
        }
        for inventory in [&self.white, &self.black] {
            bytes.extend_from_slice(&[
                inventory.tiles,
                inventory.discs,
                inventory.rings,
                inventory.captured_discs,
                inventory.captured_rings,
            ]);
        }
        bytes.push(match self.side_to_move {
            Color::White => 0,
            Color::Black => 1,
        });
        bytes
    }

    /// 128-bit hash of [`to_bytes`](Self::to_bytes).
    pub fn position_hash(&self) -> u128 {
        MurMurHasher::hash(&self.to_bytes())
    }

    fn tile_adjacency_required(&self) -> bool {
        self.tiles_on_board() >= FREE_TILE_PLACEMENTS
    }

    fn is_tile_target(&self, pos: Position, adjacency_required: bool) -> bool {
        let cell = self.board.cell(pos);
        if cell.tile.is_some() || cell.piece.is_some() {
            return false;
        }
        !adjacency_required || self.board.has_adjacent_tile(pos)
    }

    fn is_piece_target(&self, color: Color, pos: Position) -> bool {
        let cell = self.board.cell(pos);
        cell.tile == Some(color) && cell.piece.is_none()
    }

    /// Feeds every action `color` could take to `visit`, in legal-action
    /// order, until `visit` breaks.
    fn visit_actions(
        &self,
        color: Color,
        visit: &mut dyn FnMut(Action) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        let inventory = *self.inventory(color);

        if inventory.tiles > 0 {
            let adjacency_required = self.tile_adjacency_required();
            for pos in Position::all() {
                if self.is_tile_target(pos, adjacency_required) {
                    visit(Action::PlaceTile { pos })?;
                }
            }
        }

        if inventory.discs > 0 {
            for pos in Position::all() {
                if self.is_piece_target(color, pos) {
                    visit(Action::PlaceDisc { pos })?;
                }
            }
        }

        if inventory.rings > 0 && inventory.captured_discs > 0 {
            for pos in Position::all() {
                if self.is_piece_target(color, pos) {
                    visit(Action::PlaceRing { pos })?;
                }
            }
        }

        for from in Position::all() {
            if self.board.piece(from).is_some_and(|p| p.color == color) {
                for to in self.piece_moves(from) {
                    visit(Action::Move { from, to })?;
                }
            }
        }

        ControlFlow::Continue(())
    }
}

/// Cell whose piece a move may capture: the jumped cell for a disc jump, the
/// landing cell for a ring.
fn capture_square(kind: PieceKind, from: Position, to: Position) -> Option<Position> {
    match kind {
        PieceKind::Disc => {
            let (dr, dc) = from.delta_to(to);
            if dr.abs() == 2 || dc.abs() == 2 {
                from.offset((dr / 2) as i8, (dc / 2) as i8)
            } else {
                None
            }
        }
        PieceKind::Ring => Some(to),
    }
}
