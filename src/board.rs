use std::fmt;

/// Number of rows and columns of the playing grid.
pub const BOARD_SIZE: usize = 10;
/// Number of cells of the playing grid.
pub const CELL_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

/// The six axial hex directions as `(row, col)` deltas, in canonical order:
/// north, north-east, east, south, south-west, west.
pub const HEX_DIRECTIONS: [(i8, i8); 6] = [(-1, 0), (-1, 1), (0, 1), (1, 0), (1, -1), (0, -1)];

/// The twelve cells at hex distance exactly two, reachable by a ring hop.
///
/// Even entries are straight double steps, odd entries the corners between two
/// neighbouring directions.
pub const RING_HOPS: [(i8, i8); 12] = [
    (-2, 0),
    (-2, 1),
    (-2, 2),
    (-1, 2),
    (0, 2),
    (1, 1),
    (2, 0),
    (2, -1),
    (2, -2),
    (1, -2),
    (0, -2),
    (-1, -1),
];

/// The two sides of the game.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, PartialOrd, Ord)]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Both colors, white first.
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    /// Returns the other side.
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => f.write_str("white"),
            Color::Black => f.write_str("black"),
        }
    }
}

/// The kinds of movable pieces.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum PieceKind {
    Disc,
    Ring,
}

/// A piece standing on a tile.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    pub const fn disc(color: Color) -> Self {
        Self {
            color,
            kind: PieceKind::Disc,
        }
    }

    pub const fn ring(color: Color) -> Self {
        Self {
            color,
            kind: PieceKind::Ring,
        }
    }
}

/// A cell of the grid: an optional tile and an optional piece on top of it.
#[derive(Debug, Default, PartialEq, Eq, Hash, Copy, Clone)]
pub struct Cell {
    pub tile: Option<Color>,
    pub piece: Option<Piece>,
}

/// A cell coordinate that is always inside the grid.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, PartialOrd, Ord)]
pub struct Position {
    row: u8,
    col: u8,
}

impl Position {
    /// Returns the position at `(row, col)`, or `None` outside the grid.
    pub const fn new(row: usize, col: usize) -> Option<Self> {
        if row < BOARD_SIZE && col < BOARD_SIZE {
            Some(Self {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    /// Returns the position of a row-major cell index.
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < CELL_COUNT {
            Position::new(index / BOARD_SIZE, index % BOARD_SIZE)
        } else {
            None
        }
    }

    pub const fn row(self) -> usize {
        self.row as usize
    }

    pub const fn col(self) -> usize {
        self.col as usize
    }

    /// Row-major index of the cell.
    pub const fn index(self) -> usize {
        self.row() * BOARD_SIZE + self.col()
    }

    /// Returns the position shifted by `(dr, dc)`, or `None` if it leaves the grid.
    pub fn offset(self, dr: i8, dc: i8) -> Option<Position> {
        let row = self.row as i32 + dr as i32;
        let col = self.col as i32 + dc as i32;
        if row < 0 || col < 0 {
            return None;
        }
        Position::new(row as usize, col as usize)
    }

    /// `(row, col)` displacement from `self` to `other`.
    pub fn delta_to(self, other: Position) -> (i32, i32) {
        (
            other.row as i32 - self.row as i32,
            other.col as i32 - self.col as i32,
        )
    }

    /// Every position of the grid in row-major order.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..CELL_COUNT).filter_map(Position::from_index)
    }

    /// The on-board hex neighbours, in [`HEX_DIRECTIONS`] order.
    pub fn neighbors(self) -> impl Iterator<Item = Position> {
        HEX_DIRECTIONS
            .iter()
            .filter_map(move |&(dr, dc)| self.offset(dr, dc))
    }
}

impl fmt::Display for Position {
    /// Algebraic notation: column letter, then rows counted from the bottom.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = (b'A' + self.col) as char;
        write!(f, "{}{}", letter, BOARD_SIZE - self.row())
    }
}

/// The playing grid.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub struct Board {
    cells: [Cell; CELL_COUNT],
}

impl Default for Board {
    fn default() -> Self {
        Board::empty()
    }
}

impl Board {
    /// A grid without tiles or pieces.
    pub const fn empty() -> Self {
        Self {
            cells: [Cell {
                tile: None,
                piece: None,
            }; CELL_COUNT],
        }
    }

    pub fn cell(&self, pos: Position) -> &Cell {
        &self.cells[pos.index()]
    }

    pub fn tile(&self, pos: Position) -> Option<Color> {
        self.cells[pos.index()].tile
    }

    pub fn piece(&self, pos: Position) -> Option<Piece> {
        self.cells[pos.index()].piece
    }

    pub fn set_tile(&mut self, pos: Position, tile: Option<Color>) {
        self.cells[pos.index()].tile = tile;
    }

    pub fn set_piece(&mut self, pos: Position, piece: Option<Piece>) {
        self.cells[pos.index()].piece = piece;
    }

    /// Removes and returns the piece at `pos`.
    pub fn take_piece(&mut self, pos: Position) -> Option<Piece> {
        self.cells[pos.index()].piece.take()
    }

    /// Whether `pos` carries a tile and no piece.
    pub fn is_free_tile(&self, pos: Position) -> bool {
        let cell = self.cell(pos);
        cell.tile.is_some() && cell.piece.is_none()
    }

    /// Whether any hex neighbour of `pos` carries a tile.
    pub fn has_adjacent_tile(&self, pos: Position) -> bool {
        pos.neighbors().any(|n| self.tile(n).is_some())
    }

    /// Number of tiles of any color on the grid.
    pub fn tile_count(&self) -> usize {
        self.cells.iter().filter(|c| c.tile.is_some()).count()
    }

    /// Number of tiles of `color` on the grid.
    pub fn tiles_of(&self, color: Color) -> usize {
        self.cells.iter().filter(|c| c.tile == Some(color)).count()
    }

    /// Number of pieces of `color` and `kind` on the grid.
    pub fn pieces_of(&self, color: Color, kind: PieceKind) -> usize {
        self.cells
            .iter()
            .filter(|c| c.piece == Some(Piece { color, kind }))
            .count()
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Cell; CELL_COUNT] {
        &self.cells
    }
}
