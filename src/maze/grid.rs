//! Maze Grid Model
//!
//! A logical maze of `width x height` cells is stored as a
//! `(2*width+1) x (2*height+1)` matrix:
//!
//! ```text
//!   even,even  -> fixed post (always a wall)
//!   odd,odd    -> traversable cell
//!   mixed      -> wall slot, standing (1) or removed (0)
//! ```
//!
//! Logical cell `i` maps to matrix index `2*i+1`. Marker values other than
//! open/wall only ever occupy cell positions.

use serde::{Serialize, Deserialize};

use crate::core::hash::{layout_digest, LayoutHash};
use crate::core::rng::MazeRng;

/// Value stored at one matrix position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i8)]
pub enum CellMark {
    /// Open path.
    Open = 0,
    /// Wall (post or standing wall slot).
    Wall = 1,
    /// Part of the solution overlay.
    Solution = 2,
    /// Entrance marker.
    Start = 3,
    /// Exit marker.
    End = 4,
    /// Reserved cell (bonus spawn, teleport target).
    Reserved = -1,
}

impl CellMark {
    /// Numeric value of the marker.
    #[inline]
    pub fn value(self) -> i8 {
        self as i8
    }

    /// Parse a numeric marker value.
    pub fn from_value(value: i8) -> Option<Self> {
        match value {
            0 => Some(CellMark::Open),
            1 => Some(CellMark::Wall),
            2 => Some(CellMark::Solution),
            3 => Some(CellMark::Start),
            4 => Some(CellMark::End),
            -1 => Some(CellMark::Reserved),
            _ => None,
        }
    }

    /// Whether a walker may stand on this position.
    #[inline]
    pub fn is_passable(self) -> bool {
        self != CellMark::Wall
    }
}

/// Matrix coordinate (`x` = column, `y` = row).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Coord {
    /// Create a coordinate.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Wire representation `[x, y]`.
    pub fn to_pair(self) -> [i32; 2] {
        [self.x, self.y]
    }

    /// From wire representation `[x, y]`.
    pub fn from_pair(pair: [i32; 2]) -> Self {
        Self { x: pair[0], y: pair[1] }
    }

    /// Manhattan distance to another coordinate.
    pub fn manhattan(self, other: Coord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The four orthogonal neighbours (may be out of bounds).
    pub fn orthogonal(self) -> [Coord; 4] {
        [
            Coord::new(self.x - 1, self.y),
            Coord::new(self.x + 1, self.y),
            Coord::new(self.x, self.y - 1),
            Coord::new(self.x, self.y + 1),
        ]
    }

    /// Is this a cell (odd, odd) position?
    #[inline]
    pub fn is_cell(self) -> bool {
        self.x % 2 == 1 && self.y % 2 == 1
    }

    /// Is this a wall slot (exactly one odd component)?
    #[inline]
    pub fn is_wall_slot(self) -> bool {
        (self.x % 2 == 1) != (self.y % 2 == 1)
    }
}

/// A logical maze cell, independent of the doubled matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalCell {
    /// Logical column.
    pub x: u32,
    /// Logical row.
    pub y: u32,
}

impl LogicalCell {
    /// Create a logical cell.
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Matrix position of this cell (`2*i+1`).
    pub fn to_coord(self) -> Coord {
        Coord::new(to_matrix(self.x), to_matrix(self.y))
    }

    /// Logical cell at a matrix cell position.
    pub fn from_coord(coord: Coord) -> Option<Self> {
        if coord.x < 0 || coord.y < 0 || !coord.is_cell() {
            return None;
        }
        Some(Self::new((coord.x as u32 - 1) / 2, (coord.y as u32 - 1) / 2))
    }
}

/// Map a logical index to its matrix index.
#[inline]
pub const fn to_matrix(index: u32) -> i32 {
    2 * index as i32 + 1
}

/// Orientation of a wall slot, named by the neighbours it separates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WallAxis {
    /// Separates two horizontally adjacent cells (left / right).
    Horizontal,
    /// Separates two vertically adjacent cells (above / below).
    Vertical,
}

/// A wall slot in the matrix, tagged with its axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WallSlot {
    /// Matrix position of the wall.
    pub pos: Coord,
    /// Axis of separation.
    pub axis: WallAxis,
}

impl WallSlot {
    /// The two logical cells this wall separates.
    pub fn bordering(&self) -> (LogicalCell, LogicalCell) {
        let (a, b) = match self.axis {
            WallAxis::Horizontal => (
                Coord::new(self.pos.x - 1, self.pos.y),
                Coord::new(self.pos.x + 1, self.pos.y),
            ),
            WallAxis::Vertical => (
                Coord::new(self.pos.x, self.pos.y - 1),
                Coord::new(self.pos.x, self.pos.y + 1),
            ),
        };
        // Slots handed out by the grid are interior, so both sides are cells.
        let cell = |c: Coord| LogicalCell::new((c.x as u32 - 1) / 2, (c.y as u32 - 1) / 2);
        (cell(a), cell(b))
    }
}

/// Grid errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// Every cell is already walled, reserved or marked.
    #[error("No free cell left to reserve")]
    NoFreeCell,

    /// Coordinate outside the matrix.
    #[error("Coordinate ({x}, {y}) is out of bounds")]
    OutOfBounds {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },
}

/// The two-resolution maze matrix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<CellMark>,
}

impl Grid {
    /// Create an un-carved grid: every cell open, everything else walled.
    pub fn new(width: u32, height: u32) -> Self {
        let mw = to_matrix(width) as usize;
        let mh = to_matrix(height) as usize;
        let mut cells = Vec::with_capacity(mw * mh);
        for y in 0..mh {
            for x in 0..mw {
                let mark = if x % 2 == 1 && y % 2 == 1 {
                    CellMark::Open
                } else {
                    CellMark::Wall
                };
                cells.push(mark);
            }
        }
        Self { width, height, cells }
    }

    /// Logical width in cells.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Logical height in cells.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Matrix width (`2*width+1`).
    pub fn matrix_width(&self) -> i32 {
        to_matrix(self.width)
    }

    /// Matrix height (`2*height+1`).
    pub fn matrix_height(&self) -> i32 {
        to_matrix(self.height)
    }

    /// Entrance cell, just inside the top-left corner.
    pub fn start(&self) -> Coord {
        Coord::new(1, 1)
    }

    /// Exit cell, just inside the bottom-right corner.
    pub fn exit(&self) -> Coord {
        Coord::new(self.matrix_width() - 2, self.matrix_height() - 2)
    }

    /// Is the coordinate inside the matrix?
    #[inline]
    pub fn in_bounds(&self, c: Coord) -> bool {
        c.x >= 0 && c.y >= 0 && c.x < self.matrix_width() && c.y < self.matrix_height()
    }

    /// Is the coordinate on the outer border?
    pub fn is_border(&self, c: Coord) -> bool {
        c.x == 0 || c.y == 0 || c.x == self.matrix_width() - 1 || c.y == self.matrix_height() - 1
    }

    /// Standing wall slot that may be knocked down (inside the border).
    /// Posts between slots never go.
    pub fn is_breachable(&self, c: Coord) -> bool {
        self.in_bounds(c) && !self.is_border(c) && c.is_wall_slot() && self.get(c) == Some(CellMark::Wall)
    }

    fn index(&self, c: Coord) -> Option<usize> {
        if self.in_bounds(c) {
            Some(c.y as usize * self.matrix_width() as usize + c.x as usize)
        } else {
            None
        }
    }

    /// Value at a matrix position.
    pub fn get(&self, c: Coord) -> Option<CellMark> {
        self.index(c).map(|i| self.cells[i])
    }

    /// Value at matrix column `x`, row `y`.
    pub fn query(&self, x: i32, y: i32) -> Option<CellMark> {
        self.get(Coord::new(x, y))
    }

    /// Out-of-bounds positions count as walls.
    #[inline]
    pub fn is_wall(&self, c: Coord) -> bool {
        self.get(c).map_or(true, |m| !m.is_passable())
    }

    /// Set one matrix position.
    pub fn set(&mut self, c: Coord, mark: CellMark) -> Result<(), GridError> {
        let i = self.index(c).ok_or(GridError::OutOfBounds { x: c.x, y: c.y })?;
        self.cells[i] = mark;
        Ok(())
    }

    /// Set every listed position to `mark`.
    ///
    /// Validates all coordinates before touching the grid.
    pub fn mark_region(&mut self, coords: &[Coord], mark: CellMark) -> Result<(), GridError> {
        if let Some(bad) = coords.iter().find(|c| !self.in_bounds(**c)) {
            return Err(GridError::OutOfBounds { x: bad.x, y: bad.y });
        }
        for c in coords {
            self.set(*c, mark)?;
        }
        Ok(())
    }

    /// Overwrite the whole matrix with one value.
    pub fn fill(&mut self, mark: CellMark) {
        self.cells.iter_mut().for_each(|m| *m = mark);
    }

    /// All positions holding `mark`, in row-major order.
    pub fn positions_of(&self, mark: CellMark) -> Vec<Coord> {
        let mw = self.matrix_width();
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, m)| **m == mark)
            .map(|(i, _)| Coord::new(i as i32 % mw, i as i32 / mw))
            .collect()
    }

    /// Standing walls as wire pairs, row-major.
    pub fn wall_pairs(&self) -> Vec<[i32; 2]> {
        self.positions_of(CellMark::Wall).into_iter().map(Coord::to_pair).collect()
    }

    /// Reset solution/start/end/reserved markers back to open.
    pub fn clear_markers(&mut self) {
        for m in self.cells.iter_mut() {
            if *m != CellMark::Wall {
                *m = CellMark::Open;
            }
        }
    }

    /// Mark the entrance and exit cells.
    pub fn mark_endpoints(&mut self) {
        let (start, exit) = (self.start(), self.exit());
        // Both are in bounds for any grid with at least one cell.
        let _ = self.set(start, CellMark::Start);
        let _ = self.set(exit, CellMark::End);
    }

    /// Reserve a uniformly random open cell and return it.
    ///
    /// Only cells holding [`CellMark::Open`] qualify, so start/end markers,
    /// the solution overlay and earlier reservations are never reused.
    pub fn find_random_free_cell(&mut self, rng: &mut MazeRng) -> Result<Coord, GridError> {
        let free: Vec<Coord> = self
            .positions_of(CellMark::Open)
            .into_iter()
            .filter(|c| c.is_cell())
            .collect();

        let picked = *rng.choose(&free).ok_or(GridError::NoFreeCell)?;
        self.set(picked, CellMark::Reserved)?;
        Ok(picked)
    }

    /// Logical cells adjacent to `cell` (up to four).
    pub fn neighbors_of(&self, cell: LogicalCell) -> Vec<LogicalCell> {
        let mut out = Vec::with_capacity(4);
        if cell.x > 0 {
            out.push(LogicalCell::new(cell.x - 1, cell.y));
        }
        if cell.x + 1 < self.width {
            out.push(LogicalCell::new(cell.x + 1, cell.y));
        }
        if cell.y > 0 {
            out.push(LogicalCell::new(cell.x, cell.y - 1));
        }
        if cell.y + 1 < self.height {
            out.push(LogicalCell::new(cell.x, cell.y + 1));
        }
        out
    }

    /// Standing interior walls bordering `cell`, tagged by axis.
    pub fn walls_adjacent_to(&self, cell: LogicalCell) -> Vec<WallSlot> {
        let c = cell.to_coord();
        self.neighbors_of(cell)
            .into_iter()
            .filter_map(|n| {
                let pos = Coord::new((c.x + n.to_coord().x) / 2, (c.y + n.to_coord().y) / 2);
                let axis = if n.y == cell.y { WallAxis::Horizontal } else { WallAxis::Vertical };
                self.is_wall(pos).then_some(WallSlot { pos, axis })
            })
            .collect()
    }

    /// Matrix position of the wall slot between two adjacent cells.
    pub fn wall_between(&self, a: LogicalCell, b: LogicalCell) -> Option<Coord> {
        if a.x.abs_diff(b.x) + a.y.abs_diff(b.y) != 1 {
            return None;
        }
        let (ca, cb) = (a.to_coord(), b.to_coord());
        Some(Coord::new((ca.x + cb.x) / 2, (ca.y + cb.y) / 2))
    }

    /// Remove the wall between two adjacent cells.
    pub fn carve_between(&mut self, a: LogicalCell, b: LogicalCell) {
        if let Some(pos) = self.wall_between(a, b) {
            // Adjacent cells always have an in-bounds wall slot.
            let _ = self.set(pos, CellMark::Open);
        }
    }

    /// Number of removed interior wall slots.
    pub fn removed_wall_count(&self) -> usize {
        self.cells
            .iter()
            .enumerate()
            .filter(|(i, m)| {
                let c = Coord::new(*i as i32 % self.matrix_width(), *i as i32 / self.matrix_width());
                c.is_wall_slot() && !self.is_border(c) && **m != CellMark::Wall
            })
            .count()
    }

    /// Logical cells reachable from `from` through open wall slots.
    pub fn reachable_cells(&self, from: LogicalCell) -> usize {
        let mut seen = vec![false; (self.width * self.height) as usize];
        let idx = |c: LogicalCell| (c.y * self.width + c.x) as usize;
        let mut stack = vec![from];
        seen[idx(from)] = true;
        let mut count = 0;
        while let Some(cell) = stack.pop() {
            count += 1;
            for n in self.neighbors_of(cell) {
                let open = self.wall_between(cell, n).is_some_and(|w| !self.is_wall(w));
                if open && !seen[idx(n)] {
                    seen[idx(n)] = true;
                    stack.push(n);
                }
            }
        }
        count
    }

    /// Layout digest over size and standing walls.
    pub fn digest(&self) -> LayoutHash {
        layout_digest(self.width, self.height, &self.wall_pairs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_layout() {
        let grid = Grid::new(6, 4);
        assert_eq!(grid.matrix_width(), 13);
        assert_eq!(grid.matrix_height(), 9);

        for y in 0..grid.matrix_height() {
            for x in 0..grid.matrix_width() {
                let c = Coord::new(x, y);
                let expected = if c.is_cell() { CellMark::Open } else { CellMark::Wall };
                assert_eq!(grid.get(c), Some(expected));
            }
        }
        assert_eq!(grid.removed_wall_count(), 0);
    }

    #[test]
    fn test_query_out_of_bounds() {
        let grid = Grid::new(6, 6);
        assert_eq!(grid.query(-1, 0), None);
        assert_eq!(grid.query(13, 0), None);
        assert!(grid.is_wall(Coord::new(99, 99)));
    }

    #[test]
    fn test_mark_region_rejects_out_of_bounds() {
        let mut grid = Grid::new(6, 6);
        let coords = [Coord::new(1, 1), Coord::new(50, 1)];
        assert_eq!(
            grid.mark_region(&coords, CellMark::Reserved),
            Err(GridError::OutOfBounds { x: 50, y: 1 })
        );
        // Nothing was written
        assert_eq!(grid.get(Coord::new(1, 1)), Some(CellMark::Open));
    }

    #[test]
    fn test_logical_mapping() {
        let cell = LogicalCell::new(5, 5);
        assert_eq!(cell.to_coord(), Coord::new(11, 11));
        assert_eq!(LogicalCell::from_coord(Coord::new(11, 11)), Some(cell));
        assert_eq!(LogicalCell::from_coord(Coord::new(2, 1)), None);
    }

    #[test]
    fn test_neighbors_at_corner_and_center() {
        let grid = Grid::new(6, 6);
        assert_eq!(grid.neighbors_of(LogicalCell::new(0, 0)).len(), 2);
        assert_eq!(grid.neighbors_of(LogicalCell::new(5, 0)).len(), 2);
        assert_eq!(grid.neighbors_of(LogicalCell::new(2, 0)).len(), 3);
        assert_eq!(grid.neighbors_of(LogicalCell::new(2, 2)).len(), 4);
    }

    #[test]
    fn test_walls_adjacent_axis_and_bordering() {
        let grid = Grid::new(6, 6);
        let cell = LogicalCell::new(2, 2);
        let walls = grid.walls_adjacent_to(cell);
        assert_eq!(walls.len(), 4);

        for wall in walls {
            let (a, b) = wall.bordering();
            assert!(a == cell || b == cell);
            match wall.axis {
                WallAxis::Horizontal => assert_eq!(a.y, b.y),
                WallAxis::Vertical => assert_eq!(a.x, b.x),
            }
        }
    }

    #[test]
    fn test_carve_removes_adjacent_wall() {
        let mut grid = Grid::new(6, 6);
        let a = LogicalCell::new(0, 0);
        let b = LogicalCell::new(1, 0);
        grid.carve_between(a, b);

        assert_eq!(grid.query(2, 1), Some(CellMark::Open));
        assert_eq!(grid.walls_adjacent_to(a).len(), 1);
        assert_eq!(grid.removed_wall_count(), 1);
        assert_eq!(grid.reachable_cells(a), 2);
    }

    #[test]
    fn test_wall_between_requires_adjacency() {
        let grid = Grid::new(6, 6);
        assert!(grid.wall_between(LogicalCell::new(0, 0), LogicalCell::new(2, 0)).is_none());
        assert!(grid.wall_between(LogicalCell::new(0, 0), LogicalCell::new(1, 1)).is_none());
    }

    #[test]
    fn test_find_random_free_cell_distinct_then_exhausted() {
        let mut grid = Grid::new(6, 6);
        let mut rng = MazeRng::from_seed(7);
        let mut seen = std::collections::BTreeSet::new();

        for _ in 0..36 {
            let c = grid.find_random_free_cell(&mut rng).unwrap();
            assert!(c.is_cell());
            assert_eq!(grid.get(c), Some(CellMark::Reserved));
            assert!(seen.insert(c), "cell {:?} reserved twice", c);
        }

        assert_eq!(grid.find_random_free_cell(&mut rng), Err(GridError::NoFreeCell));
    }

    #[test]
    fn test_find_random_free_cell_skips_endpoints() {
        let mut grid = Grid::new(6, 6);
        grid.mark_endpoints();
        let mut rng = MazeRng::from_seed(99);

        for _ in 0..34 {
            let c = grid.find_random_free_cell(&mut rng).unwrap();
            assert_ne!(c, grid.start());
            assert_ne!(c, grid.exit());
        }
        assert!(grid.find_random_free_cell(&mut rng).is_err());
    }

    #[test]
    fn test_clear_markers_keeps_walls() {
        let mut grid = Grid::new(6, 6);
        grid.mark_endpoints();
        grid.set(Coord::new(3, 3), CellMark::Solution).unwrap();
        let walls_before = grid.wall_pairs();

        grid.clear_markers();
        assert_eq!(grid.get(grid.start()), Some(CellMark::Open));
        assert_eq!(grid.get(Coord::new(3, 3)), Some(CellMark::Open));
        assert_eq!(grid.wall_pairs(), walls_before);
    }

    #[test]
    fn test_breachable_walls() {
        let grid = Grid::new(6, 6);
        assert!(grid.is_breachable(Coord::new(2, 1)));
        assert!(grid.is_breachable(Coord::new(1, 2)));
        // Posts are walls but not slots
        assert!(grid.is_wall(Coord::new(2, 2)));
        assert!(!grid.is_breachable(Coord::new(2, 2)));
        assert!(!grid.is_breachable(Coord::new(0, 1)));
        assert!(!grid.is_breachable(Coord::new(12, 5)));
        assert!(!grid.is_breachable(Coord::new(1, 1)));
        assert!(!grid.is_breachable(Coord::new(40, 2)));
    }

    #[test]
    fn test_cell_mark_values() {
        for mark in [
            CellMark::Open,
            CellMark::Wall,
            CellMark::Solution,
            CellMark::Start,
            CellMark::End,
            CellMark::Reserved,
        ] {
            assert_eq!(CellMark::from_value(mark.value()), Some(mark));
        }
        assert_eq!(CellMark::from_value(7), None);
    }
}
