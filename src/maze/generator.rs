//! Perfect Maze Generation
//!
//! Two interchangeable carving algorithms. Both take an un-carved
//! [`Grid`] and leave a spanning tree over all logical cells: exactly
//! `width*height - 1` walls removed, every cell reachable, no cycles.
//!
//! Tie-breaking is uniform-random through [`MazeRng`]. With an
//! entropy-seeded RNG the output is non-deterministic between runs.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::core::rng::MazeRng;
use crate::maze::grid::{Grid, LogicalCell, WallSlot};

/// Carving algorithm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// Randomized depth-first search (recursive backtracker).
    /// Long, winding corridors.
    #[default]
    #[serde(rename = "DFS")]
    Dfs,
    /// Randomized Prim. Short, evenly branching corridors.
    Prim,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Dfs => write!(f, "DFS"),
            Algorithm::Prim => write!(f, "Prim"),
        }
    }
}

/// Unknown algorithm name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown algorithm '{0}' (expected DFS or Prim)")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dfs" => Ok(Algorithm::Dfs),
            "prim" => Ok(Algorithm::Prim),
            _ => Err(UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Build a new `width x height` perfect maze.
pub fn generate(width: u32, height: u32, algorithm: Algorithm, rng: &mut MazeRng) -> Grid {
    let mut grid = Grid::new(width, height);
    carve(&mut grid, algorithm, rng);
    grid
}

/// Carve a spanning tree into an un-carved grid.
pub fn carve(grid: &mut Grid, algorithm: Algorithm, rng: &mut MazeRng) {
    if grid.width() == 0 || grid.height() == 0 {
        return;
    }
    match algorithm {
        Algorithm::Dfs => carve_dfs(grid, rng),
        Algorithm::Prim => carve_prim(grid, rng),
    }
}

/// Per-run visited flags, dropped once carving finishes.
struct Visited {
    width: u32,
    flags: Vec<bool>,
}

impl Visited {
    fn new(grid: &Grid) -> Self {
        Self {
            width: grid.width(),
            flags: vec![false; (grid.width() * grid.height()) as usize],
        }
    }

    #[inline]
    fn get(&self, cell: LogicalCell) -> bool {
        self.flags[(cell.y * self.width + cell.x) as usize]
    }

    #[inline]
    fn mark(&mut self, cell: LogicalCell) {
        self.flags[(cell.y * self.width + cell.x) as usize] = true;
    }
}

/// Recursive backtracker with an explicit stack, starting at `(0, 0)`.
fn carve_dfs(grid: &mut Grid, rng: &mut MazeRng) {
    let mut visited = Visited::new(grid);
    let start = LogicalCell::new(0, 0);
    visited.mark(start);
    let mut stack = vec![start];

    while let Some(&current) = stack.last() {
        let candidates: Vec<LogicalCell> = grid
            .neighbors_of(current)
            .into_iter()
            .filter(|n| !visited.get(*n))
            .collect();

        match rng.choose(&candidates) {
            Some(&next) => {
                visited.mark(next);
                grid.carve_between(current, next);
                stack.push(next);
            }
            None => {
                stack.pop();
            }
        }
    }
}

/// Randomized Prim over a frontier of walls.
fn carve_prim(grid: &mut Grid, rng: &mut MazeRng) {
    let mut visited = Visited::new(grid);
    let start = LogicalCell::new(
        rng.next_index(grid.width() as usize) as u32,
        rng.next_index(grid.height() as usize) as u32,
    );
    visited.mark(start);
    let mut frontier: Vec<WallSlot> = grid.walls_adjacent_to(start);

    while !frontier.is_empty() {
        // The chosen wall leaves the frontier whatever happens next.
        let wall = frontier.swap_remove(rng.next_index(frontier.len()));
        let (a, b) = wall.bordering();

        let fresh = match (visited.get(a), visited.get(b)) {
            (true, false) => b,
            (false, true) => a,
            _ => continue,
        };

        grid.carve_between(a, b);
        visited.mark(fresh);
        frontier.extend(grid.walls_adjacent_to(fresh));
    }
}
