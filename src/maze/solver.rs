//! A* Shortest Path
//!
//! Searches matrix positions with 4-directional movement and unit step
//! cost. Any non-wall position is walkable, so paths step through removed
//! wall slots between cells.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::maze::grid::{CellMark, Coord, Grid};

/// Heuristic used to order the open set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Heuristic {
    /// Admissible for unit-cost 4-connected grids; paths are optimal.
    #[default]
    Manhattan,
    /// Squared Euclidean distance. Inadmissible, kept for parity with
    /// older mazes' overlays; in a perfect maze the path is unique anyway.
    SquaredEuclidean,
}

impl Heuristic {
    #[inline]
    fn estimate(self, from: Coord, to: Coord) -> u64 {
        let dx = from.x.abs_diff(to.x) as u64;
        let dy = from.y.abs_diff(to.y) as u64;
        match self {
            Heuristic::Manhattan => dx + dy,
            Heuristic::SquaredEuclidean => dx * dx + dy * dy,
        }
    }
}

/// Search node, indexed by matrix position.
#[derive(Clone, Copy, Debug)]
struct PathNode {
    g: u64,
    h: u64,
    parent: Option<usize>,
}

impl PathNode {
    #[inline]
    fn f(&self) -> u64 {
        self.g + self.h
    }
}

/// Open-set entry. Stale entries (superseded by a decrease-key) are
/// skipped when popped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenEntry {
    f: u64,
    g: u64,
    index: usize,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on f
        other.f.cmp(&self.f).then_with(|| self.index.cmp(&other.index))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a path from `start` to `end` (inclusive) with the default heuristic.
///
/// Returns `None` when `end` is unreachable or either endpoint is a wall
/// or outside the grid.
pub fn astar(grid: &Grid, start: Coord, end: Coord) -> Option<Vec<Coord>> {
    astar_with(grid, start, end, Heuristic::default())
}

/// Find a path from `start` to `end` using the given heuristic.
pub fn astar_with(grid: &Grid, start: Coord, end: Coord, heuristic: Heuristic) -> Option<Vec<Coord>> {
    if grid.is_wall(start) || grid.is_wall(end) {
        return None;
    }

    let width = grid.matrix_width() as usize;
    let to_index = |c: Coord| c.y as usize * width + c.x as usize;
    let to_coord = |i: usize| Coord::new((i % width) as i32, (i / width) as i32);

    let total = width * grid.matrix_height() as usize;
    let mut nodes: Vec<Option<PathNode>> = vec![None; total];
    let mut closed = vec![false; total];
    let mut open = BinaryHeap::new();

    let start_index = to_index(start);
    let end_index = to_index(end);
    let start_node = PathNode { g: 0, h: heuristic.estimate(start, end), parent: None };
    nodes[start_index] = Some(start_node);
    open.push(OpenEntry { f: start_node.f(), g: 0, index: start_index });

    while let Some(entry) = open.pop() {
        if closed[entry.index] {
            continue;
        }
        let current = match nodes[entry.index] {
            Some(node) if node.g == entry.g => node,
            _ => continue,
        };

        if entry.index == end_index {
            return Some(reconstruct(&nodes, end_index, to_coord));
        }
        closed[entry.index] = true;

        for neighbor in to_coord(entry.index).orthogonal() {
            if grid.is_wall(neighbor) {
                continue;
            }
            let ni = to_index(neighbor);
            if closed[ni] {
                continue;
            }

            let tentative_g = current.g + 1;
            match nodes[ni].as_mut() {
                Some(known) if tentative_g >= known.g => {}
                Some(known) => {
                    // Decrease-key: update cost and parent in place
                    known.g = tentative_g;
                    known.parent = Some(entry.index);
                    open.push(OpenEntry { f: known.f(), g: tentative_g, index: ni });
                }
                None => {
                    let node = PathNode {
                        g: tentative_g,
                        h: heuristic.estimate(neighbor, end),
                        parent: Some(entry.index),
                    };
                    nodes[ni] = Some(node);
                    open.push(OpenEntry { f: node.f(), g: tentative_g, index: ni });
                }
            }
        }
    }

    None
}

fn reconstruct(
    nodes: &[Option<PathNode>],
    end_index: usize,
    to_coord: impl Fn(usize) -> Coord,
) -> Vec<Coord> {
    let mut path = Vec::new();
    let mut cursor = Some(end_index);
    while let Some(index) = cursor {
        path.push(to_coord(index));
        cursor = nodes[index].and_then(|n| n.parent);
    }
    path.reverse();
    path
}

/// Solve entrance-to-exit and paint the path as [`CellMark::Solution`].
///
/// Returns the path length in positions, or `None` if there is no path.
pub fn mark_solution(grid: &mut Grid) -> Option<usize> {
    let path = astar(grid, grid.start(), grid.exit())?;
    for c in &path {
        // Every path position came from the grid itself.
        let _ = grid.set(*c, CellMark::Solution);
    }
    Some(path.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::MazeRng;
    use crate::maze::generator::{generate, Algorithm};
    use crate::maze::grid::LogicalCell;
    use proptest::prelude::*;

    fn assert_valid_path(grid: &Grid, path: &[Coord], start: Coord, end: Coord) {
        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&end));
        assert!(path.len() as u32 - 1 >= start.manhattan(end));
        for pair in path.windows(2) {
            assert_eq!(pair[0].manhattan(pair[1]), 1);
            assert!(!grid.is_wall(pair[1]));
        }
    }

    #[test]
    fn test_dfs_6x6_end_to_end() {
        let mut rng = MazeRng::from_entropy();
        let grid = generate(6, 6, Algorithm::Dfs, &mut rng);
        let path = astar(&grid, grid.start(), grid.exit()).unwrap();

        assert_eq!(path[0], Coord::new(1, 1));
        assert_eq!(*path.last().unwrap(), Coord::new(11, 11));
        for c in &path[1..path.len() - 1] {
            assert_eq!(grid.get(*c), Some(CellMark::Open));
        }
        assert_valid_path(&grid, &path, grid.start(), grid.exit());
    }

    #[test]
    fn test_open_grid_is_optimal() {
        let mut grid = Grid::new(4, 4);
        grid.fill(CellMark::Open);
        let path = astar(&grid, Coord::new(0, 0), Coord::new(8, 8)).unwrap();
        assert_eq!(path.len(), 17);
    }

    #[test]
    fn test_unreachable_end_returns_none() {
        let mut rng = MazeRng::from_seed(5);
        let mut grid = generate(6, 6, Algorithm::Prim, &mut rng);
        let exit = grid.exit();
        for c in exit.orthogonal() {
            grid.set(c, CellMark::Wall).unwrap();
        }
        assert_eq!(astar(&grid, grid.start(), exit), None);
        assert_eq!(astar_with(&grid, grid.start(), exit, Heuristic::SquaredEuclidean), None);
    }

    #[test]
    fn test_wall_endpoints_return_none() {
        let grid = Grid::new(6, 6);
        assert_eq!(astar(&grid, Coord::new(0, 0), grid.exit()), None);
        assert_eq!(astar(&grid, grid.start(), Coord::new(-3, 2)), None);
    }

    #[test]
    fn test_start_equals_end() {
        let grid = Grid::new(6, 6);
        assert_eq!(astar(&grid, grid.start(), grid.start()), Some(vec![grid.start()]));
    }

    #[test]
    fn test_mark_solution_paints_path() {
        let mut rng = MazeRng::from_seed(11);
        let mut grid = generate(7, 6, Algorithm::Dfs, &mut rng);
        let len = mark_solution(&mut grid).unwrap();

        assert_eq!(grid.positions_of(CellMark::Solution).len(), len);
        assert_eq!(grid.get(grid.start()), Some(CellMark::Solution));
        assert_eq!(grid.get(grid.exit()), Some(CellMark::Solution));
    }

    #[test]
    fn test_heuristics_agree_on_perfect_maze() {
        let mut rng = MazeRng::from_seed(21);
        let grid = generate(15, 11, Algorithm::Prim, &mut rng);
        let a = astar_with(&grid, grid.start(), grid.exit(), Heuristic::Manhattan);
        let b = astar_with(&grid, grid.start(), grid.exit(), Heuristic::SquaredEuclidean);
        assert_eq!(a, b);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_path_is_connected_and_wall_free(
            width in 6u32..=19,
            height in 6u32..=19,
            prim in any::<bool>(),
            seed in any::<u64>(),
            tx in 0u32..6,
            ty in 0u32..6,
        ) {
            let algorithm = if prim { Algorithm::Prim } else { Algorithm::Dfs };
            let grid = generate(width, height, algorithm, &mut MazeRng::from_seed(seed));
            let target = LogicalCell::new(tx, ty).to_coord();
            let path = astar(&grid, grid.start(), target);

            prop_assert!(path.is_some());
            let path = path.unwrap();
            prop_assert_eq!(path[0], grid.start());
            prop_assert_eq!(*path.last().unwrap(), target);
            prop_assert!(path.len() as u32 - 1 >= grid.start().manhattan(target));
            for pair in path.windows(2) {
                prop_assert_eq!(pair[0].manhattan(pair[1]), 1);
                prop_assert!(!grid.is_wall(pair[1]));
            }
        }
    }
}
