//! Maze Module
//!
//! Pure grid model, generation, solving and text persistence. Nothing in
//! here knows about players, pixels or the network.
//!
//! ## Module Structure
//!
//! - `grid`: two-resolution cell/wall matrix
//! - `generator`: randomized DFS and Prim carving
//! - `solver`: A* over the matrix
//! - `text`: save/load in the `+---+` text format

pub mod grid;
pub mod generator;
pub mod solver;
pub mod text;

// Re-export key types
pub use grid::{CellMark, Coord, Grid, GridError, LogicalCell, WallAxis, WallSlot};
pub use generator::{Algorithm, generate};
pub use solver::{Heuristic, astar, astar_with, mark_solution};
pub use text::MazeFileError;
