//! Core primitives shared by the maze and game layers.

pub mod rng;
pub mod hash;

// Re-export core types
pub use rng::MazeRng;
pub use hash::{LayoutHash, layout_digest};
