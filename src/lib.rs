//! # Maze Duel
//!
//! Perfect-maze generation, A* solving and a two-player race over
//! WebSocket with a server that owns the match state.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MAZE DUEL                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  config.rs       - Maze, server and client settings          │
//! │                                                              │
//! │  core/           - Shared primitives                         │
//! │  ├── rng.rs      - Xorshift128+ PRNG                         │
//! │  └── hash.rs     - Maze layout digest                        │
//! │                                                              │
//! │  maze/           - Grid model (no players, no pixels)        │
//! │  ├── grid.rs     - Cell/wall matrix and reservations         │
//! │  ├── generator.rs- Randomized DFS and Prim                   │
//! │  ├── solver.rs   - A* search                                 │
//! │  └── text.rs     - Text save/load                            │
//! │                                                              │
//! │  game/           - Players inside a maze                     │
//! │  ├── state.rs    - Session and player state                  │
//! │  ├── input.rs    - Intents, autopilot                        │
//! │  ├── collision.rs- Pixel movement against walls              │
//! │  ├── bonus.rs    - Bonus layout and effects                  │
//! │  ├── tick.rs     - Local match loop                          │
//! │  └── events.rs   - Tick side effects                         │
//! │                                                              │
//! │  network/        - Sessions over WebSocket                   │
//! │  ├── protocol.rs - Message types                             │
//! │  ├── session.rs  - Authoritative match session               │
//! │  ├── server.rs   - Accept loop and session workers           │
//! │  └── client.rs   - Prediction and reconciliation             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authority
//!
//! In a network session the server decides wall breaches, bonus pickups
//! and the winner. Positions and completion times are taken from the
//! clients as reported; a completion time, once reported, never changes.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod maze;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use config::{ClientConfig, ConfigError, MazeConfig, ServerConfig};
pub use core::rng::MazeRng;
pub use maze::{Algorithm, CellMark, Coord, Grid, Heuristic};
pub use game::state::{MatchOutcome, PlayerId, SessionState};
pub use network::{GameClient, GameServer};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tick rate (Hz) of local matches and of the client send loop
pub const TICK_RATE: u32 = 60;
