//! Game Logic Module
//!
//! Everything that happens to players inside a maze, independent of how
//! the match is hosted.
//!
//! ## Module Structure
//!
//! - `state`: session state, players, outcome
//! - `input`: intents and where they come from
//! - `collision`: pixel movement against walls
//! - `bonus`: bonus layout, reservation and effects
//! - `tick`: local simulation loop
//! - `events`: side effects reported by a tick

pub mod state;
pub mod input;
pub mod collision;
pub mod bonus;
pub mod tick;
pub mod events;

// Re-export key types
pub use state::{
    MatchOutcome, PixelPos, PlayerId, PlayerState, SessionState,
    CELL_SIZE, MAX_WALL_BREACHES, PLAYER_SIZE,
};
pub use input::{Autopilot, Idle, Intent, IntentSource};
pub use collision::{step_player, StepOutcome};
pub use bonus::{Bonus, BonusKind};
pub use tick::{TickResult, run_local};
pub use events::GameEvent;
