//! Player Input
//!
//! An [`Intent`] is what a player wants to do this tick. Where intents come
//! from is behind [`IntentSource`]; the crate ships a path-following
//! [`Autopilot`] for headless play and [`Idle`] for a player that stands
//! still.

use serde::{Serialize, Deserialize};

use crate::game::state::{PixelPos, PlayerState};
use crate::maze::grid::{Coord, Grid};
use crate::maze::solver::{astar_with, Heuristic};

// =============================================================================
// INTENT
// =============================================================================

/// Desired movement for one tick.
///
/// The delta is a wish; movement clamps each axis to the player's step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Intent {
    /// Horizontal delta in pixels.
    pub dx: i32,
    /// Vertical delta in pixels.
    pub dy: i32,
    /// Knock down a blocking wall.
    pub destroy: bool,
}

impl Intent {
    /// Do nothing.
    pub const IDLE: Intent = Intent { dx: 0, dy: 0, destroy: false };

    /// Move by a delta.
    pub const fn toward(dx: i32, dy: i32) -> Self {
        Self { dx, dy, destroy: false }
    }

    /// Move by a delta, breaching a wall if one blocks.
    pub const fn breaching(dx: i32, dy: i32) -> Self {
        Self { dx, dy, destroy: true }
    }

    /// Move from `from` straight at `to`.
    pub fn between(from: PixelPos, to: PixelPos) -> Self {
        Self::toward(to.x - from.x, to.y - from.y)
    }

    /// No movement requested.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

// =============================================================================
// INTENT SOURCES
// =============================================================================

/// Produces one intent per tick for a player.
pub trait IntentSource: Send {
    /// Next intent, given the player's current view of the maze.
    fn next_intent(&mut self, grid: &Grid, me: &PlayerState) -> Intent;
}

/// Never moves.
#[derive(Clone, Copy, Debug, Default)]
pub struct Idle;

impl IntentSource for Idle {
    fn next_intent(&mut self, _grid: &Grid, _me: &PlayerState) -> Intent {
        Intent::IDLE
    }
}

/// Walks the A* route to the exit, one matrix position at a time.
///
/// Steps are aimed at each position's anchor so the hit box stays centred in
/// the corridor. The route is recomputed whenever the player turns up off it
/// (after a teleport, for instance).
#[derive(Clone, Debug, Default)]
pub struct Autopilot {
    route: Vec<Coord>,
    cursor: usize,
    heuristic: Heuristic,
}

impl Autopilot {
    /// Autopilot using the default heuristic.
    pub fn new() -> Self {
        Self::default()
    }

    /// Autopilot using a specific heuristic.
    pub fn with_heuristic(heuristic: Heuristic) -> Self {
        Self { heuristic, ..Self::default() }
    }

    /// Remaining route positions.
    pub fn remaining(&self) -> &[Coord] {
        self.route.get(self.cursor..).unwrap_or(&[])
    }

    fn on_route(&self, here: Coord) -> bool {
        let current = self.route.get(self.cursor) == Some(&here);
        let previous = self.cursor > 0 && self.route.get(self.cursor - 1) == Some(&here);
        current || previous
    }

    fn replan(&mut self, grid: &Grid, here: Coord) {
        self.route = astar_with(grid, here, grid.exit(), self.heuristic).unwrap_or_default();
        self.cursor = 0;
    }
}

impl IntentSource for Autopilot {
    fn next_intent(&mut self, grid: &Grid, me: &PlayerState) -> Intent {
        if me.finished_at.is_some() {
            return Intent::IDLE;
        }

        let here = me.position.cell();
        if !self.on_route(here) {
            self.replan(grid, here);
        }

        while let Some(&target) = self.route.get(self.cursor) {
            let anchor = PixelPos::anchor_of(target);
            if me.position != anchor {
                return Intent::between(me.position, anchor);
            }
            self.cursor += 1;
        }
        Intent::IDLE
    }
}
