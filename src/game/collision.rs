//! Collision Detection
//!
//! Pixel-space movement against the wall matrix. Every matrix position is a
//! `CELL_SIZE` square; a player is a `PLAYER_SIZE` square. Overlap is strict
//! intersection, so touching edges do not collide.

use crate::game::input::Intent;
use crate::game::state::{PixelPos, PlayerState, CELL_SIZE, PLAYER_SIZE};
use crate::maze::grid::{Coord, Grid};

/// Axis-aligned rectangle in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub w: i32,
    /// Height.
    pub h: i32,
}

impl Rect {
    /// Hit box of a player at `pos`.
    pub fn player(pos: PixelPos) -> Self {
        Self { x: pos.x, y: pos.y, w: PLAYER_SIZE, h: PLAYER_SIZE }
    }

    /// Area of one matrix position.
    pub fn cell(c: Coord) -> Self {
        Self { x: c.x * CELL_SIZE, y: c.y * CELL_SIZE, w: CELL_SIZE, h: CELL_SIZE }
    }

    /// Strict intersection.
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// What happened to one movement step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Position changed.
    pub moved: bool,
    /// Wall that stopped the step, preferring one that can be breached.
    pub blocked_by: Option<Coord>,
    /// Hit box overlaps the exit cell after the step.
    pub reached_exit: bool,
}

/// Standing walls under a hit box at `pos`.
pub fn overlapping_walls(grid: &Grid, pos: PixelPos) -> Vec<Coord> {
    let x0 = pos.x.div_euclid(CELL_SIZE);
    let x1 = (pos.x + PLAYER_SIZE - 1).div_euclid(CELL_SIZE);
    let y0 = pos.y.div_euclid(CELL_SIZE);
    let y1 = (pos.y + PLAYER_SIZE - 1).div_euclid(CELL_SIZE);

    let mut walls = Vec::new();
    for y in y0..=y1 {
        for x in x0..=x1 {
            let c = Coord::new(x, y);
            if grid.is_wall(c) {
                walls.push(c);
            }
        }
    }
    walls
}

/// Is the hit box strictly inside the board?
fn within_board(grid: &Grid, pos: PixelPos) -> bool {
    let right = grid.matrix_width() * CELL_SIZE;
    let bottom = grid.matrix_height() * CELL_SIZE;
    pos.x > 0 && pos.y > 0 && pos.x + PLAYER_SIZE < right && pos.y + PLAYER_SIZE < bottom
}

/// Move a player by one step of `intent`.
///
/// Each axis moves by the intent delta clamped to the player's step. A step
/// that leaves the board or overlaps a wall is reverted entirely.
pub fn step_player(grid: &Grid, player: &mut PlayerState, intent: Intent) -> StepOutcome {
    let step = player.step();
    let old = player.position;
    let next = PixelPos::new(
        old.x + intent.dx.clamp(-step, step),
        old.y + intent.dy.clamp(-step, step),
    );

    let mut outcome = StepOutcome::default();
    if next != old && within_board(grid, next) {
        let walls = overlapping_walls(grid, next);
        if walls.is_empty() {
            player.position = next;
            outcome.moved = true;
        } else {
            outcome.blocked_by = walls
                .iter()
                .copied()
                .find(|w| grid.is_breachable(*w))
                .or_else(|| walls.first().copied());
        }
    }

    outcome.reached_exit = Rect::player(player.position).overlaps(&Rect::cell(grid.exit()));
    outcome
}
