//! Bonuses
//!
//! Bonus cells are reserved on the grid when a session starts. The kind of
//! each bonus is not sent over the wire: it follows from its index in the
//! setup list, which is always `⌈(w+h)/2⌉` teleports, then
//! [`SPEED_BONUS_COUNT`] speed-ups, then [`SPEED_BONUS_COUNT`] speed-downs.

use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::core::rng::MazeRng;
use crate::game::state::{PixelPos, PlayerId, SessionState, CELL_SIZE, PLAYER_SIZE};
use crate::maze::grid::{Coord, Grid, GridError};

/// Speed-ups (and, separately, speed-downs) per session.
pub const SPEED_BONUS_COUNT: usize = 4;

/// Speed multiplier of a speed-up bonus.
pub const SPEED_UP_FACTOR: f32 = 1.3;

/// Speed multiplier of a speed-down bonus.
pub const SPEED_DOWN_FACTOR: f32 = 0.7;

/// Bonus effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusKind {
    /// Move to a random free cell.
    Teleport,
    /// Multiply speed by [`SPEED_UP_FACTOR`].
    SpeedUp,
    /// Multiply speed by [`SPEED_DOWN_FACTOR`].
    SpeedDown,
}

/// A bonus lying on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bonus {
    /// Matrix cell it occupies.
    pub pos: Coord,
    /// What it does when collected.
    pub kind: BonusKind,
}

impl Bonus {
    /// Does a player hit box at `player` strictly overlap this bonus cell?
    pub fn touches(&self, player: PixelPos) -> bool {
        let left = self.pos.x * CELL_SIZE;
        let top = self.pos.y * CELL_SIZE;
        player.x < left + CELL_SIZE
            && left < player.x + PLAYER_SIZE
            && player.y < top + CELL_SIZE
            && top < player.y + PLAYER_SIZE
    }
}

/// Number of teleport bonuses for a maze of `width x height` cells.
#[inline]
pub fn teleport_count(width: u32, height: u32) -> usize {
    ((width + height) as usize).div_ceil(2)
}

/// Kinds in setup-list order.
pub fn bonus_layout(width: u32, height: u32) -> Vec<BonusKind> {
    let mut kinds = vec![BonusKind::Teleport; teleport_count(width, height)];
    kinds.extend([BonusKind::SpeedUp; SPEED_BONUS_COUNT]);
    kinds.extend([BonusKind::SpeedDown; SPEED_BONUS_COUNT]);
    kinds
}

/// Reserve one free cell per bonus in [`bonus_layout`] order.
pub fn spawn_bonuses(grid: &mut Grid, rng: &mut MazeRng) -> Result<Vec<Bonus>, GridError> {
    bonus_layout(grid.width(), grid.height())
        .into_iter()
        .map(|kind| Ok(Bonus { pos: grid.find_random_free_cell(rng)?, kind }))
        .collect()
}

/// Rebuild typed bonuses from a setup list.
pub fn bonuses_from_pairs(pairs: &[[i32; 2]], width: u32, height: u32) -> Vec<Bonus> {
    pairs
        .iter()
        .zip(bonus_layout(width, height))
        .map(|(pair, kind)| Bonus { pos: Coord::from_pair(*pair), kind })
        .collect()
}

/// Collect every bonus the player touches and apply its effect.
///
/// Collected bonuses are removed from the session whether or not the
/// effect could be applied.
pub fn collect_bonuses(state: &mut SessionState, id: PlayerId) -> Vec<Bonus> {
    let Some(position) = state.player(id).map(|p| p.position) else {
        return Vec::new();
    };

    let (hit, kept): (Vec<Bonus>, Vec<Bonus>) =
        state.bonuses.iter().partition(|b| b.touches(position));
    state.bonuses = kept;

    for bonus in &hit {
        apply_bonus(state, id, bonus.kind);
    }
    hit
}

fn apply_bonus(state: &mut SessionState, id: PlayerId, kind: BonusKind) {
    let target = match kind {
        BonusKind::Teleport => match state.grid.find_random_free_cell(&mut state.rng) {
            Ok(cell) => Some(cell),
            Err(e) => {
                warn!(player = id.name(), "Teleport failed: {}", e);
                return;
            }
        },
        _ => None,
    };

    let Some(player) = state.player_mut(id) else {
        return;
    };
    match kind {
        BonusKind::SpeedUp => player.speed *= SPEED_UP_FACTOR,
        BonusKind::SpeedDown => player.speed *= SPEED_DOWN_FACTOR,
        BonusKind::Teleport => {
            if let Some(cell) = target {
                player.position = PixelPos::anchor_of(cell);
            }
        }
    }
    debug!(player = id.name(), ?kind, speed = player.speed, "Bonus applied");
}
