//! Session State
//!
//! The authoritative per-match state: player positions and speeds, wall
//! breaches, remaining bonuses and completion times. A networked session
//! owns one of these on the server; local play owns one directly.

use serde::{Serialize, Deserialize};

use crate::core::rng::MazeRng;
use crate::game::bonus::{spawn_bonuses, Bonus};
use crate::maze::grid::{CellMark, Coord, Grid, GridError};

// =============================================================================
// GEOMETRY CONSTANTS
// =============================================================================

/// Side of one matrix position, in pixels.
pub const CELL_SIZE: i32 = 20;

/// Side of a player's square hit box, in pixels.
pub const PLAYER_SIZE: i32 = 10;

/// Offset of a player's top-left corner inside a cell.
pub const CELL_INSET: i32 = (CELL_SIZE - PLAYER_SIZE) / 2;

/// Wall breaches allowed per player.
pub const MAX_WALL_BREACHES: u8 = 3;

// =============================================================================
// PLAYER ID
// =============================================================================

/// Player slot within a session (0 = blue, 1 = red).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// First player.
    pub const BLUE: PlayerId = PlayerId(0);
    /// Second player.
    pub const RED: PlayerId = PlayerId(1);

    /// Slot index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The other slot of a two-player session.
    #[inline]
    pub fn other(self) -> PlayerId {
        PlayerId(1 - self.0.min(1))
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "BLUE",
            _ => "RED",
        }
    }
}

// =============================================================================
// PIXEL POSITION
// =============================================================================

/// Top-left corner of a player's hit box, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPos {
    /// Horizontal pixel.
    pub x: i32,
    /// Vertical pixel.
    pub y: i32,
}

impl PixelPos {
    /// Create a position.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Where a player stands when placed in a matrix cell.
    pub fn anchor_of(cell: Coord) -> Self {
        Self::new(cell.x * CELL_SIZE + CELL_INSET, cell.y * CELL_SIZE + CELL_INSET)
    }

    /// Matrix position under the centre of the hit box.
    pub fn cell(self) -> Coord {
        let half = PLAYER_SIZE / 2;
        Coord::new((self.x + half).div_euclid(CELL_SIZE), (self.y + half).div_euclid(CELL_SIZE))
    }
}

// =============================================================================
// PLAYER STATE
// =============================================================================

/// State of a single player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Slot in the session.
    pub id: PlayerId,

    /// Hit box top-left corner.
    pub position: PixelPos,

    /// Speed multiplier; steps are `max(1, trunc(speed))` pixels.
    pub speed: f32,

    /// Walls this player has breached.
    pub walls_destroyed: u8,

    /// Seconds from match start to reaching the exit.
    pub finished_at: Option<f64>,

    /// Still playing (false once the player quits).
    pub running: bool,
}

impl PlayerState {
    /// Create a player at the entrance of `grid`.
    pub fn new(id: PlayerId, speed: f32, grid: &Grid) -> Self {
        Self {
            id,
            position: PixelPos::anchor_of(grid.start()),
            speed,
            walls_destroyed: 0,
            finished_at: None,
            running: true,
        }
    }

    /// Pixels moved per axis per step.
    #[inline]
    pub fn step(&self) -> i32 {
        (self.speed as i32).max(1)
    }

    /// May this player breach another wall?
    #[inline]
    pub fn can_breach(&self) -> bool {
        self.walls_destroyed < MAX_WALL_BREACHES
    }

    /// Stamp the completion time. Only the first stamp counts.
    pub fn record_finish(&mut self, time: f64) -> bool {
        if self.finished_at.is_some() {
            return false;
        }
        self.finished_at = Some(time);
        true
    }
}

// =============================================================================
// OUTCOME
// =============================================================================

/// Final result of a match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Completion time per player slot.
    pub times: Vec<Option<f64>>,
    /// Fastest finisher (ties go to the lower slot).
    pub winner: Option<PlayerId>,
}

impl MatchOutcome {
    /// Build from per-player completion times.
    pub fn from_times(times: Vec<Option<f64>>) -> Self {
        let winner = times
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.map(|t| (i, t)))
            .fold(None, |best: Option<(usize, f64)>, (i, t)| match best {
                Some((_, bt)) if bt <= t => best,
                _ => Some((i, t)),
            })
            .map(|(i, _)| PlayerId(i as u8));
        Self { times, winner }
    }
}

// =============================================================================
// SESSION STATE
// =============================================================================

/// Authoritative state of one match.
#[derive(Clone, Debug)]
pub struct SessionState {
    /// Maze with start/end markers and bonus reservations.
    pub grid: Grid,

    /// One or two players, indexed by [`PlayerId`].
    pub players: Vec<PlayerState>,

    /// Bonuses not yet collected.
    pub bonuses: Vec<Bonus>,

    /// Bonuses and wall breaching are enabled.
    pub bonuses_enabled: bool,

    /// Most recent wall breach.
    pub last_destroyed_wall: Option<Coord>,

    /// Every wall breached so far, in order.
    pub destroyed_walls: Vec<Coord>,

    /// RNG for teleport targets.
    pub(crate) rng: MazeRng,
}

impl SessionState {
    /// Wrap a carved grid into a fresh match.
    ///
    /// Drops any overlay markers, marks the entrance and exit, then
    /// reserves bonus cells when enabled. Bonuses may therefore lie on the
    /// solution path whether or not it is drawn.
    pub fn new(
        mut grid: Grid,
        player_count: usize,
        speed: f32,
        bonuses_enabled: bool,
        mut rng: MazeRng,
    ) -> Result<Self, GridError> {
        grid.clear_markers();
        grid.mark_endpoints();
        let bonuses = if bonuses_enabled {
            spawn_bonuses(&mut grid, &mut rng)?
        } else {
            Vec::new()
        };

        let players = (0..player_count.clamp(1, 2))
            .map(|i| PlayerState::new(PlayerId(i as u8), speed, &grid))
            .collect();

        Ok(Self {
            grid,
            players,
            bonuses,
            bonuses_enabled,
            last_destroyed_wall: None,
            destroyed_walls: Vec::new(),
            rng,
        })
    }

    /// Get a player.
    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.get(id.index())
    }

    /// Get a player mutably.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut PlayerState> {
        self.players.get_mut(id.index())
    }

    /// Apply a wall breach by `id` at `wall`.
    ///
    /// Accepted only with bonuses enabled, below the breach cap, for a
    /// standing non-border wall.
    pub fn destroy_wall(&mut self, id: PlayerId, wall: Coord) -> bool {
        if !self.bonuses_enabled || !self.grid.is_breachable(wall) {
            return false;
        }
        let Some(player) = self.players.get_mut(id.index()) else {
            return false;
        };
        if !player.can_breach() {
            return false;
        }

        if self.grid.set(wall, CellMark::Open).is_err() {
            return false;
        }
        player.walls_destroyed += 1;
        self.last_destroyed_wall = Some(wall);
        self.destroyed_walls.push(wall);
        true
    }

    /// Stamp a completion time for `id` (first stamp wins).
    pub fn record_finish(&mut self, id: PlayerId, time: f64) -> bool {
        self.player_mut(id).is_some_and(|p| p.record_finish(time))
    }

    /// Remaining bonus positions as wire pairs.
    pub fn bonus_pairs(&self) -> Vec<[i32; 2]> {
        self.bonuses.iter().map(|b| b.pos.to_pair()).collect()
    }

    /// Breached walls as wire pairs.
    pub fn destroyed_wall_pairs(&self) -> Vec<[i32; 2]> {
        self.destroyed_walls.iter().map(|c| c.to_pair()).collect()
    }

    /// Has every player reached the exit?
    pub fn all_finished(&self) -> bool {
        self.players.iter().all(|p| p.finished_at.is_some())
    }

    /// Has any player quit?
    pub fn anyone_quit(&self) -> bool {
        self.players.iter().any(|p| !p.running)
    }

    /// Times and winner so far.
    pub fn outcome(&self) -> MatchOutcome {
        MatchOutcome::from_times(self.players.iter().map(|p| p.finished_at).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::generator::{generate, Algorithm};

    fn test_state(bonuses: bool) -> SessionState {
        let mut rng = MazeRng::from_seed(3);
        let grid = generate(8, 8, Algorithm::Dfs, &mut rng);
        SessionState::new(grid, 2, 2.0, bonuses, rng).unwrap()
    }

    #[test]
    fn test_player_spawns_at_entrance() {
        let state = test_state(false);
        for player in &state.players {
            assert_eq!(player.position, PixelPos::new(25, 25));
            assert_eq!(player.position.cell(), Coord::new(1, 1));
            assert!(player.running);
        }
        assert_eq!(state.grid.get(state.grid.start()), Some(CellMark::Start));
        assert_eq!(state.grid.get(state.grid.exit()), Some(CellMark::End));
    }

    #[test]
    fn test_solution_overlay_does_not_shape_bonuses() {
        let mut rng = MazeRng::from_seed(11);
        let plain = generate(8, 8, Algorithm::Prim, &mut rng);
        let mut painted = plain.clone();
        crate::maze::solver::mark_solution(&mut painted).unwrap();

        let a = SessionState::new(plain, 2, 2.0, true, MazeRng::from_seed(5)).unwrap();
        let b = SessionState::new(painted, 2, 2.0, true, MazeRng::from_seed(5)).unwrap();
        assert!(b.grid.positions_of(CellMark::Solution).is_empty());
        assert_eq!(a.bonuses, b.bonuses);
        assert_eq!(a.grid.wall_pairs(), b.grid.wall_pairs());
    }

    #[test]
    fn test_player_ids() {
        assert_eq!(PlayerId::BLUE.other(), PlayerId::RED);
        assert_eq!(PlayerId::RED.other(), PlayerId::BLUE);
        assert_eq!(PlayerId::RED.name(), "RED");
    }

    #[test]
    fn test_step_never_below_one() {
        let grid = Grid::new(6, 6);
        let mut player = PlayerState::new(PlayerId::BLUE, 2.0, &grid);
        assert_eq!(player.step(), 2);
        player.speed = 0.7 * 0.7;
        assert_eq!(player.step(), 1);
        player.speed = 2.0 * 1.3;
        assert_eq!(player.step(), 2);
    }

    #[test]
    fn test_finish_time_is_monotonic() {
        let mut state = test_state(false);
        assert!(state.record_finish(PlayerId::BLUE, 12.3));
        assert!(!state.record_finish(PlayerId::BLUE, 20.0));
        assert_eq!(state.players[0].finished_at, Some(12.3));
        assert!(!state.all_finished());

        assert!(state.record_finish(PlayerId::RED, 15.0));
        assert!(state.all_finished());
    }

    #[test]
    fn test_outcome_winner() {
        let outcome = MatchOutcome::from_times(vec![Some(14.0), Some(9.5)]);
        assert_eq!(outcome.winner, Some(PlayerId::RED));

        let tie = MatchOutcome::from_times(vec![Some(9.5), Some(9.5)]);
        assert_eq!(tie.winner, Some(PlayerId::BLUE));

        let nobody = MatchOutcome::from_times(vec![None, None]);
        assert_eq!(nobody.winner, None);
    }

    #[test]
    fn test_destroy_wall_requires_bonuses() {
        let mut state = test_state(false);
        let wall = Coord::new(4, 3);
        let standing = state.grid.is_wall(wall);
        assert!(!state.destroy_wall(PlayerId::BLUE, wall));
        assert_eq!(state.grid.is_wall(wall), standing);
    }

    #[test]
    fn test_destroy_wall_cap_and_border() {
        let mut state = test_state(true);
        let interior: Vec<Coord> = state
            .grid
            .positions_of(CellMark::Wall)
            .into_iter()
            .filter(|c| !state.grid.is_border(*c))
            .take(4)
            .collect();

        assert!(!state.destroy_wall(PlayerId::BLUE, Coord::new(0, 0)));
        for wall in &interior[..3] {
            assert!(state.destroy_wall(PlayerId::BLUE, *wall));
        }
        assert!(!state.destroy_wall(PlayerId::BLUE, interior[3]));
        assert!(state.destroy_wall(PlayerId::RED, interior[3]));

        // Already open
        assert!(!state.destroy_wall(PlayerId::RED, interior[0]));
        assert_eq!(state.last_destroyed_wall, Some(interior[3]));
        assert_eq!(state.destroyed_walls.len(), 4);
        assert_eq!(state.players[0].walls_destroyed, 3);
    }

    #[test]
    fn test_single_player_session() {
        let mut rng = MazeRng::from_seed(9);
        let grid = generate(6, 6, Algorithm::Prim, &mut rng);
        let mut state = SessionState::new(grid, 1, 3.0, false, rng).unwrap();
        assert_eq!(state.players.len(), 1);
        assert!(state.player(PlayerId::RED).is_none());

        state.record_finish(PlayerId::BLUE, 4.0);
        assert!(state.all_finished());
        assert_eq!(state.outcome().winner, Some(PlayerId::BLUE));
    }
}
