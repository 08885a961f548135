//! Match Session Management
//!
//! Server-side owner of one two-player match. Client updates are folded
//! into the authoritative [`SessionState`]; each player then gets a view of
//! the result from their own side.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::MazeConfig;
use crate::core::hash::{layout_digest, short_hex};
use crate::core::rng::MazeRng;
use crate::game::bonus::collect_bonuses;
use crate::game::events::GameEvent;
use crate::game::state::{PixelPos, PlayerId, SessionState};
use crate::game::tick::is_over;
use crate::maze::grid::{Coord, Grid, GridError};
use crate::network::protocol::{
    ClientUpdate, EndReason, MatchEndInfo, ServerUpdate, SetupDescriptor,
};

/// Unique session identifier.
pub type SessionId = [u8; 16];

/// Players per networked session.
pub const SESSION_PLAYERS: usize = 2;

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Not enough free cells for the bonus layout.
    #[error("Could not place bonuses: {0}")]
    Grid(#[from] GridError),

    /// Player slot outside the session.
    #[error("Player not found: {0}")]
    PlayerNotFound(u8),
}

/// A match session.
pub struct MatchSession {
    /// Unique session identifier.
    pub id: SessionId,
    /// Authoritative game state.
    state: SessionState,
    /// Initial player speed.
    speed: u32,
    /// Clients should draw the solution overlay.
    solution: bool,
    /// Setup walls and bonuses, fixed at creation.
    setup_walls: Vec<[i32; 2]>,
    setup_bonuses: Vec<[i32; 2]>,
    /// When the session was created.
    created_at: Instant,
}

impl MatchSession {
    /// Create a session on a carved grid.
    ///
    /// Marks the endpoints and reserves bonuses when enabled. The solution
    /// overlay is only a flag for clients to draw.
    pub fn new(id: SessionId, config: &MazeConfig, grid: Grid, rng: MazeRng) -> Result<Self, SessionError> {
        let state = SessionState::new(grid, SESSION_PLAYERS, config.speed as f32, config.bonuses, rng)?;
        let setup_walls = state.grid.wall_pairs();
        let setup_bonuses = state.bonus_pairs();

        info!(
            session = %uuid::Uuid::from_bytes(id),
            width = state.grid.width(),
            height = state.grid.height(),
            digest = %short_hex(&state.grid.digest()),
            bonuses = setup_bonuses.len(),
            "Session created"
        );

        Ok(Self {
            id,
            state,
            speed: config.speed,
            solution: config.solution,
            setup_walls,
            setup_bonuses,
            created_at: Instant::now(),
        })
    }

    /// Session id as a UUID string.
    pub fn id_string(&self) -> String {
        uuid::Uuid::from_bytes(self.id).to_string()
    }

    /// Authoritative state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Setup descriptor for one player.
    pub fn setup_for(&self, id: PlayerId) -> SetupDescriptor {
        let grid = &self.state.grid;
        SetupDescriptor {
            session_id: self.id_string(),
            player: id.0,
            width: grid.width(),
            height: grid.height(),
            speed: self.speed,
            solution: self.solution,
            walls: self.setup_walls.clone(),
            bonuses: self.setup_bonuses.clone(),
            digest: hex::encode(layout_digest(grid.width(), grid.height(), &self.setup_walls)),
        }
    }

    /// Fold one client update into the authoritative state.
    ///
    /// Position is taken as reported. A breach is accepted only if the
    /// session allows it; bonus pickups are decided here; the first
    /// reported finish time sticks.
    pub fn apply_update(&mut self, id: PlayerId, update: &ClientUpdate) -> Result<Vec<GameEvent>, SessionError> {
        let mut events = Vec::new();
        let player = self.state.player_mut(id).ok_or(SessionError::PlayerNotFound(id.0))?;

        player.position = PixelPos::new(update.x, update.y);
        if !update.running && player.running {
            player.running = false;
            info!(player = id.name(), "Player left");
            events.push(GameEvent::PlayerLeft { player: id });
        }

        if let Some(pair) = update.destroyed_wall {
            let wall = Coord::from_pair(pair);
            if self.state.destroy_wall(id, wall) {
                let count = self.state.player(id).map_or(0, |p| p.walls_destroyed);
                debug!(player = id.name(), x = wall.x, y = wall.y, count, "Wall destroyed");
                events.push(GameEvent::WallDestroyed { player: id, wall, count });
            } else {
                warn!(player = id.name(), x = wall.x, y = wall.y, "Rejected wall breach");
            }
        }

        for bonus in collect_bonuses(&mut self.state, id) {
            events.push(GameEvent::BonusCollected { player: id, kind: bonus.kind, at: bonus.pos });
        }

        if let Some(time) = update.end_time {
            if self.state.record_finish(id, time) {
                info!(player = id.name(), time, "Player finished");
                events.push(GameEvent::PlayerFinished { player: id, time });
            }
        }

        Ok(events)
    }

    /// Authoritative state from `id`'s point of view.
    pub fn update_for(&self, id: PlayerId) -> Result<ServerUpdate, SessionError> {
        let me = self.state.player(id).ok_or(SessionError::PlayerNotFound(id.0))?;
        let other = self.state.player(id.other()).ok_or(SessionError::PlayerNotFound(id.other().0))?;

        Ok(ServerUpdate {
            x0: me.position.x,
            y0: me.position.y,
            x1: other.position.x,
            y1: other.position.y,
            speed: me.speed,
            bonuses: self.state.bonus_pairs(),
            destroyed_wall: self.state.last_destroyed_wall.map(Coord::to_pair),
            destroyed_walls: self.state.destroyed_wall_pairs(),
            walls_destroyed: me.walls_destroyed,
            running: other.running,
            end_time: other.finished_at,
        })
    }

    /// Both players finished, or one of them quit.
    pub fn is_over(&self) -> bool {
        is_over(&self.state)
    }

    /// The session's single winner.
    ///
    /// The fastest completion time wins. Without any time, a player who
    /// stayed beats one who left.
    pub fn winner(&self) -> Option<PlayerId> {
        if let Some(winner) = self.state.outcome().winner {
            return Some(winner);
        }
        let stayed: Vec<PlayerId> = self.state.players.iter().filter(|p| p.running).map(|p| p.id).collect();
        match stayed.as_slice() {
            [only] if self.state.anyone_quit() => Some(*only),
            _ => None,
        }
    }

    /// Final result from `id`'s point of view.
    pub fn end_info_for(&self, id: PlayerId) -> MatchEndInfo {
        let outcome = self.state.outcome();
        let time_of = |p: PlayerId| outcome.times.get(p.index()).copied().flatten();
        let opponent_left = self.state.player(id.other()).is_some_and(|p| !p.running);

        let reason = if opponent_left && !self.state.all_finished() {
            EndReason::OpponentLeft
        } else {
            EndReason::Finished
        };

        MatchEndInfo {
            session_id: self.id_string(),
            your_time: time_of(id),
            opponent_time: time_of(id.other()),
            you_won: self.winner() == Some(id),
            reason,
        }
    }

    /// Mark a player as gone (connection lost).
    pub fn drop_player(&mut self, id: PlayerId) {
        if let Some(player) = self.state.player_mut(id) {
            player.running = false;
        }
    }

    /// Seconds since the session was created.
    pub fn age_secs(&self) -> f64 {
        self.created_at.elapsed().as_secs_f64()
    }
}

// =============================================================================
// SESSION MANAGER
// =============================================================================

/// Summary of a running session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Peer addresses, in player order.
    pub peers: Vec<std::net::SocketAddr>,
    /// When the session started.
    pub started_at: Instant,
}

/// Tracks running sessions.
pub struct SessionManager {
    /// Active sessions.
    sessions: RwLock<BTreeMap<SessionId, SessionInfo>>,
}

impl SessionManager {
    /// Create new session manager.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a new session and return its id.
    pub async fn create_session(&self, peers: Vec<std::net::SocketAddr>) -> SessionId {
        let id = uuid::Uuid::new_v4().into_bytes();
        let mut sessions = self.sessions.write().await;
        sessions.insert(id, SessionInfo { peers, started_at: Instant::now() });
        id
    }

    /// Look up a session.
    pub async fn get_session(&self, id: &SessionId) -> Option<SessionInfo> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Remove a session.
    pub async fn remove_session(&self, id: &SessionId) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id);
    }

    /// Get active session count.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to the session manager.
pub type SharedSessions = Arc<SessionManager>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::bonus::BonusKind;
    use crate::maze::generator::{generate, Algorithm};
    use crate::maze::grid::CellMark;

    fn create_test_session(bonuses: bool) -> MatchSession {
        let config = MazeConfig { width: 6, height: 6, bonuses, ..Default::default() };
        let mut rng = MazeRng::from_seed(42);
        let grid = generate(config.width, config.height, config.algorithm, &mut rng);
        MatchSession::new([7; 16], &config, grid, rng).unwrap()
    }

    fn update(x: i32, y: i32) -> ClientUpdate {
        ClientUpdate { x, y, destroyed_wall: None, running: true, end_time: None }
    }

    fn interior_wall(session: &MatchSession) -> Coord {
        let grid = &session.state().grid;
        grid.positions_of(CellMark::Wall)
            .into_iter()
            .find(|c| grid.is_breachable(*c))
            .unwrap()
    }

    #[test]
    fn test_setup_descriptor() {
        let session = create_test_session(true);
        let setup = session.setup_for(PlayerId::RED);

        assert_eq!(setup.player, 1);
        assert_eq!((setup.width, setup.height, setup.speed), (6, 6, 2));
        assert_eq!(setup.bonuses.len(), 6 + 8);
        assert!(setup.verify_digest());
        assert_eq!(setup.session_id, session.id_string());
        // Markers are not walls
        assert!(!setup.walls.contains(&[1, 1]));
    }

    #[test]
    fn test_positions_are_mirrored_per_recipient() {
        let mut session = create_test_session(false);
        session.apply_update(PlayerId::BLUE, &update(30, 25)).unwrap();
        session.apply_update(PlayerId::RED, &update(25, 30)).unwrap();

        let blue = session.update_for(PlayerId::BLUE).unwrap();
        assert_eq!((blue.x0, blue.y0, blue.x1, blue.y1), (30, 25, 25, 30));
        let red = session.update_for(PlayerId::RED).unwrap();
        assert_eq!((red.x0, red.y0, red.x1, red.y1), (25, 30, 30, 25));
        assert!(red.running);
        assert_eq!(red.end_time, None);
    }

    #[test]
    fn test_first_end_time_sticks() {
        let mut session = create_test_session(false);
        let mut first = update(225, 225);
        first.end_time = Some(12.3);
        let events = session.apply_update(PlayerId::BLUE, &first).unwrap();
        assert_eq!(events, vec![GameEvent::PlayerFinished { player: PlayerId::BLUE, time: 12.3 }]);

        let mut later = update(225, 225);
        later.end_time = Some(20.0);
        assert!(session.apply_update(PlayerId::BLUE, &later).unwrap().is_empty());

        let red_view = session.update_for(PlayerId::RED).unwrap();
        assert_eq!(red_view.end_time, Some(12.3));
        assert!(!session.is_over());
    }

    #[test]
    fn test_wall_breach_validated() {
        let mut session = create_test_session(false);
        let wall = interior_wall(&session);
        let mut breach = update(25, 25);
        breach.destroyed_wall = Some(wall.to_pair());

        // Bonuses off: rejected
        assert!(session.apply_update(PlayerId::BLUE, &breach).unwrap().is_empty());
        assert!(session.state().grid.is_wall(wall));

        let mut session = create_test_session(true);
        let wall = interior_wall(&session);
        breach.destroyed_wall = Some(wall.to_pair());
        let events = session.apply_update(PlayerId::BLUE, &breach).unwrap();
        assert!(events.contains(&GameEvent::WallDestroyed { player: PlayerId::BLUE, wall, count: 1 }));

        let view = session.update_for(PlayerId::RED).unwrap();
        assert_eq!(view.destroyed_wall, Some(wall.to_pair()));
        assert_eq!(view.destroyed_walls, vec![wall.to_pair()]);
        assert_eq!(view.walls_destroyed, 0);
        assert_eq!(session.update_for(PlayerId::BLUE).unwrap().walls_destroyed, 1);

        // Border walls never go
        breach.destroyed_wall = Some([0, 3]);
        assert!(session.apply_update(PlayerId::BLUE, &breach).unwrap().is_empty());

        // Nor do posts
        breach.destroyed_wall = Some([2, 2]);
        assert!(session.apply_update(PlayerId::BLUE, &breach).unwrap().is_empty());
        assert!(session.state().grid.is_wall(Coord::new(2, 2)));
        assert_eq!(session.update_for(PlayerId::BLUE).unwrap().walls_destroyed, 1);
    }

    #[test]
    fn test_server_applies_bonus_pickup() {
        let mut session = create_test_session(true);
        let up = session.state().bonuses.iter().find(|b| b.kind == BonusKind::SpeedUp).copied().unwrap();
        let anchor = PixelPos::anchor_of(up.pos);

        let events = session.apply_update(PlayerId::RED, &update(anchor.x, anchor.y)).unwrap();
        assert!(events.iter().any(|e| matches!(e, GameEvent::BonusCollected { kind: BonusKind::SpeedUp, .. })));

        let view = session.update_for(PlayerId::RED).unwrap();
        assert!((view.speed - 2.6).abs() < 1e-5);
        assert!(!view.bonuses.contains(&up.pos.to_pair()));
        assert_eq!(session.update_for(PlayerId::BLUE).unwrap().bonuses, view.bonuses);
    }

    #[test]
    fn test_session_ends_when_both_finish() {
        let mut session = create_test_session(false);
        for (id, time) in [(PlayerId::BLUE, 9.0), (PlayerId::RED, 7.5)] {
            let mut u = update(225, 225);
            u.end_time = Some(time);
            session.apply_update(id, &u).unwrap();
        }
        assert!(session.is_over());

        let blue = session.end_info_for(PlayerId::BLUE);
        assert_eq!(blue.reason, EndReason::Finished);
        assert!(!blue.you_won);
        assert_eq!((blue.your_time, blue.opponent_time), (Some(9.0), Some(7.5)));
        assert!(session.end_info_for(PlayerId::RED).you_won);
    }

    #[test]
    fn test_session_ends_when_player_leaves() {
        let mut session = create_test_session(false);
        let mut leaving = update(25, 25);
        leaving.running = false;
        let events = session.apply_update(PlayerId::RED, &leaving).unwrap();
        assert_eq!(events, vec![GameEvent::PlayerLeft { player: PlayerId::RED }]);
        assert!(session.is_over());

        let blue = session.end_info_for(PlayerId::BLUE);
        assert_eq!(blue.reason, EndReason::OpponentLeft);
        assert!(blue.you_won);
        assert!(!session.update_for(PlayerId::BLUE).unwrap().running);
    }

    #[test]
    fn test_finished_player_who_leaves_still_wins() {
        let mut session = create_test_session(false);
        let mut done = update(225, 225);
        done.end_time = Some(12.3);
        session.apply_update(PlayerId::BLUE, &done).unwrap();
        session.apply_update(PlayerId::RED, &update(25, 25)).unwrap();
        session.drop_player(PlayerId::BLUE);
        assert!(session.is_over());
        assert_eq!(session.winner(), Some(PlayerId::BLUE));

        let blue = session.end_info_for(PlayerId::BLUE);
        let red = session.end_info_for(PlayerId::RED);
        assert!(blue.you_won);
        assert_eq!(blue.your_time, Some(12.3));
        assert!(!red.you_won);
        assert_eq!(red.reason, EndReason::OpponentLeft);
        assert_eq!((red.your_time, red.opponent_time), (None, Some(12.3)));
    }

    #[test]
    fn test_nobody_wins_when_both_leave_unfinished() {
        let mut session = create_test_session(false);
        session.drop_player(PlayerId::BLUE);
        session.drop_player(PlayerId::RED);
        assert_eq!(session.winner(), None);
        assert!(!session.end_info_for(PlayerId::BLUE).you_won);
        assert!(!session.end_info_for(PlayerId::RED).you_won);
    }

    #[test]
    fn test_unknown_player() {
        let mut session = create_test_session(false);
        assert_eq!(
            session.apply_update(PlayerId(5), &update(0, 0)),
            Err(SessionError::PlayerNotFound(5))
        );
    }

    #[tokio::test]
    async fn test_session_manager() {
        let manager = SessionManager::new();
        let peers = vec!["127.0.0.1:1".parse().unwrap(), "127.0.0.1:2".parse().unwrap()];
        let id = manager.create_session(peers).await;
        assert_eq!(manager.session_count().await, 1);
        assert_eq!(manager.get_session(&id).await.unwrap().peers.len(), 2);

        manager.remove_session(&id).await;
        assert_eq!(manager.session_count().await, 0);
        assert!(manager.get_session(&id).await.is_none());
    }
}
