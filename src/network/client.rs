//! Game Client
//!
//! Connects to a server, rebuilds the maze from the setup descriptor and
//! plays one session. Each tick the client predicts its own move against
//! the walls it knows, reports it, then adopts whatever the server answers:
//! positions, speed, breached walls and remaining bonuses all come from the
//! server's reply.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, instrument};

use crate::config::ClientConfig;
use crate::core::hash::short_hex;
use crate::game::bonus::{bonuses_from_pairs, Bonus};
use crate::game::collision::step_player;
use crate::game::input::{Intent, IntentSource};
use crate::game::state::{PixelPos, PlayerId, PlayerState};
use crate::maze::grid::{CellMark, Coord, Grid, GridError};
use crate::maze::solver::mark_solution;
use crate::network::protocol::{
    ClientMessage, ClientUpdate, MatchEndInfo, ProtocolError, ServerMessage, ServerUpdate,
    SetupDescriptor,
};

/// Client errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// WebSocket error (including failure to connect).
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Undecodable record from the server.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Record could not be encoded.
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Setup walls or bonuses fall outside the advertised maze.
    #[error("Invalid setup: {0}")]
    InvalidSetup(#[from] GridError),

    /// Setup contents do not hash to the advertised digest.
    #[error("Setup digest mismatch")]
    DigestMismatch,

    /// The server reported an error.
    #[error("Server error: {0}")]
    Server(String),

    /// Server did not answer within the I/O timeout.
    #[error("Timed out waiting for server")]
    Timeout,

    /// Server closed the connection.
    #[error("Server disconnected")]
    Disconnected,
}

// =============================================================================
// CLIENT VIEW
// =============================================================================

/// What the client believes about the session.
#[derive(Clone, Debug)]
pub struct ClientView {
    /// Setup as received.
    pub setup: SetupDescriptor,
    /// Local maze: setup walls minus known breaches.
    pub grid: Grid,
    /// This player.
    pub me: PlayerState,
    /// The other player.
    pub opponent: PlayerState,
    /// Bonuses still on the grid.
    pub bonuses: Vec<Bonus>,
    /// Breaching is possible in this session.
    pub bonuses_enabled: bool,
}

impl ClientView {
    /// Rebuild the maze from a setup descriptor.
    pub fn from_setup(setup: SetupDescriptor) -> Result<Self, ClientError> {
        if !setup.verify_digest() {
            return Err(ClientError::DigestMismatch);
        }

        let mut grid = Grid::new(setup.width, setup.height);
        grid.fill(CellMark::Open);
        let walls: Vec<Coord> = setup.walls.iter().copied().map(Coord::from_pair).collect();
        grid.mark_region(&walls, CellMark::Wall)?;

        if setup.solution {
            mark_solution(&mut grid);
        }
        grid.mark_endpoints();

        let bonuses = bonuses_from_pairs(&setup.bonuses, setup.width, setup.height);
        let cells: Vec<Coord> = bonuses.iter().map(|b| b.pos).collect();
        grid.mark_region(&cells, CellMark::Reserved)?;

        let me_id = PlayerId(setup.player.min(1));
        let speed = setup.speed as f32;
        Ok(Self {
            me: PlayerState::new(me_id, speed, &grid),
            opponent: PlayerState::new(me_id.other(), speed, &grid),
            bonuses_enabled: !setup.bonuses.is_empty(),
            bonuses,
            grid,
            setup,
        })
    }

    /// Apply an intent locally and build the record reporting it.
    ///
    /// A breach is predicted only when the local view allows it; the server
    /// has the final say.
    pub fn predict(&mut self, intent: Intent, elapsed: f64) -> ClientUpdate {
        let outcome = step_player(&self.grid, &mut self.me, intent);

        let mut destroyed_wall = None;
        if intent.destroy && self.bonuses_enabled && self.me.can_breach() {
            if let Some(wall) = outcome.blocked_by.filter(|w| self.grid.is_breachable(*w)) {
                if self.grid.set(wall, CellMark::Open).is_ok() {
                    self.me.walls_destroyed += 1;
                    destroyed_wall = Some(wall.to_pair());
                }
            }
        }

        if outcome.reached_exit && self.me.record_finish(elapsed) {
            info!(time = elapsed, "Reached the exit");
        }

        ClientUpdate {
            x: self.me.position.x,
            y: self.me.position.y,
            destroyed_wall,
            running: self.me.running,
            end_time: self.me.finished_at,
        }
    }

    /// Adopt the server's state.
    pub fn reconcile(&mut self, update: &ServerUpdate) {
        self.me.position = PixelPos::new(update.x0, update.y0);
        self.me.speed = update.speed;
        self.me.walls_destroyed = update.walls_destroyed;

        self.opponent.position = PixelPos::new(update.x1, update.y1);
        self.opponent.running = update.running;
        if let Some(time) = update.end_time {
            self.opponent.record_finish(time);
        }

        // Walls: exactly the setup walls the server has not seen breached
        let breached: HashSet<[i32; 2]> = update.destroyed_walls.iter().copied().collect();
        for pair in &self.setup.walls {
            let mark = if breached.contains(pair) { CellMark::Open } else { CellMark::Wall };
            let _ = self.grid.set(Coord::from_pair(*pair), mark);
        }

        let remaining: HashSet<[i32; 2]> = update.bonuses.iter().copied().collect();
        for bonus in self.bonuses.iter().filter(|b| !remaining.contains(&b.pos.to_pair())) {
            debug!(x = bonus.pos.x, y = bonus.pos.y, kind = ?bonus.kind, "Bonus gone");
            let _ = self.grid.set(bonus.pos, CellMark::Open);
        }
        self.bonuses.retain(|b| remaining.contains(&b.pos.to_pair()));
    }

    /// Both players have a completion time.
    pub fn both_finished(&self) -> bool {
        self.me.finished_at.is_some() && self.opponent.finished_at.is_some()
    }
}

// =============================================================================
// CLIENT
// =============================================================================

type ClientSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How a session ended for this client.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientOutcome {
    /// Slot the server assigned.
    pub player: PlayerId,
    /// Own completion time.
    pub my_time: Option<f64>,
    /// Final result; `None` if this client left first.
    pub end: Option<MatchEndInfo>,
}

/// The game client.
pub struct GameClient {
    /// Client configuration.
    config: ClientConfig,
    /// Leave signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameClient {
    /// Create a client.
    pub fn new(config: ClientConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self { config, shutdown_tx }
    }

    /// Leave the running session at the next tick.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Connect and play one session, driving this player from `source`.
    #[instrument(skip_all, fields(server = %self.config.server_url))]
    pub async fn play(&self, source: &mut dyn IntentSource) -> Result<ClientOutcome, ClientError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let (mut ws, _) = connect_async(self.config.server_url.as_str()).await?;
        let io_timeout = self.config.io_timeout;

        let setup = match recv(&mut ws, io_timeout).await? {
            ServerMessage::Setup(setup) => setup,
            ServerMessage::Error(e) => return Err(ClientError::Server(e.message)),
            other => return Err(unexpected("setup", &other)),
        };
        let mut view = ClientView::from_setup(setup)?;
        info!(
            player = view.me.id.name(),
            session = %view.setup.session_id,
            digest = %short_hex(&view.setup.layout_digest()),
            "Joined session"
        );

        let started = Instant::now();
        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_rx.recv() => {
                    info!("Leaving session");
                    send(&mut ws, &ClientMessage::Leave, io_timeout).await?;
                    let _ = ws.close(None).await;
                    return Ok(ClientOutcome { player: view.me.id, my_time: view.me.finished_at, end: None });
                }
            }

            let intent = source.next_intent(&view.grid, &view.me);
            let update = view.predict(intent, started.elapsed().as_secs_f64());
            send(&mut ws, &ClientMessage::Update(update), io_timeout).await?;

            match recv(&mut ws, io_timeout).await? {
                ServerMessage::State(state) => view.reconcile(&state),
                ServerMessage::MatchEnd(end) => {
                    info!(won = end.you_won, reason = ?end.reason, "Match over");
                    let _ = ws.close(None).await;
                    return Ok(ClientOutcome { player: view.me.id, my_time: view.me.finished_at, end: Some(end) });
                }
                ServerMessage::Error(e) => return Err(ClientError::Server(e.message)),
                other => return Err(unexpected("state", &other)),
            }
        }
    }
}

fn unexpected(expected: &'static str, got: &ServerMessage) -> ClientError {
    ClientError::Protocol(ProtocolError::UnexpectedMessage { expected, got: got.kind().to_string() })
}

async fn recv(ws: &mut ClientSocket, io_timeout: Duration) -> Result<ServerMessage, ClientError> {
    loop {
        let frame = timeout(io_timeout, ws.next()).await.map_err(|_| ClientError::Timeout)?;
        match frame {
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => return Err(ClientError::Disconnected),
            Some(Ok(frame)) => return Ok(ServerMessage::from_frame(&frame)?),
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

async fn send(ws: &mut ClientSocket, msg: &ClientMessage, io_timeout: Duration) -> Result<(), ClientError> {
    let frame = msg.to_frame()?;
    timeout(io_timeout, ws.send(frame)).await.map_err(|_| ClientError::Timeout)??;
    Ok(())
}
