//! WebSocket Game Server
//!
//! Accepts connections, pairs them in arrival order and runs one session
//! worker per pair. Each worker owns its session outright: it reads one
//! record from each player per tick, folds them into the authoritative
//! state and answers each player with their own view. A failing connection
//! ends only its own session.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{FutureExt, SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{ConfigError, MazeConfig, ServerConfig};
use crate::core::hash::short_hex;
use crate::core::rng::MazeRng;
use crate::game::state::PlayerId;
use crate::maze::generator::generate;
use crate::maze::grid::Grid;
use crate::maze::text::{self, MazeFileError};
use crate::network::protocol::{
    ClientMessage, ErrorCode, ProtocolError, ServerError, ServerMessage,
};
use crate::network::session::{MatchSession, SessionError, SessionId, SessionManager, SharedSessions};

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Socket failure (bind, accept, address lookup).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Maze file could not be used.
    #[error("Maze file error: {0}")]
    MazeFile(#[from] MazeFileError),

    /// Undecodable record from a client.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Record could not be encoded.
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Session error.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Peer did not answer within the I/O timeout.
    #[error("Timed out waiting for peer")]
    Timeout,

    /// Peer closed the connection.
    #[error("Peer disconnected")]
    Disconnected,
}

type ServerSocket = WebSocketStream<TcpStream>;

/// A connected, handshaken player waiting for or playing a session.
struct Seat {
    ws: ServerSocket,
    addr: SocketAddr,
    connected: bool,
}

/// Everything a session worker needs, shared across sessions.
struct SessionContext {
    maze: MazeConfig,
    template: Option<Grid>,
    io_timeout: Duration,
    sessions: SharedSessions,
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Bound listener.
    listener: TcpListener,
    /// Shared session settings.
    context: Arc<SessionContext>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Validate the configuration and bind the listener.
    ///
    /// A configured maze file is loaded once here so a bad file fails
    /// startup instead of every session.
    pub async fn bind(config: ServerConfig) -> Result<Self, GameServerError> {
        config.maze.validate()?;

        let template = match &config.maze_file {
            Some(path) => {
                let grid = text::load(path)?;
                info!(
                    path = %path.display(),
                    width = grid.width(),
                    height = grid.height(),
                    digest = %short_hex(&grid.digest()),
                    "Loaded maze file"
                );
                Some(grid)
            }
            None => None,
        };

        let listener = TcpListener::bind(config.bind_addr).await?;
        let (shutdown_tx, _) = broadcast::channel(1);
        let context = Arc::new(SessionContext {
            maze: config.maze.clone(),
            template,
            io_timeout: config.io_timeout,
            sessions: Arc::new(SessionManager::new()),
        });

        Ok(Self { config, listener, context, shutdown_tx })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, GameServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the server until [`GameServer::shutdown`] is called.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        info!("Game server listening on {}", self.local_addr()?);

        let (ready_tx, mut ready_rx) = mpsc::channel::<Seat>(16);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut waiting: Option<Seat> = None;

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            info!("New connection from {}", addr);
                            self.handshake(stream, addr, ready_tx.clone());
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                Some(seat) = ready_rx.recv() => {
                    if waiting.as_mut().is_some_and(hung_up) {
                        if let Some(gone) = waiting.take() {
                            info!("{} left before being paired", gone.addr);
                        }
                    }
                    match waiting.take() {
                        Some(first) => self.start_session([first, seat]),
                        None => {
                            debug!("{} is waiting for an opponent", seat.addr);
                            waiting = Some(seat);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        if let Some(mut seat) = waiting {
            let _ = seat.ws.close(None).await;
        }
        Ok(())
    }

    /// Upgrade a TCP connection in the background.
    fn handshake(&self, stream: TcpStream, addr: SocketAddr, ready: mpsc::Sender<Seat>) {
        let io_timeout = self.config.io_timeout;
        tokio::spawn(async move {
            match timeout(io_timeout, accept_async(stream)).await {
                Ok(Ok(ws)) => {
                    let _ = ready.send(Seat { ws, addr, connected: true }).await;
                }
                Ok(Err(e)) => error!("WebSocket handshake failed for {}: {}", addr, e),
                Err(_) => warn!("WebSocket handshake timed out for {}", addr),
            }
        });
    }

    /// Spawn a worker for a pair of players.
    fn start_session(&self, seats: [Seat; 2]) {
        let context = self.context.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = run_session(context, seats, shutdown_rx).await {
                warn!("Session aborted: {}", e);
            }
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active session count.
    pub async fn session_count(&self) -> usize {
        self.context.sessions.session_count().await
    }
}

// =============================================================================
// SESSION WORKER
// =============================================================================

async fn run_session(
    context: Arc<SessionContext>,
    mut seats: [Seat; 2],
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), GameServerError> {
    let id = context.sessions.create_session(seats.iter().map(|s| s.addr).collect()).await;
    let result = play_session(&context, id, &mut seats, &mut shutdown_rx).await;

    for seat in seats.iter_mut() {
        let _ = seat.ws.close(None).await;
    }
    context.sessions.remove_session(&id).await;
    result
}

#[instrument(skip_all, fields(session = %uuid::Uuid::from_bytes(id)))]
async fn play_session(
    context: &SessionContext,
    id: SessionId,
    seats: &mut [Seat; 2],
    shutdown_rx: &mut broadcast::Receiver<()>,
) -> Result<(), GameServerError> {
    let io_timeout = context.io_timeout;
    let mut rng = MazeRng::from_entropy();
    let grid = match &context.template {
        Some(template) => template.clone(),
        None => generate(context.maze.width, context.maze.height, context.maze.algorithm, &mut rng),
    };

    let mut session = match MatchSession::new(id, &context.maze, grid, rng) {
        Ok(session) => session,
        Err(e) => {
            let failure = ServerMessage::Error(ServerError {
                code: ErrorCode::SessionFailed,
                message: e.to_string(),
            });
            for seat in seats.iter_mut() {
                let _ = send(&mut seat.ws, &failure, io_timeout).await;
            }
            return Err(e.into());
        }
    };

    for (i, seat) in seats.iter_mut().enumerate() {
        let setup = ServerMessage::Setup(session.setup_for(PlayerId(i as u8)));
        send(&mut seat.ws, &setup, io_timeout).await?;
    }

    loop {
        // 1. One record from each player
        let [blue, red] = &mut *seats;
        let reads = tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Session interrupted by shutdown");
                return Ok(());
            }
            reads = async { tokio::join!(recv(blue, io_timeout), recv(red, io_timeout)) } => reads,
        };

        // 2. Fold into the authoritative state
        for (i, read) in [reads.0, reads.1].into_iter().enumerate() {
            let player = PlayerId(i as u8);
            let seat = &mut seats[i];
            match read {
                Ok(ClientMessage::Update(update)) => {
                    for event in session.apply_update(player, &update)? {
                        debug!(?event, "Session event");
                    }
                }
                Ok(ClientMessage::Leave) => {
                    info!(player = player.name(), "Player left");
                    seat.connected = false;
                    session.drop_player(player);
                }
                Err(e) => {
                    if seat.connected {
                        warn!(player = player.name(), peer = %seat.addr, "Connection lost: {}", e);
                    }
                    if let GameServerError::Protocol(ref reason) = e {
                        if seat.connected {
                            let error = ServerMessage::Error(ServerError {
                                code: ErrorCode::InvalidInput,
                                message: reason.to_string(),
                            });
                            let _ = send(&mut seat.ws, &error, io_timeout).await;
                        }
                    }
                    seat.connected = false;
                    session.drop_player(player);
                }
            }
        }

        // 3. Answer each player
        if session.is_over() {
            for (i, seat) in seats.iter_mut().enumerate() {
                if !seat.connected {
                    continue;
                }
                let end = ServerMessage::MatchEnd(session.end_info_for(PlayerId(i as u8)));
                if let Err(e) = send(&mut seat.ws, &end, io_timeout).await {
                    warn!(peer = %seat.addr, "Failed to deliver match end: {}", e);
                }
            }
            let outcome = session.state().outcome();
            info!(
                winner = ?outcome.winner.map(PlayerId::name),
                times = ?outcome.times,
                secs = session.age_secs(),
                "Session ended"
            );
            return Ok(());
        }

        for (i, seat) in seats.iter_mut().enumerate() {
            let player = PlayerId(i as u8);
            let state = ServerMessage::State(session.update_for(player)?);
            if let Err(e) = send(&mut seat.ws, &state, io_timeout).await {
                warn!(player = player.name(), "Failed to send state: {}", e);
                seat.connected = false;
                session.drop_player(player);
            }
        }
    }
}

/// Has a seat that has not been sent anything yet gone away?
///
/// Drains pending control frames without waiting. Anything else before the
/// setup (a close, an error, or a record) counts as gone.
fn hung_up(seat: &mut Seat) -> bool {
    loop {
        match seat.ws.next().now_or_never() {
            None => return false,
            Some(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
            Some(_) => return true,
        }
    }
}

/// Read the next record from a seat.
async fn recv(seat: &mut Seat, io_timeout: Duration) -> Result<ClientMessage, GameServerError> {
    if !seat.connected {
        return Err(GameServerError::Disconnected);
    }
    loop {
        let frame = timeout(io_timeout, seat.ws.next())
            .await
            .map_err(|_| GameServerError::Timeout)?;
        match frame {
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => return Err(GameServerError::Disconnected),
            Some(Ok(frame)) => return Ok(ClientMessage::from_frame(&frame)?),
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

/// Write one record to a client.
async fn send(ws: &mut ServerSocket, msg: &ServerMessage, io_timeout: Duration) -> Result<(), GameServerError> {
    let frame = msg.to_frame()?;
    timeout(io_timeout, ws.send(frame))
        .await
        .map_err(|_| GameServerError::Timeout)??;
    Ok(())
}
