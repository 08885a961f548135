//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket. Every record
//! is one JSON text frame, so the transport delimits records for us.
//!
//! Grid positions (walls, bonuses) are matrix coordinates `[x, y]`; player
//! positions are pixels.

use serde::{Serialize, Deserialize};
use tokio_tungstenite::tungstenite::Message;

use crate::core::hash::{layout_digest, LayoutHash};

/// Protocol errors. A session treats any of these as a dead connection.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Record is not valid JSON for the expected message.
    #[error("Malformed record: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Frame type that carries no record.
    #[error("Unexpected frame: {0}")]
    UnexpectedFrame(String),

    /// Well-formed message at the wrong time.
    #[error("Unexpected message: expected {expected}, got {got}")]
    UnexpectedMessage {
        /// What the receiver was waiting for.
        expected: &'static str,
        /// What arrived.
        got: String,
    },
}

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Position report for the current tick.
    Update(ClientUpdate),

    /// Player is leaving the match.
    Leave,
}

/// One client tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientUpdate {
    /// Pixel x of the player's hit box.
    pub x: i32,
    /// Pixel y of the player's hit box.
    pub y: i32,
    /// Wall breached this tick.
    pub destroyed_wall: Option<[i32; 2]>,
    /// Still playing.
    pub running: bool,
    /// Seconds from the client's start to reaching the exit.
    pub end_time: Option<f64>,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Session setup, sent once.
    Setup(SetupDescriptor),

    /// Authoritative state after a tick.
    State(ServerUpdate),

    /// Session is over.
    MatchEnd(MatchEndInfo),

    /// Error message.
    Error(ServerError),
}

/// Immutable snapshot of a session's initial state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupDescriptor {
    /// Session identifier (UUID).
    pub session_id: String,
    /// Recipient's player slot (0 or 1).
    pub player: u8,
    /// Logical width in cells.
    pub width: u32,
    /// Logical height in cells.
    pub height: u32,
    /// Initial player speed.
    pub speed: u32,
    /// Draw the solution overlay.
    pub solution: bool,
    /// Standing walls, row-major.
    pub walls: Vec<[i32; 2]>,
    /// Bonus cells in layout order (teleports, speed-ups, speed-downs).
    pub bonuses: Vec<[i32; 2]>,
    /// Hex layout digest of `width`, `height` and `walls`.
    pub digest: String,
}

impl SetupDescriptor {
    /// Digest recomputed from the descriptor's own contents.
    pub fn layout_digest(&self) -> LayoutHash {
        layout_digest(self.width, self.height, &self.walls)
    }

    /// Does the advertised digest match the contents?
    pub fn verify_digest(&self) -> bool {
        hex::encode(self.layout_digest()) == self.digest
    }
}

/// Authoritative state for one recipient.
///
/// `x0, y0` and `speed` are the recipient's own values, `x1, y1` the
/// opponent's. `running` and `end_time` describe the opponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerUpdate {
    /// Recipient x.
    pub x0: i32,
    /// Recipient y.
    pub y0: i32,
    /// Opponent x.
    pub x1: i32,
    /// Opponent y.
    pub y1: i32,
    /// Recipient speed multiplier.
    pub speed: f32,
    /// Bonuses still on the grid.
    pub bonuses: Vec<[i32; 2]>,
    /// Most recent wall breach by either player.
    pub destroyed_wall: Option<[i32; 2]>,
    /// Every wall breached so far.
    pub destroyed_walls: Vec<[i32; 2]>,
    /// Walls the recipient has breached.
    pub walls_destroyed: u8,
    /// Opponent still playing.
    pub running: bool,
    /// Opponent's completion time.
    pub end_time: Option<f64>,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Everyone reached the exit.
    Finished,
    /// The opponent quit or dropped.
    OpponentLeft,
}

/// Match end information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEndInfo {
    /// Session identifier.
    pub session_id: String,
    /// Recipient's completion time.
    pub your_time: Option<f64>,
    /// Opponent's completion time.
    pub opponent_time: Option<f64>,
    /// Recipient won.
    pub you_won: bool,
    /// Why it ended.
    pub reason: EndReason,
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Record could not be decoded.
    InvalidInput,
    /// Session could not be built.
    SessionFailed,
    /// Internal error.
    InternalError,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Wrap in a text frame.
    pub fn to_frame(&self) -> Result<Message, serde_json::Error> {
        Ok(Message::Text(self.to_json()?))
    }

    /// Decode a frame.
    pub fn from_frame(frame: &Message) -> Result<Self, ProtocolError> {
        Ok(Self::from_json(frame_text(frame)?)?)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Wrap in a text frame.
    pub fn to_frame(&self) -> Result<Message, serde_json::Error> {
        Ok(Message::Text(self.to_json()?))
    }

    /// Decode a frame.
    pub fn from_frame(frame: &Message) -> Result<Self, ProtocolError> {
        Ok(Self::from_json(frame_text(frame)?)?)
    }

    /// Short name for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Setup(_) => "setup",
            ServerMessage::State(_) => "state",
            ServerMessage::MatchEnd(_) => "match_end",
            ServerMessage::Error(_) => "error",
        }
    }
}

fn frame_text(frame: &Message) -> Result<&str, ProtocolError> {
    match frame {
        Message::Text(text) => Ok(text.as_str()),
        Message::Binary(data) => std::str::from_utf8(data)
            .map_err(|e| ProtocolError::UnexpectedFrame(format!("binary frame is not UTF-8: {}", e))),
        other => Err(ProtocolError::UnexpectedFrame(format!("{:?}", other))),
    }
}
