//! Network Layer
//!
//! WebSocket server and client for two-player sessions. The server owns
//! the authoritative [`crate::game::SessionState`] of every session; clients
//! only predict and report.

pub mod protocol;
pub mod session;
pub mod server;
pub mod client;

pub use protocol::{
    ClientMessage, ClientUpdate, EndReason, MatchEndInfo, ProtocolError, ServerMessage,
    ServerUpdate, SetupDescriptor,
};
pub use session::{MatchSession, SessionError, SessionId, SessionManager};
pub use server::{GameServer, GameServerError};
pub use client::{ClientError, ClientOutcome, ClientView, GameClient};
