//! Configuration
//!
//! Plain structs with defaults. Everything is validated before a maze is
//! built or a socket is opened.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Serialize, Deserialize};

use crate::maze::generator::{Algorithm, UnknownAlgorithm};

/// Smallest allowed maze side, in cells.
pub const MIN_SIDE: u32 = 6;
/// Largest allowed maze side, in cells.
pub const MAX_SIDE: u32 = 19;
/// Slowest allowed player speed.
pub const MIN_SPEED: u32 = 2;
/// Fastest allowed player speed.
pub const MAX_SPEED: u32 = 5;

/// Configuration errors. Rejected before any session starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Maze side outside 6..=19.
    #[error("Side of the maze must be between 6 and 19, got {0}")]
    SideOutOfRange(u32),

    /// Player speed outside 2..=5.
    #[error("Player speed must be between 2 and 5, got {0}")]
    SpeedOutOfRange(u32),

    /// Algorithm name not recognised.
    #[error(transparent)]
    UnknownAlgorithm(#[from] UnknownAlgorithm),
}

/// How a maze and the match on it are set up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MazeConfig {
    /// Logical width in cells.
    pub width: u32,
    /// Logical height in cells.
    pub height: u32,
    /// Carving algorithm.
    pub algorithm: Algorithm,
    /// Show the solution overlay.
    pub solution: bool,
    /// Spawn bonuses and allow wall breaching.
    pub bonuses: bool,
    /// Initial player speed.
    pub speed: u32,
}

impl Default for MazeConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            algorithm: Algorithm::Dfs,
            solution: false,
            bonuses: false,
            speed: MIN_SPEED,
        }
    }
}

impl MazeConfig {
    /// Check size and speed ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_side(self.width)?;
        check_side(self.height)?;
        if !(MIN_SPEED..=MAX_SPEED).contains(&self.speed) {
            return Err(ConfigError::SpeedOutOfRange(self.speed));
        }
        Ok(())
    }
}

/// Validate one maze side.
pub fn check_side(side: u32) -> Result<u32, ConfigError> {
    if (MIN_SIDE..=MAX_SIDE).contains(&side) {
        Ok(side)
    } else {
        Err(ConfigError::SideOutOfRange(side))
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maze and match settings for every session.
    pub maze: MazeConfig,
    /// Load this maze file instead of generating one.
    pub maze_file: Option<PathBuf>,
    /// Read/write deadline per record; a silent peer ends its session.
    pub io_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            maze: MazeConfig::default(),
            maze_file: None,
            io_timeout: Duration::from_secs(30),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the server.
    pub server_url: String,
    /// Delay between ticks.
    pub tick_interval: Duration,
    /// Read deadline while waiting for the server.
    pub io_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8080".to_string(),
            tick_interval: Duration::from_micros(1_000_000 / crate::TICK_RATE as u64),
            io_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Build a config for a host given as `ip`, `ip:port` or a full URL.
    pub fn for_host(host: &str) -> Self {
        let server_url = if host.starts_with("ws://") || host.starts_with("wss://") {
            host.to_string()
        } else if host.contains(':') {
            format!("ws://{}", host)
        } else {
            format!("ws://{}:8080", host)
        };
        Self { server_url, ..Default::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maze_config_default_is_valid() {
        let config = MazeConfig::default();
        assert_eq!(config.width, 10);
        assert_eq!(config.speed, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_side_range() {
        assert_eq!(check_side(6), Ok(6));
        assert_eq!(check_side(19), Ok(19));
        assert_eq!(check_side(5), Err(ConfigError::SideOutOfRange(5)));
        assert_eq!(check_side(20), Err(ConfigError::SideOutOfRange(20)));

        let config = MazeConfig { height: 25, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::SideOutOfRange(25)));
    }

    #[test]
    fn test_speed_range() {
        let config = MazeConfig { speed: 6, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::SpeedOutOfRange(6)));
        let config = MazeConfig { speed: 1, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_algorithm_converts() {
        let err: ConfigError = "maze".parse::<Algorithm>().unwrap_err().into();
        assert!(err.to_string().contains("maze"));
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.io_timeout, Duration::from_secs(30));
        assert!(config.maze_file.is_none());
    }

    #[test]
    fn test_client_config_for_host() {
        assert_eq!(ClientConfig::for_host("192.168.0.4").server_url, "ws://192.168.0.4:8080");
        assert_eq!(ClientConfig::for_host("10.0.0.1:9000").server_url, "ws://10.0.0.1:9000");
        assert_eq!(ClientConfig::for_host("ws://example:1").server_url, "ws://example:1");
    }
}
