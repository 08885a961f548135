//! Game Events
//!
//! Side effects produced while advancing a session, for logging and for
//! drivers that want to react to them.

use serde::{Serialize, Deserialize};

use crate::game::bonus::BonusKind;
use crate::game::state::{MatchOutcome, PlayerId};
use crate::maze::grid::Coord;

/// Something notable that happened during a tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A player knocked down a wall.
    WallDestroyed {
        /// Who breached it.
        player: PlayerId,
        /// Matrix position of the removed wall.
        wall: Coord,
        /// Breaches by this player so far.
        count: u8,
    },

    /// A player picked up a bonus.
    BonusCollected {
        /// Who collected it.
        player: PlayerId,
        /// What it did.
        kind: BonusKind,
        /// Where it was.
        at: Coord,
    },

    /// A player reached the exit.
    PlayerFinished {
        /// Who finished.
        player: PlayerId,
        /// Seconds since the match started.
        time: f64,
    },

    /// A player stopped playing.
    PlayerLeft {
        /// Who left.
        player: PlayerId,
    },

    /// The match is over.
    MatchEnded {
        /// Times and winner.
        outcome: MatchOutcome,
    },
}

impl GameEvent {
    /// Player the event is about, if any.
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            GameEvent::WallDestroyed { player, .. }
            | GameEvent::BonusCollected { player, .. }
            | GameEvent::PlayerFinished { player, .. }
            | GameEvent::PlayerLeft { player } => Some(*player),
            GameEvent::MatchEnded { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_player() {
        let event = GameEvent::PlayerFinished { player: PlayerId::RED, time: 1.5 };
        assert_eq!(event.player(), Some(PlayerId::RED));

        let end = GameEvent::MatchEnded { outcome: MatchOutcome::from_times(vec![None]) };
        assert_eq!(end.player(), None);
    }

    #[test]
    fn test_event_serializes_tagged() {
        let event = GameEvent::WallDestroyed { player: PlayerId::BLUE, wall: Coord::new(4, 3), count: 1 };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"wall_destroyed\""));
    }
}
