//! Local Simulation Tick
//!
//! Advances a [`SessionState`] owned by this process: movement, wall
//! breaching, bonus pickup and finish stamping, in player order.

use tracing::{debug, info};

use crate::game::bonus::collect_bonuses;
use crate::game::collision::step_player;
use crate::game::events::GameEvent;
use crate::game::input::{Intent, IntentSource};
use crate::game::state::{MatchOutcome, PlayerId, SessionState};
use crate::TICK_RATE;

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Whether the match ended this tick
    pub match_ended: bool,
}

/// Run one tick.
///
/// `intents[i]` drives player `i`; missing intents count as idle. `elapsed`
/// is the match clock in seconds and is what finish times are stamped with.
pub fn tick(state: &mut SessionState, intents: &[Intent], elapsed: f64) -> TickResult {
    let mut result = TickResult::default();
    if is_over(state) {
        result.match_ended = true;
        return result;
    }

    for index in 0..state.players.len() {
        let id = PlayerId(index as u8);
        let intent = intents.get(index).copied().unwrap_or(Intent::IDLE);
        advance_player(state, id, intent, elapsed, &mut result.events);
    }

    if is_over(state) {
        let outcome = state.outcome();
        info!(winner = ?outcome.winner.map(PlayerId::name), "Match ended");
        result.events.push(GameEvent::MatchEnded { outcome });
        result.match_ended = true;
    }
    result
}

/// A match is over once every player has finished or someone quit.
pub fn is_over(state: &SessionState) -> bool {
    state.all_finished() || state.anyone_quit()
}

fn advance_player(
    state: &mut SessionState,
    id: PlayerId,
    intent: Intent,
    elapsed: f64,
    events: &mut Vec<GameEvent>,
) {
    let grid = &state.grid;
    let Some(player) = state.players.get_mut(id.index()) else {
        return;
    };
    if !player.running || player.finished_at.is_some() {
        return;
    }

    // 1. Move
    let outcome = step_player(grid, player, intent);

    // 2. Breach the blocking wall
    if intent.destroy {
        if let Some(wall) = outcome.blocked_by {
            if state.destroy_wall(id, wall) {
                let count = state.player(id).map_or(0, |p| p.walls_destroyed);
                debug!(player = id.name(), x = wall.x, y = wall.y, count, "Wall destroyed");
                events.push(GameEvent::WallDestroyed { player: id, wall, count });
            }
        }
    }

    // 3. Bonuses
    for bonus in collect_bonuses(state, id) {
        events.push(GameEvent::BonusCollected { player: id, kind: bonus.kind, at: bonus.pos });
    }

    // 4. Finish
    if outcome.reached_exit && state.record_finish(id, elapsed) {
        info!(player = id.name(), time = elapsed, "Player finished");
        events.push(GameEvent::PlayerFinished { player: id, time: elapsed });
    }
}

/// Play a whole match headlessly on a simulated clock.
///
/// Returns when the match is over or after `max_ticks`, whichever is first.
pub fn run_local(
    state: &mut SessionState,
    sources: &mut [Box<dyn IntentSource>],
    max_ticks: u64,
) -> MatchOutcome {
    for n in 1..=max_ticks {
        let intents: Vec<Intent> = state
            .players
            .iter()
            .zip(sources.iter_mut())
            .map(|(player, source)| source.next_intent(&state.grid, player))
            .collect();

        let elapsed = n as f64 / TICK_RATE as f64;
        if tick(state, &intents, elapsed).match_ended {
            break;
        }
    }
    state.outcome()
}
