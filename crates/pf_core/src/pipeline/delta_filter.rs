//! Change-detection gate for outgoing snapshots.
//!
//! Suppresses snapshots that carry no meaningful change so downstream render
//! and propagation cost stays bounded. References update only on emit: small
//! movements accumulate against the same stale reference until their
//! cumulative displacement crosses threshold (hysteresis, not a sliding
//! window).

use serde::{Deserialize, Serialize};

use super::snapshot::{StandardSnapshot, Vec2, TRACK_COUNT};

/// Thresholds for the gate. Distances in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaFilterConfig {
    pub ball_threshold_m: f32,
    pub player_threshold_m: f32,
    /// Minimum count of moved players that forces an emit on its own.
    pub min_changed_players: usize,
}

impl Default for DeltaFilterConfig {
    fn default() -> Self {
        Self { ball_threshold_m: 0.5, player_threshold_m: 0.5, min_changed_players: 2 }
    }
}

/// Running emit/drop counters for tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaFilterStats {
    pub emitted: u64,
    pub dropped: u64,
}

/// Stateful gate. Lives for one match session; `reset()` at session
/// boundaries.
#[derive(Debug, Clone, Default)]
pub struct DeltaFilter {
    config: DeltaFilterConfig,
    last_ball: Option<Vec2>,
    last_players: [Option<Vec2>; TRACK_COUNT],
    stats: DeltaFilterStats,
}

impl DeltaFilter {
    pub fn new(config: DeltaFilterConfig) -> Self {
        Self { config, ..Self::default() }
    }

    pub fn configure(&mut self, config: DeltaFilterConfig) {
        self.config = config;
    }

    #[inline]
    pub fn config(&self) -> &DeltaFilterConfig {
        &self.config
    }

    #[inline]
    pub fn stats(&self) -> DeltaFilterStats {
        self.stats
    }

    /// Decide whether a snapshot is worth propagating, updating the
    /// last-emitted references when it is.
    ///
    /// Emit when any of:
    /// - the snapshot carries events
    /// - the ball moved beyond `ball_threshold_m` from the last EMITTED pos
    /// - at least `min_changed_players` players moved beyond
    ///   `player_threshold_m` from their last EMITTED positions
    /// - no reference exists yet (first snapshot of a session)
    pub fn should_emit(&mut self, snapshot: &StandardSnapshot) -> bool {
        let emit = self.evaluate(snapshot);
        if emit {
            self.last_ball = Some(snapshot.ball.pos);
            for (slot, player) in self.last_players.iter_mut().zip(snapshot.players.iter()) {
                *slot = Some(player.pos);
            }
            self.stats.emitted += 1;
        } else {
            self.stats.dropped += 1;
        }
        emit
    }

    fn evaluate(&self, snapshot: &StandardSnapshot) -> bool {
        if !snapshot.events.is_empty() {
            return true;
        }

        let last_ball = match self.last_ball {
            Some(pos) => pos,
            None => return true,
        };
        if snapshot.ball.pos.distance_to(last_ball) > self.config.ball_threshold_m {
            return true;
        }

        let mut changed = 0usize;
        for (last, player) in self.last_players.iter().zip(snapshot.players.iter()) {
            let moved = match last {
                Some(pos) => player.pos.distance_to(*pos) > self.config.player_threshold_m,
                None => true,
            };
            if moved {
                changed += 1;
                if changed >= self.config.min_changed_players {
                    return true;
                }
            }
        }
        false
    }

    /// Clear all references and counters at a session boundary.
    pub fn reset(&mut self) {
        self.last_ball = None;
        self.last_players = [None; TRACK_COUNT];
        self.stats = DeltaFilterStats::default();
    }
}
