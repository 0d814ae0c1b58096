//! Format-agnostic snapshot normalization.
//!
//! Converts any supported raw tick/replay encoding into one canonical
//! [`StandardSnapshot`], with temporal smoothing:
//! - interpolation between bracketing samples (numeric channels lerp,
//!   discrete channels snap)
//! - constant-velocity dead-reckoning past the last sample, trusted for at
//!   most [`PREDICTION_HORIZON_S`]; beyond that the pipeline prefers
//!   staleness over guesswork
//!
//! Predictions that leave the field are clamped every time but warned about
//! exactly once per process lifetime.

use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;

use super::events::{normalize_event, NormalizedEvent};
use super::field_board::FieldBounds;
use super::frames::{dequantize, unpack_f32, unpack_i16, FrameHistory, RawTickFrame};
use super::identity::{resolve_track_value, IdentityTable, TeamSide};
use super::raw::RawStepResponse;
use super::snapshot::{
    team_of, BallState, PlayerAction, PlayerState, Score, StandardSnapshot, Vec2, NO_TRACK,
    TRACK_COUNT,
};
use crate::replay::frame::ReplayFrame;

/// How far past the last known sample extrapolation is trusted, in seconds.
pub const PREDICTION_HORIZON_S: f32 = 0.5;

const GRAVITY_MPS2: f32 = 9.8;

static OOB_WARNED: AtomicBool = AtomicBool::new(false);

/// Record an out-of-bounds prediction. The clamp itself happens at every
/// occurrence; the log line fires once per process lifetime so sustained
/// out-of-bounds prediction cannot flood the log. Returns whether this call
/// emitted the warning.
pub(crate) fn note_out_of_bounds(raw: Vec2, clamped: Vec2) -> bool {
    if OOB_WARNED.swap(true, Ordering::Relaxed) {
        return false;
    }
    warn!(
        "dead-reckoned position ({:.2}, {:.2}) left the field, clamped to ({:.2}, {:.2}); \
         further occurrences are silent",
        raw.x, raw.y, clamped.x, clamped.y
    );
    true
}

#[cfg(test)]
pub(crate) fn reset_oob_warning() {
    OOB_WARNED.store(false, Ordering::Relaxed);
}

// ============================================================================
// Interpolation / dead-reckoning over one entity history
// ============================================================================

/// Interpolate an entity's state at `t` seconds from its sample history.
///
/// Bracketing samples: `before` = latest sample with `t_sample <= t`,
/// `after` = earliest with `t_sample >= t`. Numeric channels lerp with
/// `alpha = clamp((t - before.t) / (after.t - before.t), 0, 1)`; discrete
/// channels take `before`'s value verbatim. Equal-time brackets return
/// `before` unchanged.
pub fn interpolate(history: &FrameHistory, t: f32) -> Option<RawTickFrame> {
    let (before, after) = history.bracket(t);
    match (before, after) {
        (Some(b), Some(a)) => {
            if a.t <= b.t {
                return Some(b.clone());
            }
            let alpha = ((t - b.t) / (a.t - b.t)).clamp(0.0, 1.0);
            let lerp = |x: f32, y: f32| x + (y - x) * alpha;
            Some(RawTickFrame {
                t,
                x: lerp(b.x, a.x),
                y: lerp(b.y, a.y),
                vx: lerp(b.vx, a.vx),
                vy: lerp(b.vy, a.vy),
                z: match (b.z, a.z) {
                    (Some(bz), Some(az)) => Some(lerp(bz, az)),
                    (z, None) | (None, z) => z,
                },
                state: b.state.clone(),
            })
        }
        // Target precedes all history: the first sample is the best answer.
        (None, Some(a)) => Some(a.clone()),
        // Target is past the last sample: interpolation alone returns it
        // unchanged; extrapolation is dead_reckon's job.
        (Some(b), None) => Some(b.clone()),
        (None, None) => None,
    }
}

/// Extrapolate past the last known sample with a constant-velocity model.
///
/// Horizontal velocity is not decayed. The ball's height decays
/// ballistically (`h' = max(0, h - 0.5 * g * dt^2)`). Past the horizon the
/// last sample is returned unchanged.
pub fn dead_reckon(last: &RawTickFrame, t: f32, is_ball: bool) -> RawTickFrame {
    let dt = t - last.t;
    if dt <= 0.0 || dt >= PREDICTION_HORIZON_S {
        return last.clone();
    }

    let raw = Vec2::new(last.x + last.vx * dt, last.y + last.vy * dt);
    let clamped = FieldBounds::standard().clamp(raw);
    if clamped != raw {
        note_out_of_bounds(raw, clamped);
    }

    let z = match last.z {
        Some(h) if is_ball && h > 0.0 => Some((h - 0.5 * GRAVITY_MPS2 * dt * dt).max(0.0)),
        Some(_) if is_ball => Some(0.0),
        other => other,
    };

    RawTickFrame {
        t,
        x: clamped.x,
        y: clamped.y,
        vx: last.vx,
        vy: last.vy,
        z,
        state: last.state.clone(),
    }
}

// ============================================================================
// SnapshotNormalizer
// ============================================================================

/// Stateful normalizer for one match session.
///
/// Owns the per-entity sample histories and the identity table; collaborators
/// are constructor-injected, nothing global. `reset()` at session boundaries.
pub struct SnapshotNormalizer {
    identity: IdentityTable,
    bounds: FieldBounds,
    ball: FrameHistory,
    players: [FrameHistory; TRACK_COUNT],
    /// Last known stamina per slot; packed encodings carry none.
    stamina: [f32; TRACK_COUNT],
    score: Score,
    ball_owner: i32,
}

impl SnapshotNormalizer {
    pub fn new(identity: IdentityTable) -> Self {
        Self {
            identity,
            bounds: FieldBounds::standard(),
            ball: FrameHistory::new(),
            players: std::array::from_fn(|_| FrameHistory::new()),
            stamina: [1.0; TRACK_COUNT],
            score: Score::default(),
            ball_owner: NO_TRACK,
        }
    }

    #[inline]
    pub fn identity(&self) -> &IdentityTable {
        &self.identity
    }

    /// Mutable access for roster side effects (substitution slot swaps are
    /// applied before the same tick is normalized).
    #[inline]
    pub fn identity_mut(&mut self) -> &mut IdentityTable {
        &mut self.identity
    }

    /// Clear all per-session caches. The identity table is kept; a new
    /// session installs a fresh one via [`Self::set_identity`].
    pub fn reset(&mut self) {
        self.ball.clear();
        for history in &mut self.players {
            history.clear();
        }
        self.stamina = [1.0; TRACK_COUNT];
        self.score = Score::default();
        self.ball_owner = NO_TRACK;
    }

    pub fn set_identity(&mut self, identity: IdentityTable) {
        self.identity = identity;
    }

    /// Record a raw step and produce the canonical snapshot for its tick.
    /// Pre-normalized events are passed in so the caller can apply roster
    /// side effects between event normalization and snapshot assembly.
    pub fn ingest_step(
        &mut self,
        resp: &RawStepResponse,
        events: Vec<NormalizedEvent>,
    ) -> StandardSnapshot {
        self.record_step(resp);
        self.snapshot_at(resp.t_ms, events)
    }

    /// Record a compact replay frame (slot 0 = ball, slots 1..=22 = players).
    pub fn ingest_replay_frame(&mut self, frame: &ReplayFrame) {
        let t = frame.t_ms as f32 / 1000.0;

        let ball = &frame.entities[0];
        self.ball.push(ball.to_tick_frame(t));

        for track_id in 0..TRACK_COUNT {
            let entity = &frame.entities[track_id + 1];
            self.players[track_id].push(entity.to_tick_frame(t));
        }
    }

    fn record_step(&mut self, resp: &RawStepResponse) {
        let t = resp.t_ms as f32 / 1000.0;
        let payload = &resp.snapshot;

        self.score = Score { home: payload.score_home, away: payload.score_away };

        if let Some(ball) = &payload.ball {
            self.ball_owner = ball.owner;
            self.ball.push(RawTickFrame {
                t,
                x: ball.x,
                y: ball.y,
                vx: ball.vx,
                vy: ball.vy,
                z: Some(ball.height),
                state: None,
            });
        } else if let Some(packed) = &payload.ball_packed {
            // [x10, y10, vx10, vy10, height10] at 0.1-unit precision
            let get = |i: usize| packed.get(i).copied().map(dequantize).unwrap_or(0.0);
            self.ball_owner = NO_TRACK;
            self.ball.push(RawTickFrame {
                t,
                x: get(0),
                y: get(1),
                vx: get(2),
                vy: get(3),
                z: Some(get(4)),
                state: None,
            });
        }

        if let Some(entries) = &payload.players {
            for entry in entries {
                let hint = match entry.team_id {
                    Some(1) => TeamSide::Away,
                    _ => TeamSide::Home,
                };
                let track_id = resolve_track_value(&entry.id, hint);
                if track_id == NO_TRACK {
                    // Unresolvable identity: skip the entity, never index.
                    continue;
                }
                let track_id = track_id as usize;
                if let Some(stamina) = entry.stamina {
                    self.stamina[track_id] = stamina.clamp(0.0, 1.0);
                }
                self.players[track_id].push(RawTickFrame {
                    t,
                    x: entry.x,
                    y: entry.y,
                    vx: entry.vx,
                    vy: entry.vy,
                    z: None,
                    state: entry.state.clone(),
                });
            }
        } else if let Some(values) = &payload.players_packed {
            for (track_id, frame) in unpack_f32(values, t).into_iter().enumerate() {
                self.players[track_id].push(frame);
            }
        } else if let Some(values) = &payload.players_packed_i16 {
            for (track_id, frame) in unpack_i16(values, t).into_iter().enumerate() {
                self.players[track_id].push(frame);
            }
        }
    }

    /// Assemble the canonical snapshot for a target time.
    ///
    /// Every position is clamped into field bounds before it leaves the
    /// normalizer; out-of-range input is never propagated raw.
    pub fn snapshot_at(&self, t_ms: u64, events: Vec<NormalizedEvent>) -> StandardSnapshot {
        let t = t_ms as f32 / 1000.0;

        let ball = match self.sample(&self.ball, t, true) {
            Some(frame) => BallState {
                pos: self.bounds.clamp(Vec2::new(frame.x, frame.y)),
                vel: Vec2::new(frame.vx, frame.vy),
                height: frame.z.unwrap_or(0.0).max(0.0),
                owner_track_id: self.ball_owner,
            },
            None => BallState::default(),
        };

        let players = std::array::from_fn(|track_id| {
            let meta = self.identity.slot(track_id);
            let mut state = PlayerState {
                team_id: team_of(track_id),
                role: meta.role.clone(),
                name: meta.name.clone(),
                number: meta.number,
                stamina: self.stamina[track_id],
                ..PlayerState::default()
            };
            if let Some(frame) = self.sample(&self.players[track_id], t, false) {
                state.pos = self.bounds.clamp(Vec2::new(frame.x, frame.y));
                state.vel = Vec2::new(frame.vx, frame.vy);
                if let Some(s) = &frame.state {
                    state.action = PlayerAction::from_state_str(s);
                }
            }
            state
        });

        StandardSnapshot { t_ms, score: self.score, ball, players, events }
    }

    fn sample(&self, history: &FrameHistory, t: f32, is_ball: bool) -> Option<RawTickFrame> {
        let (before, after) = history.bracket(t);
        match (before, after) {
            (Some(b), None) => Some(dead_reckon(b, t, is_ball)),
            _ => interpolate(history, t),
        }
    }
}

/// Normalize the raw events of one step response.
pub fn normalize_step_events(resp: &RawStepResponse) -> Vec<NormalizedEvent> {
    resp.events.iter().map(|raw| normalize_event(raw, resp.t_ms)).collect()
}
