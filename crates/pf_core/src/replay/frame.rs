//! Compact replay frames: integer coordinates, fixed slot layout.
//!
//! One frame carries 23 entities — slot 0 is the ball, slots 1..=22 are the
//! players in canonical track-id order. Coordinates and velocities are i16 at
//! 0.1-unit precision, so a decoded position lands within 0.05 m of the
//! original floating value.

use serde::{Deserialize, Serialize};

use crate::pipeline::frames::{dequantize, quantize, RawTickFrame};
use crate::pipeline::snapshot::PlayerAction;

/// Entities per frame: ball + 22 players.
pub const REPLAY_TRACKS: usize = 23;

/// One entity's state at one timestamp (integer coordinates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntitySnap {
    /// Coordinates in 0.1m units.
    pub x10: i16,
    pub y10: i16,
    /// Velocity in 0.1m/s units.
    pub vx10: i16,
    pub vy10: i16,
    /// Action code (see [`PlayerAction::to_code`]); ball height in 0.1m units
    /// rides in `flags` for slot 0.
    pub state: u8,
    /// Slot 0: ball height in 0.1m units (0..=255 = 0..=25.5m).
    /// Slots 1..=22: bit 0 = has_ball.
    pub flags: u8,
}

impl EntitySnap {
    /// Encode a floating sample.
    pub fn from_tick_frame(frame: &RawTickFrame) -> Self {
        Self {
            x10: quantize(frame.x),
            y10: quantize(frame.y),
            vx10: quantize(frame.vx),
            vy10: quantize(frame.vy),
            state: frame
                .state
                .as_deref()
                .map(PlayerAction::from_state_str)
                .unwrap_or_default()
                .to_code(),
            flags: frame.z.map(|h| (h * 10.0).round().clamp(0.0, 255.0) as u8).unwrap_or(0),
        }
    }

    /// Decode back to a floating sample at time `t` seconds.
    pub fn to_tick_frame(&self, t: f32) -> RawTickFrame {
        RawTickFrame {
            t,
            x: dequantize(self.x10),
            y: dequantize(self.y10),
            vx: dequantize(self.vx10),
            vy: dequantize(self.vy10),
            z: if self.flags > 0 { Some(self.flags as f32 / 10.0) } else { None },
            state: Some(action_name(PlayerAction::from_code(self.state)).to_string()),
        }
    }
}

fn action_name(action: PlayerAction) -> &'static str {
    match action {
        PlayerAction::Idle => "idle",
        PlayerAction::Walk => "walk",
        PlayerAction::Run => "run",
        PlayerAction::Sprint => "sprint",
        PlayerAction::Dribble => "dribble",
        PlayerAction::Control => "control",
        PlayerAction::Kick => "kick",
    }
}

/// One saved frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    /// Time in ms.
    pub t_ms: u32,
    /// Slot 0 = ball, slots 1..=22 = players in canonical track-id order.
    pub entities: [EntitySnap; REPLAY_TRACKS],
}

impl ReplayFrame {
    pub fn empty(t_ms: u32) -> Self {
        Self { t_ms, entities: [EntitySnap::default(); REPLAY_TRACKS] }
    }

    /// Record a canonical snapshot as one quantized frame.
    pub fn from_snapshot(snapshot: &crate::pipeline::snapshot::StandardSnapshot) -> Self {
        let mut frame = Self::empty(snapshot.t_ms as u32);

        frame.entities[0] = EntitySnap {
            x10: quantize(snapshot.ball.pos.x),
            y10: quantize(snapshot.ball.pos.y),
            vx10: quantize(snapshot.ball.vel.x),
            vy10: quantize(snapshot.ball.vel.y),
            state: 0,
            flags: (snapshot.ball.height * 10.0).round().clamp(0.0, 255.0) as u8,
        };

        for (track_id, player) in snapshot.players.iter().enumerate() {
            frame.entities[track_id + 1] = EntitySnap {
                x10: quantize(player.pos.x),
                y10: quantize(player.pos.y),
                vx10: quantize(player.vel.x),
                vy10: quantize(player.vel.y),
                state: player.action.to_code(),
                flags: u8::from(snapshot.ball.owner_track_id == track_id as i32),
            };
        }

        frame
    }
}

/// Container metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayMeta {
    /// Coordinate unit in mm: 100 = 0.1m.
    pub coord_unit_mm: u16,
    /// Simulation tick in ms.
    pub sim_tick_ms: u16,
    /// Intended playback tick in ms.
    pub view_tick_ms: u16,
    /// Field extents in 0.1m units.
    pub field_x_max: i32,
    pub field_y_max: i32,
    /// Entity count (ball + players).
    pub track_count: u8,
}

impl Default for ReplayMeta {
    fn default() -> Self {
        Self {
            coord_unit_mm: 100,
            sim_tick_ms: 250,
            view_tick_ms: 50,
            field_x_max: 1050,
            field_y_max: 680,
            track_count: REPLAY_TRACKS as u8,
        }
    }
}

/// Root replay document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayDoc {
    pub version: u8,
    pub meta: ReplayMeta,
    pub frames: Vec<ReplayFrame>,
}

pub const REPLAY_VERSION: u8 = 1;

impl Default for ReplayDoc {
    fn default() -> Self {
        Self { version: REPLAY_VERSION, meta: ReplayMeta::default(), frames: Vec::new() }
    }
}
