//! Canonical per-tick state structures.
//!
//! Everything downstream of the normalizer (delta filter, priority selector,
//! renderer) consumes exactly one shape: `StandardSnapshot`. Raw engine
//! payloads never leave the ingestion boundary.
//!
//! Contract: track_id 0..=10 = Home slots, 11..=21 = Away slots. A slot is a
//! roster position, not a permanent player identity; substitutions swap the
//! occupant of a slot.

use serde::{Deserialize, Serialize};

/// Tracked outfield entities (22 players; the ball is carried separately).
pub const TRACK_COUNT: usize = 22;

/// Highest home slot index. Away slots are `HOME_SLOT_MAX + 1 ..= 21`.
pub const HOME_SLOT_MAX: usize = 10;

/// Sentinel for "no entity" (loose ball, unresolved identity).
pub const NO_TRACK: i32 = -1;

/// Team of a canonical track id. 0 = home, 1 = away.
#[inline]
pub fn team_of(track_id: usize) -> u8 {
    if track_id <= HOME_SLOT_MAX {
        0
    } else {
        1
    }
}

/// 2D field position/velocity in meters (FIFA pitch: 105 x 68).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in meters.
    #[inline]
    pub fn distance_to(&self, other: Vec2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Linear interpolation. t=0 returns self, t=1 returns target.
    #[inline]
    pub fn lerp(&self, target: Vec2, t: f32) -> Self {
        Self { x: self.x + (target.x - self.x) * t, y: self.y + (target.y - self.y) * t }
    }
}

/// Current score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

/// Ball state. `owner_track_id == NO_TRACK` means a loose ball.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BallState {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Height above the pitch in meters.
    pub height: f32,
    pub owner_track_id: i32,
}

impl Default for BallState {
    fn default() -> Self {
        Self { pos: Vec2::ZERO, vel: Vec2::ZERO, height: 0.0, owner_track_id: NO_TRACK }
    }
}

/// Discrete animation-facing action. Snaps between samples, never blends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    #[default]
    Idle,
    Walk,
    Run,
    Sprint,
    Dribble,
    Control,
    Kick,
}

impl PlayerAction {
    /// Parse a raw engine state string. Unknown strings degrade to Idle.
    pub fn from_state_str(s: &str) -> Self {
        match s {
            "walk" | "walking" => Self::Walk,
            "run" | "running" => Self::Run,
            "sprint" | "sprinting" => Self::Sprint,
            "dribble" | "dribbling" => Self::Dribble,
            "control" | "controlling" => Self::Control,
            "kick" | "kicking" | "shoot" => Self::Kick,
            _ => Self::Idle,
        }
    }

    /// Compact byte code used by the quantized replay frame.
    pub fn to_code(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Walk => 1,
            Self::Run => 2,
            Self::Sprint => 3,
            Self::Dribble => 4,
            Self::Control => 5,
            Self::Kick => 6,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Walk,
            2 => Self::Run,
            3 => Self::Sprint,
            4 => Self::Dribble,
            5 => Self::Control,
            6 => Self::Kick,
            _ => Self::Idle,
        }
    }
}

/// Renderable state of one pitch slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub pos: Vec2,
    pub vel: Vec2,
    /// 0 = home, 1 = away. Derived from the slot, never from the payload.
    pub team_id: u8,
    /// Display role from the roster document (e.g. "GK", "CM").
    pub role: String,
    pub name: String,
    pub number: u32,
    pub action: PlayerAction,
    /// 0.0 = exhausted, 1.0 = fresh.
    pub stamina: f32,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            team_id: 0,
            role: String::new(),
            name: String::new(),
            number: 0,
            action: PlayerAction::Idle,
            stamina: 1.0,
        }
    }
}

/// The single canonical per-tick state consumed by all downstream components.
///
/// Ephemeral: rebuilt from engine output every tick, never persisted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardSnapshot {
    /// Monotonic simulation time in milliseconds.
    pub t_ms: u64,
    pub score: Score,
    pub ball: BallState,
    /// Indexed by canonical track id.
    pub players: [PlayerState; TRACK_COUNT],
    pub events: Vec<super::events::NormalizedEvent>,
}

impl Default for StandardSnapshot {
    fn default() -> Self {
        Self {
            t_ms: 0,
            score: Score::default(),
            ball: BallState::default(),
            players: std::array::from_fn(|i| PlayerState {
                team_id: team_of(i),
                ..PlayerState::default()
            }),
            events: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_of_slots() {
        assert_eq!(team_of(0), 0);
        assert_eq!(team_of(10), 0);
        assert_eq!(team_of(11), 1);
        assert_eq!(team_of(21), 1);
    }

    #[test]
    fn test_vec2_distance_and_lerp() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(3.0, 4.0);
        assert!((a.distance_to(b) - 5.0).abs() < 1e-6);

        let mid = a.lerp(b, 0.5);
        assert_eq!(mid, Vec2::new(1.5, 2.0));
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
    }

    #[test]
    fn test_action_code_roundtrip() {
        for action in [
            PlayerAction::Idle,
            PlayerAction::Walk,
            PlayerAction::Run,
            PlayerAction::Sprint,
            PlayerAction::Dribble,
            PlayerAction::Control,
            PlayerAction::Kick,
        ] {
            assert_eq!(PlayerAction::from_code(action.to_code()), action);
        }
        // Unknown codes degrade to Idle, never panic
        assert_eq!(PlayerAction::from_code(200), PlayerAction::Idle);
    }

    #[test]
    fn test_default_snapshot_team_ids() {
        let snap = StandardSnapshot::default();
        assert_eq!(snap.players[0].team_id, 0);
        assert_eq!(snap.players[11].team_id, 1);
        assert_eq!(snap.ball.owner_track_id, NO_TRACK);
    }
}
