//! Typed wire model for the external engine boundary.
//!
//! Raw step payloads are parsed exactly once, here, into tolerant typed
//! structs. Every field is defaulted: a malformed frame degrades to documented
//! defaults and is still processed, it never raises an error. The only field
//! that aborts a session is an explicit non-empty `error` string.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snapshot::NO_TRACK;

/// Request for one engine step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StepRequest {
    /// Upper bound of simulated time this step may cover.
    pub max_dt_ms: u32,
}

/// Acknowledge shape returned by engine lifecycle calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: String,
}

impl EngineAck {
    pub fn ok() -> Self {
        Self { success: true, error: String::new() }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: error.into() }
    }
}

/// Ball fields as the engine reports them. `owner` is a canonical track id,
/// -1 for a loose ball.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawBall {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub vx: f32,
    #[serde(default)]
    pub vy: f32,
    #[serde(default)]
    pub height: f32,
    #[serde(default = "default_owner")]
    pub owner: i32,
}

fn default_owner() -> i32 {
    NO_TRACK
}

impl Default for RawBall {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, vx: 0.0, vy: 0.0, height: 0.0, owner: NO_TRACK }
    }
}

/// One per-player entry in the floating-point "session" shape. The id may be
/// a canonical integer, a prefixed string, or a bare team-local string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPlayerEntry {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub vx: f32,
    #[serde(default)]
    pub vy: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamina: Option<f32>,
    /// 0 = home, 1 = away; contextualizes bare string ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<u8>,
}

/// Per-tick heatmap layers, fully computed engine-side. Each vector is
/// row-major over the 28x18 board (504 cells).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawHeatmaps {
    #[serde(default)]
    pub occupancy_total: Vec<f32>,
    #[serde(default)]
    pub occupancy_home: Vec<f32>,
    #[serde(default)]
    pub occupancy_away: Vec<f32>,
    #[serde(default)]
    pub pressure_against_home: Vec<f32>,
    #[serde(default)]
    pub pressure_against_away: Vec<f32>,
}

/// Snapshot section of a step response. Exactly one ball shape and one
/// players shape is expected; when several are present the unpacked
/// (floating) shape wins, when none is present positions stay at defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSnapshotPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ball: Option<RawBall>,
    /// Packed ball: `[x10, y10, vx10, vy10, height10]` at 0.1-unit precision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ball_packed: Option<Vec<i16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<Vec<RawPlayerEntry>>,
    /// Packed players, entity-major float channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players_packed: Option<Vec<f32>>,
    /// Packed players, fixed-point i16 at 0.1-unit precision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players_packed_i16: Option<Vec<i16>>,
    #[serde(default)]
    pub score_home: u32,
    #[serde(default)]
    pub score_away: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heatmaps: Option<RawHeatmaps>,
}

/// Full response of one engine step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStepResponse {
    #[serde(default)]
    pub t_ms: u64,
    #[serde(default)]
    pub snapshot: RawSnapshotPayload,
    /// Raw events in either wire shape; normalized downstream.
    #[serde(default)]
    pub events: Vec<Value>,
    #[serde(default)]
    pub halftime: bool,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub paused: bool,
    /// Present when the engine waits for a user decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_decision: Option<Value>,
    /// Non-empty = fatal step error; the session tears down, no retry.
    #[serde(default)]
    pub error: String,
}

impl RawStepResponse {
    #[inline]
    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_malformed_frame_falls_back_to_defaults() {
        // Nothing but a timestamp: still parses, every field defaulted.
        let resp: RawStepResponse = serde_json::from_value(json!({"t_ms": 250})).unwrap();
        assert_eq!(resp.t_ms, 250);
        assert!(!resp.is_error());
        assert!(resp.snapshot.ball.is_none());
        assert_eq!(resp.snapshot.score_home, 0);
        assert!(resp.events.is_empty());

        // Even an empty object is a processable frame.
        let resp: RawStepResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(resp.t_ms, 0);
    }

    #[test]
    fn test_ball_owner_defaults_to_loose() {
        let ball: RawBall = serde_json::from_value(json!({"x": 52.5, "y": 34.0})).unwrap();
        assert_eq!(ball.owner, NO_TRACK);
        assert_eq!(ball.height, 0.0);
    }

    #[test]
    fn test_full_payload_parses() {
        let resp: RawStepResponse = serde_json::from_value(json!({
            "t_ms": 1000,
            "snapshot": {
                "ball": {"x": 10.0, "y": 20.0, "vx": 1.0, "vy": 0.0, "height": 0.5, "owner": 7},
                "players": [
                    {"id": "H0", "x": 5.0, "y": 34.0, "state": "idle", "stamina": 0.9, "team_id": 0}
                ],
                "score_home": 1,
                "score_away": 0,
                "heatmaps": {"occupancy_total": [0.0, 1.0]}
            },
            "events": [{"type": "pass", "team_id": 0}],
            "halftime": false
        }))
        .unwrap();

        assert_eq!(resp.snapshot.ball.unwrap().owner, 7);
        assert_eq!(resp.snapshot.players.as_ref().unwrap().len(), 1);
        assert_eq!(resp.snapshot.score_home, 1);
        assert_eq!(resp.snapshot.heatmaps.unwrap().occupancy_total.len(), 2);
        assert_eq!(resp.events.len(), 1);
    }

    #[test]
    fn test_error_flag() {
        let resp: RawStepResponse =
            serde_json::from_value(json!({"error": "engine panicked"})).unwrap();
        assert!(resp.is_error());
    }
}
