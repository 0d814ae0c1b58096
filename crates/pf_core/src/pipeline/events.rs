//! Normalized match events and the wire-shape adapter.
//!
//! Two incompatible shapes of the "same" event arrive from the engine: a
//! nested layout carrying a `data` object, and a flattened layout with all
//! fields at the top level. One adapter normalizes both into
//! [`NormalizedEvent`]; nothing downstream ever touches an untyped map.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::identity::{resolve_track_value, TeamSide};
use super::snapshot::{Vec2, NO_TRACK};

/// Canonical event shape consumed by the renderer and the feed filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Event kind, e.g. "goal", "pass", "substitution". "unknown" when the
    /// payload carried no recognizable type.
    pub kind: String,
    pub t_ms: u64,
    pub minute: u32,
    /// 0 = home, 1 = away, -1 = unknown.
    pub team_id: i32,
    /// Canonical track id of the acting player, -1 = unresolved.
    pub player_track_id: i32,
    /// Canonical track id of the secondary player (receiver, incoming sub).
    pub target_track_id: i32,
    pub pos: Vec2,
    /// Kind-specific extras, passed through for display tooling.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, Value>,
}

impl NormalizedEvent {
    pub fn unknown(t_ms: u64) -> Self {
        Self {
            kind: "unknown".to_string(),
            t_ms,
            minute: (t_ms / 60_000) as u32,
            team_id: NO_TRACK,
            player_track_id: NO_TRACK,
            target_track_id: NO_TRACK,
            pos: Vec2::ZERO,
            details: HashMap::new(),
        }
    }
}

/// Normalize one raw event of either wire shape.
///
/// Total over its input: missing fields fall back to documented defaults and
/// an unrecognizable payload yields an "unknown" event rather than an error.
/// `fallback_t_ms` supplies the tick time when the event carries none.
pub fn normalize_event(raw: &Value, fallback_t_ms: u64) -> NormalizedEvent {
    let top = match raw.as_object() {
        Some(map) => map,
        None => return NormalizedEvent::unknown(fallback_t_ms),
    };

    // Nested shape keeps kind/time at the top and everything else under
    // `data`; the flattened shape has one level. Fields are read from `data`
    // first, then from the top level.
    let data = top.get("data").and_then(Value::as_object);
    let field = |key: &str| -> Option<&Value> {
        data.and_then(|d| d.get(key)).or_else(|| top.get(key))
    };
    let num = |key: &str| -> Option<f32> { field(key).and_then(Value::as_f64).map(|v| v as f32) };

    let kind = field("type")
        .or_else(|| field("kind"))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    let t_ms = field("t_ms")
        .or_else(|| field("timestamp_ms"))
        .and_then(Value::as_u64)
        .unwrap_or(fallback_t_ms);
    let minute =
        field("minute").and_then(Value::as_u64).map(|m| m as u32).unwrap_or((t_ms / 60_000) as u32);

    let team_id = match field("team_id").and_then(Value::as_i64) {
        Some(0) => 0,
        Some(1) => 1,
        Some(_) => NO_TRACK,
        None => match field("is_home_team").and_then(Value::as_bool) {
            Some(true) => 0,
            Some(false) => 1,
            None => NO_TRACK,
        },
    };
    let hint = if team_id == 1 { TeamSide::Away } else { TeamSide::Home };

    let resolve_first = |keys: &[&str]| -> i32 {
        for key in keys {
            if let Some(raw_id) = field(key) {
                let id = resolve_track_value(raw_id, hint);
                if id != NO_TRACK {
                    return id;
                }
            }
        }
        NO_TRACK
    };
    let player_track_id = resolve_first(&["player_track_id", "player", "player_id"]);
    let target_track_id = resolve_first(&["target_track_id", "target", "in_player", "receiver_id"]);

    let nested_pos = |axis: &str| -> Option<f32> {
        field("pos")
            .and_then(Value::as_object)
            .and_then(|p| p.get(axis))
            .and_then(Value::as_f64)
            .map(|v| v as f32)
    };
    let pos = Vec2::new(
        num("x").or_else(|| nested_pos("x")).unwrap_or(0.0),
        num("y").or_else(|| nested_pos("y")).unwrap_or(0.0),
    );

    // Everything not consumed above survives as details.
    const CONSUMED: [&str; 16] = [
        "type", "kind", "t_ms", "timestamp_ms", "minute", "team_id", "is_home_team",
        "player_track_id", "player", "player_id", "target_track_id", "target", "in_player",
        "receiver_id", "x", "y",
    ];
    let mut details = HashMap::new();
    let source = data.unwrap_or(top);
    for (key, value) in source {
        if !CONSUMED.contains(&key.as_str()) && key != "data" && key != "pos" {
            details.insert(key.clone(), value.clone());
        }
    }

    NormalizedEvent { kind, t_ms, minute, team_id, player_track_id, target_track_id, pos, details }
}

/// Extract the slot swap carried by a substitution event, if fully resolved.
///
/// Returns `(slot_out, slot_in)` as canonical track ids. Events missing
/// either side are display-only; the identity table must not guess.
pub fn substitution_swap(event: &NormalizedEvent) -> Option<(i32, i32)> {
    if event.kind != "substitution" {
        return None;
    }
    if event.player_track_id == NO_TRACK || event.target_track_id == NO_TRACK {
        return None;
    }
    Some((event.player_track_id, event.target_track_id))
}
