//! # pf_core - Realtime Match State Synchronization Pipeline
//!
//! Converts irregular, possibly-lagging ticks from an external match
//! simulation engine into a smooth, bandwidth-bounded, priority-aware stream
//! of renderable positions for 22 tracked entities plus a ball.
//!
//! ## Features
//! - Fixed-step session driving with bounded catch-up
//! - Format-agnostic snapshot normalization (interpolation + dead-reckoning)
//! - Change-detection gating and proximity-based update priorities
//! - Fixed spatial grid with engine-supplied heatmap layers
//! - Compact quantized replay format (MessagePack + LZ4 container)

// Game pipeline APIs often require many parameters for state plumbing
#![allow(clippy::too_many_arguments)]
// Struct initialization pattern used intentionally
#![allow(clippy::field_reassign_with_default)]
// Large enum variants - boxing would require API changes
#![allow(clippy::large_enum_variant)]

pub mod error;
pub mod pipeline;
pub mod replay;

// Re-export the main pipeline surface
pub use error::{FeedError, Result};
pub use pipeline::{
    AoiPartition, AoiSelector, DeltaFilter, EngineHandle, FieldBoard, IdentityTable,
    NormalizedEvent, PipelinePreset, PresetName, RawStepResponse, RosterDoc, SessionEvent,
    SessionSink, SessionState, SessionStepDriver, SnapshotNormalizer, StandardSnapshot, ViewFeed,
};
pub use replay::{ReplayDoc, ReplayError, ReplayFrame};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const SCHEMA_VERSION: u8 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::{DriverConfig, EngineAck, RawSnapshotPayload, StepRequest, Vec2};
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Scripted engine: the ball travels along the pitch at 4 m/s, players
    /// hold formation. Deterministic, no physics.
    struct ScriptedEngine {
        t_ms: u64,
        finish_at_ms: u64,
    }

    impl EngineHandle for ScriptedEngine {
        fn start(&mut self, _request: &Value) -> EngineAck {
            EngineAck::ok()
        }

        fn step(&mut self, request: StepRequest) -> RawStepResponse {
            self.t_ms += request.max_dt_ms as u64;
            let t_s = self.t_ms as f32 / 1000.0;

            let mut players = Vec::new();
            for i in 0..22 {
                players.push(serde_json::from_value(json!({
                    "id": i,
                    "x": 10.0 + (i % 11) as f32 * 8.0,
                    "y": if i < 11 { 20.0 } else { 48.0 },
                    "state": "run",
                    "stamina": 0.9
                }))
                .unwrap());
            }

            RawStepResponse {
                t_ms: self.t_ms,
                snapshot: RawSnapshotPayload {
                    ball: Some(
                        serde_json::from_value(json!({
                            "x": (1.5 * t_s) % 105.0, "y": 34.0, "vx": 1.5, "vy": 0.0
                        }))
                        .unwrap(),
                    ),
                    players: Some(players),
                    ..RawSnapshotPayload::default()
                },
                finished: self.t_ms >= self.finish_at_ms,
                ..RawStepResponse::default()
            }
        }

        fn submit_action(&mut self, _action: &Value) -> EngineAck {
            EngineAck::ok()
        }

        fn resume_second_half(&mut self) {}

        fn finish(&mut self) -> Value {
            json!({"score_home": 0, "score_away": 0})
        }
    }

    struct SharedFeed(Rc<RefCell<ViewFeed>>);

    impl SessionSink for SharedFeed {
        fn on_session_event(&mut self, event: &SessionEvent<'_>) {
            self.0.borrow_mut().on_session_event(event);
        }
    }

    #[test]
    fn test_end_to_end_session_flow() {
        let engine = ScriptedEngine { t_ms: 0, finish_at_ms: 5_000 };
        let feed = Rc::new(RefCell::new(ViewFeed::new(&PipelinePreset::default())));

        let mut driver = SessionStepDriver::new(
            Some(Box::new(engine)),
            SnapshotNormalizer::new(IdentityTable::default()),
            DriverConfig::default(),
        );
        driver.add_sink(Box::new(SharedFeed(feed.clone())));

        driver.start(&json!({"seed": 1})).unwrap();

        let mut emitted = 0usize;
        // 16ms host frames until the scripted match finishes
        for _ in 0..2_000 {
            driver.advance(16.0);
            emitted += feed.borrow_mut().drain_frames().len();
            if driver.state() == SessionState::Finished {
                break;
            }
        }

        assert_eq!(driver.state(), SessionState::Finished);
        assert!(emitted > 0, "feed must emit frames");

        let stats = feed.borrow().stats();
        assert_eq!(stats.delta.emitted as usize, emitted);
        assert!(stats.delta.emitted + stats.delta.dropped >= 5_000 / 250);
        // Players hold formation and the ball covers 0.375m per tick, under
        // the 0.5m threshold: the hysteresis gate must have dropped ticks.
        assert!(stats.delta.dropped > 0);
    }

    #[test]
    fn test_snapshot_positions_stay_in_bounds() {
        let engine = ScriptedEngine { t_ms: 0, finish_at_ms: 2_000 };
        struct BoundsSink(Rc<RefCell<bool>>);
        impl SessionSink for BoundsSink {
            fn on_session_event(&mut self, event: &SessionEvent<'_>) {
                if let SessionEvent::Snapshot(snap) = event {
                    let bounds = pipeline::FieldBounds::standard();
                    let ok = bounds.contains(snap.ball.pos)
                        && snap.players.iter().all(|p| bounds.contains(p.pos));
                    if !ok {
                        *self.0.borrow_mut() = false;
                    }
                }
            }
        }

        let all_in_bounds = Rc::new(RefCell::new(true));
        let mut driver = SessionStepDriver::new(
            Some(Box::new(engine)),
            SnapshotNormalizer::new(IdentityTable::default()),
            DriverConfig::default(),
        );
        driver.add_sink(Box::new(BoundsSink(all_in_bounds.clone())));
        driver.start(&json!({})).unwrap();
        for _ in 0..20 {
            driver.advance(250.0);
        }
        assert!(*all_in_bounds.borrow());
    }

    #[test]
    fn test_vec2_reexport_surface() {
        // The public surface exposes the data model directly
        let p = Vec2::new(1.0, 2.0);
        assert_eq!(p.x, 1.0);
        assert_eq!(SCHEMA_VERSION, 1);
        assert!(!VERSION.is_empty());
    }
}
