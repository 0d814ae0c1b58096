//! Realtime match-state synchronization pipeline.
//!
//! Data flow: the session driver accumulates host time and steps the engine;
//! raw results are normalized into canonical snapshots; snapshots pass the
//! delta gate and the priority selector; board layers refresh from the same
//! tick; the composed feed hands renderer-ready frames to the host.

pub mod aoi; // proximity-based update-priority selection
pub mod delta_filter; // change-detection gate (hysteresis against last emit)
pub mod driver; // fixed-step session driver + state machine
pub mod events; // normalized events + wire-shape adapter
pub mod feed; // renderer-facing composition of filter/selector/board
pub mod field_board; // fixed spatial grid + engine-supplied heatmap layers
pub mod frames; // raw tick samples, history buffers, packed decoding
pub mod identity; // track-id resolution + roster table
pub mod normalizer; // interpolation + dead-reckoning into StandardSnapshot
pub mod presets; // named configuration bundles + hardware heuristic
pub mod raw; // tolerant typed wire model for the engine boundary
pub mod snapshot; // canonical per-tick data model

pub use aoi::{AoiConfig, AoiMode, AoiPartition, AoiSelector, AoiStats};
pub use delta_filter::{DeltaFilter, DeltaFilterConfig, DeltaFilterStats};
pub use driver::{
    DriverConfig, EngineHandle, SessionEvent, SessionSink, SessionState, SessionStepDriver,
    MAX_STEPS_PER_FRAME, STEP_MS,
};
pub use events::{normalize_event, substitution_swap, NormalizedEvent};
pub use feed::{FeedFrame, FeedStats, ViewFeed};
pub use field_board::{
    BoardSummaryExport, CellIndex, FieldBoard, FieldBoardSnapshotExport, FieldBoardSpec,
    FieldBounds, HeatmapF32, NeighborMode, FIELD_LENGTH_M, FIELD_WIDTH_M,
};
pub use frames::{FrameHistory, RawTickFrame};
pub use identity::{resolve_track_str, resolve_track_value, IdentityTable, RosterDoc, TeamSide};
pub use normalizer::{
    dead_reckon, interpolate, normalize_step_events, SnapshotNormalizer, PREDICTION_HORIZON_S,
};
pub use presets::{DeviceClass, PipelinePreset, PresetName, RenderPacing};
pub use raw::{EngineAck, RawBall, RawHeatmaps, RawSnapshotPayload, RawStepResponse, StepRequest};
pub use snapshot::{
    team_of, BallState, PlayerAction, PlayerState, Score, StandardSnapshot, Vec2, NO_TRACK,
    TRACK_COUNT,
};
