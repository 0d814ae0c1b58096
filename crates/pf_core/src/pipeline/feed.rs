//! Renderer-facing feed composition.
//!
//! Wires the per-tick data flow behind one preset: snapshots pass the delta
//! gate, surviving ones get a priority partition, and board layers refresh
//! from the same tick's raw payload. Output frames queue up until the host
//! drains them (once per render frame).

use serde::{Deserialize, Serialize};

use super::aoi::{AoiPartition, AoiSelector, AoiStats};
use super::delta_filter::{DeltaFilter, DeltaFilterStats};
use super::driver::{SessionEvent, SessionSink};
use super::field_board::{FieldBoard, FieldBoardSnapshotExport};
use super::presets::{PipelinePreset, RenderPacing};
use super::snapshot::StandardSnapshot;

/// One renderer-ready frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedFrame {
    pub snapshot: StandardSnapshot,
    pub partition: AoiPartition,
    /// Present when board overlays are enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<FieldBoardSnapshotExport>,
}

/// Feed-level statistics for tuning and debug overlays.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FeedStats {
    pub delta: DeltaFilterStats,
    pub aoi: AoiStats,
}

/// Session sink composing the delta filter, priority selector and board.
pub struct ViewFeed {
    filter: DeltaFilter,
    selector: AoiSelector,
    board: FieldBoard,
    pacing: RenderPacing,
    include_board_export: bool,
    frames: Vec<FeedFrame>,
}

impl ViewFeed {
    pub fn new(preset: &PipelinePreset) -> Self {
        let mut feed = Self {
            filter: DeltaFilter::default(),
            selector: AoiSelector::default(),
            board: FieldBoard::default(),
            pacing: preset.render,
            include_board_export: false,
            frames: Vec::new(),
        };
        feed.configure(preset);
        feed
    }

    /// Apply a preset bundle to every composed component.
    pub fn configure(&mut self, preset: &PipelinePreset) {
        preset.apply(&mut self.filter, &mut self.selector);
        self.pacing = preset.render;
    }

    /// Attach board overlay exports to every emitted frame.
    pub fn set_board_export_enabled(&mut self, enabled: bool) {
        self.include_board_export = enabled;
    }

    #[inline]
    pub fn pacing(&self) -> RenderPacing {
        self.pacing
    }

    #[inline]
    pub fn board(&self) -> &FieldBoard {
        &self.board
    }

    pub fn stats(&self) -> FeedStats {
        FeedStats { delta: self.filter.stats(), aoi: self.selector.stats() }
    }

    /// Frames queued since the last drain.
    pub fn drain_frames(&mut self) -> Vec<FeedFrame> {
        std::mem::take(&mut self.frames)
    }

    fn on_snapshot(&mut self, snapshot: &StandardSnapshot) {
        if !self.filter.should_emit(snapshot) {
            return;
        }
        let partition = self.selector.partition(snapshot);
        let board =
            if self.include_board_export { Some(self.board.to_snapshot_export()) } else { None };
        self.frames.push(FeedFrame { snapshot: snapshot.clone(), partition, board });
        // Renderer-side pacing: keep at most buffer_len pending frames; the
        // oldest fall off first, consumers interpolate over what remains.
        if self.frames.len() > self.pacing.buffer_len.max(1) {
            let excess = self.frames.len() - self.pacing.buffer_len.max(1);
            self.frames.drain(..excess);
        }
    }
}

impl SessionSink for ViewFeed {
    fn on_session_event(&mut self, event: &SessionEvent<'_>) {
        match event {
            SessionEvent::Started => {
                self.filter.reset();
                self.selector.reset();
                self.board.clear_layers();
                self.frames.clear();
            }
            SessionEvent::RawTick(response) => {
                if let Some(heatmaps) = &response.snapshot.heatmaps {
                    self.board.apply_heatmaps(response.t_ms, heatmaps);
                }
            }
            SessionEvent::Snapshot(snapshot) => self.on_snapshot(snapshot),
            _ => {}
        }
    }
}
