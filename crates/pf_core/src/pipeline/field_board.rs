//! Fixed spatial grid over the pitch.
//!
//! - Truth = meters (105x68)
//! - Board = view/query layer (cells)
//! - Heatmap layers (occupancy + pressure) arrive fully computed from the
//!   engine's per-tick payload and are wholesale-replaced here. This
//!   component never accumulates; it only looks up and exports.

use serde::{Deserialize, Serialize};

use super::identity::TeamSide;
use super::raw::RawHeatmaps;
use super::snapshot::Vec2;

pub const FIELD_LENGTH_M: f32 = 105.0;
pub const FIELD_WIDTH_M: f32 = 68.0;

/// Neighbor lookup mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborMode {
    VonNeumann4,
    Moore8,
}

/// A cell index in (col,row). Both are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellIndex {
    pub col: u8,
    pub row: u8,
}

impl CellIndex {
    #[inline]
    pub fn id(self, cols: u8) -> usize {
        (self.row as usize) * (cols as usize) + (self.col as usize)
    }
}

/// Board configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FieldBoardSpec {
    pub cols: u8,
    pub rows: u8,
}

impl Default for FieldBoardSpec {
    fn default() -> Self {
        // 28x18 (~3.75m x 3.78m per cell, 504 cells)
        Self { cols: 28, rows: 18 }
    }
}

/// Scalar heatmap container, stored row-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapF32 {
    pub cols: u8,
    pub rows: u8,
    pub values: Vec<f32>, // len = cols*rows
}

impl HeatmapF32 {
    pub fn new(cols: u8, rows: u8) -> Self {
        let len = (cols as usize) * (rows as usize);
        Self { cols, rows, values: vec![0.0; len] }
    }

    #[inline]
    pub fn get(&self, c: CellIndex) -> f32 {
        self.values[c.id(self.cols)]
    }

    /// Replace the layer with an engine-supplied vector. Short payloads zero
    /// the tail, long payloads are truncated; either way the layer keeps its
    /// fixed length.
    pub fn replace(&mut self, source: &[f32]) {
        for (i, slot) in self.values.iter_mut().enumerate() {
            *slot = source.get(i).copied().unwrap_or(0.0);
        }
    }

    pub fn clear(&mut self) {
        for v in &mut self.values {
            *v = 0.0;
        }
    }

    pub fn max_value(&self) -> f32 {
        self.values.iter().cloned().fold(0.0_f32, f32::max)
    }
}

/// Field boundaries for coordinate clamping.
///
/// Contract: positions handed to the renderer are within field bounds
/// - X axis: 0.0 to FIELD_LENGTH_M (105.0m)
/// - Y axis: 0.0 to FIELD_WIDTH_M (68.0m)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldBounds {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

impl FieldBounds {
    /// Standard football field bounds (105m x 68m)
    pub fn standard() -> Self {
        Self { x_min: 0.0, x_max: FIELD_LENGTH_M, y_min: 0.0, y_max: FIELD_WIDTH_M }
    }

    /// Check if position is within bounds
    pub fn contains(&self, pos: Vec2) -> bool {
        pos.x >= self.x_min && pos.x <= self.x_max && pos.y >= self.y_min && pos.y <= self.y_max
    }

    /// Clamp position to bounds
    pub fn clamp(&self, pos: Vec2) -> Vec2 {
        Vec2::new(pos.x.clamp(self.x_min, self.x_max), pos.y.clamp(self.y_min, self.y_max))
    }
}

impl Default for FieldBounds {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================

/// Board runtime storage: grid geometry plus the engine-supplied layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldBoard {
    pub spec: FieldBoardSpec,
    pub cell_w_m: f32,
    pub cell_h_m: f32,

    /// Tick of the last wholesale layer replacement.
    pub layers_version_tick: u64,

    pub occupancy_total: HeatmapF32,
    pub occupancy_home: HeatmapF32,
    pub occupancy_away: HeatmapF32,
    pub pressure_against_home: HeatmapF32,
    pub pressure_against_away: HeatmapF32,
}

impl Default for FieldBoard {
    fn default() -> Self {
        Self::new(FieldBoardSpec::default())
    }
}

impl FieldBoard {
    pub fn new(spec: FieldBoardSpec) -> Self {
        let cell_w_m = FIELD_LENGTH_M / spec.cols as f32;
        let cell_h_m = FIELD_WIDTH_M / spec.rows as f32;
        Self {
            spec,
            cell_w_m,
            cell_h_m,
            layers_version_tick: 0,
            occupancy_total: HeatmapF32::new(spec.cols, spec.rows),
            occupancy_home: HeatmapF32::new(spec.cols, spec.rows),
            occupancy_away: HeatmapF32::new(spec.cols, spec.rows),
            pressure_against_home: HeatmapF32::new(spec.cols, spec.rows),
            pressure_against_away: HeatmapF32::new(spec.cols, spec.rows),
        }
    }

    #[inline]
    pub fn cols(&self) -> u8 {
        self.spec.cols
    }
    #[inline]
    pub fn rows(&self) -> u8 {
        self.spec.rows
    }
    #[inline]
    pub fn cell_count(&self) -> usize {
        (self.spec.cols as usize) * (self.spec.rows as usize)
    }

    /// Clamp a meter coordinate into field bounds.
    #[inline]
    pub fn clamp_to_field(pos: Vec2) -> Vec2 {
        Vec2::new(pos.x.clamp(0.0, FIELD_LENGTH_M), pos.y.clamp(0.0, FIELD_WIDTH_M))
    }

    /// Convert meter position to cell.
    /// This is a view mapping; it clamps out-of-bounds into the nearest valid cell.
    #[inline]
    pub fn cell_of(&self, pos: Vec2) -> CellIndex {
        let p = Self::clamp_to_field(pos);
        let mut col = (p.x / self.cell_w_m).floor() as i32;
        let mut row = (p.y / self.cell_h_m).floor() as i32;
        // edge case: x == length => last col; y == width => last row
        if col >= self.spec.cols as i32 {
            col = self.spec.cols as i32 - 1;
        }
        if row >= self.spec.rows as i32 {
            row = self.spec.rows as i32 - 1;
        }
        if col < 0 {
            col = 0;
        }
        if row < 0 {
            row = 0;
        }
        CellIndex { col: col as u8, row: row as u8 }
    }

    /// Cell center in meters.
    #[inline]
    pub fn cell_center(&self, cell: CellIndex) -> Vec2 {
        Vec2::new(
            (cell.col as f32 + 0.5) * self.cell_w_m,
            (cell.row as f32 + 0.5) * self.cell_h_m,
        )
    }

    /// Neighbor cells, clipped at grid edges (fewer than the full set at
    /// borders and corners).
    pub fn neighbors(&self, cell: CellIndex, mode: NeighborMode) -> Vec<CellIndex> {
        let c = cell.col as i32;
        let r = cell.row as i32;
        let cols = self.spec.cols as i32;
        let rows = self.spec.rows as i32;

        let capacity = match mode {
            NeighborMode::VonNeumann4 => 4,
            NeighborMode::Moore8 => 8,
        };
        let mut out = Vec::with_capacity(capacity);

        let push_if = |out: &mut Vec<CellIndex>, cc: i32, rr: i32| {
            if cc >= 0 && cc < cols && rr >= 0 && rr < rows {
                out.push(CellIndex { col: cc as u8, row: rr as u8 });
            }
        };

        match mode {
            NeighborMode::VonNeumann4 => {
                push_if(&mut out, c + 1, r);
                push_if(&mut out, c - 1, r);
                push_if(&mut out, c, r + 1);
                push_if(&mut out, c, r - 1);
            }
            NeighborMode::Moore8 => {
                for dr in -1..=1 {
                    for dc in -1..=1 {
                        if dc == 0 && dr == 0 {
                            continue;
                        }
                        push_if(&mut out, c + dc, r + dr);
                    }
                }
            }
        }

        out
    }

    /// Wholesale-replace every layer from the engine's per-tick payload.
    pub fn apply_heatmaps(&mut self, current_tick: u64, source: &RawHeatmaps) {
        self.occupancy_total.replace(&source.occupancy_total);
        self.occupancy_home.replace(&source.occupancy_home);
        self.occupancy_away.replace(&source.occupancy_away);
        self.pressure_against_home.replace(&source.pressure_against_home);
        self.pressure_against_away.replace(&source.pressure_against_away);
        self.layers_version_tick = current_tick;
    }

    pub fn clear_layers(&mut self) {
        self.occupancy_total.clear();
        self.occupancy_home.clear();
        self.occupancy_away.clear();
        self.pressure_against_home.clear();
        self.pressure_against_away.clear();
        self.layers_version_tick = 0;
    }

    /// Total occupancy at a meter position (point query).
    pub fn occupancy_at(&self, pos: Vec2) -> f32 {
        self.occupancy_total.get(self.cell_of(pos))
    }

    /// Pressure against the given side at a meter position.
    pub fn pressure_at(&self, pos: Vec2, side: TeamSide) -> f32 {
        let cell = self.cell_of(pos);
        match side {
            TeamSide::Home => self.pressure_against_home.get(cell),
            TeamSide::Away => self.pressure_against_away.get(cell),
        }
    }

    /// Export the full board for viewer overlays.
    pub fn to_snapshot_export(&self) -> FieldBoardSnapshotExport {
        FieldBoardSnapshotExport {
            cols: self.spec.cols,
            rows: self.spec.rows,
            cell_w_m: self.cell_w_m,
            cell_h_m: self.cell_h_m,
            occupancy_total: self.occupancy_total.values.clone(),
            occupancy_home: self.occupancy_home.values.clone(),
            occupancy_away: self.occupancy_away.values.clone(),
            pressure_against_home: self.pressure_against_home.values.clone(),
            pressure_against_away: self.pressure_against_away.values.clone(),
        }
    }

    /// Small summary export for post-match tooling.
    /// Full heatmaps go through `to_snapshot_export`, not this.
    pub fn to_summary_export(&self, top_k: usize) -> BoardSummaryExport {
        let mut hot: Vec<(CellIndex, f32)> = Vec::new();
        for row in 0..self.rows() {
            for col in 0..self.cols() {
                let cell = CellIndex { col, row };
                let v = self.occupancy_total.get(cell);
                if v > 0.0 {
                    hot.push((cell, v));
                }
            }
        }
        hot.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        hot.truncate(top_k.min(hot.len()));

        BoardSummaryExport {
            cols: self.cols(),
            rows: self.rows(),
            cell_w_m: self.cell_w_m,
            cell_h_m: self.cell_h_m,
            occupancy_max: self.occupancy_total.max_value(),
            pressure_max_against_home: self.pressure_against_home.max_value(),
            pressure_max_against_away: self.pressure_against_away.max_value(),
            hottest_occupancy_cells: hot
                .into_iter()
                .map(|(c, v)| HotCellExport { col: c.col, row: c.row, value: v })
                .collect(),
        }
    }
}

/// Full board snapshot for viewer overlays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldBoardSnapshotExport {
    pub cols: u8,
    pub rows: u8,
    pub cell_w_m: f32,
    pub cell_h_m: f32,
    pub occupancy_total: Vec<f32>, // len = cols*rows (504 for 28x18)
    pub occupancy_home: Vec<f32>,
    pub occupancy_away: Vec<f32>,
    pub pressure_against_home: Vec<f32>,
    pub pressure_against_away: Vec<f32>,
}

/// Minimal board summary (no full heatmap dump).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSummaryExport {
    pub cols: u8,
    pub rows: u8,
    pub cell_w_m: f32,
    pub cell_h_m: f32,

    pub occupancy_max: f32,
    pub pressure_max_against_home: f32,
    pub pressure_max_against_away: f32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hottest_occupancy_cells: Vec<HotCellExport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotCellExport {
    pub col: u8,
    pub row: u8,
    pub value: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_of_origin_and_far_corner() {
        let board = FieldBoard::default();

        let origin = board.cell_of(Vec2::new(0.0, 0.0));
        assert_eq!(origin.id(board.cols()), 0);

        // Exact far corner clamps into the last valid cell, never out of range
        let corner = board.cell_of(Vec2::new(FIELD_LENGTH_M, FIELD_WIDTH_M));
        assert_eq!(corner.col, board.cols() - 1);
        assert_eq!(corner.row, board.rows() - 1);
        assert_eq!(corner.id(board.cols()), board.cell_count() - 1);
    }

    #[test]
    fn test_cell_of_out_of_bounds_clamps() {
        let board = FieldBoard::default();
        let cell = board.cell_of(Vec2::new(-10.0, 200.0));
        assert_eq!(cell.col, 0);
        assert_eq!(cell.row, board.rows() - 1);
    }

    #[test]
    fn test_cell_center_roundtrip() {
        let board = FieldBoard::default();
        for &(x, y) in &[(0.5, 0.5), (52.5, 34.0), (104.9, 67.9)] {
            let cell = board.cell_of(Vec2::new(x, y));
            let center = board.cell_center(cell);
            assert_eq!(board.cell_of(center), cell);
        }
    }

    #[test]
    fn test_neighbors_clipped_at_corner() {
        let board = FieldBoard::default();
        let corner = CellIndex { col: 0, row: 0 };
        assert_eq!(board.neighbors(corner, NeighborMode::Moore8).len(), 3);
        assert_eq!(board.neighbors(corner, NeighborMode::VonNeumann4).len(), 2);

        let mid = CellIndex { col: 10, row: 10 };
        assert_eq!(board.neighbors(mid, NeighborMode::Moore8).len(), 8);
    }

    #[test]
    fn test_apply_heatmaps_replaces_wholesale() {
        let mut board = FieldBoard::default();
        let cells = board.cell_count();

        let mut source = RawHeatmaps::default();
        source.occupancy_total = vec![1.0; cells];
        source.pressure_against_home = vec![0.5; cells];
        board.apply_heatmaps(10, &source);
        assert_eq!(board.layers_version_tick, 10);
        assert_eq!(board.occupancy_at(Vec2::new(52.5, 34.0)), 1.0);
        assert_eq!(board.pressure_at(Vec2::new(1.0, 1.0), TeamSide::Home), 0.5);

        // Next tick replaces, never accumulates
        let mut next = RawHeatmaps::default();
        next.occupancy_total = vec![2.0; cells];
        board.apply_heatmaps(11, &next);
        assert_eq!(board.occupancy_at(Vec2::new(52.5, 34.0)), 2.0);
        // pressure layer absent from the payload -> zeroed
        assert_eq!(board.pressure_at(Vec2::new(1.0, 1.0), TeamSide::Home), 0.0);
    }

    #[test]
    fn test_short_payload_zero_fills() {
        let mut board = FieldBoard::default();
        let mut source = RawHeatmaps::default();
        source.occupancy_total = vec![3.0; 10]; // far short of 504
        board.apply_heatmaps(1, &source);
        assert_eq!(board.occupancy_total.values.len(), board.cell_count());
        assert_eq!(board.occupancy_total.values[9], 3.0);
        assert_eq!(board.occupancy_total.values[10], 0.0);
    }

    #[test]
    fn test_summary_export_top_k() {
        let mut board = FieldBoard::default();
        let cells = board.cell_count();
        let mut occupancy = vec![0.0; cells];
        occupancy[0] = 1.0;
        occupancy[7] = 4.0;
        occupancy[100] = 2.0;
        let source = RawHeatmaps { occupancy_total: occupancy, ..RawHeatmaps::default() };
        board.apply_heatmaps(5, &source);

        let summary = board.to_summary_export(2);
        assert_eq!(summary.occupancy_max, 4.0);
        assert_eq!(summary.hottest_occupancy_cells.len(), 2);
        assert_eq!(summary.hottest_occupancy_cells[0].value, 4.0);
    }
}
