//! Raw per-entity tick samples and the fixed-point packed encodings.
//!
//! The engine emits position history in several shapes: floating-point meter
//! arrays, flat packed arrays (f32 or i16 fixed point), and compact replay
//! frames. This module owns the sample type, the per-entity history buffer
//! the normalizer interpolates over, and the 0.1-unit quantization helpers.

use serde::{Deserialize, Serialize};

use super::snapshot::TRACK_COUNT;

/// Fixed-point scale: 1 unit = 0.1 m (10 units per meter).
pub const QUANT_SCALE: f32 = 10.0;

/// Channels per entity in packed flat arrays: x, y, vx, vy.
pub const PACKED_CHANNELS: usize = 4;

/// How much sample history each entity keeps, in seconds. Two seconds covers
/// any interpolation delay a preset can configure plus the prediction horizon.
pub const HISTORY_WINDOW_S: f32 = 2.0;

/// Quantize a meter value to 0.1-unit fixed point.
#[inline]
pub fn quantize(v: f32) -> i16 {
    (v * QUANT_SCALE).round() as i16
}

/// Expand a 0.1-unit fixed-point value back to meters.
#[inline]
pub fn dequantize(q: i16) -> f32 {
    q as f32 / QUANT_SCALE
}

/// One historical sample for one entity. Times are seconds of simulation
/// time; positions and velocities are meters / meters-per-second.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawTickFrame {
    pub t: f32,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub vx: f32,
    #[serde(default)]
    pub vy: f32,
    /// Height channel; only meaningful for the ball.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
    /// Discrete animation state. Snaps, never blends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl RawTickFrame {
    pub fn at(t: f32, x: f32, y: f32) -> Self {
        Self { t, x, y, ..Self::default() }
    }

    pub fn with_velocity(mut self, vx: f32, vy: f32) -> Self {
        self.vx = vx;
        self.vy = vy;
        self
    }
}

// ============================================================================
// FrameHistory
// ============================================================================

/// Time-ordered sample history for a single entity.
///
/// Samples are appended per tick and pruned against [`HISTORY_WINDOW_S`].
/// Out-of-order arrivals are inserted at the right position so bracketing
/// stays a simple linear scan.
#[derive(Debug, Clone, Default)]
pub struct FrameHistory {
    samples: Vec<RawTickFrame>,
}

impl FrameHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: RawTickFrame) {
        match self.samples.last() {
            Some(last) if frame.t < last.t => {
                let idx = self.samples.partition_point(|s| s.t <= frame.t);
                self.samples.insert(idx, frame);
            }
            _ => self.samples.push(frame),
        }
        self.prune();
    }

    fn prune(&mut self) {
        if let Some(newest) = self.samples.last().map(|s| s.t) {
            let cutoff = newest - HISTORY_WINDOW_S;
            self.samples.retain(|s| s.t >= cutoff);
        }
    }

    #[inline]
    pub fn last(&self) -> Option<&RawTickFrame> {
        self.samples.last()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Bracketing samples for a target time: the latest sample with
    /// `t_sample <= t` and the earliest with `t_sample >= t`.
    pub fn bracket(&self, t: f32) -> (Option<&RawTickFrame>, Option<&RawTickFrame>) {
        let mut before: Option<&RawTickFrame> = None;
        let mut after: Option<&RawTickFrame> = None;
        for sample in &self.samples {
            if sample.t <= t {
                before = Some(sample);
            }
            if sample.t >= t {
                after = Some(sample);
                break;
            }
        }
        (before, after)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

// ============================================================================
// Packed flat arrays (22 entities x up to 4 channels)
// ============================================================================

fn channels_for(len: usize) -> usize {
    // Payloads carry either position-only (2) or position+velocity (4)
    // channels per entity. Anything shorter decodes as far as it reaches.
    if len >= TRACK_COUNT * PACKED_CHANNELS {
        PACKED_CHANNELS
    } else {
        2
    }
}

/// Decode a packed flat f32 array into per-entity samples at time `t`.
///
/// Layout is entity-major: `[x0, y0, vx0, vy0, x1, ...]`. Missing channels
/// fall back to zero rather than failing the frame.
pub fn unpack_f32(values: &[f32], t: f32) -> [RawTickFrame; TRACK_COUNT] {
    let channels = channels_for(values.len());
    std::array::from_fn(|i| {
        let base = i * channels;
        let get = |offset: usize| values.get(base + offset).copied().unwrap_or(0.0);
        RawTickFrame {
            t,
            x: get(0),
            y: get(1),
            vx: if channels >= 4 { get(2) } else { 0.0 },
            vy: if channels >= 4 { get(3) } else { 0.0 },
            z: None,
            state: None,
        }
    })
}

/// Decode a packed fixed-point i16 array (0.1-unit precision).
pub fn unpack_i16(values: &[i16], t: f32) -> [RawTickFrame; TRACK_COUNT] {
    let channels = channels_for(values.len());
    std::array::from_fn(|i| {
        let base = i * channels;
        let get = |offset: usize| values.get(base + offset).copied().map(dequantize).unwrap_or(0.0);
        RawTickFrame {
            t,
            x: get(0),
            y: get(1),
            vx: if channels >= 4 { get(2) } else { 0.0 },
            vy: if channels >= 4 { get(3) } else { 0.0 },
            z: None,
            state: None,
        }
    })
}
