//! Proximity-based update-priority selection.
//!
//! Bounds per-tick update cost by refreshing entities far from the point of
//! interest (the ball) less often, without ever losing track of them: a
//! low-priority entity stays in the data model, consumers reuse its last
//! known state until its tier comes up again.

use serde::{Deserialize, Serialize};

use super::snapshot::{StandardSnapshot, Vec2, TRACK_COUNT};

/// Selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AoiMode {
    /// Every entity is high priority (full-fidelity analysis views).
    Full,
    /// Tier by distance from the ball.
    #[default]
    BallCentric,
    /// Reserved. Accepted in configuration; tiers around the supplied focus
    /// point once a camera source exists, the ball until then.
    CameraCentric,
}

/// Tier radii and refresh cadence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AoiConfig {
    pub mode: AoiMode,
    /// Outer edge of tiers 0..=2 in meters; beyond the last radius is tier 3.
    pub tier_radii_m: [f32; 3],
    /// Tier 2 refreshes every `tier2_interval` frames.
    pub tier2_interval: u64,
    /// Tier 3 refreshes every `tier3_interval` frames.
    pub tier3_interval: u64,
}

impl Default for AoiConfig {
    fn default() -> Self {
        Self {
            mode: AoiMode::BallCentric,
            tier_radii_m: [10.0, 20.0, 30.0],
            tier2_interval: 2,
            tier3_interval: 4,
        }
    }
}

/// One frame's partition. Low-priority entities are deprioritized for
/// refresh, never dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AoiPartition {
    pub high_priority: Vec<u8>,
    pub low_priority: Vec<u8>,
}

/// Cumulative selection counts for tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AoiStats {
    pub high_total: u64,
    pub low_total: u64,
}

/// Stateful selector. The frame counter lives for one session.
#[derive(Debug, Clone, Default)]
pub struct AoiSelector {
    config: AoiConfig,
    frame_counter: u64,
    stats: AoiStats,
}

impl AoiSelector {
    pub fn new(config: AoiConfig) -> Self {
        Self { config, ..Self::default() }
    }

    pub fn configure(&mut self, config: AoiConfig) {
        self.config = config;
    }

    #[inline]
    pub fn config(&self) -> &AoiConfig {
        &self.config
    }

    #[inline]
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    #[inline]
    pub fn stats(&self) -> AoiStats {
        self.stats
    }

    /// Distance tier around the focus point: 0..=3.
    fn tier_of(&self, d: f32) -> usize {
        let radii = &self.config.tier_radii_m;
        if d < radii[0] {
            0
        } else if d < radii[1] {
            1
        } else if d < radii[2] {
            2
        } else {
            3
        }
    }

    fn refresh_this_frame(&self, tier: usize) -> bool {
        match tier {
            0 | 1 => true,
            2 => self.frame_counter % self.config.tier2_interval.max(1) == 0,
            _ => self.frame_counter % self.config.tier3_interval.max(1) == 0,
        }
    }

    /// Partition all tracked entities for this frame, then advance the frame
    /// counter.
    pub fn partition(&mut self, snapshot: &StandardSnapshot) -> AoiPartition {
        self.partition_around(snapshot, snapshot.ball.pos)
    }

    /// Partition around an explicit focus point (camera modes supply theirs).
    pub fn partition_around(&mut self, snapshot: &StandardSnapshot, focus: Vec2) -> AoiPartition {
        let mut out = AoiPartition {
            high_priority: Vec::with_capacity(TRACK_COUNT),
            low_priority: Vec::new(),
        };

        for (track_id, player) in snapshot.players.iter().enumerate() {
            let high = match self.config.mode {
                AoiMode::Full => true,
                AoiMode::BallCentric | AoiMode::CameraCentric => {
                    let tier = self.tier_of(player.pos.distance_to(focus));
                    self.refresh_this_frame(tier)
                }
            };
            if high {
                out.high_priority.push(track_id as u8);
            } else {
                out.low_priority.push(track_id as u8);
            }
        }

        self.stats.high_total += out.high_priority.len() as u64;
        self.stats.low_total += out.low_priority.len() as u64;
        self.frame_counter += 1;
        out
    }

    /// Clear the frame counter and counters at a session boundary.
    pub fn reset(&mut self) {
        self.frame_counter = 0;
        self.stats = AoiStats::default();
    }
}
