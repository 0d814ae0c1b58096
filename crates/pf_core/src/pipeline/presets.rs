//! Configuration presets for the feed components.
//!
//! A preset is one internally-consistent bundle: delta-filter thresholds,
//! priority-selector tiers and renderer pacing are tuned together so the
//! stateful components are never configured against each other. Presets are
//! immutable data; application goes through each component's `configure`.

use serde::{Deserialize, Serialize};

use super::aoi::{AoiConfig, AoiSelector};
use super::delta_filter::{DeltaFilter, DeltaFilterConfig};

/// Named preset tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetName {
    /// Fidelity first: tight thresholds, wide priority radii.
    Smooth,
    #[default]
    Balanced,
    /// Cost first: coarse thresholds, narrow priority radii.
    Performance,
}

impl PresetName {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "smooth" => Some(Self::Smooth),
            "balanced" => Some(Self::Balanced),
            "performance" => Some(Self::Performance),
            _ => None,
        }
    }
}

/// Rough device classification used by the default heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Mobile,
    Desktop,
    #[default]
    Unknown,
}

/// Renderer-facing pacing values carried alongside the component configs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderPacing {
    /// Snapshot buffer length the renderer keeps for smoothing.
    pub buffer_len: usize,
    /// How far behind simulation time the renderer displays, in ms.
    pub interpolation_delay_ms: u32,
    /// How far past the last sample prediction is trusted, in ms.
    pub dead_reckoning_horizon_ms: u32,
}

/// One immutable configuration bundle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelinePreset {
    pub name: PresetName,
    pub delta: DeltaFilterConfig,
    pub aoi: AoiConfig,
    pub render: RenderPacing,
}

impl Default for PipelinePreset {
    fn default() -> Self {
        Self::named(PresetName::Balanced)
    }
}

impl PipelinePreset {
    /// The bundle for a named preset.
    pub fn named(name: PresetName) -> Self {
        match name {
            PresetName::Smooth => Self {
                name,
                delta: DeltaFilterConfig {
                    ball_threshold_m: 0.25,
                    player_threshold_m: 0.25,
                    min_changed_players: 1,
                },
                aoi: AoiConfig { tier_radii_m: [15.0, 25.0, 40.0], ..AoiConfig::default() },
                render: RenderPacing {
                    buffer_len: 8,
                    interpolation_delay_ms: 100,
                    dead_reckoning_horizon_ms: 400,
                },
            },
            PresetName::Balanced => Self {
                name,
                delta: DeltaFilterConfig::default(),
                aoi: AoiConfig::default(),
                render: RenderPacing {
                    buffer_len: 6,
                    interpolation_delay_ms: 150,
                    dead_reckoning_horizon_ms: 500,
                },
            },
            PresetName::Performance => Self {
                name,
                delta: DeltaFilterConfig {
                    ball_threshold_m: 0.75,
                    player_threshold_m: 0.75,
                    min_changed_players: 3,
                },
                aoi: AoiConfig { tier_radii_m: [8.0, 16.0, 24.0], ..AoiConfig::default() },
                render: RenderPacing {
                    buffer_len: 4,
                    interpolation_delay_ms: 200,
                    dead_reckoning_horizon_ms: 500,
                },
            },
        }
    }

    /// Resolve a preset by its configuration-surface name.
    pub fn from_name_str(name: &str) -> Option<Self> {
        PresetName::parse(name).map(Self::named)
    }

    /// Pick a default preset for the hardware at hand.
    ///
    /// Mobile devices always get `performance`; otherwise the logical core
    /// count decides.
    pub fn detect_default(device: DeviceClass) -> Self {
        let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self::named(Self::pick_for(device, cores))
    }

    fn pick_for(device: DeviceClass, cores: usize) -> PresetName {
        match device {
            DeviceClass::Mobile => PresetName::Performance,
            DeviceClass::Desktop | DeviceClass::Unknown => {
                if cores >= 8 {
                    PresetName::Smooth
                } else if cores >= 4 {
                    PresetName::Balanced
                } else {
                    PresetName::Performance
                }
            }
        }
    }

    /// Push the relevant subsets into the stateful components.
    pub fn apply(&self, filter: &mut DeltaFilter, selector: &mut AoiSelector) {
        filter.configure(self.delta);
        selector.configure(self.aoi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_lookup() {
        assert_eq!(PipelinePreset::from_name_str("smooth").unwrap().name, PresetName::Smooth);
        assert_eq!(PipelinePreset::from_name_str("balanced").unwrap().name, PresetName::Balanced);
        assert_eq!(
            PipelinePreset::from_name_str("performance").unwrap().name,
            PresetName::Performance
        );
        assert!(PipelinePreset::from_name_str("turbo").is_none());
    }

    #[test]
    fn test_bundles_are_internally_ordered() {
        let smooth = PipelinePreset::named(PresetName::Smooth);
        let balanced = PipelinePreset::named(PresetName::Balanced);
        let performance = PipelinePreset::named(PresetName::Performance);

        // Fidelity decreases monotonically across the tiers
        assert!(smooth.delta.ball_threshold_m < balanced.delta.ball_threshold_m);
        assert!(balanced.delta.ball_threshold_m < performance.delta.ball_threshold_m);
        assert!(smooth.aoi.tier_radii_m[2] > performance.aoi.tier_radii_m[2]);
        assert!(smooth.render.interpolation_delay_ms < performance.render.interpolation_delay_ms);
    }

    #[test]
    fn test_hardware_heuristic() {
        assert_eq!(
            PipelinePreset::pick_for(DeviceClass::Mobile, 16),
            PresetName::Performance
        );
        assert_eq!(PipelinePreset::pick_for(DeviceClass::Desktop, 16), PresetName::Smooth);
        assert_eq!(PipelinePreset::pick_for(DeviceClass::Unknown, 6), PresetName::Balanced);
        assert_eq!(PipelinePreset::pick_for(DeviceClass::Desktop, 2), PresetName::Performance);
    }

    #[test]
    fn test_apply_configures_components() {
        let preset = PipelinePreset::named(PresetName::Performance);
        let mut filter = DeltaFilter::default();
        let mut selector = AoiSelector::default();
        preset.apply(&mut filter, &mut selector);
        assert_eq!(filter.config().min_changed_players, 3);
        assert_eq!(selector.config().tier_radii_m, [8.0, 16.0, 24.0]);
    }

    #[test]
    fn test_explicit_bundle_deserializes() {
        // Configuration surface: an explicit key/value bundle with the
        // documented threshold names.
        let preset: PipelinePreset = serde_json::from_str(
            r#"{
                "name": "balanced",
                "delta": {"ball_threshold_m": 0.4, "player_threshold_m": 0.6, "min_changed_players": 2},
                "aoi": {"mode": "ball_centric", "tier_radii_m": [12.0, 22.0, 32.0], "tier2_interval": 2, "tier3_interval": 4},
                "render": {"buffer_len": 6, "interpolation_delay_ms": 120, "dead_reckoning_horizon_ms": 500}
            }"#,
        )
        .unwrap();
        assert_eq!(preset.delta.ball_threshold_m, 0.4);
        assert_eq!(preset.aoi.tier_radii_m[0], 12.0);
    }
}
