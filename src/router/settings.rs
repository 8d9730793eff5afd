//! Routing settings, track/via sizes and design rules
//!
//! All three are plain serde structs with defaults so a partial JSON file
//! (or none at all) yields a usable configuration.

use super::direction::{CornerMode, Direction45};
use super::error::{Result, RouterError};
use super::item::{LayerRange, ViaType};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Conflict resolution strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterMode {
    /// Obstacles are flagged, never avoided
    MarkObstacles,
    #[default]
    Walkaround,
    Shove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerEffort {
    Low,
    #[default]
    Medium,
    Full,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    pub mode: RouterMode,
    /// Infer posture from the mouse trail and keep the tail minimal
    pub follow_mouse: bool,
    pub allow_drc_violations: bool,
    /// Straight pad exits when optimizing
    pub smart_pads: bool,
    /// Remove redundant parallel routes after reaching an end item
    pub remove_loops: bool,
    /// Any-angle routing (only meaningful in mark-obstacles mode)
    pub free_angle: bool,
    pub corner_mode: CornerMode,
    pub optimizer_effort: OptimizerEffort,
    pub walkaround_iteration_limit: usize,
    /// Partial hug results longer than this multiple of the straight
    /// route are rejected in favour of the closest-to-cursor prefix
    pub walkaround_hug_length_threshold: f64,
    pub shove_iteration_limit: usize,
    pub initial_direction: Direction45,
    /// Only horizontal/vertical segments
    pub orthogonal: bool,
    /// Commit every segment on fix instead of keeping the last one floating
    pub fix_all_segments: bool,
    /// Let the trail tracer pick the posture
    pub auto_posture: bool,
    pub clearance: i64,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            mode: RouterMode::Walkaround,
            follow_mouse: true,
            allow_drc_violations: false,
            smart_pads: true,
            remove_loops: true,
            free_angle: false,
            corner_mode: CornerMode::Mitered45,
            optimizer_effort: OptimizerEffort::Medium,
            walkaround_iteration_limit: 40,
            walkaround_hug_length_threshold: 1.5,
            shove_iteration_limit: 250,
            initial_direction: Direction45::N,
            orthogonal: false,
            fix_all_segments: false,
            auto_posture: true,
            clearance: DesignRules::default().clearance,
        }
    }
}

impl RoutingSettings {
    pub fn validate(&self) -> Result<()> {
        if self.walkaround_iteration_limit == 0 {
            return Err(RouterError::InvalidSetting {
                key: "walkaround_iteration_limit".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.walkaround_hug_length_threshold.is_nan() || self.walkaround_hug_length_threshold < 1.0 {
            return Err(RouterError::InvalidSetting {
                key: "walkaround_hug_length_threshold".to_string(),
                reason: "must be >= 1.0".to_string(),
            });
        }
        if self.clearance < 0 {
            return Err(RouterError::InvalidSetting {
                key: "clearance".to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let settings: RoutingSettings = serde_json::from_str(&text)
            .with_context(|| format!("parsing settings in {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).with_context(|| format!("writing settings to {}", path.display()))
    }

    pub fn rules(&self) -> DesignRules {
        DesignRules { clearance: self.clearance }
    }
}

/// Track and via dimensions for the trace being placed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizesSettings {
    pub track_width: i64,
    /// Width was chosen explicitly and overrides the start item's width
    pub width_is_explicit: bool,
    pub via_diameter: i64,
    pub via_drill: i64,
    pub via_type: ViaType,
    pub via_layers: LayerRange,
}

impl Default for SizesSettings {
    fn default() -> Self {
        Self {
            track_width: 250_000,
            width_is_explicit: false,
            via_diameter: 600_000,
            via_drill: 300_000,
            via_type: ViaType::Through,
            via_layers: LayerRange::new(0, 31),
        }
    }
}

/// Clearance rules (nanometers)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesignRules {
    pub clearance: i64,
}

impl Default for DesignRules {
    fn default() -> Self {
        Self {
            clearance: 150_000, // 6 mil
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let s: RoutingSettings = serde_json::from_str(r#"{"mode":"shove","orthogonal":true}"#).unwrap();
        assert_eq!(s.mode, RouterMode::Shove);
        assert!(s.orthogonal);
        assert!(s.follow_mouse);
        assert_eq!(s.corner_mode, CornerMode::Mitered45);
    }

    #[test]
    fn test_validate_rejects_zero_iterations() {
        let s = RoutingSettings { walkaround_iteration_limit: 0, ..Default::default() };
        assert!(matches!(s.validate(), Err(RouterError::InvalidSetting { .. })));
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routing.json");
        let s = RoutingSettings { mode: RouterMode::MarkObstacles, clearance: 42, ..Default::default() };
        s.save(&path).unwrap();
        let back = RoutingSettings::load(&path).unwrap();
        assert_eq!(back, s);
    }
}
