//! Render configuration.
//!
//! Defaults reproduce the tuned constants of the interactive renderer. A
//! settings file is plain JSON with any subset of the fields; missing fields
//! keep their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Hard limit on BVH depth; traversal uses a fixed-size stack.
pub const MAX_BVH_DEPTH: u32 = 128;

/// Errors that can occur while loading or validating settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid setting `{name}`: {reason}")]
    Invalid { name: &'static str, reason: String },
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// How diffuse bounce directions are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HemisphereSampling {
    /// pdf = cosθ/π
    Cosine,
    /// pdf = 1/2π
    Uniform,
}

/// How next event estimation chooses which light to sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightSelection {
    Uniform,
    /// Proportional to light surface area
    AreaWeighted,
}

/// BVH construction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhSettings {
    /// Nodes with fewer primitives than this become leaves
    pub leaf_threshold: u32,
    /// Nodes at this depth become leaves regardless of size
    pub max_depth: u32,
    /// SAH candidate bins per axis
    pub bins: u32,
    /// Evaluate SAH on all three axes instead of only the longest one
    pub split_all_axes: bool,
    /// Cost of visiting a node relative to one primitive test
    pub traversal_cost: f32,
}

impl Default for BvhSettings {
    fn default() -> Self {
        Self {
            leaf_threshold: 3,
            max_depth: MAX_BVH_DEPTH,
            bins: 32,
            split_all_axes: false,
            traversal_cost: 0.125,
        }
    }
}

/// Everything the renderer needs besides the scene and the camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Maximum ray bounce depth
    pub max_depth: u32,
    /// Iterations after which the image counts as converged
    pub target_iterations: u32,
    pub bvh: BvhSettings,
    /// Offset of light ray origins along their direction
    pub shadow_bias: f32,
    /// Offset of reflected and bounced ray origins
    pub reflection_bias: f32,
    /// Offset of refracted ray origins
    pub refraction_bias: f32,
    /// Per-sample radiance magnitude above which samples are scaled down
    pub firefly_clamp: f32,
    pub hemisphere_sampling: HemisphereSampling,
    pub light_selection: LightSelection,
    pub russian_roulette: bool,
    /// Lower bound of the continuation probability
    pub roulette_min: f32,
    /// Upper bound of the continuation probability
    pub roulette_max: f32,
    /// Bucket edge length in pixels
    pub tile_size: u32,
    /// Base seed of the per-sample random streams
    pub seed: u64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            max_depth: 8,
            target_iterations: 1024,
            bvh: BvhSettings::default(),
            shadow_bias: 0.001,
            reflection_bias: 0.01,
            refraction_bias: 0.001,
            firefly_clamp: 10.0,
            hemisphere_sampling: HemisphereSampling::Cosine,
            light_selection: LightSelection::Uniform,
            russian_roulette: true,
            roulette_min: 0.1,
            roulette_max: 0.95,
            tile_size: 64,
            seed: 0,
        }
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> SettingsError {
    SettingsError::Invalid {
        name,
        reason: reason.into(),
    }
}

impl BvhSettings {
    /// Reject parameters the builder cannot work with.
    pub fn validate(&self) -> SettingsResult<()> {
        if self.leaf_threshold == 0 {
            return Err(invalid("bvh.leaf_threshold", "must be at least 1"));
        }
        if self.max_depth > MAX_BVH_DEPTH {
            return Err(invalid(
                "bvh.max_depth",
                format!("{} exceeds the limit of {MAX_BVH_DEPTH}", self.max_depth),
            ));
        }
        if self.bins < 2 {
            return Err(invalid("bvh.bins", "need at least 2 bins to form a split"));
        }
        if !(self.traversal_cost >= 0.0) {
            return Err(invalid("bvh.traversal_cost", "must be non-negative"));
        }
        Ok(())
    }
}

impl RenderSettings {
    /// Parse settings from JSON and validate them.
    pub fn from_json_str(json: &str) -> SettingsResult<Self> {
        let settings: RenderSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file and validate them.
    pub fn from_file(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json_str(&json)?;
        log::info!("Loaded render settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Reject values that would only fail, or silently misbehave, mid-render.
    pub fn validate(&self) -> SettingsResult<()> {
        if self.max_depth == 0 {
            return Err(invalid("max_depth", "must be at least 1"));
        }
        if self.target_iterations == 0 {
            return Err(invalid("target_iterations", "must be at least 1"));
        }
        self.bvh.validate()?;
        for (name, bias) in [
            ("shadow_bias", self.shadow_bias),
            ("reflection_bias", self.reflection_bias),
            ("refraction_bias", self.refraction_bias),
        ] {
            if !(bias >= 0.0 && bias.is_finite()) {
                return Err(invalid(name, format!("{bias} is not a finite non-negative offset")));
            }
        }
        if !(self.firefly_clamp > 0.0) {
            return Err(invalid("firefly_clamp", "must be positive"));
        }
        if !(self.roulette_min > 0.0 && self.roulette_min <= self.roulette_max && self.roulette_max <= 1.0)
        {
            return Err(invalid(
                "roulette_min/roulette_max",
                format!(
                    "need 0 < min <= max <= 1, got {}..{}",
                    self.roulette_min, self.roulette_max
                ),
            ));
        }
        if self.tile_size == 0 {
            return Err(invalid("tile_size", "must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = RenderSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.max_depth, 8);
        assert_eq!(settings.bvh.bins, 32);
        assert_eq!(settings.bvh.max_depth, 128);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = RenderSettings::from_json_str(
            r#"{ "max_depth": 4, "light_selection": "area_weighted", "bvh": { "bins": 16 } }"#,
        )
        .unwrap();

        assert_eq!(settings.max_depth, 4);
        assert_eq!(settings.light_selection, LightSelection::AreaWeighted);
        assert_eq!(settings.bvh.bins, 16);
        assert_eq!(settings.bvh.leaf_threshold, 3);
        assert_eq!(settings.firefly_clamp, 10.0);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let cases: [(&str, fn(&mut RenderSettings)); 6] = [
            ("max_depth", |s| s.max_depth = 0),
            ("target_iterations", |s| s.target_iterations = 0),
            ("bvh.max_depth", |s| s.bvh.max_depth = 500),
            ("bvh.bins", |s| s.bvh.bins = 1),
            ("shadow_bias", |s| s.shadow_bias = -1.0),
            ("firefly_clamp", |s| s.firefly_clamp = 0.0),
        ];

        for (expected, mutate) in cases {
            let mut settings = RenderSettings::default();
            mutate(&mut settings);
            match settings.validate() {
                Err(SettingsError::Invalid { name, .. }) => assert_eq!(name, expected),
                other => panic!("{expected}: expected rejection, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_bvh_settings_validate_on_their_own() {
        assert!(BvhSettings::default().validate().is_ok());

        for bins in [0, 1] {
            let settings = BvhSettings {
                bins,
                ..BvhSettings::default()
            };
            assert!(matches!(
                settings.validate(),
                Err(SettingsError::Invalid { name: "bvh.bins", .. })
            ));
        }

        let settings = BvhSettings {
            leaf_threshold: 0,
            ..BvhSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Invalid { name: "bvh.leaf_threshold", .. })
        ));
    }

    #[test]
    fn test_bad_json_reports_parse_error() {
        let err = RenderSettings::from_json_str("{ max_depth: ").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));

        let err = RenderSettings::from_json_str(r#"{ "max_depth": 0 }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { name: "max_depth", .. }));
    }
}
