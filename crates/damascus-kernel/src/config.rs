//! Billet construction parameters and tunable settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BilletError, Result};
use crate::report::Diagnostics;

/// Layer-stack configuration for an alternating bright/dark billet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BilletConfig {
    /// Total number of layers.
    pub layer_count: usize,
    /// Thickness of bright (even-index) layers (mm).
    pub white_thickness: f64,
    /// Thickness of dark (odd-index) layers (mm).
    pub black_thickness: f64,
    /// Billet width (mm).
    pub width: f64,
    /// Billet length (mm).
    pub length: f64,
}

impl Default for BilletConfig {
    fn default() -> Self {
        Self {
            layer_count: 30,
            white_thickness: 0.8,
            black_thickness: 0.8,
            width: 50.0,
            length: 100.0,
        }
    }
}

impl BilletConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.layer_count < 1 {
            return Err(BilletError::InvalidConfig(
                "layer_count must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("white_thickness", self.white_thickness),
            ("black_thickness", self.black_thickness),
            ("width", self.width),
            ("length", self.length),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(BilletError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Sum of all layer thicknesses (mm).
    pub fn total_height(&self) -> f64 {
        let bright = self.layer_count.div_ceil(2) as f64;
        let dark = (self.layer_count / 2) as f64;
        bright * self.white_thickness + dark * self.black_thickness
    }
}

/// Inclusive typical range for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl ParameterRange {
    /// Create a range.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// True if `value` lies in `[min, max]`.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Add a warning to `diagnostics` when `value` is outside the range.
    pub fn check(&self, name: &str, value: f64, diagnostics: &mut Diagnostics) {
        if !self.contains(value) {
            diagnostics.warn(format!(
                "{name} = {value} is outside the typical range [{}, {}]",
                self.min, self.max
            ));
        }
    }
}

/// Typical parameter ranges. Values outside these are allowed but flagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterLimits {
    /// Wedge depth (mm).
    pub wedge_depth: ParameterRange,
    /// Wedge half-angle (degrees).
    pub wedge_angle: ParameterRange,
    /// Wedge split gap (mm).
    pub split_gap: ParameterRange,
    /// Total twist (degrees).
    pub twist_angle: ParameterRange,
    /// Compression factor.
    pub compression_factor: ParameterRange,
    /// Drill radius (mm).
    pub drill_radius: ParameterRange,
    /// Forge target size (mm).
    pub forge_size: ParameterRange,
    /// Number of forging heats.
    pub heats: ParameterRange,
}

impl Default for ParameterLimits {
    fn default() -> Self {
        Self {
            wedge_depth: ParameterRange::new(5.0, 30.0),
            wedge_angle: ParameterRange::new(20.0, 50.0),
            split_gap: ParameterRange::new(2.0, 15.0),
            twist_angle: ParameterRange::new(45.0, 360.0),
            compression_factor: ParameterRange::new(0.3, 0.95),
            drill_radius: ParameterRange::new(3.0, 15.0),
            forge_size: ParameterRange::new(5.0, 100.0),
            heats: ParameterRange::new(1.0, 20.0),
        }
    }
}

/// Forge-to-profile tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeSettings {
    /// Fraction of the enclosing square's area kept by an octagonal bar.
    ///
    /// An empirical allowance for material lost at the chamfered corners,
    /// not a function of the chamfer fraction.
    pub octagon_area_factor: f64,
}

impl Default for ForgeSettings {
    fn default() -> Self {
        Self {
            octagon_area_factor: 0.95,
        }
    }
}

/// Workspace footprint used for advisory size checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildPlate {
    /// Plate extent along the width axis (mm).
    pub width: f64,
    /// Plate extent along the length axis (mm).
    pub length: f64,
}

impl Default for BuildPlate {
    fn default() -> Self {
        Self {
            width: 400.0,
            length: 400.0,
        }
    }
}

impl BuildPlate {
    /// True if a `width × length` footprint fits on the plate.
    pub fn fits(&self, width: f64, length: f64) -> bool {
        width <= self.width && length <= self.length
    }

    /// Smallest plate, at least as large as this one, that holds the
    /// footprint with a 10 % margin.
    pub fn resized_to_fit(&self, width: f64, length: f64) -> BuildPlate {
        BuildPlate {
            width: self.width.max(width * 1.1),
            length: self.length.max(length * 1.1),
        }
    }

    /// Warn in `diagnostics` when the footprint does not fit.
    pub fn check(&self, subject: &str, width: f64, length: f64, diagnostics: &mut Diagnostics) {
        if !self.fits(width, length) {
            let resized = self.resized_to_fit(width, length);
            diagnostics.warn(format!(
                "{subject} ({width:.1} x {length:.1} mm) exceeds build plate \
                 ({:.0} x {:.0} mm); a {:.0} x {:.0} mm plate would fit",
                self.width, self.length, resized.width, resized.length
            ));
        }
    }
}

/// Workflow policy applied by [`crate::Session`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Reject twists until the billet has been forged to a bar.
    pub require_forge_before_twist: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            require_forge_before_twist: true,
        }
    }
}

/// All tunables, loadable from TOML. Every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Typical parameter ranges.
    pub limits: ParameterLimits,
    /// Forge tuning.
    pub forge: ForgeSettings,
    /// Build plate footprint.
    pub plate: BuildPlate,
    /// Session policy.
    pub session: SessionSettings,
}

impl Settings {
    /// Parse settings from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(s).map_err(|e| BilletError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        let factor = self.forge.octagon_area_factor;
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(BilletError::Settings(format!(
                "forge.octagon_area_factor must be in (0, 1], got {factor}"
            )));
        }
        if !(self.plate.width > 0.0 && self.plate.length > 0.0) {
            return Err(BilletError::Settings(
                "plate dimensions must be positive".into(),
            ));
        }
        let l = &self.limits;
        for (name, range) in [
            ("wedge_depth", l.wedge_depth),
            ("wedge_angle", l.wedge_angle),
            ("split_gap", l.split_gap),
            ("twist_angle", l.twist_angle),
            ("compression_factor", l.compression_factor),
            ("drill_radius", l.drill_radius),
            ("forge_size", l.forge_size),
            ("heats", l.heats),
        ] {
            if range.min > range.max {
                return Err(BilletError::Settings(format!(
                    "limits.{name}: min {} exceeds max {}",
                    range.min, range.max
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = BilletConfig::default();
        assert!(config.validate().is_ok());
        assert_relative_eq!(config.total_height(), 24.0, epsilon = 1e-9);
    }

    #[test]
    fn test_total_height_odd_count() {
        let config = BilletConfig {
            layer_count: 5,
            white_thickness: 1.0,
            black_thickness: 2.0,
            ..Default::default()
        };
        // 3 bright + 2 dark
        assert_relative_eq!(config.total_height(), 7.0);
    }

    #[test]
    fn test_invalid_configs() {
        let zero_layers = BilletConfig {
            layer_count: 0,
            ..Default::default()
        };
        assert!(zero_layers.validate().is_err());

        let negative = BilletConfig {
            black_thickness: -0.5,
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let flat = BilletConfig {
            width: 0.0,
            ..Default::default()
        };
        assert!(flat.validate().is_err());

        let nan = BilletConfig {
            length: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_range_check_warns() {
        let mut diag = Diagnostics::new();
        let range = ParameterRange::new(5.0, 30.0);
        range.check("depth", 18.0, &mut diag);
        assert!(diag.is_empty());
        range.check("depth", 40.0, &mut diag);
        assert_eq!(diag.warnings().count(), 1);
    }

    #[test]
    fn test_build_plate() {
        let plate = BuildPlate::default();
        assert!(plate.fits(50.0, 100.0));
        assert!(!plate.fits(15.0, 533.3));
        let resized = plate.resized_to_fit(15.0, 533.3);
        assert_relative_eq!(resized.width, 400.0);
        assert_relative_eq!(resized.length, 586.63, epsilon = 1e-9);

        let mut diag = Diagnostics::new();
        plate.check("forged bar", 15.0, 533.3, &mut diag);
        assert_eq!(diag.warnings().count(), 1);
    }

    #[test]
    fn test_settings_from_partial_toml() {
        let settings = Settings::from_toml_str(
            r#"
            [forge]
            octagon_area_factor = 0.9

            [plate]
            width = 600.0

            [limits.heats]
            min = 1.0
            max = 40.0
            "#,
        )
        .unwrap();
        assert_relative_eq!(settings.forge.octagon_area_factor, 0.9);
        assert_relative_eq!(settings.plate.width, 600.0);
        assert_relative_eq!(settings.plate.length, 400.0);
        assert_relative_eq!(settings.limits.heats.max, 40.0);
        assert_relative_eq!(settings.limits.wedge_depth.max, 30.0);
        assert!(settings.session.require_forge_before_twist);
    }

    #[test]
    fn test_settings_rejects_bad_area_factor() {
        let err = Settings::from_toml_str("[forge]\noctagon_area_factor = 1.5\n").unwrap_err();
        assert!(matches!(err, BilletError::Settings(_)));
    }

    #[test]
    fn test_settings_rejects_malformed_toml() {
        assert!(matches!(
            Settings::from_toml_str("[forge\n"),
            Err(BilletError::Settings(_))
        ));
    }
}
