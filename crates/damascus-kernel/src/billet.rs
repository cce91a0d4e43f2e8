//! The layered workpiece.

use damascus_mesh::Aabb;

use crate::config::BilletConfig;
use crate::error::{BilletError, Result};
use crate::history::{OperationHistory, OperationLog, OperationRecord};
use crate::layer::{Layer, Material};
use crate::stats::{BilletInfo, BilletStats};

/// An ordered stack of layers plus billet-wide dimensions and history.
///
/// Layers are created bottom to top and are never added or removed
/// afterwards; operators only move their vertices and rescale their
/// thickness and stack position.
#[derive(Debug, Clone)]
pub struct Billet {
    width: f64,
    length: f64,
    layers: Vec<Layer>,
    history: OperationHistory,
    forged: bool,
}

impl Billet {
    /// Build an alternating bright/dark stack, bright at the bottom.
    pub fn from_config(config: &BilletConfig) -> Result<Self> {
        config.validate()?;
        let stack: Vec<(f64, Material)> = (0..config.layer_count)
            .map(|i| {
                let material = Material::alternating(i);
                let thickness = match material {
                    Material::Bright => config.white_thickness,
                    Material::Dark => config.black_thickness,
                };
                (thickness, material)
            })
            .collect();
        Self::from_layers(config.width, config.length, &stack)
    }

    /// Build a stack from explicit `(thickness, material)` pairs, bottom first.
    pub fn from_layers(width: f64, length: f64, stack: &[(f64, Material)]) -> Result<Self> {
        if stack.is_empty() {
            return Err(BilletError::InvalidConfig(
                "a billet needs at least one layer".into(),
            ));
        }
        if !(width.is_finite() && width > 0.0 && length.is_finite() && length > 0.0) {
            return Err(BilletError::InvalidConfig(format!(
                "billet dimensions must be positive, got {width} x {length}"
            )));
        }
        if let Some((i, (t, _))) = stack
            .iter()
            .enumerate()
            .find(|(_, (t, _))| !(t.is_finite() && *t > 0.0))
        {
            return Err(BilletError::InvalidConfig(format!(
                "layer {i} thickness must be positive, got {t}"
            )));
        }

        let mut layers = Vec::with_capacity(stack.len());
        let mut z = 0.0;
        for (index, &(thickness, material)) in stack.iter().enumerate() {
            layers.push(Layer::new(index, z, thickness, material, width, length));
            z += thickness;
        }

        tracing::info!(
            layers = layers.len(),
            width,
            length,
            height = z,
            "created billet"
        );

        Ok(Self {
            width,
            length,
            layers,
            history: OperationHistory::new(),
            forged: false,
        })
    }

    /// Billet width (mm).
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Billet length (mm).
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Layers, bottom first.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Layer by index.
    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    /// Operation history.
    pub fn history(&self) -> &OperationHistory {
        &self.history
    }

    /// True once forged to a square or octagonal bar.
    pub fn is_forged(&self) -> bool {
        self.forged
    }

    /// Sum of current layer thicknesses (mm).
    pub fn total_height(&self) -> f64 {
        self.layers.iter().map(|l| l.thickness).sum()
    }

    /// Nominal volume `width · length · total_height` (mm³).
    pub fn volume(&self) -> f64 {
        self.width * self.length * self.total_height()
    }

    /// Bounding box of all layer geometry.
    pub fn bounds(&self) -> Option<Aabb> {
        self.layers
            .iter()
            .filter_map(|l| l.mesh.bounds())
            .reduce(|a, b| a.union(&b))
    }

    /// Append a record to the operation history.
    pub fn record(&mut self, record: OperationRecord) {
        tracing::debug!(operation = %record.operation, "recorded operation");
        self.history.push(record);
    }

    pub(crate) fn take_history(&mut self) -> OperationHistory {
        std::mem::take(&mut self.history)
    }

    pub(crate) fn set_history(&mut self, history: OperationHistory) {
        self.history = history;
    }

    /// Snapshot statistics.
    pub fn stats(&self) -> BilletStats {
        BilletStats::of(self)
    }

    /// History export document with a fresh statistics snapshot.
    pub fn operation_log(&self) -> OperationLog {
        OperationLog {
            billet_info: BilletInfo::of(self),
            operations: self.history.records().to_vec(),
            final_stats: self.stats(),
        }
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub(crate) fn set_forged_dimensions(&mut self, width: f64, length: f64) {
        self.width = width;
        self.length = length;
        self.forged = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_config_alternates_and_stacks() {
        let billet = Billet::from_config(&BilletConfig {
            layer_count: 4,
            white_thickness: 1.0,
            black_thickness: 0.5,
            width: 20.0,
            length: 40.0,
        })
        .unwrap();
        let layers = billet.layers();
        assert_eq!(layers.len(), 4);
        assert!(layers[0].is_bright());
        assert!(!layers[1].is_bright());
        let positions: Vec<f64> = layers.iter().map(|l| l.stack_position()).collect();
        assert_eq!(positions, vec![0.0, 1.0, 1.5, 2.5]);
        assert_relative_eq!(billet.total_height(), 3.0);
        assert_relative_eq!(billet.volume(), 20.0 * 40.0 * 3.0);
    }

    #[test]
    fn test_stack_positions_non_decreasing() {
        let billet = Billet::from_config(&BilletConfig::default()).unwrap();
        for pair in billet.layers().windows(2) {
            assert!(pair[0].stack_position() <= pair[1].stack_position());
        }
    }

    #[test]
    fn test_from_layers_custom_stack() {
        let billet = Billet::from_layers(
            30.0,
            60.0,
            &[
                (2.0, Material::Dark),
                (0.5, Material::Bright),
                (2.0, Material::Dark),
            ],
        )
        .unwrap();
        assert!(!billet.layers()[0].is_bright());
        assert_relative_eq!(billet.layers()[2].stack_position(), 2.5);
        let b = billet.bounds().unwrap();
        assert_relative_eq!(b.max[2], 4.5);
        assert_relative_eq!(b.min[0], -15.0);
    }

    #[test]
    fn test_invalid_construction() {
        assert!(matches!(
            Billet::from_layers(10.0, 10.0, &[]),
            Err(BilletError::InvalidConfig(_))
        ));
        assert!(Billet::from_layers(-1.0, 10.0, &[(1.0, Material::Bright)]).is_err());
        assert!(Billet::from_layers(10.0, 10.0, &[(0.0, Material::Bright)]).is_err());
        assert!(Billet::from_config(&BilletConfig {
            white_thickness: 0.0,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_operation_log_json() {
        let mut billet = Billet::from_config(&BilletConfig::default()).unwrap();
        billet.record(OperationRecord::new(
            "compression",
            crate::history::param_map(&[("factor", 0.5)]),
            0.001,
            Default::default(),
        ));
        let json = billet.operation_log().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["billetInfo"]["layerCount"], 30);
        assert_eq!(value["operations"][0]["operationName"], "compression");
        assert_eq!(value["finalStats"]["operationCount"], 1);

        let parsed = OperationLog::from_json(&json).unwrap();
        assert_eq!(parsed.operations.len(), 1);
    }
}
