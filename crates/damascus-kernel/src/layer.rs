//! A single lamination of the billet.

use chrono::{DateTime, Utc};
use damascus_mesh::LayerMesh;
use serde::{Deserialize, Serialize};

use crate::history::ParamMap;

/// Steel type of a layer, as it appears after etching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    /// High-nickel steel, etches light.
    Bright,
    /// High-carbon steel, etches dark.
    Dark,
}

impl Material {
    /// Tri-channel display color in `0..=1`.
    pub fn color(self) -> [f64; 3] {
        match self {
            Material::Bright => [0.9, 0.9, 0.9],
            Material::Dark => [0.2, 0.2, 0.2],
        }
    }

    /// Classify a tri-channel color: channel 0 above 0.5 is bright.
    pub fn from_color(color: [f64; 3]) -> Self {
        if color[0] > 0.5 {
            Material::Bright
        } else {
            Material::Dark
        }
    }

    /// Material of layer `index` in an alternating stack (bottom is bright).
    pub fn alternating(index: usize) -> Self {
        if index % 2 == 0 {
            Material::Bright
        } else {
            Material::Dark
        }
    }
}

/// One per-layer deformation log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeformationRecord {
    /// Short operator name (`wedge`, `twist`, `compression`, `drill`, `forge`).
    pub operation: String,
    /// When the layer was processed.
    pub timestamp: DateTime<Utc>,
    /// Operator parameters.
    pub parameters: ParamMap,
    /// Displacement statistics for this layer.
    pub stats: ParamMap,
}

/// A lamination: a thin deformable solid with a material and a stack position.
#[derive(Debug, Clone)]
pub struct Layer {
    pub(crate) index: usize,
    pub(crate) stack_position: f64,
    pub(crate) thickness: f64,
    pub(crate) color: [f64; 3],
    pub(crate) mesh: LayerMesh,
    pub(crate) deformation_history: Vec<DeformationRecord>,
}

impl Layer {
    pub(crate) fn new(
        index: usize,
        stack_position: f64,
        thickness: f64,
        material: Material,
        width: f64,
        length: f64,
    ) -> Self {
        tracing::debug!(
            index,
            stack_position,
            thickness,
            ?material,
            "creating layer"
        );
        Self {
            index,
            stack_position,
            thickness,
            color: material.color(),
            mesh: LayerMesh::slab(width, length, thickness, stack_position),
            deformation_history: Vec::new(),
        }
    }

    /// Position in the stack, 0 at the bottom.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Height-axis offset of the layer's bottom face (mm).
    pub fn stack_position(&self) -> f64 {
        self.stack_position
    }

    /// Current thickness (mm).
    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    /// Tri-channel display color.
    pub fn color(&self) -> [f64; 3] {
        self.color
    }

    /// Material derived from the color.
    pub fn material(&self) -> Material {
        Material::from_color(self.color)
    }

    /// True for high-nickel (light) layers.
    pub fn is_bright(&self) -> bool {
        self.material() == Material::Bright
    }

    /// Current geometry.
    pub fn mesh(&self) -> &LayerMesh {
        &self.mesh
    }

    /// Deformations applied to this layer, oldest first.
    pub fn deformation_history(&self) -> &[DeformationRecord] {
        &self.deformation_history
    }

    pub(crate) fn record(&mut self, operation: &str, parameters: &ParamMap, stats: ParamMap) {
        self.deformation_history.push(DeformationRecord {
            operation: operation.to_string(),
            timestamp: Utc::now(),
            parameters: parameters.clone(),
            stats,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_round_trip_through_color() {
        assert_eq!(Material::from_color(Material::Bright.color()), Material::Bright);
        assert_eq!(Material::from_color(Material::Dark.color()), Material::Dark);
        assert_eq!(Material::from_color([0.5, 1.0, 1.0]), Material::Dark);
    }

    #[test]
    fn test_alternating_starts_bright() {
        assert_eq!(Material::alternating(0), Material::Bright);
        assert_eq!(Material::alternating(1), Material::Dark);
        assert_eq!(Material::alternating(6), Material::Bright);
    }

    #[test]
    fn test_new_layer_geometry() {
        let layer = Layer::new(3, 2.4, 0.8, Material::Dark, 50.0, 100.0);
        assert_eq!(layer.index(), 3);
        assert!(!layer.is_bright());
        let bounds = layer.mesh().bounds().unwrap();
        assert!((bounds.min[2] - 2.4).abs() < 1e-12);
        assert!((bounds.max[2] - 3.2).abs() < 1e-12);
        assert!(layer.deformation_history().is_empty());
    }
}
