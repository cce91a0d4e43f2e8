//! Snapshot statistics for layers and the whole billet.

use chrono::{DateTime, Utc};
use damascus_mesh::Aabb;
use serde::{Deserialize, Serialize};

use crate::billet::Billet;
use crate::layer::{Layer, Material};

/// Geometry summary of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerStats {
    /// Layer index.
    pub index: usize,
    /// Vertex count.
    pub vertex_count: usize,
    /// Triangle count.
    pub triangle_count: usize,
    /// Current bounding box, `None` for an empty mesh.
    pub bounds: Option<Aabb>,
    /// Mean vertex position `[x, y, z]`.
    pub center: Option<[f64; 3]>,
    /// Material.
    pub material: Material,
    /// Current thickness (mm).
    pub thickness: f64,
    /// Number of deformations applied.
    pub deformation_count: usize,
}

impl LayerStats {
    pub(crate) fn of(layer: &Layer) -> Self {
        let mesh = layer.mesh();
        Self {
            index: layer.index(),
            vertex_count: mesh.num_vertices(),
            triangle_count: mesh.num_triangles(),
            bounds: mesh.bounds(),
            center: mesh.centroid().map(|c| [c.x, c.y, c.z]),
            material: layer.material(),
            thickness: layer.thickness(),
            deformation_count: layer.deformation_history().len(),
        }
    }
}

/// Whole-billet snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BilletStats {
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// Number of layers.
    pub layer_count: usize,
    /// Sum of layer thicknesses (mm).
    pub total_height: f64,
    /// Billet width (mm).
    pub width: f64,
    /// Billet length (mm).
    pub length: f64,
    /// Vertices over all layers.
    pub total_vertices: usize,
    /// Triangles over all layers.
    pub total_triangles: usize,
    /// Recorded operations.
    pub operation_count: usize,
    /// True once forged to a bar.
    pub forged: bool,
    /// Per-layer detail, bottom first.
    pub layers: Vec<LayerStats>,
}

impl BilletStats {
    pub(crate) fn of(billet: &Billet) -> Self {
        let layers: Vec<LayerStats> = billet.layers().iter().map(LayerStats::of).collect();
        Self {
            timestamp: Utc::now(),
            layer_count: layers.len(),
            total_height: billet.total_height(),
            width: billet.width(),
            length: billet.length(),
            total_vertices: layers.iter().map(|l| l.vertex_count).sum(),
            total_triangles: layers.iter().map(|l| l.triangle_count).sum(),
            operation_count: billet.history().len(),
            forged: billet.is_forged(),
            layers,
        }
    }
}

/// Billet dimensions as written at the head of an operation log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BilletInfo {
    /// Width (mm).
    pub width_mm: f64,
    /// Length (mm).
    pub length_mm: f64,
    /// Number of layers.
    pub layer_count: usize,
    /// Total height (mm).
    pub total_height_mm: f64,
}

impl BilletInfo {
    pub(crate) fn of(billet: &Billet) -> Self {
        Self {
            width_mm: billet.width(),
            length_mm: billet.length(),
            layer_count: billet.layers().len(),
            total_height_mm: billet.total_height(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BilletConfig;
    use approx::assert_relative_eq;

    #[test]
    fn test_stats_of_fresh_billet() {
        let billet = Billet::from_config(&BilletConfig::default()).unwrap();
        let stats = billet.stats();
        assert_eq!(stats.layer_count, 30);
        assert_eq!(stats.total_vertices, 240);
        assert_eq!(stats.total_triangles, 360);
        assert_eq!(stats.operation_count, 0);
        assert!(!stats.forged);
        assert_relative_eq!(stats.total_height, 24.0, epsilon = 1e-9);

        let top = &stats.layers[29];
        assert_eq!(top.material, Material::Dark);
        assert_eq!(top.deformation_count, 0);
        let center = top.center.unwrap();
        assert_relative_eq!(center[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(center[2], 23.6, epsilon = 1e-9);
    }

    #[test]
    fn test_billet_info() {
        let billet = Billet::from_config(&BilletConfig::default()).unwrap();
        let info = BilletInfo::of(&billet);
        assert_relative_eq!(info.width_mm, 50.0);
        assert_relative_eq!(info.length_mm, 100.0);
        assert_eq!(info.layer_count, 30);
    }
}
