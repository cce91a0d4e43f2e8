//! Mesh hand-off to external file writers.

use std::io;
use std::time::Instant;

use damascus_mesh::TriangleMesh;
use rayon::prelude::*;

use crate::billet::Billet;
use crate::error::{BilletError, Result};
use crate::history::{param_map, OperationRecord};
use crate::layer::Material;
use crate::report::{Diagnostics, OperationReport};

const OPERATION: &str = "export_mesh";

/// An export buffer with the layer it came from.
#[derive(Debug, Clone)]
pub struct TaggedMesh {
    /// Suggested file stem, e.g. `layer_003`.
    pub name: String,
    /// Source layer, `None` for a merged billet mesh.
    pub layer_index: Option<usize>,
    /// Source material, `None` for a merged billet mesh.
    pub material: Option<Material>,
    /// Geometry.
    pub mesh: TriangleMesh,
}

/// A file-format serializer for billet meshes (STL, OBJ, ...).
pub trait MeshWriter {
    /// Short format name for logs and history, e.g. `stl`.
    fn format(&self) -> &str;

    /// Serialize the meshes.
    fn write_meshes(&mut self, meshes: &[TaggedMesh]) -> io::Result<()>;
}

impl Billet {
    /// One export buffer per layer, bottom first.
    pub fn layer_meshes(&self) -> Vec<TaggedMesh> {
        self.layers()
            .par_iter()
            .map(|layer| TaggedMesh {
                name: format!("layer_{:03}", layer.index()),
                layer_index: Some(layer.index()),
                material: Some(layer.material()),
                mesh: layer.mesh().to_triangle_mesh(),
            })
            .collect()
    }

    /// All layers merged into one export buffer.
    pub fn merged_mesh(&self) -> TaggedMesh {
        let mut mesh = TriangleMesh::new();
        for layer in self.layer_meshes() {
            mesh.merge(&layer.mesh);
        }
        TaggedMesh {
            name: "billet".into(),
            layer_index: None,
            material: None,
            mesh,
        }
    }

    /// Hand the current geometry to `writer`, per layer or merged.
    ///
    /// The attempt is recorded in the history with a `success` stat whether
    /// or not the writer fails; geometry is never touched.
    pub fn export_meshes(&mut self, writer: &mut dyn MeshWriter, merge: bool) -> Result<OperationReport> {
        let started = Instant::now();
        let meshes = if merge {
            vec![self.merged_mesh()]
        } else {
            self.layer_meshes()
        };
        let triangles: usize = meshes.iter().map(|m| m.mesh.num_triangles()).sum();
        let outcome = writer.write_meshes(&meshes);
        let duration_seconds = started.elapsed().as_secs_f64();

        let parameters = param_map(&[("merged", if merge { 1.0 } else { 0.0 })]);
        let stats = param_map(&[
            ("success", if outcome.is_ok() { 1.0 } else { 0.0 }),
            ("meshes", meshes.len() as f64),
            ("triangles", triangles as f64),
        ]);
        self.record(OperationRecord::new(
            OPERATION,
            parameters.clone(),
            duration_seconds,
            stats.clone(),
        ));

        match outcome {
            Ok(()) => {
                tracing::info!(
                    format = writer.format(),
                    meshes = meshes.len(),
                    triangles,
                    "exported billet mesh"
                );
                Ok(OperationReport {
                    operation: OPERATION.to_string(),
                    parameters,
                    stats,
                    duration_seconds,
                    diagnostics: Diagnostics::new(),
                })
            }
            Err(e) => {
                tracing::error!(format = writer.format(), error = %e, "mesh export failed");
                Err(BilletError::Io(e))
            }
        }
    }
}
