#![warn(missing_docs)]

//! Low-polygon layer meshes for the damascus billet kernel.
//!
//! Every lamination is a minimal box: 8 corner vertices and 12 triangles.
//! Deformations only move vertices; connectivity never changes, so a
//! deformed layer is a general hexahedron rather than a re-tessellated
//! surface.
//!
//! Two representations live here:
//!
//! - [`LayerMesh`]: the working geometry (f64 points, `[u32; 3]` triangles)
//!   that operators mutate in place.
//! - [`TriangleMesh`]: flat f32/u32 buffers with normals, handed to
//!   external mesh writers.

use damascus_math::{Point3, Vec3};
use serde::{Deserialize, Serialize};

/// Triangle table for the slab primitive.
///
/// Vertex layout (bottom face at `z0`, top face at `z1`):
/// ```text
///     v7----v6
///    /|    /|
///   v4----v5|    z
///   | v3--|-v2   | y
///   |/    |/     |/
///   v0----v1     +---x
/// ```
/// Outward normals, CCW when viewed from outside.
const SLAB_TRIANGLES: [[u32; 3]; 12] = [
    // Bottom (-z)
    [0, 2, 1],
    [0, 3, 2],
    // Top (+z)
    [4, 5, 6],
    [4, 6, 7],
    // Front (-y)
    [0, 1, 5],
    [0, 5, 4],
    // Back (+y)
    [2, 3, 7],
    [2, 7, 6],
    // Left (-x)
    [0, 4, 7],
    [0, 7, 3],
    // Right (+x)
    [1, 2, 6],
    [1, 6, 5],
];

/// Axis-aligned bounding box as `[x, y, z]` corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: [f64; 3],
    /// Maximum corner.
    pub max: [f64; 3],
}

impl Aabb {
    /// Size along each axis.
    pub fn extent(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Grow this box to contain `other`.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: [
                self.min[0].min(other.min[0]),
                self.min[1].min(other.min[1]),
                self.min[2].min(other.min[2]),
            ],
            max: [
                self.max[0].max(other.max[0]),
                self.max[1].max(other.max[1]),
                self.max[2].max(other.max[2]),
            ],
        }
    }
}

/// Working geometry of one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Triangles as indices into `vertices`.
    pub triangles: Vec<[u32; 3]>,
}

impl LayerMesh {
    /// Build a thin rectangular solid `width × length × thickness`,
    /// centered on the width/length axes with its bottom face at `base_z`.
    pub fn slab(width: f64, length: f64, thickness: f64, base_z: f64) -> Self {
        let (x0, x1) = (-width / 2.0, width / 2.0);
        let (y0, y1) = (-length / 2.0, length / 2.0);
        let (z0, z1) = (base_z, base_z + thickness);

        let vertices = vec![
            Point3::new(x0, y0, z0),
            Point3::new(x1, y0, z0),
            Point3::new(x1, y1, z0),
            Point3::new(x0, y1, z0),
            Point3::new(x0, y0, z1),
            Point3::new(x1, y0, z1),
            Point3::new(x1, y1, z1),
            Point3::new(x0, y1, z1),
        ];

        Self {
            vertices,
            triangles: SLAB_TRIANGLES.to_vec(),
        }
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// The three corner positions of a triangle.
    pub fn triangle_points(&self, tri: &[u32; 3]) -> [Point3; 3] {
        [
            self.vertices[tri[0] as usize],
            self.vertices[tri[1] as usize],
            self.vertices[tri[2] as usize],
        ]
    }

    /// Bounding box of the vertex buffer, `None` when empty.
    pub fn bounds(&self) -> Option<Aabb> {
        let first = self.vertices.first()?;
        let mut min = [first.x, first.y, first.z];
        let mut max = min;

        for v in &self.vertices[1..] {
            min[0] = min[0].min(v.x);
            min[1] = min[1].min(v.y);
            min[2] = min[2].min(v.z);
            max[0] = max[0].max(v.x);
            max[1] = max[1].max(v.y);
            max[2] = max[2].max(v.z);
        }

        Some(Aabb { min, max })
    }

    /// Mean of all vertex positions, `None` when empty.
    pub fn centroid(&self) -> Option<Point3> {
        if self.vertices.is_empty() {
            return None;
        }
        let sum = self
            .vertices
            .iter()
            .fold(Vec3::zeros(), |acc, v| acc + v.coords);
        Some(Point3::from(sum / self.vertices.len() as f64))
    }

    /// Area-weighted vertex normals.
    ///
    /// Vertices that touch only degenerate triangles get `+z`.
    pub fn vertex_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::zeros(); self.vertices.len()];

        for tri in &self.triangles {
            let [a, b, c] = self.triangle_points(tri);
            // Cross product length is twice the triangle area.
            let n = (b - a).cross(&(c - a));
            for &i in tri {
                normals[i as usize] += n;
            }
        }

        normals
            .into_iter()
            .map(|n| {
                let len = n.norm();
                if len > 1e-12 {
                    n / len
                } else {
                    Vec3::z()
                }
            })
            .collect()
    }

    /// Flatten into an export buffer with freshly computed normals.
    pub fn to_triangle_mesh(&self) -> TriangleMesh {
        let mut mesh = TriangleMesh::new();
        mesh.vertices.reserve(self.vertices.len() * 3);
        mesh.normals.reserve(self.vertices.len() * 3);
        mesh.indices.reserve(self.triangles.len() * 3);

        for v in &self.vertices {
            mesh.vertices.extend_from_slice(&[v.x as f32, v.y as f32, v.z as f32]);
        }
        for n in self.vertex_normals() {
            mesh.normals.extend_from_slice(&[n.x as f32, n.y as f32, n.z as f32]);
        }
        for tri in &self.triangles {
            mesh.indices.extend_from_slice(tri);
        }

        mesh
    }
}

/// Output triangle mesh for rendering and export.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    /// Flat array of vertex positions: `[x0, y0, z0, x1, y1, z1, ...]` (f32).
    pub vertices: Vec<f32>,
    /// Flat array of triangle indices: `[i0, i1, i2, ...]` (u32).
    pub indices: Vec<u32>,
    /// Flat array of vertex normals: `[nx0, ny0, nz0, ...]` (f32). Same length as vertices.
    pub normals: Vec<f32>,
}

impl TriangleMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Merge another mesh into this one.
    pub fn merge(&mut self, other: &TriangleMesh) {
        let offset = self.num_vertices() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.normals.extend_from_slice(&other.normals);
        self.indices.extend(other.indices.iter().map(|&i| i + offset));
    }
}
