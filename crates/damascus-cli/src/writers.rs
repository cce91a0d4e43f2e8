//! File writers behind the kernel's export seams: binary STL and PNG.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use damascus_kernel::{MeshWriter, TaggedMesh};
use damascus_section::CrossSection;
use damascus_section::RasterWriter;
use image::GrayImage;

const STL_HEADER: &[u8; 80] =
    b"damascus billet STL export                                                      ";

/// Encode indexed triangles as binary STL with per-facet normals.
pub fn stl_bytes(vertices: &[f32], indices: &[u32]) -> Vec<u8> {
    let num_triangles = indices.len() / 3;
    let mut data = Vec::with_capacity(84 + num_triangles * 50);

    data.extend_from_slice(STL_HEADER);
    data.extend_from_slice(&(num_triangles as u32).to_le_bytes());

    let corner = |i: u32| {
        let i = i as usize * 3;
        [vertices[i], vertices[i + 1], vertices[i + 2]]
    };

    for tri in indices.chunks_exact(3) {
        let [v0, v1, v2] = [corner(tri[0]), corner(tri[1]), corner(tri[2])];

        let e1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
        let e2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
        let n = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        // Collapsed facets (a fully pinched drill corner) get +z.
        let n = if len > 1e-10 {
            [n[0] / len, n[1] / len, n[2] / len]
        } else {
            [0.0, 0.0, 1.0]
        };

        for c in n.iter().chain(&v0).chain(&v1).chain(&v2) {
            data.extend_from_slice(&c.to_le_bytes());
        }
        data.extend_from_slice(&0u16.to_le_bytes());
    }

    data
}

/// Writes each tagged mesh to `<dir>/<prefix>_<name>.stl`.
pub struct StlWriter {
    dir: PathBuf,
    prefix: String,
    written: Vec<PathBuf>,
}

impl StlWriter {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            written: Vec::new(),
        }
    }

    /// Files written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl MeshWriter for StlWriter {
    fn format(&self) -> &str {
        "stl"
    }

    fn write_meshes(&mut self, meshes: &[TaggedMesh]) -> io::Result<()> {
        for tagged in meshes {
            let path = self.dir.join(format!("{}_{}.stl", self.prefix, tagged.name));
            fs::write(&path, stl_bytes(&tagged.mesh.vertices, &tagged.mesh.indices))?;
            tracing::debug!(path = %path.display(), triangles = tagged.mesh.num_triangles(), "wrote STL");
            self.written.push(path);
        }
        Ok(())
    }
}

/// Writes a cross-section as an 8-bit grayscale PNG.
pub struct PngWriter {
    path: PathBuf,
}

impl PngWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RasterWriter for PngWriter {
    fn format(&self) -> &str {
        "png"
    }

    fn write_raster(&mut self, section: &CrossSection) -> io::Result<()> {
        let side = u32::try_from(section.resolution())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let img = GrayImage::from_raw(side, side, section.pixels().to_vec()).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "raster does not match its resolution")
        })?;
        img.save(&self.path).map_err(io::Error::other)
    }
}
