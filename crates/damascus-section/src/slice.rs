//! Point-projection rasterizer for billet cross-sections.

use std::time::Instant;

use damascus_kernel::{Billet, Layer};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SectionError};

/// Raster background.
pub const BACKGROUND: u8 = 255;
/// Intensity of bright (high-nickel) layers.
pub const BRIGHT: u8 = 255;
/// Intensity of dark (high-carbon) layers.
pub const DARK: u8 = 50;

const MAX_RESOLUTION: usize = 8192;

/// Where and how finely to slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionSettings {
    /// Cut position along the length axis (mm).
    pub slice_position: f64,
    /// Raster side length (pixels).
    pub resolution: usize,
}

impl Default for SectionSettings {
    fn default() -> Self {
        Self {
            slice_position: 0.0,
            resolution: 500,
        }
    }
}

impl SectionSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !self.slice_position.is_finite() {
            return Err(SectionError::InvalidSettings(format!(
                "slice_position must be finite, got {}",
                self.slice_position
            )));
        }
        if self.resolution == 0 || self.resolution > MAX_RESOLUTION {
            return Err(SectionError::InvalidSettings(format!(
                "resolution must be in 1..={MAX_RESOLUTION}, got {}",
                self.resolution
            )));
        }
        Ok(())
    }
}

/// Counters gathered while rasterizing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SectionStats {
    /// Triangles examined.
    pub triangles_processed: usize,
    /// Triangles whose length range contains the slice.
    pub triangles_intersecting: usize,
    /// Pixel writes, counting overwrites.
    pub pixels_written: usize,
    /// Projected points that fell outside the raster.
    pub pixels_discarded: usize,
}

/// An `R × R` 8-bit grayscale pattern image, row-major, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    resolution: usize,
    slice_position: f64,
    pixels: Vec<u8>,
    stats: SectionStats,
}

impl CrossSection {
    /// Side length in pixels.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Where the cut was taken along the length axis.
    pub fn slice_position(&self) -> f64 {
        self.slice_position
    }

    /// Row-major pixel buffer.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Take the pixel buffer.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Pixel at `(row, col)`; row 0 is the top of the billet.
    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        if row < self.resolution && col < self.resolution {
            Some(self.pixels[row * self.resolution + col])
        } else {
            None
        }
    }

    /// One raster row.
    pub fn row(&self, row: usize) -> Option<&[u8]> {
        let start = row.checked_mul(self.resolution)?;
        self.pixels.get(start..start + self.resolution)
    }

    /// Number of pixels with the given intensity.
    pub fn count(&self, intensity: u8) -> usize {
        self.pixels.iter().filter(|&&p| p == intensity).count()
    }

    /// True if nothing but background is present.
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&p| p == BACKGROUND)
    }

    /// Rasterization counters.
    pub fn stats(&self) -> SectionStats {
        self.stats
    }
}

/// World-to-pixel mapping: width across, height up.
#[derive(Debug, Clone, Copy)]
struct Viewport {
    x_min: f64,
    x_max: f64,
    z_min: f64,
    z_max: f64,
    resolution: usize,
}

impl Viewport {
    /// Truncates toward zero, then drops anything outside `[0, R)`.
    fn project(&self, x: f64, z: f64) -> Option<usize> {
        let r = self.resolution as i64;
        let px = ((x - self.x_min) / (self.x_max - self.x_min) * self.resolution as f64) as i64;
        let pz = ((z - self.z_min) / (self.z_max - self.z_min) * self.resolution as f64) as i64;
        if (0..r).contains(&px) && (0..r).contains(&pz) {
            let row = (r - 1 - pz) as usize;
            Some(row * self.resolution + px as usize)
        } else {
            None
        }
    }
}

#[derive(Default)]
struct LayerWrites {
    writes: Vec<usize>,
    intensity: u8,
    triangles: usize,
    intersecting: usize,
    discarded: usize,
}

fn project_layer(layer: &Layer, slice: f64, viewport: &Viewport) -> LayerWrites {
    let mesh = layer.mesh();
    let mut out = LayerWrites {
        intensity: if layer.is_bright() { BRIGHT } else { DARK },
        triangles: mesh.num_triangles(),
        ..Default::default()
    };

    for tri in &mesh.triangles {
        let pts = mesh.triangle_points(tri);
        let y_min = pts.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let y_max = pts.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        if !(y_min <= slice && slice <= y_max) {
            continue;
        }
        out.intersecting += 1;

        // Every (x, z) pairing of the three corners, not just the corners.
        for a in &pts {
            for b in &pts {
                match viewport.project(a.x, b.z) {
                    Some(index) => out.writes.push(index),
                    None => out.discarded += 1,
                }
            }
        }
    }
    out
}

/// Rasterize the billet's current geometry at `settings.slice_position`.
///
/// The raster spans `[-width/2, width/2]` across and `[0, total_height]`
/// upward. Each triangle whose length range contains the slice paints the
/// nine `(x, z)` pairings of its corners in its layer's intensity. Layers
/// are painted bottom to top and later layers win. This is a coarse point
/// projection, not a polygon fill. Points that project outside the raster
/// are dropped, not clamped to the edge, and counted in `pixels_discarded`.
/// The billet is not modified.
pub fn extract_cross_section(billet: &Billet, settings: &SectionSettings) -> Result<CrossSection> {
    settings.validate()?;
    let width = billet.width();
    let height = billet.total_height();
    if billet.layers().is_empty() || !(width > 0.0 && height > 0.0) {
        return Err(SectionError::EmptyBillet);
    }

    let started = Instant::now();
    let resolution = settings.resolution;
    let viewport = Viewport {
        x_min: -width / 2.0,
        x_max: width / 2.0,
        z_min: 0.0,
        z_max: height,
        resolution,
    };
    let slice = settings.slice_position;

    let per_layer: Vec<LayerWrites> = billet
        .layers()
        .par_iter()
        .map(|layer| project_layer(layer, slice, &viewport))
        .collect();

    let mut pixels = vec![BACKGROUND; resolution * resolution];
    let mut stats = SectionStats::default();
    for layer in &per_layer {
        for &index in &layer.writes {
            pixels[index] = layer.intensity;
        }
        stats.triangles_processed += layer.triangles;
        stats.triangles_intersecting += layer.intersecting;
        stats.pixels_written += layer.writes.len();
        stats.pixels_discarded += layer.discarded;
    }

    tracing::info!(
        slice,
        resolution,
        triangles_processed = stats.triangles_processed,
        triangles_intersecting = stats.triangles_intersecting,
        pixels_written = stats.pixels_written,
        elapsed_seconds = started.elapsed().as_secs_f64(),
        "extracted cross-section"
    );

    Ok(CrossSection {
        resolution,
        slice_position: slice,
        pixels,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use damascus_kernel::ops::{forge, ForgeParams, ForgeProfile};
    use damascus_kernel::{BilletConfig, Material, Settings};

    fn three_layers() -> Billet {
        Billet::from_layers(
            4.0,
            10.0,
            &[
                (1.0, Material::Bright),
                (1.0, Material::Dark),
                (2.0, Material::Bright),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_slice_outside_billet_is_background() {
        let billet = Billet::from_config(&BilletConfig::default()).unwrap();
        let section = extract_cross_section(
            &billet,
            &SectionSettings {
                slice_position: 1000.0,
                resolution: 64,
            },
        )
        .unwrap();
        assert!(section.is_blank());
        assert_eq!(section.pixels().len(), 64 * 64);
        assert_eq!(section.stats().triangles_processed, 360);
        assert_eq!(section.stats().triangles_intersecting, 0);
        assert_eq!(section.stats().pixels_written, 0);
    }

    #[test]
    fn test_point_projection_and_last_writer_wins() {
        let billet = three_layers();
        let section = extract_cross_section(
            &billet,
            &SectionSettings {
                slice_position: 0.0,
                resolution: 8,
            },
        )
        .unwrap();

        // Only the -x corners (column 0) land inside; x = +2 and z = 4 map
        // to pixel 8 and are dropped. Corner heights 0, 1, 2 land on rows
        // 7, 5 and 3.
        assert_eq!(section.get(7, 0), Some(BRIGHT));
        assert_eq!(section.get(5, 0), Some(DARK));
        // Layer 1 paints row 3 dark, then layer 2 paints it bright.
        assert_eq!(section.get(3, 0), Some(BRIGHT));
        assert_eq!(section.count(DARK), 1);
        // Dropped corners leave the last column untouched.
        assert_eq!(section.get(5, 7), Some(BACKGROUND));

        let stats = section.stats();
        // Bottom, top and both side faces span y = 0; the end caps do not.
        assert_eq!(stats.triangles_intersecting, 3 * 8);
        assert_eq!(
            stats.pixels_written + stats.pixels_discarded,
            9 * stats.triangles_intersecting
        );
    }

    #[test]
    fn test_slice_at_end_cap_boundary_is_inclusive() {
        let billet = three_layers();
        let section = extract_cross_section(
            &billet,
            &SectionSettings {
                slice_position: 5.0,
                resolution: 8,
            },
        )
        .unwrap();
        // All faces but the -y cap touch y = 5.
        assert_eq!(section.stats().triangles_intersecting, 3 * 10);
    }

    #[test]
    fn test_extraction_does_not_touch_billet() {
        let billet = Billet::from_config(&BilletConfig::default()).unwrap();
        let before: Vec<_> = billet.layers().iter().map(|l| l.mesh().clone()).collect();
        extract_cross_section(&billet, &SectionSettings::default()).unwrap();
        assert!(billet.history().is_empty());
        for (layer, original) in billet.layers().iter().zip(&before) {
            assert_eq!(layer.mesh(), original);
        }
    }

    #[test]
    fn test_forged_bar_uses_new_extents() {
        let mut billet = Billet::from_config(&BilletConfig::default()).unwrap();
        forge(
            &mut billet,
            &ForgeParams {
                target_size: 15.0,
                num_heats: 3,
                profile: ForgeProfile::Square,
            },
            &Settings::default(),
        )
        .unwrap();
        let section = extract_cross_section(
            &billet,
            &SectionSettings {
                slice_position: 100.0,
                resolution: 100,
            },
        )
        .unwrap();
        // The bar is now 533 mm long, so y = 100 cuts every layer.
        assert_eq!(section.stats().triangles_intersecting, 30 * 8);
        assert!(!section.is_blank());
    }

    #[test]
    fn test_invalid_settings() {
        let billet = three_layers();
        for settings in [
            SectionSettings {
                resolution: 0,
                ..Default::default()
            },
            SectionSettings {
                slice_position: f64::NAN,
                ..Default::default()
            },
        ] {
            assert!(matches!(
                extract_cross_section(&billet, &settings),
                Err(SectionError::InvalidSettings(_))
            ));
        }
    }

    #[test]
    fn test_row_access() {
        let billet = three_layers();
        let section = extract_cross_section(
            &billet,
            &SectionSettings {
                slice_position: 0.0,
                resolution: 8,
            },
        )
        .unwrap();
        assert_eq!(section.row(5).unwrap()[0], DARK);
        assert!(section.row(8).is_none());
        assert_eq!(section.get(0, 8), None);
    }
}
