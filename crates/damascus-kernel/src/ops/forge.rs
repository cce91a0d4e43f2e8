//! Forge-to-profile: draw the billet out into a square or octagonal bar.
//!
//! The billet's current vertices, thicknesses and stack positions are
//! snapshotted before the first heat. Every heat interpolates the target
//! dimensions linearly from the snapshot toward the bar, then rescales the
//! *snapshot* by the cumulative factors. The end state therefore depends
//! only on the target, never on how many heats were taken.

use std::time::Instant;

use damascus_math::Point3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{finish, require_positive};
use crate::billet::Billet;
use crate::config::Settings;
use crate::error::{BilletError, Result};
use crate::history::{param_map, ParamMap};
use crate::report::{Diagnostics, OperationReport};

const LAYER_OPERATION: &str = "forge";

/// Cross-section profile of the finished bar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ForgeProfile {
    /// Square bar, `target_size` on a side.
    #[default]
    Square,
    /// Octagonal bar, `target_size` across flats.
    Octagon {
        /// Fraction of the bar width removed at the corners, in `[0, 1)`.
        chamfer_fraction: f64,
    },
}

impl ForgeProfile {
    /// History name for a forge to this profile.
    pub fn operation_name(&self) -> &'static str {
        match self {
            ForgeProfile::Square => "forge_square",
            ForgeProfile::Octagon { .. } => "forge_octagon",
        }
    }

    /// Cross-section area relative to the enclosing square.
    fn area_factor(&self, settings: &Settings) -> f64 {
        match self {
            ForgeProfile::Square => 1.0,
            ForgeProfile::Octagon { .. } => settings.forge.octagon_area_factor,
        }
    }

    fn chamfer_fraction(&self) -> Option<f64> {
        match *self {
            ForgeProfile::Square => None,
            ForgeProfile::Octagon { chamfer_fraction } => Some(chamfer_fraction),
        }
    }
}

/// Forge parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForgeParams {
    /// Bar side (square) or across-flats size (octagon) in mm.
    pub target_size: f64,
    /// Number of heats, at least 1.
    pub num_heats: u32,
    /// Bar profile.
    #[serde(default)]
    pub profile: ForgeProfile,
}

impl ForgeParams {
    /// Check parameters.
    pub fn validate(&self) -> Result<()> {
        require_positive(LAYER_OPERATION, "target_size", self.target_size)?;
        if self.num_heats < 1 {
            return Err(BilletError::invalid(
                LAYER_OPERATION,
                "num_heats must be at least 1",
            ));
        }
        if let Some(c) = self.profile.chamfer_fraction() {
            if !(0.0..1.0).contains(&c) {
                return Err(BilletError::invalid(
                    LAYER_OPERATION,
                    format!("chamfer_fraction must be in [0, 1), got {c}"),
                ));
            }
        }
        Ok(())
    }

    fn parameters(&self) -> ParamMap {
        let mut map = param_map(&[
            ("target_size", self.target_size),
            ("num_heats", f64::from(self.num_heats)),
        ]);
        if let Some(c) = self.profile.chamfer_fraction() {
            map.insert("chamfer_fraction".into(), c);
        }
        map
    }
}

/// Bar length that conserves `volume` at the given cross-section.
pub fn forge_final_length(volume: f64, target_size: f64, area_factor: f64) -> f64 {
    volume / (target_size * target_size * area_factor)
}

struct LayerSnapshot {
    vertices: Vec<Point3>,
    thickness: f64,
    stack_position: f64,
}

/// Forge the billet into a bar over `num_heats` heats.
///
/// Stats: `final_length`, `extension_ratio`, `volume_ratio` and
/// `chamfered_vertices` (octagon, last heat). Afterwards the billet's width
/// is the target size, its length the volume-conserving bar length, and it
/// is marked forged.
pub fn forge(billet: &mut Billet, params: &ForgeParams, settings: &Settings) -> Result<OperationReport> {
    params.validate()?;
    let area_factor = params.profile.area_factor(settings);
    if !(area_factor > 0.0 && area_factor <= 1.0) {
        return Err(BilletError::Settings(format!(
            "forge.octagon_area_factor must be in (0, 1], got {area_factor}"
        )));
    }

    let started = Instant::now();
    let mut diagnostics = Diagnostics::new();
    let limits = &settings.limits;
    limits
        .forge_size
        .check("forge target size", params.target_size, &mut diagnostics);
    limits
        .heats
        .check("heats", f64::from(params.num_heats), &mut diagnostics);

    let operation = params.profile.operation_name();
    let target = params.target_size;
    let original_width = billet.width();
    let original_length = billet.length();
    let original_height = billet.total_height();
    let original_volume = original_width * original_length * original_height;
    let final_length = forge_final_length(original_volume, target, area_factor);

    settings
        .plate
        .check("forged bar", target, final_length, &mut diagnostics);
    tracing::info!(
        operation,
        target,
        final_length,
        heats = params.num_heats,
        "forging billet"
    );

    let snapshot: Vec<LayerSnapshot> = billet
        .layers()
        .iter()
        .map(|l| LayerSnapshot {
            vertices: l.mesh.vertices.clone(),
            thickness: l.thickness,
            stack_position: l.stack_position,
        })
        .collect();

    let chamfer = params.profile.chamfer_fraction();
    let heats = params.num_heats;
    let mut chamfered = 0usize;

    for heat in 1..=heats {
        let progress = f64::from(heat) / f64::from(heats);
        let width = original_width + (target - original_width) * progress;
        let height = original_height + (target - original_height) * progress;
        let length = original_length + (final_length - original_length) * progress;

        let sx = width / original_width;
        let sy = length / original_length;
        let sz = height / original_height;
        // (scale kept for corner vertices, corner threshold)
        let corner = chamfer.map(|c| {
            let current = c * progress;
            (1.0 - current, width / 2.0 - width * current)
        });

        chamfered = billet
            .layers_mut()
            .par_iter_mut()
            .zip(snapshot.par_iter())
            .map(|(layer, original)| {
                let mut count = 0usize;
                for (v, o) in layer.mesh.vertices.iter_mut().zip(&original.vertices) {
                    let mut x = o.x * sx;
                    let mut y = o.y * sy;
                    if let Some((keep, threshold)) = corner {
                        if x.abs() > threshold && y.abs() > threshold {
                            x *= keep;
                            y *= keep;
                            count += 1;
                        }
                    }
                    *v = Point3::new(x, y, o.z * sz);
                }
                layer.thickness = original.thickness * sz;
                layer.stack_position = original.stack_position * sz;
                count
            })
            .sum();

        diagnostics.info(format!(
            "heat {heat}/{heats}: {width:.1} W x {length:.1} L x {height:.1} H mm"
        ));
        tracing::debug!(heat, sx, sy, sz, chamfered, "forging heat");
    }

    let parameters = params.parameters();
    billet.layers_mut().par_iter_mut().for_each(|layer| {
        let stats = param_map(&[("thickness_after", layer.thickness)]);
        layer.record(LAYER_OPERATION, &parameters, stats);
    });
    billet.set_forged_dimensions(target, final_length);

    let final_height = billet.total_height();
    let volume_ratio = target * final_length * final_height * area_factor / original_volume;
    let stats = param_map(&[
        ("final_length", final_length),
        ("extension_ratio", final_length / original_length),
        ("volume_ratio", volume_ratio),
        ("final_height", final_height),
        ("chamfered_vertices", chamfered as f64),
    ]);
    Ok(finish(billet, operation, parameters, stats, started, diagnostics))
}
