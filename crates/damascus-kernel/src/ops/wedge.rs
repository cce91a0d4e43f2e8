//! Feather split: a wedge driven down the center line of the billet.
//!
//! The displacement field is a Gaussian in `|x|` (σ = width / 3) scaled by
//! the layer's relative height, so top layers are pulled down and apart the
//! most and the bottom layer does not move. Layers fold over the wedge like
//! a waterfall.

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{finish, require_finite, require_positive};
use crate::billet::Billet;
use crate::config::{ParameterLimits, Settings};
use crate::error::{BilletError, Result};
use crate::history::{param_map, ParamMap};
use crate::report::{Diagnostics, DisplacementStats, OperationReport};

pub(crate) const OPERATION: &str = "wedge_deformation";
const LAYER_OPERATION: &str = "wedge";

/// Wedge parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WedgeParams {
    /// Penetration depth (mm).
    pub depth: f64,
    /// Wedge half-angle from vertical (degrees).
    pub angle_degrees: f64,
    /// Extra lateral opening at the split (mm). Negative values close the
    /// split and are flagged as out of the typical range.
    pub split_gap: f64,
}

impl WedgeParams {
    /// Check parameters.
    pub fn validate(&self) -> Result<()> {
        require_positive(OPERATION, "depth", self.depth)?;
        require_finite(OPERATION, "angle_degrees", self.angle_degrees)?;
        require_finite(OPERATION, "split_gap", self.split_gap)?;
        if !(0.0..90.0).contains(&self.angle_degrees) {
            return Err(BilletError::invalid(
                OPERATION,
                format!("angle_degrees must be in [0, 90), got {}", self.angle_degrees),
            ));
        }
        Ok(())
    }

    fn check_limits(&self, limits: &ParameterLimits, diagnostics: &mut Diagnostics) {
        limits.wedge_depth.check("wedge depth", self.depth, diagnostics);
        limits
            .wedge_angle
            .check("wedge angle", self.angle_degrees, diagnostics);
        limits.split_gap.check("split gap", self.split_gap, diagnostics);
    }

    fn parameters(&self) -> ParamMap {
        param_map(&[
            ("wedge_depth", self.depth),
            ("wedge_angle", self.angle_degrees),
            ("split_gap", self.split_gap),
        ])
    }
}

/// Displacement `(Δx, Δz)` of a vertex at lateral position `x` in a layer
/// whose relative height is `layer_norm` (0 at the bottom, 1 at the top).
///
/// `x == 0` counts as the positive side.
pub fn wedge_displacement(x: f64, layer_norm: f64, width: f64, params: &WedgeParams) -> (f64, f64) {
    let sigma = width / 3.0;
    let intensity = (-(x * x) / (2.0 * sigma * sigma)).exp();
    let side = if x < 0.0 { -1.0 } else { 1.0 };
    let spread = params.split_gap + params.depth * params.angle_degrees.to_radians().tan();

    let dx = side * spread * intensity * layer_norm;
    let dz = -params.depth * intensity * layer_norm;
    (dx, dz)
}

/// Drive a wedge into the top of the billet.
///
/// Stats: `max_vertical`, `max_horizontal` over all vertices, and
/// `mean_vertical`, `mean_horizontal` as the mean of the per-layer means.
pub fn wedge(billet: &mut Billet, params: &WedgeParams, settings: &Settings) -> Result<OperationReport> {
    params.validate()?;
    let started = Instant::now();
    let mut diagnostics = Diagnostics::new();
    params.check_limits(&settings.limits, &mut diagnostics);

    let width = billet.width();
    let total_height = billet.total_height();
    let parameters = params.parameters();

    let per_layer: Vec<(DisplacementStats, DisplacementStats)> = billet
        .layers_mut()
        .par_iter_mut()
        .map(|layer| {
            let layer_norm = layer.stack_position / total_height;
            let n = layer.mesh.num_vertices();
            let mut vertical = Vec::with_capacity(n);
            let mut horizontal = Vec::with_capacity(n);

            for v in &mut layer.mesh.vertices {
                let (dx, dz) = wedge_displacement(v.x, layer_norm, width, params);
                v.x += dx;
                v.z += dz;
                horizontal.push(dx.abs());
                vertical.push(dz.abs());
            }

            let vertical = DisplacementStats::from_samples(&vertical);
            let horizontal = DisplacementStats::from_samples(&horizontal);
            let mut stats = ParamMap::new();
            vertical.write_into("vertical", &mut stats);
            horizontal.write_into("horizontal", &mut stats);
            layer.record(LAYER_OPERATION, &parameters, stats);

            tracing::debug!(
                layer = layer.index,
                vertical_max = vertical.max,
                horizontal_max = horizontal.max,
                "wedge layer deformed"
            );
            (vertical, horizontal)
        })
        .collect();

    let count = per_layer.len() as f64;
    let max_vertical = per_layer.iter().map(|(v, _)| v.max).fold(0.0, f64::max);
    let max_horizontal = per_layer.iter().map(|(_, h)| h.max).fold(0.0, f64::max);
    let mean_vertical = per_layer.iter().map(|(v, _)| v.mean).sum::<f64>() / count;
    let mean_horizontal = per_layer.iter().map(|(_, h)| h.mean).sum::<f64>() / count;
    let vertices: usize = billet.layers().iter().map(|l| l.mesh.num_vertices()).sum();

    let stats = param_map(&[
        ("max_vertical", max_vertical),
        ("max_horizontal", max_horizontal),
        ("mean_vertical", mean_vertical),
        ("mean_horizontal", mean_horizontal),
        ("vertices_processed", vertices as f64),
    ]);
    Ok(finish(billet, OPERATION, parameters, stats, started, diagnostics))
}
