//! Radial drilling (raindrop patterns).

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{finish, require_finite, require_positive};
use crate::billet::Billet;
use crate::config::Settings;
use crate::error::{BilletError, Result};
use crate::history::{param_map, ParamMap};
use crate::report::{Diagnostics, OperationReport};

pub(crate) const OPERATION: &str = "drill_hole";
pub(crate) const GRID_OPERATION: &str = "drill_grid";
const LAYER_OPERATION: &str = "drill";

/// Below this planar distance a vertex has no defined push direction.
const CENTER_EPSILON: f64 = 1e-3;

/// Push applied to vertices inside the hole radius.
const INSIDE_PUSH: f64 = 1.5;

/// Peak push of the falloff ring between `r` and `2r`.
const RING_PUSH: f64 = 0.3;

/// Largest accepted `grid_size`; a grid drills `grid_size²` holes.
pub const MAX_GRID_SIZE: u32 = 64;

/// A single hole through the full stack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrillParams {
    /// Hole center along the width axis (mm).
    pub x: f64,
    /// Hole center along the length axis (mm).
    pub y: f64,
    /// Hole radius (mm).
    pub radius: f64,
}

impl DrillParams {
    /// Check parameters.
    pub fn validate(&self) -> Result<()> {
        require_finite(OPERATION, "x", self.x)?;
        require_finite(OPERATION, "y", self.y)?;
        require_positive(OPERATION, "radius", self.radius)
    }

    fn parameters(&self) -> ParamMap {
        param_map(&[("x_pos", self.x), ("y_pos", self.y), ("radius", self.radius)])
    }
}

/// A `grid_size × grid_size` square of holes centered on the billet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrillGridParams {
    /// Holes per row and per column.
    pub grid_size: u32,
    /// Center-to-center distance (mm).
    pub spacing: f64,
    /// Radius of every hole (mm).
    pub radius: f64,
}

impl DrillGridParams {
    /// Check parameters.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_GRID_SIZE).contains(&self.grid_size) {
            return Err(BilletError::invalid(
                GRID_OPERATION,
                format!(
                    "grid_size must be in 1..={MAX_GRID_SIZE}, got {}",
                    self.grid_size
                ),
            ));
        }
        require_positive(GRID_OPERATION, "spacing", self.spacing)?;
        require_positive(GRID_OPERATION, "radius", self.radius)
    }

    /// Hole centers, row by row along the width axis.
    pub fn holes(&self) -> Vec<DrillParams> {
        let n = self.grid_size;
        let start = -f64::from(n.saturating_sub(1)) * self.spacing / 2.0;
        (0..n)
            .flat_map(|i| {
                (0..n).map(move |j| DrillParams {
                    x: start + f64::from(i) * self.spacing,
                    y: start + f64::from(j) * self.spacing,
                    radius: self.radius,
                })
            })
            .collect()
    }
}

/// Radial push factor at planar distance `dist` from a hole of `radius`,
/// or `None` when the vertex lies outside the `2r` influence ring.
pub fn drill_push_factor(dist: f64, radius: f64) -> Option<f64> {
    if dist >= 2.0 * radius {
        None
    } else if dist < radius {
        Some(INSIDE_PUSH)
    } else {
        let d = dist - radius;
        let influence = (-(d * d) / (2.0 * radius * radius)).exp();
        Some(influence * RING_PUSH)
    }
}

/// Drill one hole through every layer.
///
/// Vertices within `2r` of the center are pushed radially outward in the
/// width/length plane; height is untouched. Stats: `vertices_affected`.
pub fn drill(billet: &mut Billet, params: &DrillParams, settings: &Settings) -> Result<OperationReport> {
    params.validate()?;
    let mut diagnostics = Diagnostics::new();
    settings
        .limits
        .drill_radius
        .check("drill radius", params.radius, &mut diagnostics);
    Ok(drill_validated(billet, params, diagnostics))
}

/// Drill a square grid of holes, one history record per hole.
///
/// Every hole is validated up front, so a rejected grid drills nothing.
pub fn drill_grid(
    billet: &mut Billet,
    params: &DrillGridParams,
    settings: &Settings,
) -> Result<OperationReport> {
    params.validate()?;
    let holes = params.holes();
    for hole in &holes {
        hole.validate()?;
    }

    let started = Instant::now();
    let mut diagnostics = Diagnostics::new();
    settings
        .limits
        .drill_radius
        .check("drill radius", params.radius, &mut diagnostics);

    let mut affected = 0.0;
    for hole in &holes {
        let report = drill_validated(billet, hole, Diagnostics::new());
        affected += report.stat("vertices_affected").unwrap_or(0.0);
        diagnostics.extend(report.diagnostics);
    }

    let duration_seconds = started.elapsed().as_secs_f64();
    tracing::info!(
        holes = holes.len(),
        vertices_affected = affected,
        duration_seconds,
        "drill grid complete"
    );
    Ok(OperationReport {
        operation: GRID_OPERATION.to_string(),
        parameters: param_map(&[
            ("grid_size", f64::from(params.grid_size)),
            ("spacing", params.spacing),
            ("radius", params.radius),
        ]),
        stats: param_map(&[
            ("holes", holes.len() as f64),
            ("vertices_affected", affected),
        ]),
        duration_seconds,
        diagnostics,
    })
}

fn drill_validated(billet: &mut Billet, params: &DrillParams, mut diagnostics: Diagnostics) -> OperationReport {
    let started = Instant::now();
    let (half_w, half_l) = (billet.width() / 2.0, billet.length() / 2.0);
    if params.x.abs() > half_w || params.y.abs() > half_l {
        diagnostics.warn(format!(
            "hole center ({:.1}, {:.1}) lies outside the billet footprint",
            params.x, params.y
        ));
    }

    let parameters = params.parameters();
    let affected: usize = billet
        .layers_mut()
        .par_iter_mut()
        .map(|layer| {
            let mut count = 0usize;
            for v in &mut layer.mesh.vertices {
                let (dx, dy) = (v.x - params.x, v.y - params.y);
                let dist = dx.hypot(dy);
                let Some(push) = drill_push_factor(dist, params.radius) else {
                    continue;
                };
                count += 1;
                if dist > CENTER_EPSILON {
                    let scale = params.radius * push / dist;
                    v.x += dx * scale;
                    v.y += dy * scale;
                }
            }
            tracing::debug!(layer = layer.index, vertices_affected = count, "drilled layer");
            layer.record(
                LAYER_OPERATION,
                &parameters,
                param_map(&[("vertices_affected", count as f64)]),
            );
            count
        })
        .sum();

    let stats = param_map(&[("vertices_affected", affected as f64)]);
    finish(billet, OPERATION, parameters, stats, started, diagnostics)
}
