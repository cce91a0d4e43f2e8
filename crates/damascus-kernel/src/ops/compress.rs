//! Uniform height compression (pressing or hammering).

use std::time::Instant;

use damascus_math::Transform;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{finish, require_positive};
use crate::billet::Billet;
use crate::config::Settings;
use crate::error::Result;
use crate::history::param_map;
use crate::report::{Diagnostics, OperationReport};

pub(crate) const OPERATION: &str = "compression";

/// Compression parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressParams {
    /// Height scale factor. Below 1 compresses; above 1 stretches.
    pub factor: f64,
}

impl CompressParams {
    /// Check parameters.
    pub fn validate(&self) -> Result<()> {
        require_positive(OPERATION, "factor", self.factor)
    }
}

/// Scale every height coordinate, thickness and stack position by `factor`.
pub fn compress(
    billet: &mut Billet,
    params: &CompressParams,
    settings: &Settings,
) -> Result<OperationReport> {
    params.validate()?;
    let started = Instant::now();
    let mut diagnostics = Diagnostics::new();
    settings
        .limits
        .compression_factor
        .check("compression factor", params.factor, &mut diagnostics);

    let factor = params.factor;
    let height_before = billet.total_height();
    let parameters = param_map(&[("compression_factor", factor)]);
    let squash = Transform::scale(1.0, 1.0, factor);

    billet.layers_mut().par_iter_mut().for_each(|layer| {
        let before = layer.mesh.bounds().map_or(0.0, |b| b.extent()[2]);
        for v in &mut layer.mesh.vertices {
            *v = squash.apply_point(v);
        }
        layer.thickness *= factor;
        layer.stack_position *= factor;
        let after = layer.mesh.bounds().map_or(0.0, |b| b.extent()[2]);

        tracing::debug!(layer = layer.index, before, after, "compressed layer");
        layer.record(
            OPERATION,
            &parameters,
            param_map(&[("height_before", before), ("height_after", after)]),
        );
    });

    let height_after = billet.total_height();
    diagnostics.info(format!(
        "height {height_before:.1} mm -> {height_after:.1} mm"
    ));
    let stats = param_map(&[
        ("height_before_mm", height_before),
        ("height_after_mm", height_after),
    ]);
    Ok(finish(billet, OPERATION, parameters, stats, started, diagnostics))
}
