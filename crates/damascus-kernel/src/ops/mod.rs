//! Deformation operators.
//!
//! Every operator validates its parameters before touching a vertex, so a
//! rejected call leaves the billet unchanged. A successful call appends one
//! record to the billet history, one [`DeformationRecord`] per layer, and
//! returns an [`OperationReport`].
//!
//! [`DeformationRecord`]: crate::DeformationRecord

mod compress;
mod drill;
mod forge;
mod twist;
mod wedge;

pub use compress::{compress, CompressParams};
pub use drill::{
    drill, drill_grid, drill_push_factor, DrillGridParams, DrillParams, MAX_GRID_SIZE,
};
pub use forge::{forge, forge_final_length, ForgeParams, ForgeProfile};
pub use twist::{twist, twist_angle_at, TwistParams};
pub use wedge::{wedge, wedge_displacement, WedgeParams};

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::billet::Billet;
use crate::config::Settings;
use crate::error::{BilletError, Result};
use crate::history::{OperationRecord, ParamMap};
use crate::report::{Diagnostics, OperationReport};

/// Any operator with its parameters, as stored in recipes and sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Feather split.
    Wedge(WedgeParams),
    /// Torsional twist about the length axis.
    Twist(TwistParams),
    /// Uniform height compression.
    Compress(CompressParams),
    /// Single radial drill hole.
    Drill(DrillParams),
    /// Square grid of drill holes.
    DrillGrid(DrillGridParams),
    /// Forge to a square or octagonal bar.
    Forge(ForgeParams),
}

impl Operation {
    /// Name of the operation as it appears in reports and the history.
    ///
    /// A drill grid is recorded as one `drill_hole` entry per hole.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Wedge(_) => wedge::OPERATION,
            Operation::Twist(_) => twist::OPERATION,
            Operation::Compress(_) => compress::OPERATION,
            Operation::Drill(_) => drill::OPERATION,
            Operation::DrillGrid(_) => drill::GRID_OPERATION,
            Operation::Forge(p) => p.profile.operation_name(),
        }
    }

    /// Check parameters without touching a billet.
    pub fn validate(&self) -> Result<()> {
        match self {
            Operation::Wedge(p) => p.validate(),
            Operation::Twist(p) => p.validate(),
            Operation::Compress(p) => p.validate(),
            Operation::Drill(p) => p.validate(),
            Operation::DrillGrid(p) => p.validate(),
            Operation::Forge(p) => p.validate(),
        }
    }

    /// Run the operator against `billet`.
    ///
    /// A drill grid produces one history record per hole; the returned
    /// report summarizes the whole grid.
    pub fn apply(&self, billet: &mut Billet, settings: &Settings) -> Result<OperationReport> {
        match self {
            Operation::Wedge(p) => wedge(billet, p, settings),
            Operation::Twist(p) => twist(billet, p, settings),
            Operation::Compress(p) => compress(billet, p, settings),
            Operation::Drill(p) => drill(billet, p, settings),
            Operation::DrillGrid(p) => drill_grid(billet, p, settings),
            Operation::Forge(p) => forge(billet, p, settings),
        }
    }
}

pub(crate) fn require_positive(operation: &'static str, name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(BilletError::invalid(
            operation,
            format!("{name} must be positive, got {value}"),
        ))
    }
}

pub(crate) fn require_finite(operation: &'static str, name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(BilletError::invalid(
            operation,
            format!("{name} must be finite, got {value}"),
        ))
    }
}

/// Append the billet-level record and build the report.
pub(crate) fn finish(
    billet: &mut Billet,
    operation: &str,
    parameters: ParamMap,
    stats: ParamMap,
    started: Instant,
    diagnostics: Diagnostics,
) -> OperationReport {
    let duration_seconds = started.elapsed().as_secs_f64();
    tracing::info!(
        operation,
        duration_seconds,
        layers = billet.layers().len(),
        "operation complete"
    );
    billet.record(OperationRecord::new(
        operation,
        parameters.clone(),
        duration_seconds,
        stats.clone(),
    ));
    OperationReport {
        operation: operation.to_string(),
        parameters,
        stats,
        duration_seconds,
        diagnostics,
    }
}
