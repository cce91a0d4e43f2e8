//! Torsional twist about the length axis.

use std::time::Instant;

use damascus_math::{Point3, Transform};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{finish, require_finite};
use crate::billet::Billet;
use crate::config::Settings;
use crate::error::Result;
use crate::history::param_map;
use crate::report::{Diagnostics, OperationReport};

pub(crate) const OPERATION: &str = "twist";

/// Twist parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TwistParams {
    /// Rotation of the `+length/2` end relative to the `-length/2` end (degrees).
    pub angle_degrees: f64,
}

impl TwistParams {
    /// Check parameters.
    pub fn validate(&self) -> Result<()> {
        require_finite(OPERATION, "angle_degrees", self.angle_degrees)
    }
}

/// Rotation angle at length coordinate `y`: a linear ramp from 0 at
/// `-length/2` to `total` at `+length/2`.
pub fn twist_angle_at(y: f64, length: f64, total: f64) -> f64 {
    total * (y + length / 2.0) / length
}

/// Twist every layer about its own mid-plane.
///
/// Each layer pivots about `(x = 0, z = stack_position + thickness / 2)`,
/// so the stack does not share a single global axis.
pub fn twist(billet: &mut Billet, params: &TwistParams, settings: &Settings) -> Result<OperationReport> {
    params.validate()?;
    let started = Instant::now();
    let mut diagnostics = Diagnostics::new();
    settings
        .limits
        .twist_angle
        .check("twist angle", params.angle_degrees, &mut diagnostics);

    let length = billet.length();
    let total = params.angle_degrees.to_radians();
    let parameters = param_map(&[("angle_degrees", params.angle_degrees)]);

    let max_per_layer: Vec<f64> = billet
        .layers_mut()
        .par_iter_mut()
        .map(|layer| {
            let pivot = Point3::new(0.0, 0.0, layer.stack_position + layer.thickness / 2.0);
            let mut max_angle: f64 = 0.0;

            for v in &mut layer.mesh.vertices {
                let theta = twist_angle_at(v.y, length, total);
                let rotation = Transform::about_point(&pivot, &Transform::rotation_about_length(theta));
                *v = rotation.apply_point(v);
                max_angle = max_angle.max(theta.abs());
            }

            let stats = param_map(&[("max_rotation_degrees", max_angle.to_degrees())]);
            layer.record(OPERATION, &parameters, stats);
            tracing::debug!(
                layer = layer.index,
                pivot_z = pivot.z,
                max_rotation_degrees = max_angle.to_degrees(),
                "twisted layer"
            );
            max_angle.to_degrees()
        })
        .collect();

    let vertices: usize = billet.layers().iter().map(|l| l.mesh.num_vertices()).sum();
    let stats = param_map(&[
        (
            "max_rotation_degrees",
            max_per_layer.iter().copied().fold(0.0, f64::max),
        ),
        ("vertices_processed", vertices as f64),
    ]);
    Ok(finish(billet, OPERATION, parameters, stats, started, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Material;
    use approx::assert_relative_eq;

    fn two_layer_billet() -> Billet {
        Billet::from_layers(10.0, 20.0, &[(2.0, Material::Bright), (2.0, Material::Dark)]).unwrap()
    }

    #[test]
    fn test_angle_ramp_boundaries() {
        assert_eq!(twist_angle_at(-50.0, 100.0, 1.0), 0.0);
        assert_relative_eq!(twist_angle_at(50.0, 100.0, 1.0), 1.0);
        assert_relative_eq!(twist_angle_at(0.0, 100.0, 1.0), 0.5);
    }

    #[test]
    fn test_near_end_is_untouched() {
        let mut billet = two_layer_billet();
        let before = billet.layer(1).unwrap().mesh().clone();
        twist(&mut billet, &TwistParams { angle_degrees: 90.0 }, &Settings::default()).unwrap();

        let after = billet.layer(1).unwrap().mesh();
        for (a, b) in after.vertices.iter().zip(&before.vertices) {
            if b.y < 0.0 {
                assert_relative_eq!(a.x, b.x, epsilon = 1e-12);
                assert_relative_eq!(a.y, b.y, epsilon = 1e-12);
                assert_relative_eq!(a.z, b.z, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_far_end_rotates_fully_about_layer_mid_plane() {
        let mut billet = two_layer_billet();
        twist(&mut billet, &TwistParams { angle_degrees: 90.0 }, &Settings::default()).unwrap();

        // Layer 0 pivots at z = 1; (5, 10, 0) is (5, -1) from the pivot.
        let v = billet.layer(0).unwrap().mesh().vertices[2];
        assert_relative_eq!(v.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(v.y, 10.0, epsilon = 1e-12);
        assert_relative_eq!(v.z, 6.0, epsilon = 1e-12);

        // Layer 1 pivots at z = 3; (5, 10, 4) is (5, 1) from the pivot.
        let v = billet.layer(1).unwrap().mesh().vertices[6];
        assert_relative_eq!(v.x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(v.z, 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_twist_keeps_length_coordinates() {
        let mut billet = two_layer_billet();
        let before: Vec<f64> = billet.layer(0).unwrap().mesh().vertices.iter().map(|v| v.y).collect();
        let report =
            twist(&mut billet, &TwistParams { angle_degrees: 270.0 }, &Settings::default()).unwrap();
        let after: Vec<f64> = billet.layer(0).unwrap().mesh().vertices.iter().map(|v| v.y).collect();
        assert_eq!(before, after);
        assert_relative_eq!(report.stat("max_rotation_degrees").unwrap(), 270.0, epsilon = 1e-9);
        assert_eq!(billet.layer(0).unwrap().deformation_history()[0].operation, "twist");
    }

    #[test]
    fn test_extreme_angle_warns() {
        let mut billet = two_layer_billet();
        let report =
            twist(&mut billet, &TwistParams { angle_degrees: 720.0 }, &Settings::default()).unwrap();
        assert_eq!(report.diagnostics.warnings().count(), 1);
    }
}
