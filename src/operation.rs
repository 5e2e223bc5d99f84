//! Transform-change commands
//!
//! An interaction layer expresses every change to a frame as an [`Operation`].
//! Frames, planes and stacks each decide how to apply it.

use crate::config::EPS;
use crate::transform::AffineTransform;
use nalgebra::{Point3, Vector3};

/// A command that changes a frame's index-to-world transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    /// Leaves the frame untouched
    Nothing,

    /// Adds a world-space vector to the origin
    Translate(Vector3<f64>),

    /// Grows each axis by `delta[i]` millimeters per index unit, keeping the
    /// world-space center fixed
    ///
    /// The applied factor per axis is `1 + delta[i] / |column i|`.
    ScaleAboutCenter {
        /// Additive change of the per-axis spacing
        delta: Vector3<f64>,
    },

    /// Rotates about the line through `center` along `axis`
    ///
    /// The angle is clamped to `[-360°, 360°]`. A zero axis is ignored.
    RotateAboutPoint {
        /// Point on the rotation axis
        center: Point3<f64>,
        /// Axis direction, normalized before use
        axis: Vector3<f64>,
        /// Rotation angle in degrees
        angle_degrees: f64,
    },

    /// Rotates about `point` so that the third axis aligns with `normal`
    Orient {
        /// Center of rotation, also the point a slice stack stays aligned to
        point: Point3<f64>,
        /// Desired normal direction
        normal: Vector3<f64>,
    },

    /// Replaces the transform with a stored one
    ///
    /// Planes also reset their bounds to `[0, width, 0, height, 0, 1]`.
    RestorePlanePosition {
        /// Transform to restore
        transform: AffineTransform,
        /// Plane width in index units
        width: f64,
        /// Plane height in index units
        height: f64,
    },
}

/// Clamp a rotation angle to one full turn in either direction
pub(crate) fn clamp_angle_degrees(angle_degrees: f64) -> f64 {
    angle_degrees.clamp(-360.0, 360.0)
}

/// Axis and signed angle (degrees) that rotate `current` onto `target`
///
/// Opposite directions turn by 180° about an axis perpendicular to `current`.
pub(crate) fn orientation_change(
    current: &Vector3<f64>,
    target: &Vector3<f64>,
) -> (Vector3<f64>, f64) {
    let (Some(current), Some(target)) = (current.try_normalize(0.0), target.try_normalize(0.0))
    else {
        return (Vector3::zeros(), 0.0);
    };
    let axis = target.cross(&current);
    let angle = -axis.norm().atan2(target.dot(&current)).to_degrees();
    if (angle.abs() - 180.0).abs() < EPS {
        return (perpendicular_axis(&current), 180.0);
    }
    (axis, angle)
}

/// Some axis perpendicular to the unit vector `direction`
fn perpendicular_axis(direction: &Vector3<f64>) -> Vector3<f64> {
    let help = direction + Vector3::new(1.0, -1.0, 1.0);
    let axis = help.cross(direction);
    if axis.norm_squared() > EPS {
        return axis;
    }
    // the helper is parallel to `direction` only for ±(1, -1, 1)/√3
    direction.cross(&Vector3::x())
}
