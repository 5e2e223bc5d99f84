//! Affine index-to-world transforms
//!
//! An [`AffineTransform`] is a 3×3 linear part plus an offset. Column `i` of the
//! matrix is the world-space step of one index unit along axis `i`, so column
//! lengths are the spacing and the offset is the origin.

use crate::error::{Error, Result};
use nalgebra::{Matrix3, Point3, Rotation3, Unit, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Linear map plus offset
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AffineTransform {
    /// Linear part
    pub matrix: Matrix3<f64>,
    /// Translation applied after the linear part
    pub offset: Vector3<f64>,
}

impl AffineTransform {
    /// Create a transform from its parts
    pub fn new(matrix: Matrix3<f64>, offset: Vector3<f64>) -> Self {
        Self { matrix, offset }
    }

    /// The identity transform
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
            offset: Vector3::zeros(),
        }
    }

    /// Pure translation by `offset`
    pub fn translation(offset: Vector3<f64>) -> Self {
        Self {
            matrix: Matrix3::identity(),
            offset,
        }
    }

    /// Rotation by `angle_radians` about the line through `center` along `axis`
    ///
    /// Returns `None` when the axis has zero length.
    pub fn rotation_about_point(
        center: &Point3<f64>,
        axis: &Vector3<f64>,
        angle_radians: f64,
    ) -> Option<Self> {
        let axis = Unit::try_new(*axis, 0.0)?;
        let rotation = Rotation3::from_axis_angle(&axis, angle_radians).into_inner();
        let c = center.coords;
        Some(Self {
            matrix: rotation,
            offset: c - rotation * c,
        })
    }

    /// Map a point
    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.matrix * point.coords + self.offset)
    }

    /// Map a vector; the offset does not apply
    pub fn transform_vector(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.matrix * vector
    }

    /// Column `axis` of the linear part
    ///
    /// # Panics
    ///
    /// Panics if `axis > 2`.
    pub fn column(&self, axis: usize) -> Vector3<f64> {
        self.matrix.column(axis).into_owned()
    }

    /// Replace column `axis` of the linear part
    pub fn set_column(&mut self, axis: usize, column: &Vector3<f64>) {
        self.matrix.set_column(axis, column);
    }

    /// Lengths of the three columns
    pub fn column_norms(&self) -> Vector3<f64> {
        Vector3::new(
            self.matrix.column(0).norm(),
            self.matrix.column(1).norm(),
            self.matrix.column(2).norm(),
        )
    }

    /// Inverse of the linear part
    ///
    /// Fails with [`Error::DegenerateTransform`] when the matrix is singular or
    /// its inverse is not finite.
    pub fn inverse_matrix(&self) -> Result<Matrix3<f64>> {
        match self.matrix.try_inverse() {
            Some(inverse) if inverse.iter().all(|v| v.is_finite()) => Ok(inverse),
            _ => Err(Error::degenerate_transform(&self.matrix)),
        }
    }

    /// The inverse transform
    pub fn inverse(&self) -> Result<Self> {
        let inverse = self.inverse_matrix()?;
        Ok(Self {
            matrix: inverse,
            offset: -(inverse * self.offset),
        })
    }

    /// True when the linear part has a finite inverse
    pub fn is_invertible(&self) -> bool {
        self.inverse_matrix().is_ok()
    }

    /// Apply `self` first, then `outer`
    ///
    /// # Example
    ///
    /// ```
    /// use medgeom::AffineTransform;
    /// use nalgebra::{Point3, Vector3};
    ///
    /// let a = AffineTransform::translation(Vector3::new(1.0, 0.0, 0.0));
    /// let b = AffineTransform::translation(Vector3::new(0.0, 2.0, 0.0));
    /// let p = a.compose(&b).transform_point(&Point3::origin());
    /// assert_eq!(p, Point3::new(1.0, 2.0, 0.0));
    /// ```
    pub fn compose(&self, outer: &AffineTransform) -> Self {
        Self {
            matrix: outer.matrix * self.matrix,
            offset: outer.matrix * self.offset + outer.offset,
        }
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_inverse_round_trip() {
        let t = AffineTransform::new(
            Matrix3::new(2.0, 0.0, 0.0, 0.0, 0.0, -3.0, 0.0, 1.0, 0.0),
            Vector3::new(5.0, -1.0, 2.0),
        );
        let inv = t.inverse().unwrap();
        let p = Point3::new(0.3, 7.0, -2.5);
        let back = inv.transform_point(&t.transform_point(&p));
        assert!((back - p).norm() < 1e-12);
    }

    #[test]
    fn test_singular_matrix_is_degenerate() {
        let mut t = AffineTransform::identity();
        t.set_column(1, &Vector3::zeros());
        assert!(matches!(t.inverse(), Err(Error::DegenerateTransform(_))));
        assert!(!t.is_invertible());
    }

    #[test]
    fn test_nan_matrix_is_degenerate() {
        let mut t = AffineTransform::identity();
        t.matrix[(0, 0)] = f64::NAN;
        assert!(t.inverse_matrix().is_err());
    }

    #[test]
    fn test_rotation_about_point_keeps_center() {
        let center = Point3::new(1.0, 1.0, 0.0);
        let r = AffineTransform::rotation_about_point(&center, &Vector3::z(), FRAC_PI_2).unwrap();
        assert!((r.transform_point(&center) - center).norm() < 1e-12);

        let p = r.transform_point(&Point3::new(2.0, 1.0, 0.0));
        assert!((p - Point3::new(1.0, 2.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_zero_axis_rotation() {
        assert!(AffineTransform::rotation_about_point(&Point3::origin(), &Vector3::zeros(), 1.0).is_none());
    }
}
