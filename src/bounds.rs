//! Axis-aligned bounding boxes and time intervals
//!
//! Both types are plain values. A [`BoundingBox`] lives in index units of the
//! frame that owns it, a [`TimeBounds`] in milliseconds.

use crate::error::{Error, Result};
use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis-aligned box given by its minimum and maximum corner
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingBox {
    min: Point3<f64>,
    max: Point3<f64>,
}

impl BoundingBox {
    /// Create a box from its two corners
    ///
    /// Fails with [`Error::InvalidBounds`] when a minimum exceeds its maximum.
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Result<Self> {
        for axis in 0..3 {
            if min[axis].is_nan() || max[axis].is_nan() || min[axis] > max[axis] {
                return Err(Error::InvalidBounds(format!(
                    "axis {}: minimum {} exceeds maximum {}",
                    axis, min[axis], max[axis]
                )));
            }
        }
        Ok(Self { min, max })
    }

    /// Create a box from a `[x0, x1, y0, y1, z0, z1]` array
    ///
    /// # Example
    ///
    /// ```
    /// use medgeom::BoundingBox;
    ///
    /// let bbox = BoundingBox::from_bounds([0.0, 10.0, 0.0, 20.0, 0.0, 5.0]).unwrap();
    /// assert_eq!(bbox.extent(1), 20.0);
    /// assert!(BoundingBox::from_bounds([1.0, 0.0, 0.0, 1.0, 0.0, 1.0]).is_err());
    /// ```
    pub fn from_bounds(bounds: [f64; 6]) -> Result<Self> {
        Self::new(
            Point3::new(bounds[0], bounds[2], bounds[4]),
            Point3::new(bounds[1], bounds[3], bounds[5]),
        )
    }

    /// The unit cube `[0, 1]³`
    pub fn unit() -> Self {
        Self {
            min: Point3::origin(),
            max: Point3::new(1.0, 1.0, 1.0),
        }
    }

    /// The all-zero box used to mark "no extent"
    pub fn zero() -> Self {
        Self {
            min: Point3::origin(),
            max: Point3::origin(),
        }
    }

    /// Smallest box containing every point, or `None` for an empty input
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<f64>>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bbox = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bbox.include(p);
        }
        Some(bbox)
    }

    /// Grow the box so that it contains `point`
    pub fn include(&mut self, point: &Point3<f64>) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(point[axis]);
            self.max[axis] = self.max[axis].max(point[axis]);
        }
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let mut result = *self;
        result.include(&other.min);
        result.include(&other.max);
        result
    }

    /// Minimum corner
    pub fn min(&self) -> &Point3<f64> {
        &self.min
    }

    /// Maximum corner
    pub fn max(&self) -> &Point3<f64> {
        &self.max
    }

    /// Bounds as `[x0, x1, y0, y1, z0, z1]`
    pub fn bounds(&self) -> [f64; 6] {
        [
            self.min.x, self.max.x, self.min.y, self.max.y, self.min.z, self.max.z,
        ]
    }

    /// Length of the box along `axis`
    ///
    /// # Panics
    ///
    /// Panics if `axis > 2`.
    pub fn extent(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }

    /// Center of the box
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Squared length of the box diagonal
    pub fn diagonal_length2(&self) -> f64 {
        (self.max - self.min).norm_squared()
    }

    /// True for the all-zero box, which aggregation always skips
    pub fn is_degenerate(&self) -> bool {
        self.bounds().iter().all(|b| *b == 0.0)
    }

    /// Inclusive containment test
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        (0..3).all(|axis| point[axis] >= self.min[axis] && point[axis] <= self.max[axis])
    }

    /// Corner selected by lower (`false`) or upper (`true`) bound per axis
    pub fn corner(&self, upper_x: bool, upper_y: bool, upper_z: bool) -> Point3<f64> {
        Point3::new(
            if upper_x { self.max.x } else { self.min.x },
            if upper_y { self.max.y } else { self.min.y },
            if upper_z { self.max.z } else { self.min.z },
        )
    }

    /// Corner `id` in `0..8`, with z varying fastest and x slowest
    pub fn corner_by_id(&self, id: usize) -> Option<Point3<f64>> {
        if id > 7 {
            return None;
        }
        Some(self.corner(id & 4 != 0, id & 2 != 0, id & 1 != 0))
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::unit()
    }
}

/// Time interval `[start, end]` in milliseconds
///
/// Either side may be infinite. The default interval covers all of time.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeBounds {
    /// Lower bound
    pub start: f64,
    /// Upper bound
    pub end: f64,
}

impl TimeBounds {
    /// Interval from `start` to `end`
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// The full interval `(-∞, +∞)`
    pub fn full() -> Self {
        Self {
            start: f64::NEG_INFINITY,
            end: f64::INFINITY,
        }
    }

    /// `end - start`, infinite if either side is
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// True when both sides are finite
    pub fn is_finite(&self) -> bool {
        self.start.is_finite() && self.end.is_finite()
    }

    /// Inclusive containment test
    pub fn contains(&self, time_ms: f64) -> bool {
        self.start <= time_ms && time_ms <= self.end
    }

    /// The interval moved by `delta` milliseconds
    pub fn shifted(&self, delta: f64) -> Self {
        Self {
            start: self.start + delta,
            end: self.end + delta,
        }
    }
}

impl Default for TimeBounds {
    fn default() -> Self {
        Self::full()
    }
}
