//! Parametric lines and rectangle clipping

use crate::config::EPS;
use nalgebra::{Point2, Point3, Vector2, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Line through `point` along `direction`, parameterized as `point + t·direction`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Line3 {
    point: Point3<f64>,
    direction: Vector3<f64>,
}

impl Line3 {
    /// Line through `point` with the given (not necessarily unit) direction
    pub fn new(point: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self { point, direction }
    }

    /// Line through two points; `t = 1` lands on `p2`
    pub fn from_points(p1: &Point3<f64>, p2: &Point3<f64>) -> Self {
        Self {
            point: *p1,
            direction: p2 - p1,
        }
    }

    /// Base point at `t = 0`
    pub fn point(&self) -> &Point3<f64> {
        &self.point
    }

    /// Direction vector
    pub fn direction(&self) -> &Vector3<f64> {
        &self.direction
    }

    /// Point at parameter `t`
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        self.point + self.direction * t
    }

    /// Point at `t = 1`
    pub fn point2(&self) -> Point3<f64> {
        self.point + self.direction
    }

    /// Orthogonal projection of `p` onto the line
    ///
    /// A zero direction projects everything onto the base point.
    pub fn project(&self, p: &Point3<f64>) -> Point3<f64> {
        let len2 = self.direction.norm_squared();
        if len2 == 0.0 {
            return self.point;
        }
        self.point_at((p - self.point).dot(&self.direction) / len2)
    }

    /// Distance from `p` to the line
    pub fn distance(&self, p: &Point3<f64>) -> f64 {
        (p - self.project(p)).norm()
    }

    /// True when the two directions are parallel within [`EPS`]
    pub fn is_parallel(&self, other: &Line3) -> bool {
        let (a, b) = (self.direction, other.direction);
        let (na, nb) = (a.norm(), b.norm());
        if na == 0.0 || nb == 0.0 {
            return false;
        }
        (a / na).cross(&(b / nb)).norm_squared() < EPS
    }
}

/// Intersections of a 2D line with the rectangle `[x1, x2] × [y1, y2]`
///
/// The line is `p + t·d`. Candidates are the crossings with the four edge
/// lines that fall on the rectangle boundary. Duplicates (a line through a
/// corner) are collapsed, so at most two points are returned.
///
/// # Example
///
/// ```
/// use medgeom::line::rectangle_line_intersection;
/// use nalgebra::{Point2, Vector2};
///
/// let hits = rectangle_line_intersection(
///     0.0, 0.0, 10.0, 5.0,
///     &Point2::new(-1.0, 2.0),
///     &Vector2::new(1.0, 0.0),
/// );
/// assert_eq!(hits, vec![Point2::new(0.0, 2.0), Point2::new(10.0, 2.0)]);
/// ```
pub fn rectangle_line_intersection(
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    p: &Point2<f64>,
    d: &Vector2<f64>,
) -> Vec<Point2<f64>> {
    let mut hits: Vec<Point2<f64>> = Vec::with_capacity(2);
    let mut push = |candidate: Point2<f64>| {
        if hits.len() < 2 && hits.iter().all(|h| (h - candidate).norm() > EPS) {
            hits.push(candidate);
        }
    };

    if d.x.abs() > EPS {
        for x in [x1, x2] {
            let candidate = p + d * ((x - p.x) / d.x);
            if candidate.y >= y1 - EPS && candidate.y <= y2 + EPS {
                push(Point2::new(x, candidate.y.clamp(y1, y2)));
            }
        }
    }
    if d.y.abs() > EPS {
        for y in [y1, y2] {
            let candidate = p + d * ((y - p.y) / d.y);
            if candidate.x >= x1 - EPS && candidate.x <= x2 + EPS {
                push(Point2::new(candidate.x.clamp(x1, x2), y));
            }
        }
    }
    hits
}
