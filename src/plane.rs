//! Bounded planes embedded in 3D
//!
//! A [`PlaneFrame`] is an [`AffineFrame`] whose first two axes span the plane
//! and whose third axis is the normal. The normal is kept perpendicular to the
//! in-plane axes on every transform change, and the bounds always have the form
//! `[0, width, 0, height, z0, z1]`.
//!
//! The frame is read through `Deref`; every mutation goes through the plane's
//! own setters so the invariants cannot be bypassed.

use crate::bounds::TimeBounds;
use crate::config::{EPS, PARALLEL_EPS};
use crate::error::{Error, Result};
use crate::frame::AffineFrame;
use crate::line::{Line3, rectangle_line_intersection};
use crate::operation::Operation;
use crate::transform::AffineTransform;
use nalgebra::{Matrix3, Point2, Point3, Vector2, Vector3};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Canonical plane orientations relative to a volume's index axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Orientation {
    /// Normal along axis 2 (also called axial)
    Transversal,
    /// Normal along axis 0
    Sagittal,
    /// Normal along axis 1 (also called coronal)
    Frontal,
}

impl Orientation {
    /// Index axis the plane normal follows
    pub fn normal_axis(&self) -> usize {
        match self {
            Orientation::Transversal => 2,
            Orientation::Frontal => 1,
            Orientation::Sagittal => 0,
        }
    }

    /// Index axes spanned by the plane's right and bottom directions
    pub fn in_plane_axes(&self) -> (usize, usize) {
        match self {
            Orientation::Transversal => (0, 1),
            Orientation::Frontal => (0, 2),
            Orientation::Sagittal => (1, 2),
        }
    }
}

impl TryFrom<i32> for Orientation {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Orientation::Transversal),
            1 => Ok(Orientation::Sagittal),
            2 => Ok(Orientation::Frontal),
            other => Err(Error::InvalidOrientation(format!(
                "unknown orientation code {}",
                other
            ))),
        }
    }
}

impl FromStr for Orientation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transversal" | "axial" => Ok(Orientation::Transversal),
            "sagittal" => Ok(Orientation::Sagittal),
            "frontal" | "coronal" => Ok(Orientation::Frontal),
            _ => Err(Error::InvalidOrientation(format!(
                "unknown orientation name '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Orientation::Transversal => "transversal",
            Orientation::Sagittal => "sagittal",
            Orientation::Frontal => "frontal",
        };
        f.write_str(name)
    }
}

/// Orientation and viewing side of a standard plane
///
/// `frontside = false` mirrors the right direction; `rotated = true` turns the
/// plane by 180° within itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardPlaneOptions {
    orientation: Orientation,
    frontside: bool,
    rotated: bool,
}

impl StandardPlaneOptions {
    /// Front side, not rotated
    pub fn new(orientation: Orientation) -> Self {
        Self {
            orientation,
            frontside: true,
            rotated: false,
        }
    }

    /// Choose the viewing side
    pub fn with_frontside(mut self, frontside: bool) -> Self {
        self.frontside = frontside;
        self
    }

    /// Choose whether the plane is turned by 180°
    pub fn with_rotated(mut self, rotated: bool) -> Self {
        self.rotated = rotated;
        self
    }

    /// Plane orientation
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Viewing side
    pub fn frontside(&self) -> bool {
        self.frontside
    }

    /// True when turned by 180°
    pub fn rotated(&self) -> bool {
        self.rotated
    }

    /// Origin, right direction and bottom direction in the plane's own units
    ///
    /// The right direction is mirrored when exactly one of `frontside == false`
    /// and `rotated` holds; the bottom direction is mirrored when rotated.
    /// Mirrored directions start from the far edge of the plane.
    fn layout(
        &self,
        width: f64,
        height: f64,
        z_position: f64,
    ) -> (Point3<f64>, Vector3<f64>, Vector3<f64>) {
        let (right_axis, bottom_axis) = self.orientation.in_plane_axes();
        let right_sign = if self.frontside != self.rotated { 1.0 } else { -1.0 };
        let bottom_sign = if self.rotated { -1.0 } else { 1.0 };

        let mut origin = Point3::origin();
        origin[self.orientation.normal_axis()] = z_position;
        origin[right_axis] = if right_sign > 0.0 { 0.0 } else { width };
        origin[bottom_axis] = if bottom_sign > 0.0 { 0.0 } else { height };

        let mut right = Vector3::zeros();
        right[right_axis] = right_sign;
        let mut bottom = Vector3::zeros();
        bottom[bottom_axis] = bottom_sign;
        (origin, right, bottom)
    }
}

/// A bounded plane in world space
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlaneFrame {
    frame: AffineFrame,
}

fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let denominator = a.norm() * b.norm();
    if denominator == 0.0 {
        return 0.0;
    }
    (a.dot(b) / denominator).clamp(-1.0, 1.0).acos()
}

fn validate_plane_bounds(bounds: &[f64; 6]) -> Result<()> {
    let anchored = bounds[0] == 0.0 && bounds[2] == 0.0;
    let positive = bounds[1] > 0.0 && bounds[3] > 0.0;
    if !anchored || !positive {
        return Err(Error::invalid_plane_bounds(bounds));
    }
    Ok(())
}

impl PlaneFrame {
    /// Unit square in the xy-plane at the world origin, normal along +z
    pub fn new() -> Self {
        Self {
            frame: AffineFrame::new(),
        }
    }

    /// Plane through `origin` with the given normal
    ///
    /// See [`PlaneFrame::initialize_plane`].
    pub fn from_origin_and_normal(origin: &Point3<f64>, normal: &Vector3<f64>) -> Result<Self> {
        let mut plane = Self::new();
        plane.initialize_plane(origin, normal)?;
        Ok(plane)
    }

    /// The underlying frame
    pub fn frame(&self) -> &AffineFrame {
        &self.frame
    }

    /// Replace the transform, then re-derive the normal column
    pub fn set_transform(&mut self, transform: AffineTransform) {
        self.frame.set_transform(transform);
        self.ensure_perpendicular_normal();
    }

    /// Replace column 2 with `normalize(column0 × column1)` scaled to the old
    /// column-2 length, or to 1 if that length was zero
    pub fn ensure_perpendicular_normal(&mut self) {
        let mut transform = *self.frame.transform();
        let Some(direction) = transform
            .column(0)
            .cross(&transform.column(1))
            .try_normalize(0.0)
        else {
            return;
        };
        let thickness = match transform.column(2).norm() {
            n if n == 0.0 => 1.0,
            n => n,
        };
        transform.set_column(2, &(direction * thickness));
        self.frame.set_transform(transform);
    }

    /// Replace the bounds
    ///
    /// Fails with [`Error::InvalidPlaneBounds`] unless the bounds start at
    /// `[0, 0]` and have positive width and height.
    pub fn set_bounds(&mut self, bounds: [f64; 6]) -> Result<()> {
        validate_plane_bounds(&bounds)?;
        self.frame.set_bounds(bounds)
    }

    /// Move the plane so that its origin is `origin`
    pub fn set_origin(&mut self, origin: &Point3<f64>) {
        self.frame.set_origin(origin);
    }

    /// Shift the plane by a world-space vector
    pub fn translate(&mut self, vector: &Vector3<f64>) {
        self.frame.translate(vector);
    }

    /// Rescale the three columns to `spacing`
    pub fn set_spacing(&mut self, spacing: &Vector3<f64>) -> Result<()> {
        self.frame.set_spacing(spacing)
    }

    /// Rescale column `axis` so that the extent along it is `length` millimeters
    pub fn set_extent_in_mm(&mut self, axis: usize, length: f64) -> Result<()> {
        self.frame.set_extent_in_mm(axis, length)
    }

    /// Replace the time interval
    pub fn set_time_bounds(&mut self, time_bounds: TimeBounds) {
        self.frame.set_time_bounds(time_bounds);
    }

    /// Set the voxel-center flag without moving the origin
    pub fn set_image_geometry(&mut self, image_geometry: bool) {
        self.frame.set_image_geometry(image_geometry);
    }

    /// Set the frame-of-reference identifier
    pub fn set_frame_of_reference_id(&mut self, id: u32) {
        self.frame.set_frame_of_reference_id(id);
    }

    /// Apply a transform-change command
    ///
    /// [`Operation::RestorePlanePosition`] also resets the bounds to the stored
    /// width and height.
    pub fn apply_operation(&mut self, operation: &Operation) -> Result<()> {
        if let Operation::RestorePlanePosition {
            width, height, ..
        } = *operation
        {
            let bounds = [0.0, width, 0.0, height, 0.0, 1.0];
            validate_plane_bounds(&bounds)?;
            self.frame.apply_operation(operation)?;
            self.frame.set_bounds(bounds)?;
        } else {
            self.frame.apply_operation(operation)?;
        }
        self.ensure_perpendicular_normal();
        Ok(())
    }

    /// Lay the plane out in one of the standard orientations
    ///
    /// Width and height are in index units. Without an ambient transform the
    /// axes have unit length and `z_position` is a world coordinate along the
    /// orientation's normal axis. With one, origin and in-plane directions are
    /// mapped through it and the thickness is the length of its column along
    /// the normal axis.
    ///
    /// # Example
    ///
    /// ```
    /// use medgeom::{Orientation, PlaneFrame, StandardPlaneOptions};
    /// use nalgebra::{Point3, Vector3};
    ///
    /// let mut plane = PlaneFrame::new();
    /// let options = StandardPlaneOptions::new(Orientation::Transversal);
    /// plane.initialize_standard_plane(100.0, 50.0, 10.0, &options, None).unwrap();
    /// assert_eq!(plane.origin(), Point3::new(0.0, 0.0, 10.0));
    /// assert_eq!(plane.bounds(), [0.0, 100.0, 0.0, 50.0, 0.0, 1.0]);
    /// assert_eq!(plane.normal(), Vector3::new(0.0, 0.0, 1.0));
    /// ```
    pub fn initialize_standard_plane(
        &mut self,
        width: f64,
        height: f64,
        z_position: f64,
        options: &StandardPlaneOptions,
        ambient: Option<&AffineTransform>,
    ) -> Result<()> {
        let bounds = [0.0, width, 0.0, height, 0.0, 1.0];
        validate_plane_bounds(&bounds)?;

        let (mut origin, mut right, mut bottom) = options.layout(width, height, z_position);
        let mut thickness = 1.0;
        if let Some(transform) = ambient {
            origin = transform.transform_point(&origin);
            right = transform.transform_vector(&right);
            bottom = transform.transform_vector(&bottom);
            thickness = transform.column(options.orientation.normal_axis()).norm();
        }
        let normal = right.cross(&bottom).try_normalize(0.0).ok_or_else(|| {
            Error::DegenerateTransform("standard plane directions are collinear".to_string())
        })?;

        let matrix = Matrix3::from_columns(&[right, bottom, normal * thickness]);
        self.frame
            .set_transform(AffineTransform::new(matrix, origin.coords));
        self.frame.set_bounds(bounds)
    }

    /// Lay the plane out in a standard orientation through a reference volume
    ///
    /// Width and height are the reference extents along the orientation's
    /// in-plane axes, `z_position` is an index coordinate of the reference
    /// along the normal axis.
    pub fn initialize_standard_plane_from_frame(
        &mut self,
        reference: &AffineFrame,
        z_position: f64,
        options: &StandardPlaneOptions,
    ) -> Result<()> {
        let (right_axis, bottom_axis) = options.orientation.in_plane_axes();
        self.initialize_standard_plane(
            reference.extent(right_axis),
            reference.extent(bottom_axis),
            z_position,
            options,
            Some(reference.transform()),
        )?;

        let mut offset = reference.bounding_box().min().coords;
        if reference.image_geometry() {
            offset -= Vector3::repeat(0.5);
        }
        let shift = reference.transform().transform_vector(&offset);
        self.frame.translate(&shift);
        Ok(())
    }

    /// Like [`PlaneFrame::initialize_standard_plane_from_frame`], placing the
    /// plane on the center of the first (`top`) or last voxel layer
    pub fn initialize_standard_plane_from_frame_top(
        &mut self,
        reference: &AffineFrame,
        top: bool,
        options: &StandardPlaneOptions,
    ) -> Result<()> {
        let z_position = if top {
            0.5
        } else {
            reference.extent(options.orientation.normal_axis()) - 1.0 + 0.5
        };
        self.initialize_standard_plane_from_frame(reference, z_position, options)
    }

    /// Span the plane by two world vectors, keeping the current origin
    ///
    /// Width and height are the vector lengths. With `spacing`, the unit axes
    /// are scaled per axis.
    pub fn initialize_standard_plane_by_vectors(
        &mut self,
        right: &Vector3<f64>,
        down: &Vector3<f64>,
        spacing: Option<&Vector3<f64>>,
    ) -> Result<()> {
        let width = right.norm();
        let height = down.norm();
        let normal = right.cross(down).try_normalize(0.0).ok_or_else(|| {
            Error::InvalidArgument("right and down vectors must span a plane".to_string())
        })?;
        let spacing = spacing.copied().unwrap_or_else(|| Vector3::repeat(1.0));

        let mut transform = *self.frame.transform();
        transform.set_column(0, &(right / width * spacing.x));
        transform.set_column(1, &(down / height * spacing.y));
        transform.set_column(2, &(normal * spacing.z));
        self.frame.set_transform(transform);
        self.set_bounds([0.0, width, 0.0, height, 0.0, 1.0])
    }

    /// Unit plane through `origin` perpendicular to `normal`
    ///
    /// The right direction lies in the xy-plane; the bottom direction
    /// completes a right-handed frame with the normal.
    pub fn initialize_plane(&mut self, origin: &Point3<f64>, normal: &Vector3<f64>) -> Result<()> {
        if normal.norm() == 0.0 {
            return Err(Error::InvalidArgument(
                "plane normal must not be zero".to_string(),
            ));
        }
        let right = if normal.y.abs() > EPS {
            Vector3::new(1.0, -normal.x / normal.y, 0.0).normalize()
        } else {
            Vector3::new(0.0, 1.0, 0.0)
        };
        let down = normal.cross(&right).try_normalize(0.0).ok_or_else(|| {
            Error::InvalidArgument("normal is parallel to the chosen right direction".to_string())
        })?;
        self.initialize_standard_plane_by_vectors(&right, &down, None)?;
        self.frame.set_origin(origin);
        Ok(())
    }

    /// Raw (unnormalized) normal, column 2 of the transform
    pub fn normal(&self) -> Vector3<f64> {
        self.frame.transform().column(2)
    }

    /// Normal scaled to unit length, zero for a degenerate plane
    pub fn unit_normal(&self) -> Vector3<f64> {
        self.normal().try_normalize(0.0).unwrap_or_else(Vector3::zeros)
    }

    /// Signed distance of `point` from the plane, positive on the normal side
    ///
    /// Returns 0 for a zero normal.
    pub fn signed_distance_from_plane(&self, point: &Point3<f64>) -> f64 {
        let normal = self.normal();
        let length = normal.norm();
        if length == 0.0 {
            return 0.0;
        }
        (point - self.origin()).dot(&normal) / length
    }

    /// Unsigned distance of `point` from the plane
    pub fn distance_from_plane(&self, point: &Point3<f64>) -> f64 {
        self.signed_distance_from_plane(point).abs()
    }

    /// True when `point` is strictly on the normal side
    pub fn is_above(&self, point: &Point3<f64>) -> bool {
        self.signed_distance_from_plane(point) > 0.0
    }

    /// Orthogonal projection of `point` onto the plane
    pub fn project_point_onto_plane(&self, point: &Point3<f64>) -> Point3<f64> {
        point - self.unit_normal() * self.signed_distance_from_plane(point)
    }

    /// Component of `vector` parallel to the plane
    pub fn project(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        let normal = self.unit_normal();
        vector - normal * normal.dot(vector)
    }

    /// Map a world point to 2D millimeters in the plane
    ///
    /// Returns the mapped point and whether it falls inside the plane's
    /// rectangle. The out-of-plane component is dropped.
    pub fn map_to_plane(&self, point: &Point3<f64>) -> Result<(Point2<f64>, bool)> {
        let transform = self.frame.transform();
        let units = transform.inverse()?.transform_point(point);
        let norms = transform.column_norms();
        let mapped = Point2::new(units.x * norms.x, units.y * norms.y);
        let inside = self
            .frame
            .bounding_box()
            .contains(&Point3::new(units.x, units.y, self.frame.bounding_box().min().z));
        Ok((mapped, inside))
    }

    /// Map 2D plane millimeters back to a world point on the plane
    pub fn map_from_plane(&self, point: &Point2<f64>) -> Point3<f64> {
        let transform = self.frame.transform();
        let norms = transform.column_norms();
        let units = Point3::new(
            safe_div(point.x, norms.x),
            safe_div(point.y, norms.y),
            0.0,
        );
        transform.transform_point(&units)
    }

    /// Map a world vector to 2D plane millimeters
    pub fn map_vector_to_plane(&self, vector: &Vector3<f64>) -> Result<Vector2<f64>> {
        let transform = self.frame.transform();
        let units = transform.inverse_matrix()? * vector;
        let norms = transform.column_norms();
        Ok(Vector2::new(units.x * norms.x, units.y * norms.y))
    }

    /// Map a 2D plane vector (millimeters) to a world vector
    pub fn map_vector_from_plane(&self, vector: &Vector2<f64>) -> Vector3<f64> {
        let transform = self.frame.transform();
        let norms = transform.column_norms();
        transform.transform_vector(&Vector3::new(
            safe_div(vector.x, norms.x),
            safe_div(vector.y, norms.y),
            0.0,
        ))
    }

    /// Angle (radians) between the two plane normals
    pub fn angle(&self, other: &PlaneFrame) -> f64 {
        angle_between(&self.normal(), &other.normal())
    }

    /// Angle (radians) between the plane and a line
    pub fn angle_with_line(&self, line: &Line3) -> f64 {
        std::f64::consts::FRAC_PI_2 - angle_between(line.direction(), &self.normal())
    }

    /// True when the normals are parallel or anti-parallel
    pub fn is_parallel(&self, other: &PlaneFrame) -> bool {
        let angle = self.angle(other);
        angle < PARALLEL_EPS || angle > std::f64::consts::PI - PARALLEL_EPS
    }

    /// True when `point` lies on the plane within [`EPS`]
    pub fn is_on_plane_point(&self, point: &Point3<f64>) -> bool {
        self.distance_from_plane(point) < EPS
    }

    /// True when both defining points of `line` lie on the plane
    pub fn is_on_plane_line(&self, line: &Line3) -> bool {
        self.is_on_plane_point(line.point()) && self.is_on_plane_point(&line.point2())
    }

    /// True when `other` is parallel and passes through this plane
    pub fn is_on_plane_plane(&self, other: &PlaneFrame) -> bool {
        self.is_parallel(other) && self.is_on_plane_point(&other.origin())
    }

    /// Intersection line of two planes, `None` when they are parallel
    ///
    /// Coincident planes count as parallel.
    pub fn intersection_line(&self, other: &PlaneFrame) -> Option<Line3> {
        let n1 = self.unit_normal();
        let n2 = other.unit_normal();
        let direction = n1.cross(&n2);
        if direction.norm_squared() < EPS {
            return None;
        }
        let c = n1.dot(&n2);
        let determinant = 1.0 - c * c;
        let d1 = n1.dot(&self.origin().coords);
        let d2 = n2.dot(&other.origin().coords);
        let c1 = (d1 - d2 * c) / determinant;
        let c2 = (d2 - d1 * c) / determinant;
        Some(Line3::new(Point3::from(n1 * c1 + n2 * c2), direction))
    }

    /// Intersection of `line` with the plane using unit normal and direction
    pub fn intersection_point(&self, line: &Line3) -> Option<Point3<f64>> {
        let normal = self.normal().try_normalize(0.0)?;
        let direction = line.direction().try_normalize(0.0)?;
        let denominator = normal.dot(&direction);
        if denominator.abs() < EPS {
            return None;
        }
        let t = normal.dot(&(self.origin() - line.point())) / denominator;
        Some(line.point() + direction * t)
    }

    /// Line parameter `t` of the intersection, using the raw vectors
    pub fn intersection_param(&self, line: &Line3) -> Option<f64> {
        let normal = self.normal();
        let denominator = normal.dot(line.direction());
        if denominator.abs() < EPS {
            return None;
        }
        Some(normal.dot(&(self.origin() - line.point())) / denominator)
    }

    /// Segment where `other` cuts this plane's rectangle, in 2D plane millimeters
    ///
    /// Returns zero, one or two endpoints.
    pub fn intersect_with_plane_2d(&self, other: &PlaneFrame) -> Result<Vec<Point2<f64>>> {
        let Some(line) = self.intersection_line(other) else {
            return Ok(Vec::new());
        };
        let (start, _) = self.map_to_plane(line.point())?;
        let (end, _) = self.map_to_plane(&line.point2())?;
        Ok(rectangle_line_intersection(
            0.0,
            0.0,
            self.extent_in_mm(0),
            self.extent_in_mm(1),
            &start,
            &(end - start),
        ))
    }
}

fn safe_div(value: f64, norm: f64) -> f64 {
    if norm == 0.0 { 0.0 } else { value / norm }
}

impl Default for PlaneFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for PlaneFrame {
    type Target = AffineFrame;

    fn deref(&self) -> &AffineFrame {
        &self.frame
    }
}

impl From<PlaneFrame> for AffineFrame {
    fn from(plane: PlaneFrame) -> Self {
        plane.frame
    }
}

impl TryFrom<AffineFrame> for PlaneFrame {
    type Error = Error;

    /// Adopt a frame as a plane, re-deriving its normal
    ///
    /// Fails unless the frame's bounds satisfy the plane contract.
    fn try_from(frame: AffineFrame) -> Result<Self> {
        validate_plane_bounds(&frame.bounds())?;
        let mut plane = Self { frame };
        plane.ensure_perpendicular_normal();
        Ok(plane)
    }
}
