//! Affine frames mapping index coordinates to world coordinates
//!
//! An [`AffineFrame`] owns an index-to-world transform, a bounding box in index
//! units, a time interval and the image-geometry flag. Image geometries use the
//! voxel-center convention: world coordinates address voxel centers while index
//! coordinates address voxel corners, so conversions shift by half a voxel.

use crate::bounds::{BoundingBox, TimeBounds};
use crate::error::{Error, Result};
use crate::modified::ModifiedTime;
use crate::operation::{Operation, clamp_angle_degrees, orientation_change};
use crate::transform::AffineTransform;
use nalgebra::{Matrix3, Point3, Vector3};
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

fn half_voxel() -> Vector3<f64> {
    Vector3::repeat(0.5)
}

/// A bounded affine frame in world space
///
/// # Example
///
/// ```
/// use medgeom::AffineFrame;
/// use nalgebra::{Point3, Vector3};
///
/// let mut frame = AffineFrame::new();
/// frame.set_spacing(&Vector3::new(2.0, 2.0, 3.0)).unwrap();
/// frame.set_origin(&Point3::new(10.0, 0.0, 0.0));
///
/// let world = frame.index_to_world(&Point3::new(1.0, 1.0, 1.0));
/// assert_eq!(world, Point3::new(12.0, 2.0, 3.0));
/// assert_eq!(frame.world_to_index(&world).unwrap(), Point3::new(1.0, 1.0, 1.0));
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AffineFrame {
    transform: AffineTransform,
    bounding_box: BoundingBox,
    spacing: Vector3<f64>,
    time_bounds: TimeBounds,
    image_geometry: bool,
    frame_of_reference_id: u32,
    #[cfg_attr(feature = "serde", serde(skip))]
    modified: ModifiedTime,
}

impl AffineFrame {
    /// Identity transform, unit bounds and infinite time bounds
    pub fn new() -> Self {
        Self {
            transform: AffineTransform::identity(),
            bounding_box: BoundingBox::unit(),
            spacing: Vector3::new(1.0, 1.0, 1.0),
            time_bounds: TimeBounds::full(),
            image_geometry: false,
            frame_of_reference_id: 0,
            modified: ModifiedTime::now(),
        }
    }

    /// Create a frame from a transform and index bounds
    pub fn with_transform(transform: AffineTransform, bounding_box: BoundingBox) -> Self {
        let mut frame = Self::new();
        frame.set_transform(transform);
        frame.bounding_box = bounding_box;
        frame
    }

    /// Reset to the state produced by [`AffineFrame::new`]
    pub fn initialize(&mut self) {
        *self = Self::new();
    }

    fn touch(&mut self) {
        self.modified = ModifiedTime::now();
    }

    /// Stamp of the last mutation
    pub fn modified(&self) -> ModifiedTime {
        self.modified
    }

    /// Index-to-world transform
    pub fn transform(&self) -> &AffineTransform {
        &self.transform
    }

    /// Replace the index-to-world transform; spacing is re-derived
    pub fn set_transform(&mut self, transform: AffineTransform) {
        self.transform = transform;
        self.spacing = transform.column_norms();
        self.touch();
    }

    /// Linear part of the transform
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.transform.matrix
    }

    /// World position of index `(0, 0, 0)` before any voxel-center shift
    pub fn origin(&self) -> Point3<f64> {
        Point3::from(self.transform.offset)
    }

    /// Move the frame so that [`AffineFrame::origin`] becomes `origin`
    pub fn set_origin(&mut self, origin: &Point3<f64>) {
        self.transform.offset = origin.coords;
        self.touch();
    }

    /// Shift the origin by a world-space vector
    pub fn translate(&mut self, vector: &Vector3<f64>) {
        self.transform.offset += vector;
        self.touch();
    }

    /// Per-axis spacing, the column lengths of the transform
    pub fn spacing(&self) -> &Vector3<f64> {
        &self.spacing
    }

    /// Rescale the columns to the given lengths; the origin stays put
    ///
    /// Fails with [`Error::InvalidSpacing`] for non-positive values and with
    /// [`Error::DegenerateTransform`] if a column has zero length.
    pub fn set_spacing(&mut self, spacing: &Vector3<f64>) -> Result<()> {
        if spacing.iter().any(|s| !(*s > 0.0) || !s.is_finite()) {
            return Err(Error::InvalidSpacing(format!(
                "spacing must be positive and finite, got ({}, {}, {})",
                spacing.x, spacing.y, spacing.z
            )));
        }
        let mut transform = self.transform;
        for axis in 0..3 {
            let column = transform.column(axis);
            let length = column.norm();
            if length == 0.0 {
                return Err(Error::degenerate_transform(&transform.matrix));
            }
            transform.set_column(axis, &(column * (spacing[axis] / length)));
        }
        self.set_transform(transform);
        Ok(())
    }

    /// Bounding box in index units
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// Bounds as `[x0, x1, y0, y1, z0, z1]` in index units
    pub fn bounds(&self) -> [f64; 6] {
        self.bounding_box.bounds()
    }

    /// Replace the bounds
    pub fn set_bounds(&mut self, bounds: [f64; 6]) -> Result<()> {
        self.set_bounding_box(BoundingBox::from_bounds(bounds)?);
        Ok(())
    }

    /// Replace the bounding box
    pub fn set_bounding_box(&mut self, bounding_box: BoundingBox) {
        self.bounding_box = bounding_box;
        self.touch();
    }

    /// Time interval covered by the frame
    pub fn time_bounds(&self) -> &TimeBounds {
        &self.time_bounds
    }

    /// Replace the time interval
    pub fn set_time_bounds(&mut self, time_bounds: TimeBounds) {
        self.time_bounds = time_bounds;
        self.touch();
    }

    /// True for the voxel-center convention
    pub fn image_geometry(&self) -> bool {
        self.image_geometry
    }

    /// Set the voxel-center flag without moving the origin
    pub fn set_image_geometry(&mut self, image_geometry: bool) {
        self.image_geometry = image_geometry;
        self.touch();
    }

    /// Switch the voxel-center flag so that the world-space corners stay in place
    ///
    /// The origin is moved by half a voxel: towards the first voxel center when
    /// switching to an image geometry, back to the corner otherwise.
    pub fn change_image_geometry_considering_origin_offset(&mut self, image_geometry: bool) {
        if self.image_geometry == image_geometry {
            return;
        }
        let shift = if image_geometry {
            half_voxel()
        } else {
            -half_voxel()
        };
        let origin = self.transform.transform_point(&Point3::from(shift));
        self.set_origin(&origin);
        self.set_image_geometry(image_geometry);
    }

    /// Frame-of-reference identifier shared by co-registered frames
    pub fn frame_of_reference_id(&self) -> u32 {
        self.frame_of_reference_id
    }

    /// Set the frame-of-reference identifier
    pub fn set_frame_of_reference_id(&mut self, id: u32) {
        self.frame_of_reference_id = id;
        self.touch();
    }

    /// True when the transform has a finite inverse
    pub fn is_valid(&self) -> bool {
        self.transform.is_invertible()
    }

    /// Convert a world point to index coordinates
    ///
    /// Fails with [`Error::DegenerateTransform`] when the matrix cannot be
    /// inverted.
    pub fn world_to_index(&self, world: &Point3<f64>) -> Result<Point3<f64>> {
        let inverse = self.transform.inverse_matrix()?;
        let mut index = inverse * (world.coords - self.transform.offset);
        if self.image_geometry {
            index += half_voxel();
        }
        Ok(Point3::from(index))
    }

    /// Convert an index point to world coordinates
    pub fn index_to_world(&self, index: &Point3<f64>) -> Point3<f64> {
        let mut index = *index;
        if self.image_geometry {
            index -= half_voxel();
        }
        self.transform.transform_point(&index)
    }

    /// Convert a world vector to index units
    pub fn world_to_index_vector(&self, world: &Vector3<f64>) -> Result<Vector3<f64>> {
        Ok(self.transform.inverse_matrix()? * world)
    }

    /// Convert an index vector to world units
    pub fn index_to_world_vector(&self, index: &Vector3<f64>) -> Vector3<f64> {
        self.transform.transform_vector(index)
    }

    /// Length of the bounding box along `axis` in index units
    ///
    /// # Panics
    ///
    /// Panics if `axis > 2`.
    pub fn extent(&self, axis: usize) -> f64 {
        self.bounding_box.extent(axis)
    }

    /// Length of the bounding box along `axis` in millimeters
    ///
    /// # Panics
    ///
    /// Panics if `axis > 2`.
    pub fn extent_in_mm(&self, axis: usize) -> f64 {
        self.transform.column(axis).norm() * self.extent(axis)
    }

    /// Rescale column `axis` so that [`AffineFrame::extent_in_mm`] becomes `length`
    ///
    /// The column keeps its direction.
    pub fn set_extent_in_mm(&mut self, axis: usize, length: f64) -> Result<()> {
        if axis > 2 {
            return Err(Error::InvalidArgument(format!("axis {} is not in 0..3", axis)));
        }
        if !(length > 0.0) || !length.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "extent must be positive and finite, got {}",
                length
            )));
        }
        let current = self.extent_in_mm(axis);
        if current == 0.0 {
            return Err(Error::degenerate_transform(&self.transform.matrix));
        }
        let mut transform = self.transform;
        transform.set_column(axis, &(transform.column(axis) * (length / current)));
        self.set_transform(transform);
        Ok(())
    }

    /// World-space vector spanning the bounding box along `axis`
    ///
    /// # Panics
    ///
    /// Panics if `axis > 2`.
    pub fn axis_vector(&self, axis: usize) -> Vector3<f64> {
        self.transform.column(axis) * self.extent(axis)
    }

    /// World position of bounding-box corner `id` in `0..8`
    ///
    /// Ids enumerate `(x0,y0,z0), (x0,y0,z1), (x0,y1,z0), (x0,y1,z1), (x1,y0,z0),
    /// (x1,y0,z1), (x1,y1,z0), (x1,y1,z1)`. Returns `None` for `id > 7`.
    pub fn corner_point(&self, id: usize) -> Option<Point3<f64>> {
        self.bounding_box
            .corner_by_id(id)
            .map(|index| self.index_to_world(&index))
    }

    /// World position of the corner on the upper (`true`) or lower side per axis
    pub fn corner_point_by_side(&self, upper_x: bool, upper_y: bool, upper_z: bool) -> Point3<f64> {
        self.index_to_world(&self.bounding_box.corner(upper_x, upper_y, upper_z))
    }

    /// All eight corners in [`AffineFrame::corner_point`] order
    pub fn corner_points(&self) -> [Point3<f64>; 8] {
        std::array::from_fn(|id| {
            self.index_to_world(&self.bounding_box.corner(id & 4 != 0, id & 2 != 0, id & 1 != 0))
        })
    }

    /// World position of the bounding-box center
    pub fn center(&self) -> Point3<f64> {
        self.index_to_world(&self.bounding_box.center())
    }

    /// Squared world length of the bounding-box diagonal
    pub fn diagonal_length2(&self) -> f64 {
        (self.corner_point_by_side(true, true, true) - self.corner_point_by_side(false, false, false))
            .norm_squared()
    }

    /// World length of the bounding-box diagonal
    pub fn diagonal_length(&self) -> f64 {
        self.diagonal_length2().sqrt()
    }

    /// True when the world point falls inside the bounding box
    pub fn is_inside(&self, world: &Point3<f64>) -> Result<bool> {
        Ok(self.is_index_inside(&self.world_to_index(world)?))
    }

    /// True when the index point falls inside the bounding box
    ///
    /// Image geometries exclude the upper faces, since the last voxel ends there.
    pub fn is_index_inside(&self, index: &Point3<f64>) -> bool {
        let min = self.bounding_box.min();
        let max = self.bounding_box.max();
        (0..3).all(|axis| {
            let v = index[axis];
            if self.image_geometry {
                v >= min[axis] && v < max[axis]
            } else {
                v >= min[axis] && v <= max[axis]
            }
        })
    }

    /// Apply a transform-change command
    ///
    /// Rotation angles are clamped to `[-360°, 360°]`; rotations about a zero
    /// axis are logged and skipped.
    pub fn apply_operation(&mut self, operation: &Operation) -> Result<()> {
        match *operation {
            Operation::Nothing => {}
            Operation::Translate(vector) => self.translate(&vector),
            Operation::ScaleAboutCenter { delta } => self.scale_about_center(&delta)?,
            Operation::RotateAboutPoint {
                center,
                axis,
                angle_degrees,
            } => self.rotate_about_point(&center, &axis, angle_degrees),
            Operation::Orient { point, normal } => {
                let (axis, angle) = orientation_change(&self.transform.column(2), &normal);
                self.rotate_about_point(&point, &axis, angle);
            }
            Operation::RestorePlanePosition { transform, .. } => self.set_transform(transform),
        }
        Ok(())
    }

    fn scale_about_center(&mut self, delta: &Vector3<f64>) -> Result<()> {
        let center = self.center();
        let mut transform = self.transform;
        for axis in 0..3 {
            let column = transform.column(axis);
            let length = column.norm();
            if length == 0.0 {
                return Err(Error::degenerate_transform(&transform.matrix));
            }
            let factor = 1.0 + delta[axis] / length;
            transform.set_column(axis, &(column * factor));
        }
        self.set_transform(transform);
        // move the origin so that the world-space center is unchanged
        let shift = center - self.center();
        self.translate(&shift);
        Ok(())
    }

    pub(crate) fn rotate_about_point(
        &mut self,
        center: &Point3<f64>,
        axis: &Vector3<f64>,
        angle_degrees: f64,
    ) {
        let angle = clamp_angle_degrees(angle_degrees).to_radians();
        match AffineTransform::rotation_about_point(center, axis, angle) {
            Some(rotation) => self.set_transform(self.transform.compose(&rotation)),
            // aligned directions yield a zero axis with a zero angle
            None if angle == 0.0 => {}
            None => warn!(angle_degrees, "Ignoring rotation about a zero-length axis"),
        }
    }
}

impl Default for AffineFrame {
    fn default() -> Self {
        Self::new()
    }
}
