//! Stacks of plane slices describing a volume
//!
//! A [`SliceStack`] holds one slot per slice. In evenly spaced mode only slot 0
//! has to be stored: any other slot that is read while unset is derived from
//! slot 0 by a rigid shift along the stack direction and cached.
//!
//! A stack built from a volume keeps a non-owning reference to it. The volume
//! must outlive the stack and is never mutated through it. After a rotation the
//! stack is re-aligned so that it still covers the whole volume and so that a
//! slice passes through the point the caller rotated about.

use crate::bounds::TimeBounds;
use crate::config::DIRECTION_EPS;
use crate::error::{Error, Result};
use crate::frame::AffineFrame;
use crate::operation::{Operation, clamp_angle_degrees, orientation_change};
use crate::plane::{Orientation, PlaneFrame, StandardPlaneOptions};
use crate::slot::{Slot, SlotState, unset_slots};
use crate::transform::AffineTransform;
use nalgebra::{Point3, Vector3};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use tracing::{debug, trace};

/// Receiver of slice-count and focus-point changes, typically a slice stepper
pub trait SliceCountObserver {
    /// The number of slices changed to `slices`
    fn slice_count_changed(&self, slices: usize);

    /// The stack was re-aligned around `point`, which a stepper should select
    fn focus_point(&self, _point: &Point3<f64>) {}
}

/// Effective spacing of a volume with per-axis `spacing` along direction `d`
///
/// The volume's voxel is treated as an ellipsoid with radii `spacing`; the
/// result is the ellipsoid radius in direction `d`. Returns 1 for a zero `d`.
///
/// # Example
///
/// ```
/// use medgeom::slice_stack::calculate_spacing;
/// use nalgebra::Vector3;
///
/// let spacing = Vector3::new(1.0, 1.0, 4.0);
/// assert!((calculate_spacing(&spacing, &Vector3::z()) - 4.0).abs() < 1e-12);
/// assert!((calculate_spacing(&spacing, &Vector3::x()) - 1.0).abs() < 1e-12);
/// ```
pub fn calculate_spacing(spacing: &Vector3<f64>, d: &Vector3<f64>) -> f64 {
    let scaling = d.component_div(spacing).norm();
    if scaling == 0.0 || !scaling.is_finite() {
        return 1.0;
    }
    d.norm() / scaling
}

/// Sum over axes of `|extent_in_mm(axis) · normal[axis]|`
pub fn directed_extent(volume: &AffineFrame, normal: &Vector3<f64>) -> f64 {
    (0..3)
        .map(|axis| (volume.extent_in_mm(axis) * normal[axis]).abs())
        .sum()
}

/// Number of slices needed to cover `directed_extent` at `spacing`, at least 1
fn slice_count(directed_extent: f64, spacing: f64) -> usize {
    if directed_extent >= spacing {
        (directed_extent / spacing + 0.5).floor() as usize
    } else {
        1
    }
}

/// Ordered, lazily derived sequence of plane slices
#[derive(Clone)]
pub struct SliceStack<'r> {
    frame: AffineFrame,
    slots: Vec<Slot<PlaneFrame>>,
    evenly_spaced: bool,
    direction_vector: Vector3<f64>,
    reference: Option<&'r AffineFrame>,
    observer: Option<Rc<dyn SliceCountObserver + 'r>>,
}

impl<'r> SliceStack<'r> {
    /// Empty, evenly spaced stack without slices
    pub fn new() -> Self {
        Self {
            frame: AffineFrame::new(),
            slots: Vec::new(),
            evenly_spaced: true,
            direction_vector: Vector3::zeros(),
            reference: None,
            observer: None,
        }
    }

    /// Reset to `slices` unset slots with unit spacing and no direction
    ///
    /// The reference volume and observer are kept.
    pub fn initialize(&mut self, slices: usize) {
        self.frame.initialize();
        self.slots = unset_slots(slices);
        self.direction_vector = Vector3::zeros();
        self.evenly_spaced = true;
    }

    /// Number of slices
    pub fn slices(&self) -> usize {
        self.slots.len()
    }

    /// True when `index` addresses a slice
    pub fn is_valid_slice(&self, index: usize) -> bool {
        index < self.slots.len()
    }

    /// State of slot `index`, `None` if out of range
    pub fn slot_state(&self, index: usize) -> Option<SlotState> {
        self.slots.get(index).map(Slot::state)
    }

    /// True when non-first slices are derived from slice 0
    pub fn evenly_spaced(&self) -> bool {
        self.evenly_spaced
    }

    /// Switch the derivation of unset slices on or off
    pub fn set_evenly_spaced(&mut self, evenly_spaced: bool) {
        self.evenly_spaced = evenly_spaced;
    }

    /// Unit direction in which derived slices are stacked; zero until known
    pub fn direction_vector(&self) -> &Vector3<f64> {
        &self.direction_vector
    }

    /// Set the stacking direction
    ///
    /// The vector is normalized. It only replaces the current one when the
    /// squared difference exceeds [`DIRECTION_EPS`]; cached derived slices are
    /// then dropped so they re-derive along the new direction.
    pub fn set_direction_vector(&mut self, direction: &Vector3<f64>) {
        let Some(direction) = direction.try_normalize(0.0) else {
            return;
        };
        if (direction - self.direction_vector).norm_squared() > DIRECTION_EPS {
            self.direction_vector = direction;
            self.drop_derived_slices();
        }
    }

    /// The volume this stack was built from
    pub fn reference_geometry(&self) -> Option<&'r AffineFrame> {
        self.reference
    }

    /// Set or clear the volume this stack re-aligns against
    pub fn set_reference_geometry(&mut self, reference: Option<&'r AffineFrame>) {
        self.reference = reference;
    }

    /// Register the receiver of slice-count and focus-point changes
    pub fn set_observer(&mut self, observer: Option<Rc<dyn SliceCountObserver + 'r>>) {
        self.observer = observer;
    }

    /// The stack's own bounding frame
    pub fn stack_frame(&self) -> &AffineFrame {
        &self.frame
    }

    /// Slice `index`, deriving and caching it from slice 0 if needed
    ///
    /// Returns `None` for an out-of-range index, or for an unset slot that
    /// cannot be derived.
    pub fn slice(&mut self, index: usize) -> Option<&PlaneFrame> {
        if matches!(self.slots.get(index)?, Slot::Unset) && self.evenly_spaced {
            let derived = self.derive_slice(index)?;
            self.slots[index] = Slot::Derived(derived);
        }
        self.slots[index].get()
    }

    /// Slice `index` if it is stored or already derived
    pub fn slice_if_materialized(&self, index: usize) -> Option<&PlaneFrame> {
        self.slots.get(index).and_then(Slot::get)
    }

    /// Store `plane` as slice `index`
    pub fn set_slice(&mut self, plane: PlaneFrame, index: usize) -> Result<()> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(Error::OutOfRangeIndex { index, len })?;
        *slot = Slot::Explicit(plane);
        Ok(())
    }

    fn derive_slice(&mut self, index: usize) -> Option<PlaneFrame> {
        let mut derived = self.slots.first().and_then(Slot::get)?.clone();
        if self.direction_vector.norm_squared() == 0.0 {
            self.direction_vector = derived.unit_normal();
        }
        let shift = self.direction_vector * (self.frame.spacing().z * index as f64);
        derived.translate(&shift);
        trace!(index, "Derived slice from slice 0");
        Some(derived)
    }

    fn drop_derived_slices(&mut self) {
        for slot in &mut self.slots {
            if slot.is_derived() {
                *slot = Slot::Unset;
            }
        }
    }

    /// Build an evenly spaced stack with `plane` as slice 0
    ///
    /// The stack adopts the plane's transform; with `flipped` its normal axis
    /// and the stacking direction point the other way. `z_spacing` defaults to
    /// the plane's own thickness. Slice 0 is stored as given; only the stack
    /// frame carries `z_spacing`.
    pub fn initialize_evenly_spaced(
        &mut self,
        plane: PlaneFrame,
        z_spacing: Option<f64>,
        slices: usize,
        flipped: bool,
    ) -> Result<()> {
        if slices == 0 {
            return Err(Error::InvalidArgument(
                "a slice stack needs at least one slice".to_string(),
            ));
        }
        let z_spacing = z_spacing.unwrap_or_else(|| plane.extent_in_mm(2) / plane.extent(2));
        if !(z_spacing > 0.0) || !z_spacing.is_finite() {
            return Err(Error::InvalidSpacing(format!(
                "slice distance must be positive and finite, got {}",
                z_spacing
            )));
        }
        let mut direction = plane
            .normal()
            .try_normalize(0.0)
            .ok_or_else(|| Error::degenerate_transform(plane.matrix()))?;

        let mut transform = *plane.transform();
        if flipped {
            direction = -direction;
            transform.set_column(2, &-transform.column(2));
        }

        let bounds = plane.bounds();
        let spacing = Vector3::new(
            plane.extent_in_mm(0) / bounds[1],
            plane.extent_in_mm(1) / bounds[3],
            z_spacing,
        );

        let mut frame = AffineFrame::new();
        frame.set_transform(transform);
        frame.set_bounds([bounds[0], bounds[1], bounds[2], bounds[3], 0.0, slices as f64])?;
        frame.set_spacing(&spacing)?;
        frame.set_time_bounds(*plane.time_bounds());
        frame.set_frame_of_reference_id(plane.frame_of_reference_id());
        frame.set_image_geometry(plane.image_geometry());

        self.frame = frame;
        self.slots = unset_slots(slices);
        self.slots[0] = Slot::Explicit(plane);
        self.direction_vector = direction;
        self.evenly_spaced = true;
        Ok(())
    }

    /// Slice `volume` in a standard orientation
    ///
    /// Slice 0 sits on the first (`top`) or last voxel layer along the
    /// orientation's normal axis. The slice distance is the volume spacing along
    /// that axis and the slice count covers the directed extent of the volume.
    /// `volume` becomes the reference geometry.
    pub fn initialize_planes(
        &mut self,
        volume: &'r AffineFrame,
        top: bool,
        options: &StandardPlaneOptions,
    ) -> Result<()> {
        self.reference = Some(volume);

        let mut plane = PlaneFrame::new();
        plane.initialize_standard_plane_from_frame_top(volume, top, options)?;

        let view_spacing = volume.spacing()[options.orientation().normal_axis()];
        let normal = self.adjust_normal(&plane.normal())?;
        let slices = slice_count(directed_extent(volume, &normal), view_spacing);

        let flipped =
            !top ^ !options.frontside() ^ (options.orientation() == Orientation::Frontal);
        debug!(
            orientation = %options.orientation(),
            slices,
            flipped,
            "Initializing slice stack from volume"
        );
        self.initialize_evenly_spaced(plane, Some(view_spacing), slices, flipped)
    }

    /// Express a world normal in the reference volume's index axes, normalized
    ///
    /// Fails with [`Error::MissingReferenceGeometry`] without a reference and
    /// with [`Error::InvalidArgument`] for a zero normal.
    pub fn adjust_normal(&self, normal: &Vector3<f64>) -> Result<Vector3<f64>> {
        let reference = self
            .reference
            .ok_or_else(|| Error::missing_reference("adjust_normal"))?;
        reference
            .world_to_index_vector(normal)?
            .try_normalize(0.0)
            .ok_or_else(|| Error::InvalidArgument("normal must not be zero".to_string()))
    }

    /// Effective reference-volume spacing along `d`, or 1 without a reference
    pub fn calculate_spacing(&self, d: &Vector3<f64>) -> f64 {
        match self.reference {
            Some(reference) => calculate_spacing(reference.spacing(), d),
            None => 1.0,
        }
    }

    /// Re-align the stack after slice 0 was rotated
    ///
    /// Recomputes the per-axis spacing and the slice count for the new
    /// direction, moves slice 0 so that `center` lies half the directed extent
    /// away on the side it was already facing, then nudges it so that a slice
    /// boundary passes through `reference_point`. All other slots are cleared
    /// and the observer is told the new count.
    ///
    /// Does nothing if slice 0 is unset. Without a reference geometry the
    /// stack is left untouched and [`Error::MissingReferenceGeometry`] is
    /// returned instead of skipping silently.
    pub fn reinitialize_planes(
        &mut self,
        center: &Point3<f64>,
        reference_point: &Point3<f64>,
    ) -> Result<()> {
        let reference = self
            .reference
            .ok_or_else(|| Error::missing_reference("reinitialize_planes"))?;
        let Some(mut first) = self.slots.first().and_then(Slot::get).cloned() else {
            trace!("Slice 0 is unset, skipping re-alignment");
            return Ok(());
        };

        let normal = first.unit_normal();
        let spacing = Vector3::new(
            self.calculate_spacing(&first.axis_vector(0)),
            self.calculate_spacing(&first.axis_vector(1)),
            self.calculate_spacing(&normal),
        );
        self.frame.set_spacing(&spacing)?;

        let extent = directed_extent(reference, &normal);
        let slices = slice_count(extent, spacing.z);

        let center_distance = first.signed_distance_from_plane(center);
        if center_distance > 0.0 {
            first.translate(&(normal * (center_distance - extent / 2.0)));
            self.direction_vector = normal;
        } else {
            first.translate(&(normal * (extent / 2.0 + center_distance)));
            self.direction_vector = -normal;
        }

        let steps = first.signed_distance_from_plane(reference_point) / spacing.z;
        let alignment = steps - steps.trunc();
        first.translate(&(normal * (alignment * spacing.z)));

        let bounds = self.frame.bounds();
        self.frame
            .set_bounds([bounds[0], bounds[1], bounds[2], bounds[3], 0.0, slices as f64])?;
        self.slots = unset_slots(slices);
        self.slots[0] = Slot::Explicit(first);

        debug!(slices, spacing = ?spacing, "Re-aligned slice stack");
        if let Some(observer) = &self.observer {
            observer.slice_count_changed(slices);
        }
        Ok(())
    }

    /// Apply a transform-change command
    ///
    /// In evenly spaced mode a rotation only turns slice 0, about the
    /// reference volume's center, and then re-aligns the stack around the
    /// caller's point. Without evenly spaced slices every stored slice is
    /// rotated as given. Other commands move the stack frame and every stored
    /// slice; derived slices are dropped and re-derive on demand.
    pub fn apply_operation(&mut self, operation: &Operation) -> Result<()> {
        match *operation {
            Operation::RotateAboutPoint {
                center,
                axis,
                angle_degrees,
            } => self.rotate(operation, &center, &axis, angle_degrees),
            Operation::Orient { point, normal } => self.orient(operation, &point, &normal),
            _ => {
                self.frame.apply_operation(operation)?;
                let evenly_spaced = self.evenly_spaced;
                for slot in &mut self.slots {
                    if evenly_spaced && slot.is_derived() {
                        *slot = Slot::Unset;
                    } else if let Some(plane) = slot.get_mut() {
                        plane.apply_operation(operation)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn rotate(
        &mut self,
        operation: &Operation,
        center: &Point3<f64>,
        axis: &Vector3<f64>,
        angle_degrees: f64,
    ) -> Result<()> {
        if !self.evenly_spaced {
            return self.forward_to_materialized(operation);
        }
        let Some(reference) = self.reference else {
            self.forward_to_materialized(operation)?;
            let angle = clamp_angle_degrees(angle_degrees).to_radians();
            if let Some(rotation) = AffineTransform::rotation_about_point(center, axis, angle) {
                self.direction_vector = rotation.transform_vector(&self.direction_vector);
            }
            return self.frame.apply_operation(operation);
        };

        let volume_center = reference.center();
        let centered = Operation::RotateAboutPoint {
            center: volume_center,
            axis: *axis,
            angle_degrees,
        };
        self.realign_after(&centered, &volume_center, center)
    }

    fn orient(
        &mut self,
        operation: &Operation,
        point: &Point3<f64>,
        normal: &Vector3<f64>,
    ) -> Result<()> {
        if !self.evenly_spaced {
            return self.forward_to_materialized(operation);
        }
        let reference = self
            .reference
            .ok_or_else(|| Error::missing_reference("orient"))?;
        let Some(first) = self.slots.first().and_then(Slot::get) else {
            return Ok(());
        };

        let volume_center = reference.center();
        let (axis, angle_degrees) = orientation_change(&first.normal(), normal);
        let rotation = Operation::RotateAboutPoint {
            center: volume_center,
            axis,
            angle_degrees,
        };
        self.realign_after(&rotation, &volume_center, point)
    }

    /// Rotate slice 0 and the stack frame, re-aligning around `focus`
    fn realign_after(
        &mut self,
        rotation: &Operation,
        volume_center: &Point3<f64>,
        focus: &Point3<f64>,
    ) -> Result<()> {
        let Some(first) = self.slots.first_mut().and_then(Slot::get_mut) else {
            return Ok(());
        };
        first.apply_operation(rotation)?;
        self.reinitialize_planes(volume_center, focus)?;

        let spacing = *self.frame.spacing();
        if let Some(first) = self.slots.first_mut().and_then(Slot::get_mut) {
            first.set_spacing(&spacing)?;
        }
        if let Some(observer) = &self.observer {
            observer.focus_point(focus);
        }
        self.frame.apply_operation(rotation)
    }

    fn forward_to_materialized(&mut self, operation: &Operation) -> Result<()> {
        for plane in self.slots.iter_mut().filter_map(Slot::get_mut) {
            plane.apply_operation(operation)?;
        }
        Ok(())
    }

    /// Set the voxel-center flag on the stack and every stored slice
    pub fn set_image_geometry(&mut self, image_geometry: bool) {
        self.frame.set_image_geometry(image_geometry);
        for plane in self.slots.iter_mut().filter_map(Slot::get_mut) {
            plane.set_image_geometry(image_geometry);
        }
    }

    /// Set the time interval of the stack and every stored slice
    pub fn set_time_bounds(&mut self, time_bounds: TimeBounds) {
        self.frame.set_time_bounds(time_bounds);
        for plane in self.slots.iter_mut().filter_map(Slot::get_mut) {
            plane.set_time_bounds(time_bounds);
        }
    }
}

impl Default for SliceStack<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for SliceStack<'_> {
    type Target = AffineFrame;

    fn deref(&self) -> &AffineFrame {
        &self.frame
    }
}

impl fmt::Debug for SliceStack<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceStack")
            .field("frame", &self.frame)
            .field("slices", &self.slots.len())
            .field("evenly_spaced", &self.evenly_spaced)
            .field("direction_vector", &self.direction_vector)
            .field("has_reference", &self.reference.is_some())
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transversal_plane(z: f64) -> PlaneFrame {
        let mut plane = PlaneFrame::new();
        plane
            .initialize_standard_plane(
                10.0,
                20.0,
                z,
                &StandardPlaneOptions::new(Orientation::Transversal),
                None,
            )
            .unwrap();
        plane
    }

    #[test]
    fn test_calculate_spacing_oblique() {
        let spacing = Vector3::new(1.0, 1.0, 1.0);
        let d = Vector3::new(1.0, 1.0, 0.0);
        assert!((calculate_spacing(&spacing, &d) - 1.0).abs() < 1e-12);
        assert_eq!(calculate_spacing(&spacing, &Vector3::zeros()), 1.0);
    }

    #[test]
    fn test_slice_count_rounding() {
        assert_eq!(slice_count(10.0, 1.0), 10);
        assert_eq!(slice_count(10.4, 1.0), 10);
        assert_eq!(slice_count(10.5, 1.0), 11);
        assert_eq!(slice_count(0.5, 1.0), 1);
    }

    #[test]
    fn test_unset_slot_without_evenly_spaced_stays_unset() {
        let mut stack = SliceStack::new();
        stack.initialize(3);
        stack.set_evenly_spaced(false);
        stack.set_slice(transversal_plane(0.0), 0).unwrap();
        assert!(stack.slice(1).is_none());
        assert_eq!(stack.slot_state(1), Some(SlotState::Unset));
    }

    #[test]
    fn test_set_slice_out_of_range() {
        let mut stack = SliceStack::new();
        stack.initialize(2);
        let err = stack.set_slice(transversal_plane(0.0), 2).unwrap_err();
        assert_eq!(err, Error::OutOfRangeIndex { index: 2, len: 2 });
        assert!(stack.slice(5).is_none());
    }

    #[test]
    fn test_direction_vector_threshold() {
        let mut stack = SliceStack::new();
        stack.set_direction_vector(&Vector3::new(0.0, 0.0, 2.0));
        assert_eq!(*stack.direction_vector(), Vector3::z());
        // a change below the threshold is ignored
        stack.set_direction_vector(&Vector3::new(0.001, 0.0, 1.0));
        assert_eq!(*stack.direction_vector(), Vector3::z());
        stack.set_direction_vector(&Vector3::x());
        assert_eq!(*stack.direction_vector(), Vector3::x());
    }

    #[test]
    fn test_reinitialize_without_reference() {
        let mut stack = SliceStack::new();
        stack
            .initialize_evenly_spaced(transversal_plane(0.0), Some(1.0), 4, false)
            .unwrap();
        stack.slice(2).unwrap();
        assert!(matches!(
            stack.reinitialize_planes(&Point3::origin(), &Point3::origin()),
            Err(Error::MissingReferenceGeometry(_))
        ));
        assert_eq!(stack.slices(), 4);
        assert_eq!(stack.slot_state(2), Some(SlotState::Derived));
        assert_eq!(stack.calculate_spacing(&Vector3::x()), 1.0);
    }
}
