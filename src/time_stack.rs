//! Stacks of 3D frames over discrete time steps
//!
//! A [`TimeStack`] holds one frame per time step. In evenly timed mode an unset
//! step is derived from step 0 by shifting its time bounds by whole durations.
//! The stack's own frame aggregates all steps: its time bounds span them, its
//! bounding box encloses them and its transform is that of step 0.

use crate::aggregate::aggregate_time_bounds;
use crate::bounds::{BoundingBox, TimeBounds};
use crate::error::{Error, Result};
use crate::frame::AffineFrame;
use crate::modified::ModifiedTime;
use crate::operation::Operation;
use crate::slot::{Slot, SlotState, unset_slots};
use std::ops::Deref;
use tracing::trace;

/// Ordered, lazily derived sequence of frames over time
#[derive(Debug, Clone)]
pub struct TimeStack {
    frame: AffineFrame,
    slots: Vec<Slot<AffineFrame>>,
    evenly_timed: bool,
    aggregated: ModifiedTime,
}

impl TimeStack {
    /// Stack without time steps
    pub fn new() -> Self {
        Self {
            frame: AffineFrame::new(),
            slots: Vec::new(),
            evenly_timed: false,
            aggregated: ModifiedTime::ZERO,
        }
    }

    /// Stack of `time_steps` copies of `frame`, evenly timed
    ///
    /// See [`TimeStack::initialize_evenly_timed`].
    pub fn from_frame(frame: AffineFrame, time_steps: usize) -> Result<Self> {
        let mut stack = Self::new();
        stack.initialize_evenly_timed(frame, time_steps)?;
        Ok(stack)
    }

    /// Reset to `time_steps` unset steps
    pub fn initialize_empty(&mut self, time_steps: usize) {
        self.frame.initialize();
        self.slots = unset_slots(time_steps);
        self.aggregated = ModifiedTime::ZERO;
    }

    /// Use `frame` as step 0 of `time_steps` evenly timed steps
    ///
    /// Step `t` covers the time bounds of `frame` shifted by `t` durations.
    /// Fails with [`Error::InvalidArgument`] when `time_steps` is zero.
    ///
    /// # Example
    ///
    /// ```
    /// use medgeom::{AffineFrame, TimeBounds, TimeStack};
    ///
    /// let mut frame = AffineFrame::new();
    /// frame.set_time_bounds(TimeBounds::new(0.0, 20.0));
    /// let mut stack = TimeStack::from_frame(frame, 5).unwrap();
    ///
    /// assert_eq!(*stack.time_bounds(), TimeBounds::new(0.0, 100.0));
    /// assert_eq!(stack.ms_to_time_step(40.0), 2);
    /// assert_eq!(stack.time_step_to_ms(2), 40.0);
    /// assert_eq!(*stack.frame(3).unwrap().time_bounds(), TimeBounds::new(60.0, 80.0));
    /// ```
    pub fn initialize_evenly_timed(&mut self, frame: AffineFrame, time_steps: usize) -> Result<()> {
        if time_steps == 0 {
            return Err(Error::InvalidArgument(
                "a time stack needs at least one time step".to_string(),
            ));
        }
        let frame_of_reference_id = frame.frame_of_reference_id();
        let image_geometry = frame.image_geometry();

        self.initialize_empty(time_steps);
        self.slots[0] = Slot::Explicit(frame);
        self.evenly_timed = true;
        self.update_information();
        self.frame.set_frame_of_reference_id(frame_of_reference_id);
        self.frame.set_image_geometry(image_geometry);
        Ok(())
    }

    /// Number of time steps
    pub fn time_steps(&self) -> usize {
        self.slots.len()
    }

    /// True when `time_step` addresses a step
    pub fn is_valid_time(&self, time_step: usize) -> bool {
        time_step < self.slots.len()
    }

    /// State of slot `time_step`, `None` if out of range
    pub fn slot_state(&self, time_step: usize) -> Option<SlotState> {
        self.slots.get(time_step).map(Slot::state)
    }

    /// True when unset steps are derived from step 0
    pub fn is_evenly_timed(&self) -> bool {
        self.evenly_timed
    }

    /// Switch the derivation of unset steps on or off
    pub fn set_evenly_timed(&mut self, evenly_timed: bool) {
        self.evenly_timed = evenly_timed;
    }

    /// The aggregated frame
    pub fn aggregate_frame(&self) -> &AffineFrame {
        &self.frame
    }

    /// Frame of `time_step`, deriving and caching it from step 0 if needed
    ///
    /// A derived frame's time bounds are step 0's shifted by
    /// `time_step · duration`, provided step 0's bounds are finite.
    pub fn frame(&mut self, time_step: usize) -> Option<&AffineFrame> {
        if matches!(self.slots.get(time_step)?, Slot::Unset) && self.evenly_timed {
            let derived = self.derive_frame(time_step)?;
            self.slots[time_step] = Slot::Derived(derived);
        }
        self.slots[time_step].get()
    }

    /// Frame of `time_step` if it is stored or already derived
    pub fn frame_if_materialized(&self, time_step: usize) -> Option<&AffineFrame> {
        self.slots.get(time_step).and_then(Slot::get)
    }

    /// Store `frame` for `time_step` and re-aggregate
    ///
    /// Replacing step 0 of an evenly timed stack drops the frames derived
    /// from it.
    pub fn set_frame(&mut self, frame: AffineFrame, time_step: usize) -> Result<()> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(time_step)
            .ok_or(Error::OutOfRangeIndex {
                index: time_step,
                len,
            })?;
        *slot = Slot::Explicit(frame);
        if time_step == 0 && self.evenly_timed {
            for slot in &mut self.slots {
                if slot.is_derived() {
                    *slot = Slot::Unset;
                }
            }
        }
        self.update_information();
        Ok(())
    }

    fn derive_frame(&self, time_step: usize) -> Option<AffineFrame> {
        let mut derived = self.slots.first().and_then(Slot::get)?.clone();
        let bounds = *derived.time_bounds();
        if bounds.is_finite() {
            derived.set_time_bounds(bounds.shifted(time_step as f64 * bounds.duration()));
        }
        trace!(time_step, "Derived frame from time step 0");
        Some(derived)
    }

    /// Re-aggregate time bounds, bounding box and transform from all steps
    ///
    /// Every derivable step is materialized first. The time bounds follow
    /// the tightest-finite rule of [`aggregate_time_bounds`]; the bounding box
    /// is the union of all non-degenerate step boxes.
    pub fn update_information(&mut self) {
        if self.slots.is_empty() {
            return;
        }
        for time_step in 0..self.slots.len() {
            self.frame(time_step);
        }

        let frames: Vec<&AffineFrame> = self.slots.iter().filter_map(Slot::get).collect();
        let newest = frames
            .iter()
            .map(|frame| frame.modified())
            .max()
            .unwrap_or(ModifiedTime::ZERO);
        let time_bounds = aggregate_time_bounds(frames.iter().map(|frame| *frame.time_bounds()));
        let bounding_box = frames
            .iter()
            .map(|frame| frame.bounding_box())
            .filter(|bbox| !bbox.is_degenerate())
            .fold(None, |acc: Option<BoundingBox>, bbox| {
                Some(acc.map_or(*bbox, |acc| acc.union(bbox)))
            })
            .unwrap_or_else(BoundingBox::zero);
        let transform = frames.first().map(|frame| *frame.transform());

        debug_assert!(time_bounds.start <= time_bounds.end);
        self.frame.set_time_bounds(time_bounds);
        self.frame.set_bounding_box(bounding_box);
        if let Some(transform) = transform {
            self.frame.set_transform(transform);
        }
        self.aggregated = newest;
    }

    /// True when a stored step changed since the last aggregation
    pub fn is_outdated(&self) -> bool {
        self.slots
            .iter()
            .filter_map(Slot::get)
            .any(|frame| frame.modified() > self.aggregated)
    }

    /// Re-aggregate if a step changed; returns whether it did
    pub fn update_if_outdated(&mut self) -> bool {
        if self.is_outdated() {
            self.update_information();
            true
        } else {
            false
        }
    }

    /// Map a time in milliseconds to a step
    ///
    /// Returns `-1` before the first step and [`TimeStack::time_steps`] at or
    /// after the end. Evenly timed stacks round half up; others return the first
    /// step whose interval contains `time_ms`, or 0.
    pub fn ms_to_time_step(&self, time_ms: f64) -> i64 {
        let bounds = self.frame.time_bounds();
        let steps = self.slots.len();
        if time_ms < bounds.start {
            return -1;
        }
        if time_ms >= bounds.end {
            return steps as i64;
        }
        if self.evenly_timed {
            if bounds.start == bounds.end {
                return 0;
            }
            if bounds.is_finite() {
                let position = steps as f64 * (time_ms - bounds.start) / bounds.duration();
                return (position - 0.5).ceil() as i64;
            }
            return 0;
        }
        self.slots
            .iter()
            .position(|slot| {
                slot.get()
                    .is_some_and(|frame| frame.time_bounds().contains(time_ms))
            })
            .map_or(0, |step| step as i64)
    }

    /// Start time of `time_step` in milliseconds, `+∞` for an invalid step
    pub fn time_step_to_ms(&self, time_step: usize) -> f64 {
        if !self.is_valid_time(time_step) {
            return f64::INFINITY;
        }
        if self.evenly_timed {
            let bounds = self.frame.time_bounds();
            if time_step == 0 {
                return bounds.start;
            }
            return bounds.start
                + time_step as f64 / self.slots.len() as f64 * bounds.duration();
        }
        self.frame_if_materialized(time_step)
            .map_or(f64::INFINITY, |frame| frame.time_bounds().start)
    }

    /// Step of `other` that covers the start of this stack's `time_step`
    pub fn time_step_to_time_step(&self, other: &TimeStack, time_step: usize) -> i64 {
        other.ms_to_time_step(self.time_step_to_ms(time_step))
    }

    /// Grow the stack to `time_steps` steps, appending unset slots
    ///
    /// A single step with an infinite bound is first restricted to `[0, 1]`.
    /// Does nothing if the stack already has enough steps.
    pub fn expand_to_number_of_time_steps(&mut self, time_steps: usize) {
        if time_steps <= self.slots.len() {
            return;
        }
        if let [Slot::Explicit(first) | Slot::Derived(first)] = self.slots.as_mut_slice() {
            if !first.time_bounds().is_finite() {
                first.set_time_bounds(TimeBounds::new(0.0, 1.0));
            }
        }
        self.slots.resize_with(time_steps, || Slot::Unset);
        self.update_information();
    }

    /// Apply a transform-change command to every stored step, then re-aggregate
    pub fn apply_operation(&mut self, operation: &Operation) -> Result<()> {
        for frame in self.slots.iter_mut().filter_map(Slot::get_mut) {
            frame.apply_operation(operation)?;
        }
        self.update_information();
        Ok(())
    }
}

impl Default for TimeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TimeStack {
    type Target = AffineFrame;

    fn deref(&self) -> &AffineFrame {
        &self.frame
    }
}
