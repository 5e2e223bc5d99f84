//! Integration test for time stacks
//!
//! Covers time/step conversion for evenly and unevenly timed stacks,
//! aggregation of bounds and the growth of single-step stacks.

use medgeom::{AffineFrame, BoundingBox, Operation, SlotState, TimeBounds, TimeStack};
use nalgebra::{Point3, Vector3};

fn frame_with_time(start: f64, end: f64) -> AffineFrame {
    let mut frame = AffineFrame::new();
    frame.set_time_bounds(TimeBounds::new(start, end));
    frame
}

fn uneven_stack() -> TimeStack {
    let mut stack = TimeStack::new();
    stack.initialize_empty(3);
    stack.set_frame(frame_with_time(0.0, 10.0), 0).unwrap();
    stack.set_frame(frame_with_time(10.0, 25.0), 1).unwrap();
    stack.set_frame(frame_with_time(25.0, 40.0), 2).unwrap();
    stack
}

#[test]
fn test_evenly_timed_step_and_ms() {
    let stack = TimeStack::from_frame(frame_with_time(0.0, 20.0), 5).unwrap();

    assert_eq!(*stack.time_bounds(), TimeBounds::new(0.0, 100.0));
    assert_eq!(stack.ms_to_time_step(40.0), 2);
    assert_eq!(stack.time_step_to_ms(2), 40.0);
    assert_eq!(stack.time_step_to_ms(0), 0.0);
    assert_eq!(stack.ms_to_time_step(99.9), 5);
    assert_eq!(stack.ms_to_time_step(89.9), 4);
}

#[test]
fn test_all_steps_materialized_by_update() {
    let stack = TimeStack::from_frame(frame_with_time(0.0, 20.0), 4).unwrap();
    for step in 0..4 {
        let expected = if step == 0 {
            SlotState::Explicit
        } else {
            SlotState::Derived
        };
        assert_eq!(stack.slot_state(step), Some(expected));
        let frame = stack.frame_if_materialized(step).unwrap();
        let start = 20.0 * step as f64;
        assert_eq!(*frame.time_bounds(), TimeBounds::new(start, start + 20.0));
    }
}

#[test]
fn test_uneven_steps_use_linear_scan() {
    let stack = uneven_stack();

    assert!(!stack.is_evenly_timed());
    assert_eq!(*stack.time_bounds(), TimeBounds::new(0.0, 40.0));
    assert_eq!(stack.ms_to_time_step(-0.5), -1);
    assert_eq!(stack.ms_to_time_step(5.0), 0);
    assert_eq!(stack.ms_to_time_step(12.0), 1);
    assert_eq!(stack.ms_to_time_step(30.0), 2);
    assert_eq!(stack.ms_to_time_step(40.0), 3);
    assert_eq!(stack.time_step_to_ms(1), 10.0);
    assert_eq!(stack.time_step_to_ms(2), 25.0);
    assert_eq!(stack.time_step_to_ms(3), f64::INFINITY);
}

#[test]
fn test_uneven_stack_with_unset_step() {
    let mut stack = TimeStack::new();
    stack.initialize_empty(2);
    stack.set_frame(frame_with_time(0.0, 10.0), 0).unwrap();
    stack.update_information();

    assert!(stack.frame(1).is_none());
    assert_eq!(stack.time_step_to_ms(1), f64::INFINITY);
}

#[test]
fn test_time_step_to_time_step() {
    let fine = TimeStack::from_frame(frame_with_time(0.0, 10.0), 4).unwrap();
    let coarse = TimeStack::from_frame(frame_with_time(0.0, 20.0), 2).unwrap();

    assert_eq!(fine.time_step_to_time_step(&coarse, 3), 1);
    assert_eq!(fine.time_step_to_time_step(&coarse, 0), 0);
    assert_eq!(coarse.time_step_to_time_step(&fine, 1), 2);
}

#[test]
fn test_expand_single_infinite_step() {
    let mut stack = TimeStack::from_frame(AffineFrame::new(), 1).unwrap();
    assert_eq!(*stack.time_bounds(), TimeBounds::full());

    stack.expand_to_number_of_time_steps(3);

    assert_eq!(stack.time_steps(), 3);
    assert_eq!(*stack.time_bounds(), TimeBounds::new(0.0, 3.0));
    assert_eq!(*stack.frame(2).unwrap().time_bounds(), TimeBounds::new(2.0, 3.0));
    assert_eq!(stack.ms_to_time_step(1.5), 1);

    // shrinking is not supported
    stack.expand_to_number_of_time_steps(2);
    assert_eq!(stack.time_steps(), 3);
}

#[test]
fn test_bounding_box_is_union_of_non_degenerate_steps() {
    let mut stack = TimeStack::new();
    stack.initialize_empty(3);

    let mut wide = frame_with_time(0.0, 1.0);
    wide.set_bounds([0.0, 2.0, 0.0, 1.0, 0.0, 5.0]).unwrap();
    let mut deep = frame_with_time(1.0, 2.0);
    deep.set_bounds([-1.0, 1.0, 0.0, 3.0, 0.0, 1.0]).unwrap();
    let mut empty = frame_with_time(2.0, 3.0);
    empty.set_bounding_box(BoundingBox::zero());

    stack.set_frame(wide, 0).unwrap();
    stack.set_frame(deep, 1).unwrap();
    stack.set_frame(empty, 2).unwrap();
    stack.update_information();

    assert_eq!(stack.bounds(), [-1.0, 2.0, 0.0, 3.0, 0.0, 5.0]);
    assert_eq!(*stack.time_bounds(), TimeBounds::new(0.0, 3.0));
}

#[test]
fn test_aggregate_adopts_first_transform() {
    let mut stack = TimeStack::from_frame(frame_with_time(0.0, 5.0), 3).unwrap();
    stack
        .apply_operation(&Operation::Translate(Vector3::new(0.0, 4.0, 0.0)))
        .unwrap();

    assert_eq!(stack.origin(), Point3::new(0.0, 4.0, 0.0));
    for step in 0..3 {
        assert_eq!(
            stack.frame_if_materialized(step).unwrap().origin(),
            Point3::new(0.0, 4.0, 0.0)
        );
    }
    assert!(!stack.is_outdated());
}

#[test]
fn test_stale_aggregate_is_refreshed_on_demand() {
    let mut stack = uneven_stack();
    assert!(!stack.update_if_outdated());

    stack.set_frame(frame_with_time(25.0, 90.0), 2).unwrap();
    assert!(!stack.is_outdated());
    assert_eq!(*stack.time_bounds(), TimeBounds::new(0.0, 90.0));
    assert_eq!(stack.ms_to_time_step(60.0), 2);
    assert_eq!(stack.time_step_to_ms(2), 25.0);
    assert!(!stack.update_if_outdated());
}

#[test]
fn test_set_frame_aggregates_without_update() {
    let mut stack = TimeStack::new();
    stack.initialize_empty(2);
    stack.set_frame(frame_with_time(0.0, 10.0), 0).unwrap();
    stack.set_frame(frame_with_time(10.0, 20.0), 1).unwrap();

    assert_eq!(*stack.time_bounds(), TimeBounds::new(0.0, 20.0));
    assert_eq!(stack.ms_to_time_step(15.0), 1);
    assert_eq!(stack.time_step_to_ms(1), 10.0);
}

#[test]
fn test_replacing_first_step_rederives_evenly_timed_steps() {
    let mut stack = TimeStack::from_frame(frame_with_time(0.0, 10.0), 3).unwrap();
    assert_eq!(*stack.time_bounds(), TimeBounds::new(0.0, 30.0));

    stack.set_frame(frame_with_time(0.0, 5.0), 0).unwrap();

    assert_eq!(*stack.time_bounds(), TimeBounds::new(0.0, 15.0));
    assert_eq!(*stack.frame(2).unwrap().time_bounds(), TimeBounds::new(10.0, 15.0));
}
