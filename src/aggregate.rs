//! Aggregation of bounding geometry across collections of frames
//!
//! Leaves are anything that exposes a bounding [`AffineFrame`]: plain frames,
//! planes and both kinds of stacks. Aggregation skips leaves without extent and
//! corner points too far from the origin to be real.

use crate::bounds::{BoundingBox, TimeBounds};
use crate::config::GeometryConfig;
use crate::frame::AffineFrame;
use crate::plane::PlaneFrame;
use crate::slice_stack::SliceStack;
use crate::time_stack::TimeStack;
use nalgebra::{Point3, Vector3};
use tracing::{debug, warn};

/// Something with a bounding frame in world space
pub trait GeometryLeaf {
    /// The frame whose corners, spacing and time bounds describe this leaf
    fn bounding_frame(&self) -> Option<&AffineFrame>;

    /// Shortest finite time-step duration of this leaf
    fn minimal_step_duration(&self) -> Option<f64> {
        let duration = self.bounding_frame()?.time_bounds().duration();
        duration.is_finite().then_some(duration)
    }
}

impl GeometryLeaf for AffineFrame {
    fn bounding_frame(&self) -> Option<&AffineFrame> {
        Some(self)
    }
}

impl GeometryLeaf for PlaneFrame {
    fn bounding_frame(&self) -> Option<&AffineFrame> {
        Some(self.frame())
    }
}

impl GeometryLeaf for SliceStack<'_> {
    fn bounding_frame(&self) -> Option<&AffineFrame> {
        Some(self.stack_frame())
    }
}

impl GeometryLeaf for TimeStack {
    fn bounding_frame(&self) -> Option<&AffineFrame> {
        Some(self.aggregate_frame())
    }

    fn minimal_step_duration(&self) -> Option<f64> {
        (0..self.time_steps())
            .filter_map(|step| self.frame_if_materialized(step))
            .map(|frame| frame.time_bounds().duration())
            .filter(|duration| duration.is_finite())
            .reduce(f64::min)
    }
}

impl<T: GeometryLeaf + ?Sized> GeometryLeaf for &T {
    fn bounding_frame(&self) -> Option<&AffineFrame> {
        (**self).bounding_frame()
    }

    fn minimal_step_duration(&self) -> Option<f64> {
        (**self).minimal_step_duration()
    }
}

impl<T: GeometryLeaf> GeometryLeaf for Option<T> {
    fn bounding_frame(&self) -> Option<&AffineFrame> {
        self.as_ref()?.bounding_frame()
    }

    fn minimal_step_duration(&self) -> Option<f64> {
        self.as_ref()?.minimal_step_duration()
    }
}

/// Combine time intervals keeping the tightest finite bounds
///
/// The start is the smallest finite start and the end the largest finite end.
/// A side without any finite value is unbounded, and an empty input or
/// crossing bounds yield the full interval.
///
/// # Example
///
/// ```
/// use medgeom::TimeBounds;
/// use medgeom::aggregate::aggregate_time_bounds;
///
/// let bounds = aggregate_time_bounds([
///     TimeBounds::new(10.0, f64::INFINITY),
///     TimeBounds::new(f64::NEG_INFINITY, 50.0),
///     TimeBounds::new(20.0, 40.0),
/// ]);
/// assert_eq!(bounds, TimeBounds::new(10.0, 50.0));
/// assert_eq!(aggregate_time_bounds([]), TimeBounds::full());
/// ```
pub fn aggregate_time_bounds<I>(bounds: I) -> TimeBounds
where
    I: IntoIterator<Item = TimeBounds>,
{
    let mut start = f64::INFINITY;
    let mut end = f64::NEG_INFINITY;
    for tb in bounds {
        if tb.start.is_finite() && tb.start < start {
            start = tb.start;
        }
        if tb.end.is_finite() && tb.end > end {
            end = tb.end;
        }
    }
    if !start.is_finite() {
        start = f64::NEG_INFINITY;
    }
    if !end.is_finite() {
        end = f64::INFINITY;
    }
    if start > end {
        return TimeBounds::full();
    }
    TimeBounds::new(start, end)
}

/// Time bounds spanning all leaves
///
/// Applies [`aggregate_time_bounds`] to every leaf's bounding frame. Leaves
/// without a frame are ignored.
pub fn compute_time_bounds<L: GeometryLeaf>(leaves: &[L]) -> TimeBounds {
    aggregate_time_bounds(
        leaves
            .iter()
            .filter_map(|leaf| leaf.bounding_frame())
            .map(|frame| *frame.time_bounds()),
    )
}

/// Bounding geometry of every leaf accepted by `filter`
///
/// Uses the default [`GeometryConfig`]. See
/// [`compute_bounding_geometry_with_config`].
pub fn compute_bounding_geometry<L, F>(leaves: &[L], filter: F) -> Option<TimeStack>
where
    L: GeometryLeaf,
    F: Fn(&L) -> bool,
{
    compute_bounding_geometry_with_config(leaves, filter, &GeometryConfig::default())
}

/// Bounding geometry of every leaf accepted by `filter`
///
/// Collects the eight world corners of each accepted leaf with a
/// non-degenerate box, skipping corners whose squared distance from the origin
/// exceeds the configured threshold. The result is an evenly timed
/// [`TimeStack`] whose frame has identity directions, the smallest spacing seen
/// per axis, and bounds in those index units. Its time steps subdivide the
/// aggregated time bounds by the shortest finite step duration when both ends
/// are finite. Returns `None` when no corner survives.
///
/// Callers that filter on several conditions combine them in `filter`.
pub fn compute_bounding_geometry_with_config<L, F>(
    leaves: &[L],
    filter: F,
    config: &GeometryConfig,
) -> Option<TimeStack>
where
    L: GeometryLeaf,
    F: Fn(&L) -> bool,
{
    let mut points: Vec<Point3<f64>> = Vec::new();
    let mut min_spacing = Vector3::repeat(f64::INFINITY);
    let mut time_bounds = Vec::new();
    let mut min_duration: Option<f64> = None;

    for (index, leaf) in leaves.iter().enumerate() {
        if !filter(leaf) {
            continue;
        }
        let Some(frame) = leaf.bounding_frame() else {
            continue;
        };
        if frame.bounding_box().is_degenerate() {
            continue;
        }
        for corner in frame.corner_points() {
            if corner.coords.norm_squared() < config.distant_point_threshold() {
                points.push(corner);
            } else {
                warn!(leaf = index, ?corner, "Ignoring unrealistically distant corner point");
            }
        }
        min_spacing = min_spacing.zip_map(frame.spacing(), f64::min);
        time_bounds.push(*frame.time_bounds());
        if let Some(duration) = leaf.minimal_step_duration() {
            min_duration = Some(min_duration.map_or(duration, |d| d.min(duration)));
        }
    }

    let world_box = BoundingBox::from_points(&points)?;
    let time_bounds = aggregate_time_bounds(time_bounds);

    let mut frame = AffineFrame::new();
    frame.set_spacing(&min_spacing).ok()?;
    let bounds = world_box.bounds();
    let index_bounds: [f64; 6] = std::array::from_fn(|i| bounds[i] / min_spacing[i / 2]);
    frame.set_bounds(index_bounds).ok()?;

    let (step_bounds, steps) = match min_duration {
        Some(duration) if time_bounds.is_finite() && duration > 0.0 => {
            let steps = ((time_bounds.duration() / duration) as usize).max(1);
            (
                TimeBounds::new(time_bounds.start, time_bounds.start + duration),
                steps,
            )
        }
        _ => (time_bounds, 1),
    };
    frame.set_time_bounds(step_bounds);

    debug!(
        points = points.len(),
        steps,
        "Computed bounding geometry"
    );
    TimeStack::from_frame(frame, steps).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_all_infinite() {
        let bounds = aggregate_time_bounds([TimeBounds::full(), TimeBounds::full()]);
        assert_eq!(bounds, TimeBounds::full());
    }

    #[test]
    fn test_aggregate_one_sided() {
        let bounds = aggregate_time_bounds([TimeBounds::new(f64::NEG_INFINITY, 5.0)]);
        assert_eq!(bounds, TimeBounds::new(f64::NEG_INFINITY, 5.0));
    }

    #[test]
    fn test_aggregate_crossing_bounds() {
        let bounds = aggregate_time_bounds([
            TimeBounds::new(10.0, f64::INFINITY),
            TimeBounds::new(f64::NEG_INFINITY, 5.0),
        ]);
        assert_eq!(bounds, TimeBounds::full());
    }

    #[test]
    fn test_option_leaf() {
        let leaves: [Option<AffineFrame>; 2] = [None, Some(AffineFrame::new())];
        assert_eq!(compute_time_bounds(&leaves), TimeBounds::full());
        assert!(compute_bounding_geometry(&leaves, |_| true).is_some());
    }
}
