//! # medgeom
//!
//! Coordinate geometry for medical image volumes, slice stacks and 2D display.
//!
//! The crate maps between index space (voxel coordinates), world space
//! (millimeters) and display space (pixels). Its building blocks are:
//!
//! - [`AffineFrame`]: an affine index-to-world transform with index-space bounds,
//!   spacing and a validity time interval
//! - [`PlaneFrame`]: a frame whose third axis is the plane normal, with 2D
//!   mapping, projections and intersections
//! - [`SliceStack`]: an ordered set of planes with lazily derived slices when
//!   evenly spaced
//! - [`TimeStack`]: a sequence of 3D frames over time with time-to-step
//!   conversion
//! - [`Viewport2D`]: the display-to-plane mapping used by a render window
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - Corner-based index coordinates for image geometries
//! - Standard transversal, sagittal and frontal plane construction
//! - Rotation, scaling and reorientation operations on any geometry
//! - Aggregated bounding geometry across many frames
//!
//! ## Example
//!
//! ```
//! use medgeom::{AffineFrame, Orientation, PlaneFrame, StandardPlaneOptions};
//! use nalgebra::Vector3;
//!
//! # fn main() -> medgeom::Result<()> {
//! let mut volume = AffineFrame::new();
//! volume.set_bounds([0.0, 256.0, 0.0, 256.0, 0.0, 40.0])?;
//! volume.set_spacing(&Vector3::new(0.5, 0.5, 2.0))?;
//! volume.set_image_geometry(true);
//!
//! let mut plane = PlaneFrame::new();
//! let options = StandardPlaneOptions::new(Orientation::Transversal);
//! plane.initialize_standard_plane_from_frame(&volume, 10.0, &options)?;
//! assert_eq!(plane.extent_in_mm(0), 128.0);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregate;
pub mod bounds;
pub mod config;
pub mod error;
pub mod frame;
pub mod line;
pub mod modified;
pub mod operation;
pub mod plane;
pub mod slice_stack;
pub mod slot;
pub mod time_stack;
pub mod transform;
pub mod viewport;

pub use aggregate::{
    GeometryLeaf, aggregate_time_bounds, compute_bounding_geometry,
    compute_bounding_geometry_with_config, compute_time_bounds,
};
pub use bounds::{BoundingBox, TimeBounds};
pub use config::GeometryConfig;
pub use error::{Error, Result};
pub use frame::AffineFrame;
pub use line::Line3;
pub use modified::ModifiedTime;
pub use operation::Operation;
pub use plane::{Orientation, PlaneFrame, StandardPlaneOptions};
pub use slice_stack::{SliceCountObserver, SliceStack};
pub use slot::SlotState;
pub use time_stack::TimeStack;
pub use transform::AffineTransform;
pub use viewport::Viewport2D;
