//! Error types for coordinate-geometry operations
//!
//! This module provides the error type shared by frames, planes, slice stacks,
//! time stacks and the viewport mapper. Every error carries a code for
//! categorization and a message with enough context to locate the cause.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: Transform errors
//! - **E2xxx**: Bounding box and plane errors
//! - **E3xxx**: Orientation and argument errors
//! - **E4xxx**: Index and reference errors
//!
//! ## Common Error Codes
//!
//! - `E1001`: Index-to-world matrix cannot be inverted
//! - `E1002`: Spacing is not strictly positive
//! - `E2001`: Bounds with a minimum above the maximum
//! - `E2002`: Plane bounds not anchored at the origin or not two-dimensional
//! - `E3001`: Unknown plane orientation
//! - `E3002`: Invalid argument
//! - `E4001`: Slice or time-step index out of range
//! - `E4002`: Operation needs a reference geometry that is not set

use nalgebra::Matrix3;
use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when working with geometry frames
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The index-to-world matrix is singular or its inverse contains NaN
    ///
    /// **Error Code**: E1001
    ///
    /// **Common Causes**:
    /// - A column of the matrix was scaled to zero length
    /// - Two axes of the frame are collinear
    /// - The matrix contains NaN or infinite entries
    ///
    /// **Suggestions**:
    /// - Check spacing values before assigning them
    /// - Rebuild the transform from orthogonal axis vectors
    #[error("[E1001] Degenerate transform: {0}")]
    DegenerateTransform(String),

    /// Spacing is zero, negative or not finite
    ///
    /// **Error Code**: E1002
    #[error("[E1002] Invalid spacing: {0}")]
    InvalidSpacing(String),

    /// Bounds where a minimum exceeds its maximum
    ///
    /// **Error Code**: E2001
    #[error("[E2001] Invalid bounds: {0}")]
    InvalidBounds(String),

    /// Plane bounds that violate the unit-rectangle contract
    ///
    /// **Error Code**: E2002
    ///
    /// **Common Causes**:
    /// - The rectangle does not start at `[0, 0]`
    /// - Width or height is zero or negative
    ///
    /// **Suggestions**:
    /// - Use bounds of the form `[0, width, 0, height, 0, 1]`
    #[error("[E2002] Invalid plane bounds: {0}")]
    InvalidPlaneBounds(String),

    /// Unknown plane orientation value
    ///
    /// **Error Code**: E3001
    ///
    /// **Common Causes**:
    /// - A persisted orientation code outside the known set
    ///
    /// **Suggestions**:
    /// - Valid orientations are transversal (0), sagittal (1) and frontal (2)
    #[error("[E3001] Invalid orientation: {0}")]
    InvalidOrientation(String),

    /// An argument outside its documented domain
    ///
    /// **Error Code**: E3002
    #[error("[E3002] Invalid argument: {0}")]
    InvalidArgument(String),

    /// A slice or time-step index outside `0..len`
    ///
    /// **Error Code**: E4001
    #[error("[E4001] Index {index} out of range (valid range is 0..{len})")]
    OutOfRangeIndex {
        /// The requested index
        index: usize,
        /// Number of valid entries
        len: usize,
    },

    /// The operation needs a reference geometry that is not set
    ///
    /// **Error Code**: E4002
    ///
    /// **Suggestions**:
    /// - Initialize the slice stack from a volume frame first
    #[error("[E4002] Missing reference geometry: {0}")]
    MissingReferenceGeometry(String),
}

impl Error {
    /// Create a DegenerateTransform error that reports the offending matrix
    ///
    /// # Example
    /// ```
    /// use medgeom::Error;
    /// use nalgebra::Matrix3;
    ///
    /// let err = Error::degenerate_transform(&Matrix3::zeros());
    /// assert!(err.to_string().contains("E1001"));
    /// ```
    pub fn degenerate_transform(matrix: &Matrix3<f64>) -> Self {
        Error::DegenerateTransform(format!(
            "matrix inversion failed, cannot proceed. Matrix was: \
             [[{}, {}, {}], [{}, {}, {}], [{}, {}, {}]]",
            matrix[(0, 0)],
            matrix[(0, 1)],
            matrix[(0, 2)],
            matrix[(1, 0)],
            matrix[(1, 1)],
            matrix[(1, 2)],
            matrix[(2, 0)],
            matrix[(2, 1)],
            matrix[(2, 2)],
        ))
    }

    /// Create an InvalidPlaneBounds error from the offending bounds array
    pub fn invalid_plane_bounds(bounds: &[f64; 6]) -> Self {
        Error::InvalidPlaneBounds(format!(
            "expected [0, w>0, 0, h>0, ..], got [{}, {}, {}, {}, {}, {}]",
            bounds[0], bounds[1], bounds[2], bounds[3], bounds[4], bounds[5]
        ))
    }

    /// Create a MissingReferenceGeometry error naming the operation that needed it
    pub fn missing_reference(operation: &str) -> Self {
        Error::MissingReferenceGeometry(format!("'{}' requires a reference volume", operation))
    }
}
