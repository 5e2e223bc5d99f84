//! Numeric tolerances and tunable limits
//!
//! The constants here are shared by every module. The few values a caller may
//! want to tune are collected in [`GeometryConfig`], which follows the same
//! builder style as the rest of the crate.

/// General geometric epsilon for lengths, dot products and parameters
pub const EPS: f64 = 1.0e-5;

/// Angle tolerance (radians) under which two plane normals count as parallel
pub const PARALLEL_EPS: f64 = 10.0 * 3.452669830012439e-4;

/// Minimal squared change that makes a slice stack accept a new direction vector
pub const DIRECTION_EPS: f64 = 3.452669830012439e-4;

/// Squared distance (mm²) from the world origin beyond which corner points are
/// discarded during bounding-box aggregation
///
/// The value only filters out obviously broken geometries; it has no semantic
/// meaning beyond that.
pub const DEFAULT_DISTANT_POINT_THRESHOLD: f64 = 1.0e10;

/// Smallest accepted viewport scale factor (mm per display unit)
pub const MIN_SCALE_FACTOR: f64 = 1.0e-4;

/// Tunable limits for aggregation and viewport mapping
///
/// # Example
///
/// ```
/// use medgeom::GeometryConfig;
///
/// let config = GeometryConfig::new()
///     .with_distant_point_threshold(1.0e8)
///     .with_min_scale_factor(1.0e-3);
/// assert_eq!(config.distant_point_threshold(), 1.0e8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryConfig {
    distant_point_threshold: f64,
    min_scale_factor: f64,
}

impl GeometryConfig {
    /// Create a configuration with the default limits
    pub fn new() -> Self {
        Self {
            distant_point_threshold: DEFAULT_DISTANT_POINT_THRESHOLD,
            min_scale_factor: MIN_SCALE_FACTOR,
        }
    }

    /// Set the squared distance (mm²) above which corner points are ignored
    pub fn with_distant_point_threshold(mut self, threshold: f64) -> Self {
        self.distant_point_threshold = threshold;
        self
    }

    /// Set the smallest scale factor a viewport accepts
    pub fn with_min_scale_factor(mut self, min_scale_factor: f64) -> Self {
        self.min_scale_factor = min_scale_factor;
        self
    }

    /// Squared distance (mm²) above which corner points are ignored
    pub fn distant_point_threshold(&self) -> f64 {
        self.distant_point_threshold
    }

    /// Smallest scale factor a viewport accepts
    pub fn min_scale_factor(&self) -> f64 {
        self.min_scale_factor
    }
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self::new()
    }
}
