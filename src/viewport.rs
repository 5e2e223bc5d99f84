//! Mapping between display pixels and plane millimeters
//!
//! A [`Viewport2D`] shows a rectangular region of a world plane. Display
//! coordinates are pixels from the viewport's origin corner, world coordinates
//! are 2D millimeters in the plane. The plane itself is borrowed and must
//! outlive the viewport.

use crate::config::GeometryConfig;
use crate::error::{Error, Result};
use crate::plane::PlaneFrame;
use nalgebra::{Point2, Point3, Vector2, Vector3};
use tracing::{trace, warn};

/// Display-to-world mapping with zoom and pan
#[derive(Debug, Clone)]
pub struct Viewport2D<'w> {
    origin_mm: Vector2<f64>,
    scale: f64,
    size_in_display_units: Vector2<u32>,
    size_in_mm: Vector2<f64>,
    world_frame: Option<&'w PlaneFrame>,
    config: GeometryConfig,
}

impl<'w> Viewport2D<'w> {
    /// 10×10 display units at 1 mm per unit, origin at 0, no world frame
    pub fn new() -> Self {
        Self::with_config(GeometryConfig::default())
    }

    /// Like [`Viewport2D::new`] with custom limits
    pub fn with_config(config: GeometryConfig) -> Self {
        Self {
            origin_mm: Vector2::zeros(),
            scale: 1.0,
            size_in_display_units: Vector2::new(10, 10),
            size_in_mm: Vector2::new(10.0, 10.0),
            world_frame: None,
            config,
        }
    }

    /// The plane being displayed
    pub fn world_frame(&self) -> Option<&'w PlaneFrame> {
        self.world_frame
    }

    /// Set or clear the plane being displayed
    pub fn set_world_frame(&mut self, world_frame: Option<&'w PlaneFrame>) {
        self.world_frame = world_frame;
    }

    /// Millimeters per display unit
    pub fn scale_factor(&self) -> f64 {
        self.scale
    }

    /// Set millimeters per display unit, clamped to the configured minimum
    ///
    /// # Example
    ///
    /// ```
    /// use medgeom::Viewport2D;
    ///
    /// let mut viewport = Viewport2D::new();
    /// viewport.set_scale_factor(1.0e-6);
    /// assert_eq!(viewport.scale_factor(), 1.0e-4);
    /// ```
    pub fn set_scale_factor(&mut self, scale: f64) {
        self.scale = scale.max(self.config.min_scale_factor());
        self.size_in_mm = self.display_to_world_vector(&self.display_size());
    }

    /// World position of the display origin
    pub fn origin_in_mm(&self) -> Point2<f64> {
        Point2::from(self.origin_mm)
    }

    /// Move the display origin to a world position
    pub fn set_origin_in_mm(&mut self, origin: &Point2<f64>) {
        self.origin_mm = origin.coords;
    }

    /// Display origin expressed in display units
    pub fn origin_in_display_units(&self) -> Point2<f64> {
        Point2::from(self.origin_mm / self.scale)
    }

    /// Move the display origin, given in display units
    pub fn set_origin_in_display_units(&mut self, origin: &Point2<f64>) {
        self.origin_mm = origin.coords * self.scale;
    }

    /// Viewport size in display units
    pub fn size_in_display_units(&self) -> Vector2<u32> {
        self.size_in_display_units
    }

    /// Viewport size in millimeters
    pub fn size_in_mm(&self) -> Vector2<f64> {
        self.size_in_mm
    }

    fn display_size(&self) -> Vector2<f64> {
        self.size_in_display_units.map(f64::from)
    }

    /// Display point to world millimeters
    pub fn display_to_world(&self, point: &Point2<f64>) -> Point2<f64> {
        Point2::from(point.coords * self.scale + self.origin_mm)
    }

    /// World millimeters to display point
    pub fn world_to_display(&self, point: &Point2<f64>) -> Point2<f64> {
        Point2::from((point.coords - self.origin_mm) / self.scale)
    }

    /// Display vector to world millimeters
    pub fn display_to_world_vector(&self, vector: &Vector2<f64>) -> Vector2<f64> {
        vector * self.scale
    }

    /// World vector to display units
    pub fn world_to_display_vector(&self, vector: &Vector2<f64>) -> Vector2<f64> {
        vector / self.scale
    }

    /// Pan by a shift given in display units
    pub fn move_by(&mut self, shift: &Vector2<f64>) {
        self.origin_mm += shift * self.scale;
    }

    /// Zoom by `factor` keeping the world point under `center` fixed
    ///
    /// Factors above 1 magnify. Fails with [`Error::InvalidArgument`] for a
    /// non-positive factor.
    ///
    /// # Example
    ///
    /// ```
    /// use medgeom::Viewport2D;
    /// use nalgebra::Point2;
    ///
    /// let mut viewport = Viewport2D::new();
    /// let center = Point2::new(5.0, 5.0);
    /// let before = viewport.display_to_world(&center);
    /// viewport.zoom(2.0, &center).unwrap();
    /// assert_eq!(viewport.scale_factor(), 0.5);
    /// assert_eq!(viewport.display_to_world(&center), before);
    /// ```
    pub fn zoom(&mut self, factor: f64, center: &Point2<f64>) -> Result<()> {
        if !(factor > 0.0) || !factor.is_finite() {
            warn!(factor, "Rejecting non-positive zoom factor");
            return Err(Error::InvalidArgument(format!(
                "zoom factor must be positive, got {}",
                factor
            )));
        }
        self.zoom_about(factor, center);
        Ok(())
    }

    // `factor` must be positive and finite
    fn zoom_about(&mut self, factor: f64, center: &Point2<f64>) {
        self.set_scale_factor(self.scale / factor);
        self.origin_mm -= center.coords * ((1.0 - factor) * self.scale);
    }

    /// Resize the viewport; sizes below 1 are raised to 1
    ///
    /// With `keep_region`, the world point at the viewport center stays
    /// centered and the diagonal keeps its length in millimeters.
    pub fn set_size_in_display_units(&mut self, width: u32, height: u32, keep_region: bool) {
        let old_size_mm = self.size_in_mm;
        let old_center = self.display_to_world(&Point2::from(self.display_size() * 0.5));

        self.size_in_display_units = Vector2::new(width.max(1), height.max(1));
        self.size_in_mm = self.display_to_world_vector(&self.display_size());

        if keep_region {
            let new_center = Point2::from(self.display_size() * 0.5);
            let shift = self.world_to_display(&old_center) - new_center;
            self.move_by(&shift);

            let old_diagonal = old_size_mm.norm();
            if old_diagonal > 0.0 {
                let factor = self.size_in_mm.norm() / old_diagonal;
                self.zoom_about(factor, &new_center);
            }
        }
    }

    /// Scale and center so the whole world plane fits, preserving its aspect
    ///
    /// Does nothing without a valid world frame.
    pub fn fit(&mut self) {
        let Some(world) = self.world_frame.filter(|frame| frame.is_valid()) else {
            return;
        };
        let width_mm = world.extent_in_mm(0);
        let height_mm = world.extent_in_mm(1);
        if !(width_mm > 0.0) || !(height_mm > 0.0) {
            return;
        }

        let display = self.display_size();
        let (mut w, mut h) = (display.x, display.y);
        let aspect = width_mm / height_mm;
        if w / width_mm > h / height_mm {
            w = (aspect * h).trunc();
        } else {
            h = (w / aspect).trunc();
        }
        if w > 0.0 {
            self.set_scale_factor(width_mm / w);
        }
        let origin_display = Vector2::new(-(display.x - w) / 2.0, -(display.y - h) / 2.0);
        self.origin_mm = origin_display * self.scale;
        trace!(scale = self.scale, "Fitted viewport to world frame");
    }

    /// Map a 3D world point through the world plane to display units
    pub fn map_world_to_display(&self, point: &Point3<f64>) -> Result<Point2<f64>> {
        let world = self
            .world_frame
            .ok_or_else(|| Error::missing_reference("map_world_to_display"))?;
        let (mapped, _) = world.map_to_plane(point)?;
        Ok(self.world_to_display(&mapped))
    }

    /// Map a display point to a 3D world point on the world plane
    pub fn map_display_to_world(&self, point: &Point2<f64>) -> Result<Point3<f64>> {
        let world = self
            .world_frame
            .ok_or_else(|| Error::missing_reference("map_display_to_world"))?;
        Ok(world.map_from_plane(&self.display_to_world(point)))
    }

    /// Map a 3D world vector through the world plane to display units
    pub fn map_world_vector_to_display(&self, vector: &Vector3<f64>) -> Result<Vector2<f64>> {
        let world = self
            .world_frame
            .ok_or_else(|| Error::missing_reference("map_world_vector_to_display"))?;
        Ok(self.world_to_display_vector(&world.map_vector_to_plane(vector)?))
    }
}

impl Default for Viewport2D<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_rejects_non_positive() {
        let mut viewport = Viewport2D::new();
        assert!(viewport.zoom(0.0, &Point2::origin()).is_err());
        assert!(viewport.zoom(-2.0, &Point2::origin()).is_err());
        assert_eq!(viewport.scale_factor(), 1.0);
    }

    #[test]
    fn test_size_is_clamped_to_one() {
        let mut viewport = Viewport2D::new();
        viewport.set_size_in_display_units(0, 0, false);
        assert_eq!(viewport.size_in_display_units(), Vector2::new(1, 1));
        assert_eq!(viewport.size_in_mm(), Vector2::new(1.0, 1.0));
    }

    #[test]
    fn test_move_by_scales_shift() {
        let mut viewport = Viewport2D::new();
        viewport.set_scale_factor(2.0);
        viewport.move_by(&Vector2::new(1.0, -3.0));
        assert_eq!(viewport.origin_in_mm(), Point2::new(2.0, -6.0));
        assert_eq!(viewport.origin_in_display_units(), Point2::new(1.0, -3.0));
    }

    #[test]
    fn test_fit_without_world_is_noop() {
        let mut viewport = Viewport2D::new();
        viewport.set_scale_factor(3.0);
        viewport.fit();
        assert_eq!(viewport.scale_factor(), 3.0);
    }

    #[test]
    fn test_custom_min_scale() {
        let mut viewport = Viewport2D::with_config(GeometryConfig::new().with_min_scale_factor(0.5));
        viewport.set_scale_factor(0.1);
        assert_eq!(viewport.scale_factor(), 0.5);
    }
}
