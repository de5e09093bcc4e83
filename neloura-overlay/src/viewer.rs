//! The slice of the host image viewer the overlay depends on.

use neloura_wcs::{ImageSize, PixelCoord};
use serde::{Deserialize, Serialize};

/// Position in CSS pixels relative to the viewer's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl ViewportSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
    }

    pub fn contains_with_margin(&self, point: ScreenPoint, margin: f64) -> bool {
        point.x >= -margin
            && point.x <= self.width + margin
            && point.y >= -margin
            && point.y <= self.height + margin
    }
}

/// Lifecycle notifications from the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewerEvent {
    Open,
    AnimationFinish,
    Resize,
    Close,
}

/// Coordinate mapping supplied by the host viewer.
///
/// Image pixels are zero-based with a top-left origin.
pub trait ViewerGeometry {
    fn screen_to_image(&self, screen: ScreenPoint) -> PixelCoord;
    fn image_to_screen(&self, pixel: PixelCoord) -> ScreenPoint;
    /// Full-resolution image size, `None` until an image is open.
    fn image_size(&self) -> Option<ImageSize>;
    fn viewport_size(&self) -> ViewportSize;

    fn device_pixel_ratio(&self) -> f64 {
        1.0
    }
}

/// Image pixels under the viewport corners and centre, in the order
/// top-left, top-right, bottom-left, bottom-right, centre.
pub fn viewport_samples(viewer: &dyn ViewerGeometry) -> [PixelCoord; 5] {
    let size = viewer.viewport_size();
    let (w, h) = (size.width, size.height);
    [
        ScreenPoint::new(0.0, 0.0),
        ScreenPoint::new(w, 0.0),
        ScreenPoint::new(0.0, h),
        ScreenPoint::new(w, h),
        ScreenPoint::new(w / 2.0, h / 2.0),
    ]
    .map(|p| viewer.screen_to_image(p))
}

/// A viewer shown at a uniform zoom with the image's pixel `origin` at the
/// top-left corner of the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanZoomViewer {
    pub image: ImageSize,
    pub viewport: ViewportSize,
    /// Screen pixels per image pixel.
    pub zoom: f64,
    pub origin: PixelCoord,
    pub device_pixel_ratio: f64,
}

impl PanZoomViewer {
    /// Fits the whole image into the viewport.
    pub fn fit(image: ImageSize, viewport: ViewportSize) -> Self {
        let zoom = (viewport.width / image.width.max(1) as f64)
            .min(viewport.height / image.height.max(1) as f64);
        Self {
            image,
            viewport,
            zoom,
            origin: PixelCoord::new(0.0, 0.0),
            device_pixel_ratio: 1.0,
        }
    }

    pub fn with_zoom(mut self, zoom: f64, origin: PixelCoord) -> Self {
        self.zoom = zoom;
        self.origin = origin;
        self
    }
}

impl ViewerGeometry for PanZoomViewer {
    fn screen_to_image(&self, screen: ScreenPoint) -> PixelCoord {
        PixelCoord::new(
            self.origin.x() + screen.x / self.zoom,
            self.origin.y() + screen.y / self.zoom,
        )
    }

    fn image_to_screen(&self, pixel: PixelCoord) -> ScreenPoint {
        ScreenPoint::new(
            (pixel.x() - self.origin.x()) * self.zoom,
            (pixel.y() - self.origin.y()) * self.zoom,
        )
    }

    fn image_size(&self) -> Option<ImageSize> {
        Some(self.image)
    }

    fn viewport_size(&self) -> ViewportSize {
        self.viewport
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pan_zoom_roundtrip() {
        let viewer = PanZoomViewer::fit(ImageSize::new(1000, 500), ViewportSize::new(500.0, 500.0))
            .with_zoom(2.0, PixelCoord::new(100.0, 50.0));
        let pixel = viewer.screen_to_image(ScreenPoint::new(20.0, 40.0));
        assert_eq!(pixel, PixelCoord::new(110.0, 70.0));
        assert_eq!(viewer.image_to_screen(pixel), ScreenPoint::new(20.0, 40.0));
    }

    #[test]
    fn test_fit_uses_limiting_axis() {
        let viewer = PanZoomViewer::fit(ImageSize::new(1000, 500), ViewportSize::new(500.0, 500.0));
        assert_eq!(viewer.zoom, 0.5);
    }

    #[test]
    fn test_viewport_samples_order() {
        let viewer = PanZoomViewer::fit(ImageSize::new(100, 100), ViewportSize::new(100.0, 100.0));
        let samples = viewport_samples(&viewer);
        assert_eq!(samples[0], PixelCoord::new(0.0, 0.0));
        assert_eq!(samples[3], PixelCoord::new(100.0, 100.0));
        assert_eq!(samples[4], PixelCoord::new(50.0, 50.0));
    }

    #[test]
    fn test_degenerate_viewport() {
        assert!(ViewportSize::new(0.0, 10.0).is_degenerate());
        assert!(ViewportSize::new(f64::NAN, 10.0).is_degenerate());
        assert!(!ViewportSize::new(1.0, 1.0).is_degenerate());
    }
}
