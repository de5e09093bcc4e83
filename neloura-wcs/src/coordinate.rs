use serde::{Deserialize, Serialize};

/// Zero-based image pixel position. `y` grows in whatever direction the
/// producing convention says; see [`crate::orientation`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelCoord {
    x: f64,
    y: f64,
}

impl PixelCoord {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.y
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[inline]
    pub fn distance(&self, other: PixelCoord) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntermediateCoord {
    x: f64,
    y: f64,
}

impl IntermediateCoord {
    #[inline]
    pub fn new(x_deg: f64, y_deg: f64) -> Self {
        Self { x: x_deg, y: y_deg }
    }

    #[inline]
    pub fn x_deg(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn y_deg(&self) -> f64 {
        self.y
    }

    #[inline]
    pub fn x_rad(&self) -> f64 {
        self.x.to_radians()
    }

    #[inline]
    pub fn y_rad(&self) -> f64 {
        self.y.to_radians()
    }
}

/// Native spherical coordinates of a projection, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeCoord {
    phi: f64,
    theta: f64,
}

impl NativeCoord {
    #[inline]
    pub fn new(phi_deg: f64, theta_deg: f64) -> Self {
        Self {
            phi: phi_deg,
            theta: theta_deg,
        }
    }

    #[inline]
    pub fn phi_deg(&self) -> f64 {
        self.phi
    }

    #[inline]
    pub fn theta_deg(&self) -> f64 {
        self.theta
    }
}

/// Equatorial sky position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyCoord {
    pub ra: f64,
    pub dec: f64,
}

impl SkyCoord {
    #[inline]
    pub fn new(ra: f64, dec: f64) -> Self {
        Self { ra, dec }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.ra.is_finite() && self.dec.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether a pixel lies on the image, using zero-based pixel-centre coordinates.
    pub fn contains(&self, pixel: PixelCoord) -> bool {
        pixel.is_finite()
            && pixel.x() >= 0.0
            && pixel.y() >= 0.0
            && pixel.x() <= self.width as f64 - 1.0
            && pixel.y() <= self.height as f64 - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_coord_new_and_accessors() {
        let p = PixelCoord::new(100.5, 200.5);
        assert_eq!(p.x(), 100.5);
        assert_eq!(p.y(), 200.5);
        assert!(p.is_finite());
        assert!(!PixelCoord::new(f64::NAN, 0.0).is_finite());
    }

    #[test]
    fn test_pixel_distance() {
        let a = PixelCoord::new(0.0, 0.0);
        let b = PixelCoord::new(3.0, 4.0);
        assert_eq!(a.distance(b), 5.0);
    }

    #[test]
    fn test_intermediate_coord() {
        let c = IntermediateCoord::new(0.001, -0.002);
        assert_eq!(c.x_deg(), 0.001);
        assert_eq!(c.y_deg(), -0.002);
        assert!((c.x_rad() - 0.001_f64.to_radians()).abs() < 1e-15);
        assert!((c.y_rad() - (-0.002_f64).to_radians()).abs() < 1e-15);
    }

    #[test]
    fn test_native_coord() {
        let n = NativeCoord::new(45.0, 30.0);
        assert_eq!(n.phi_deg(), 45.0);
        assert_eq!(n.theta_deg(), 30.0);
    }

    #[test]
    fn test_image_size_contains() {
        let size = ImageSize::new(10, 20);
        assert!(size.contains(PixelCoord::new(0.0, 0.0)));
        assert!(size.contains(PixelCoord::new(9.0, 19.0)));
        assert!(!size.contains(PixelCoord::new(9.5, 0.0)));
        assert!(!size.contains(PixelCoord::new(-0.1, 0.0)));
    }
}
