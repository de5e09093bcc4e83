//! Sky sampling along the viewport edges and its inverse interpolation.
//!
//! RA is sampled along the top edge and Dec along the left edge of the
//! visible part of the image. Tick positions are then found by scanning the
//! sampled curve for the first segment that brackets the tick value, which
//! avoids any iterative root finding.

use neloura_core::angle::unwrap_longitudes;
use neloura_wcs::{PixelCoord, WorldTransform};

use crate::viewer::{ScreenPoint, ViewerGeometry};

/// Samples taken along each edge.
pub const EDGE_SAMPLES: usize = 400;
/// Upper bound on ticks generated for one axis.
pub const MAX_TICKS: usize = 1000;

/// Visible image region, clamped to the image, zero-based pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageBounds {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl ImageBounds {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Image region under the viewport, or `None` when nothing of the image is
/// visible.
pub fn visible_bounds(viewer: &dyn ViewerGeometry) -> Option<ImageBounds> {
    let image = viewer.image_size()?;
    let viewport = viewer.viewport_size();
    if viewport.is_degenerate() || image.width == 0 || image.height == 0 {
        return None;
    }

    let corners = [
        viewer.screen_to_image(ScreenPoint::new(0.0, 0.0)),
        viewer.screen_to_image(ScreenPoint::new(viewport.width, 0.0)),
        viewer.screen_to_image(ScreenPoint::new(0.0, viewport.height)),
        viewer.screen_to_image(ScreenPoint::new(viewport.width, viewport.height)),
    ];
    if !corners.iter().all(PixelCoord::is_finite) {
        return None;
    }

    let max_x = image.width as f64 - 1.0;
    let max_y = image.height as f64 - 1.0;
    let xs = corners.map(|c| c.x());
    let ys = corners.map(|c| c.y());
    let bounds = ImageBounds {
        left: xs.iter().copied().fold(f64::INFINITY, f64::min).clamp(0.0, max_x),
        right: xs.iter().copied().fold(f64::NEG_INFINITY, f64::max).clamp(0.0, max_x),
        top: ys.iter().copied().fold(f64::INFINITY, f64::min).clamp(0.0, max_y),
        bottom: ys.iter().copied().fold(f64::NEG_INFINITY, f64::max).clamp(0.0, max_y),
    };
    (bounds.width() > 0.0 && bounds.height() > 0.0).then_some(bounds)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSample {
    pub pixel: PixelCoord,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeSamples {
    /// RA along the top edge, unwrapped across the 0/360 line.
    pub ra: Vec<EdgeSample>,
    /// Dec along the left edge.
    pub dec: Vec<EdgeSample>,
}

impl EdgeSamples {
    pub fn ra_range(&self) -> Option<(f64, f64)> {
        value_range(&self.ra)
    }

    pub fn dec_range(&self) -> Option<(f64, f64)> {
        value_range(&self.dec)
    }
}

fn value_range(samples: &[EdgeSample]) -> Option<(f64, f64)> {
    if samples.len() < 2 {
        return None;
    }
    let (min, max) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
            (lo.min(s.value), hi.max(s.value))
        });
    (min.is_finite() && max.is_finite()).then_some((min, max))
}

/// Evenly spaced points from `start` to `end` inclusive.
fn edge_points(start: PixelCoord, end: PixelCoord, count: usize) -> impl Iterator<Item = PixelCoord> {
    let last = count.saturating_sub(1).max(1) as f64;
    (0..count).map(move |i| {
        let t = i as f64 / last;
        PixelCoord::new(
            start.x() + (end.x() - start.x()) * t,
            start.y() + (end.y() - start.y()) * t,
        )
    })
}

/// Samples the transform along the top and left edges of `bounds`. Points
/// the transform cannot convert are skipped.
pub fn sample_edges(
    transform: &dyn WorldTransform,
    bounds: &ImageBounds,
    count: usize,
) -> EdgeSamples {
    let top_left = PixelCoord::new(bounds.left, bounds.top);
    let top_right = PixelCoord::new(bounds.right, bounds.top);
    let bottom_left = PixelCoord::new(bounds.left, bounds.bottom);

    let mut ra: Vec<EdgeSample> = edge_points(top_left, top_right, count)
        .filter_map(|pixel| {
            let sky = transform.pixel_to_world(pixel.x(), pixel.y())?;
            sky.ra.is_finite().then_some(EdgeSample { pixel, value: sky.ra })
        })
        .collect();

    let mut values: Vec<f64> = ra.iter().map(|s| s.value).collect();
    unwrap_longitudes(&mut values);
    for (sample, value) in ra.iter_mut().zip(values) {
        sample.value = value;
    }

    let dec = edge_points(top_left, bottom_left, count)
        .filter_map(|pixel| {
            let sky = transform.pixel_to_world(pixel.x(), pixel.y())?;
            sky.dec.is_finite().then_some(EdgeSample { pixel, value: sky.dec })
        })
        .collect();

    EdgeSamples { ra, dec }
}

/// Multiples of `step` in `[min, max]`, ascending.
///
/// ```
/// use neloura_overlay::sampling::tick_values;
///
/// assert_eq!(tick_values(0.3, 1.1, 0.5), vec![0.5, 1.0]);
/// ```
pub fn tick_values(min: f64, max: f64, step: f64) -> Vec<f64> {
    if !(min.is_finite() && max.is_finite() && step.is_finite()) || step <= 0.0 || max < min {
        return Vec::new();
    }
    let first = (min / step).ceil();
    (0..MAX_TICKS)
        .map(|i| (first + i as f64) * step)
        .take_while(|&v| v <= max)
        .collect()
}

/// Pixel at which the sampled curve first reaches `target`, interpolating
/// linearly inside the first bracketing segment.
pub fn invert_samples(samples: &[EdgeSample], target: f64) -> Option<PixelCoord> {
    if !target.is_finite() {
        return None;
    }
    samples.windows(2).find_map(|pair| {
        let (a, b) = (pair[0], pair[1]);
        let brackets = (a.value <= target && target <= b.value) || (b.value <= target && target <= a.value);
        if !brackets {
            return None;
        }
        let span = b.value - a.value;
        if span == 0.0 {
            return Some(a.pixel);
        }
        let t = (target - a.value) / span;
        Some(PixelCoord::new(
            a.pixel.x() + (b.pixel.x() - a.pixel.x()) * t,
            a.pixel.y() + (b.pixel.y() - a.pixel.y()) * t,
        ))
    })
}
