//! Live cursor readout: pixel position, sky position and pixel value.
//!
//! RA/Dec are computed synchronously on every pointer move. The pixel value
//! comes from the first source that has one: an in-memory value, a preview
//! approximation while a probe is outstanding, or a recent value kept for
//! [`STALE_VALUE_WINDOW`] to stop the display flickering. Probe responses
//! carry the generation of their request. Every pointer move starts a new
//! generation, so a response is applied only while the pointer still rests
//! where its request was issued.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use neloura_core::angle::{format_decimal_degrees, wrap_ra_degrees, DmsFmt, Fields, HmsFmt};
use neloura_wcs::{solver, CanonicalHeader, ImageSize, PixelCoord, SkyCoord, WorldTransform};

use crate::error::{OverlayError, OverlayResult};
use crate::settings::LabelMode;
use crate::viewer::{ScreenPoint, ViewerGeometry};

/// How long a resolved value may stand in for a missing one. Approximate:
/// this suppresses flicker, it does not guarantee freshness.
pub const STALE_VALUE_WINDOW: Duration = Duration::from_millis(250);
pub const PLACEHOLDER: &str = "-";

const RA_FMT: HmsFmt = HmsFmt {
    fields: Fields::Seconds,
    frac_digits: 2,
};
const DEC_FMT: DmsFmt = DmsFmt {
    fields: Fields::Seconds,
    frac_digits: 1,
};

/// In-memory pixel data, addressed with zero-based top-left pixels.
pub trait PixelSource {
    fn value_at(&self, x: u32, y: u32) -> Option<f64>;
}

/// Downsampled 8-bit preview of the image and the data range it encodes.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewBuffer {
    width: u32,
    height: u32,
    samples: Vec<u8>,
    data_min: f64,
    data_max: f64,
}

impl PreviewBuffer {
    pub fn new(
        width: u32,
        height: u32,
        samples: Vec<u8>,
        data_min: f64,
        data_max: f64,
    ) -> OverlayResult<Self> {
        if width == 0 || height == 0 {
            return Err(OverlayError::invalid_preview(format!(
                "empty preview {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize;
        if samples.len() != expected {
            return Err(OverlayError::invalid_preview(format!(
                "expected {expected} samples, got {}",
                samples.len()
            )));
        }
        if !(data_min.is_finite() && data_max.is_finite()) {
            return Err(OverlayError::invalid_preview("non-finite data range"));
        }
        Ok(Self {
            width,
            height,
            samples,
            data_min,
            data_max,
        })
    }

    /// Preview sample under a full-resolution pixel.
    pub fn sample_at(&self, pixel: PixelCoord, image: ImageSize) -> Option<u8> {
        if !image.contains(pixel) {
            return None;
        }
        let px = ((pixel.x() / image.width as f64) * self.width as f64).floor() as usize;
        let py = ((pixel.y() / image.height as f64) * self.height as f64).floor() as usize;
        let px = px.min(self.width as usize - 1);
        let py = py.min(self.height as usize - 1);
        self.samples.get(py * self.width as usize + px).copied()
    }

    /// `data_min + sample / 255 * (data_max - data_min)`.
    pub fn approximate(&self, pixel: PixelCoord, image: ImageSize) -> Option<f64> {
        let sample = self.sample_at(pixel, image)?;
        Some(self.data_min + (sample as f64 / 255.0) * (self.data_max - self.data_min))
    }
}

/// Request for the host to look up one pixel value out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProbeRequest {
    pub generation: u64,
    pub x: u32,
    /// Row counted from the bottom of the image.
    pub y_bottom_left: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Direct,
    Preview,
    Recent,
    None,
}

/// Display strings for the readout box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadoutText {
    pub x: String,
    pub y: String,
    pub ra: String,
    pub dec: String,
    pub value: String,
    pub unit: Option<String>,
}

impl Default for ReadoutText {
    fn default() -> Self {
        Self {
            x: PLACEHOLDER.to_string(),
            y: PLACEHOLDER.to_string(),
            ra: PLACEHOLDER.to_string(),
            dec: PLACEHOLDER.to_string(),
            value: PLACEHOLDER.to_string(),
            unit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadoutUpdate {
    pub text: ReadoutText,
    pub sky: Option<SkyCoord>,
    pub source: ValueSource,
    pub probe: Option<ProbeRequest>,
}

/// Everything one pointer move needs to read.
pub struct ReadoutContext<'a> {
    pub viewer: &'a dyn ViewerGeometry,
    /// Orientation-corrected transform, top-left rows.
    pub transform: Option<&'a dyn WorldTransform>,
    /// Raw header for the solver fallback, FITS rows.
    pub header: Option<&'a CanonicalHeader>,
    pub pixels: Option<&'a dyn PixelSource>,
    pub preview: Option<&'a PreviewBuffer>,
    pub label_mode: LabelMode,
    pub probe_enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct RecentValue {
    value: f64,
    unit: Option<String>,
    at: Instant,
}

#[derive(Debug, Default)]
pub struct LiveReadout {
    generation: u64,
    displayed_generation: u64,
    recent: Option<RecentValue>,
    text: ReadoutText,
}

impl LiveReadout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &ReadoutText {
        &self.text
    }

    /// Generation of the value currently on display.
    pub fn displayed_generation(&self) -> u64 {
        self.displayed_generation
    }

    pub fn on_pointer_move(
        &mut self,
        ctx: &ReadoutContext<'_>,
        screen: ScreenPoint,
        now: Instant,
    ) -> ReadoutUpdate {
        let pixel = ctx.viewer.screen_to_image(screen);
        let image = ctx.viewer.image_size();
        // responses to anything issued before this move are stale now
        self.generation += 1;
        self.displayed_generation = self.generation;

        let sky = resolve_sky(ctx, pixel, image);
        let (ra, dec) = match sky {
            Some(sky) => format_sky(sky, ctx.label_mode),
            None => (PLACEHOLDER.to_string(), PLACEHOLDER.to_string()),
        };

        let cell = image.and_then(|size| pixel_cell(pixel, size));
        let (x, y) = match (cell, image) {
            (Some((cx, cy)), Some(size)) => (cx.to_string(), (size.height - 1 - cy).to_string()),
            _ => (PLACEHOLDER.to_string(), PLACEHOLDER.to_string()),
        };

        let mut probe = None;
        let mut resolved = None;
        if let (Some((cx, cy)), Some(size)) = (cell, image) {
            let direct = ctx
                .pixels
                .and_then(|source| source.value_at(cx, cy))
                .filter(|v| v.is_finite() && *v != 0.0);
            if let Some(value) = direct {
                self.recent = Some(RecentValue {
                    value,
                    unit: None,
                    at: now,
                });
                resolved = Some((value, None, ValueSource::Direct));
            } else {
                if ctx.probe_enabled {
                    probe = Some(ProbeRequest {
                        generation: self.generation,
                        x: cx,
                        y_bottom_left: size.height - 1 - cy,
                    });
                }
                resolved = ctx
                    .preview
                    .and_then(|preview| preview.approximate(pixel, size))
                    .map(|v| (v, None, ValueSource::Preview));
            }
        }

        if resolved.is_none() {
            resolved = self
                .recent
                .as_ref()
                .filter(|r| now.saturating_duration_since(r.at) < STALE_VALUE_WINDOW)
                .map(|r| (r.value, r.unit.clone(), ValueSource::Recent));
        }

        let (value, unit, source) = match resolved {
            Some((value, unit, source)) => (format_pixel_value(value), unit, source),
            None => (PLACEHOLDER.to_string(), None, ValueSource::None),
        };

        self.text = ReadoutText {
            x,
            y,
            ra,
            dec,
            value,
            unit,
        };
        ReadoutUpdate {
            text: self.text.clone(),
            sky,
            source,
            probe,
        }
    }

    /// Applies a probe result. Returns the updated text, or `None` when the
    /// pointer has moved since the request was issued.
    pub fn apply_probe_response(
        &mut self,
        generation: u64,
        value: f64,
        unit: Option<String>,
        now: Instant,
    ) -> Option<ReadoutText> {
        if generation < self.displayed_generation {
            debug!(
                generation,
                displayed = self.displayed_generation,
                "discarding stale probe response"
            );
            return None;
        }
        self.displayed_generation = generation;
        if value.is_finite() {
            self.recent = Some(RecentValue {
                value,
                unit: unit.clone(),
                at: now,
            });
        }
        self.text.value = format_pixel_value(value);
        self.text.unit = unit;
        Some(self.text.clone())
    }
}

fn resolve_sky(
    ctx: &ReadoutContext<'_>,
    pixel: PixelCoord,
    image: Option<ImageSize>,
) -> Option<SkyCoord> {
    if !pixel.is_finite() {
        return None;
    }
    ctx.transform
        .and_then(|t| t.pixel_to_world(pixel.x(), pixel.y()))
        .filter(SkyCoord::is_finite)
        .or_else(|| {
            let header = ctx.header?;
            let fits_y = match image {
                Some(size) => size.height as f64 - 1.0 - pixel.y(),
                None => pixel.y(),
            };
            solver::pixel_to_world(header, pixel.x(), fits_y)
        })
}

/// Integer pixel cell under `pixel`, if inside the image.
fn pixel_cell(pixel: PixelCoord, image: ImageSize) -> Option<(u32, u32)> {
    if !pixel.is_finite() || pixel.x() < 0.0 || pixel.y() < 0.0 {
        return None;
    }
    let (x, y) = (pixel.x().floor(), pixel.y().floor());
    (x < image.width as f64 && y < image.height as f64).then_some((x as u32, y as u32))
}

fn format_sky(sky: SkyCoord, mode: LabelMode) -> (String, String) {
    match mode {
        LabelMode::Sexagesimal => (RA_FMT.fmt(sky.ra), DEC_FMT.fmt(sky.dec)),
        LabelMode::Degrees => (
            format_decimal_degrees(wrap_ra_degrees(sky.ra), 6, false),
            format_decimal_degrees(sky.dec, 6, true),
        ),
    }
}

/// Negative and non-finite values are hidden; very small or large
/// magnitudes switch to exponential notation.
///
/// ```
/// use neloura_overlay::readout::format_pixel_value;
///
/// assert_eq!(format_pixel_value(12.5), "12.5000");
/// assert_eq!(format_pixel_value(-1.0), "");
/// ```
pub fn format_pixel_value(value: f64) -> String {
    if !value.is_finite() || value < 0.0 {
        return String::new();
    }
    if value < 1e-3 || value >= 1e4 {
        format!("{value:.4e}")
    } else {
        format!("{value:.4}")
    }
}
