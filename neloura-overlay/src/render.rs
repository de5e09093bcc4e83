//! Axis frame painting.
//!
//! The renderer samples the corrected transform along the top and left
//! edges of the visible image, picks tick values with the [`TickPlanner`]
//! and paints border, tick marks and labels onto an [`OverlayCanvas`].

use serde::Serialize;
use tracing::{debug, warn};

use neloura_wcs::WorldTransform;

use crate::canvas::{OverlayCanvas, TextAlign};
use crate::error::{OverlayError, OverlayResult};
use crate::sampling::{invert_samples, sample_edges, tick_values, visible_bounds, EdgeSample, EDGE_SAMPLES};
use crate::settings::OverlaySettings;
use crate::ticks::TickPlanner;
use crate::viewer::{ScreenPoint, ViewerGeometry, ViewportSize};

pub const TICK_LENGTH_PX: f64 = 8.0;
/// Ticks further outside the viewport than this are not drawn.
pub const OFFSCREEN_MARGIN_PX: f64 = 20.0;
pub const MAX_CANVAS_SCALE: f64 = 4.0;
const LABEL_PADDING_PX: f64 = 2.0;
const LABEL_GAP_PX: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub value_deg: f64,
    pub screen: ScreenPoint,
    pub label: String,
}

/// What one call to [`GridRenderer::draw`] produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameSummary {
    pub ra_step: Option<f64>,
    pub dec_step: Option<f64>,
    pub ra_ticks: Vec<Tick>,
    pub dec_ticks: Vec<Tick>,
}

impl FrameSummary {
    pub fn tick_count(&self) -> usize {
        self.ra_ticks.len() + self.dec_ticks.len()
    }
}

/// Backing store scale for a device pixel ratio.
pub fn canvas_scale(device_pixel_ratio: f64) -> f64 {
    if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio.min(MAX_CANVAS_SCALE)
    } else {
        1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Ra,
    Dec,
}

#[derive(Debug)]
pub struct GridRenderer {
    samples_per_edge: usize,
    disabled: bool,
}

impl Default for GridRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl GridRenderer {
    pub fn new() -> Self {
        Self {
            samples_per_edge: EDGE_SAMPLES,
            disabled: false,
        }
    }

    /// True after a frame was requested without a usable WCS.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Re-arms the renderer after a header change.
    pub fn reset(&mut self) {
        self.disabled = false;
    }

    /// Paints one frame.
    ///
    /// Disabled settings clear the canvas. A missing transform clears the
    /// canvas and reports [`OverlayError::MissingWcs`], logging only the
    /// first occurrence until [`reset`](Self::reset).
    pub fn draw(
        &mut self,
        viewer: &dyn ViewerGeometry,
        transform: Option<&dyn WorldTransform>,
        settings: &OverlaySettings,
        canvas: &mut dyn OverlayCanvas,
    ) -> OverlayResult<FrameSummary> {
        if !settings.enabled {
            canvas.clear();
            return Ok(FrameSummary::default());
        }

        let Some(transform) = transform else {
            canvas.clear();
            if !self.disabled {
                warn!("no usable WCS; coordinate grid disabled");
                self.disabled = true;
            }
            return Err(OverlayError::MissingWcs);
        };

        let viewport = viewer.viewport_size();
        if viewport.is_degenerate() {
            canvas.clear();
            return Err(OverlayError::degenerate_viewport(viewport.width, viewport.height));
        }

        canvas.clear();
        canvas.resize(
            viewport.width,
            viewport.height,
            canvas_scale(viewer.device_pixel_ratio()),
        );
        canvas.stroke_rect(
            0.5,
            0.5,
            viewport.width - 1.0,
            viewport.height - 1.0,
            &settings.axis_color,
        );

        let mut summary = FrameSummary::default();
        let Some(bounds) = visible_bounds(viewer) else {
            debug!("image not visible; drawing border only");
            return Ok(summary);
        };

        let samples = sample_edges(transform, &bounds, self.samples_per_edge);
        let planner = TickPlanner::new(settings.label_mode);

        if let Some((min, max)) = samples.ra_range() {
            let step = planner.step(max - min);
            summary.ra_step = Some(step);
            summary.ra_ticks = place_ticks(viewer, viewport, &samples.ra, min, max, step, |v| {
                planner.ra_label(v, step)
            });
        }
        if let Some((min, max)) = samples.dec_range() {
            let step = planner.step(max - min);
            summary.dec_step = Some(step);
            summary.dec_ticks = place_ticks(viewer, viewport, &samples.dec, min, max, step, |v| {
                planner.dec_label(v, step)
            });
        }

        for tick in &summary.ra_ticks {
            paint_tick(canvas, viewport, settings, tick, Axis::Ra);
        }
        for tick in &summary.dec_ticks {
            paint_tick(canvas, viewport, settings, tick, Axis::Dec);
        }

        debug!(
            ra_ticks = summary.ra_ticks.len(),
            dec_ticks = summary.dec_ticks.len(),
            "grid frame drawn"
        );
        Ok(summary)
    }
}

fn place_ticks(
    viewer: &dyn ViewerGeometry,
    viewport: ViewportSize,
    samples: &[EdgeSample],
    min: f64,
    max: f64,
    step: f64,
    label: impl Fn(f64) -> String,
) -> Vec<Tick> {
    tick_values(min, max, step)
        .into_iter()
        .filter_map(|value| {
            let pixel = invert_samples(samples, value)?;
            let screen = viewer.image_to_screen(pixel);
            let visible = screen.x.is_finite()
                && screen.y.is_finite()
                && viewport.contains_with_margin(screen, OFFSCREEN_MARGIN_PX);
            visible.then(|| Tick {
                value_deg: value,
                screen,
                label: label(value),
            })
        })
        .collect()
}

fn paint_tick(
    canvas: &mut dyn OverlayCanvas,
    viewport: ViewportSize,
    settings: &OverlaySettings,
    tick: &Tick,
    axis: Axis,
) {
    let (w, h) = (viewport.width, viewport.height);
    let metrics = canvas.measure_text(&tick.label);
    let color = &settings.tick_color;

    match axis {
        Axis::Ra => {
            let x = tick.screen.x;
            canvas.line(x, 0.0, x, TICK_LENGTH_PX, color);
            canvas.line(x, h - TICK_LENGTH_PX, x, h, color);

            let top = TICK_LENGTH_PX + LABEL_GAP_PX;
            canvas.fill_rect(
                x - metrics.width / 2.0 - LABEL_PADDING_PX,
                top,
                metrics.width + 2.0 * LABEL_PADDING_PX,
                metrics.height + 2.0 * LABEL_PADDING_PX,
                &settings.label_background,
            );
            canvas.fill_text(
                &tick.label,
                x,
                top + LABEL_PADDING_PX + metrics.height,
                TextAlign::Center,
                &settings.label_color,
            );
        }
        Axis::Dec => {
            let y = tick.screen.y;
            canvas.line(0.0, y, TICK_LENGTH_PX, y, color);
            canvas.line(w - TICK_LENGTH_PX, y, w, y, color);

            let left = TICK_LENGTH_PX + LABEL_GAP_PX;
            canvas.fill_rect(
                left,
                y - metrics.height / 2.0 - LABEL_PADDING_PX,
                metrics.width + 2.0 * LABEL_PADDING_PX,
                metrics.height + 2.0 * LABEL_PADDING_PX,
                &settings.label_background,
            );
            canvas.fill_text(
                &tick.label,
                left + LABEL_PADDING_PX,
                y + metrics.height / 2.0,
                TextAlign::Left,
                &settings.label_color,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CommandCanvas, DrawCommand};
    use crate::viewer::PanZoomViewer;
    use neloura_core::assert_close;
    use neloura_wcs::{ImageSize, PixelCoord, SkyCoord};

    struct Plate;

    impl WorldTransform for Plate {
        fn pixel_to_world(&self, x: f64, y: f64) -> Option<SkyCoord> {
            Some(SkyCoord::new(10.0 - 0.01 * x, 20.0 - 0.01 * y))
        }

        fn world_to_pixel(&self, ra: f64, dec: f64) -> Option<PixelCoord> {
            Some(PixelCoord::new((10.0 - ra) / 0.01, (20.0 - dec) / 0.01))
        }
    }

    fn viewer() -> PanZoomViewer {
        PanZoomViewer::fit(ImageSize::new(100, 100), ViewportSize::new(400.0, 400.0))
    }

    #[test]
    fn test_draws_border_and_ticks() {
        let mut renderer = GridRenderer::new();
        let mut canvas = CommandCanvas::new();
        let settings = OverlaySettings::default();

        let summary = renderer
            .draw(&viewer(), Some(&Plate), &settings, &mut canvas)
            .unwrap();

        assert_eq!(summary.ra_step, Some(0.2));
        assert_eq!(summary.dec_step, Some(0.2));
        assert!(summary.ra_ticks.len() >= 4);
        assert!(summary.dec_ticks.len() >= 4);
        for tick in summary.ra_ticks.iter().chain(&summary.dec_ticks) {
            assert_eq!(tick.label.matches(':').count(), 1, "{}", tick.label);
        }

        let commands = canvas.commands();
        assert_eq!(commands[0], DrawCommand::Clear);
        assert!(matches!(commands[1], DrawCommand::Resize { scale, .. } if scale == 1.0));
        assert!(matches!(
            &commands[2],
            DrawCommand::StrokeRect { x, width, .. } if *x == 0.5 && *width == 399.0
        ));
        assert_eq!(canvas.texts().count(), summary.tick_count());
    }

    #[test]
    fn test_tick_marks_on_both_sides() {
        let mut renderer = GridRenderer::new();
        let mut canvas = CommandCanvas::new();
        let summary = renderer
            .draw(&viewer(), Some(&Plate), &OverlaySettings::default(), &mut canvas)
            .unwrap();
        let lines = canvas
            .commands()
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::Line { .. }))
            .count();
        assert_eq!(lines, 2 * summary.tick_count());
    }

    #[test]
    fn test_disabled_settings_clear() {
        let mut renderer = GridRenderer::new();
        let mut canvas = CommandCanvas::new();
        let settings = OverlaySettings {
            enabled: false,
            ..OverlaySettings::default()
        };
        let summary = renderer
            .draw(&viewer(), Some(&Plate), &settings, &mut canvas)
            .unwrap();
        assert_eq!(summary, FrameSummary::default());
        assert_eq!(canvas.commands(), &[DrawCommand::Clear]);
    }

    #[test]
    fn test_missing_wcs_disables() {
        let mut renderer = GridRenderer::new();
        let mut canvas = CommandCanvas::new();
        let settings = OverlaySettings::default();

        for _ in 0..2 {
            let err = renderer.draw(&viewer(), None, &settings, &mut canvas);
            assert!(matches!(err, Err(OverlayError::MissingWcs)));
            assert!(renderer.is_disabled());
            assert_eq!(canvas.commands(), &[DrawCommand::Clear]);
        }
        renderer.reset();
        assert!(!renderer.is_disabled());
    }

    #[test]
    fn test_degenerate_viewport() {
        let viewer = PanZoomViewer::fit(ImageSize::new(100, 100), ViewportSize::new(0.0, 400.0));
        let mut canvas = CommandCanvas::new();
        let result = GridRenderer::new().draw(
            &viewer,
            Some(&Plate),
            &OverlaySettings::default(),
            &mut canvas,
        );
        assert!(matches!(result, Err(OverlayError::DegenerateViewport { .. })));
    }

    /// Unit zoom with the screen shifted 25px left of the image.
    struct Shifted;

    impl ViewerGeometry for Shifted {
        fn screen_to_image(&self, screen: ScreenPoint) -> PixelCoord {
            PixelCoord::new(screen.x + 25.0, screen.y)
        }

        fn image_to_screen(&self, pixel: PixelCoord) -> ScreenPoint {
            ScreenPoint::new(pixel.x() - 25.0, pixel.y())
        }

        fn image_size(&self) -> Option<ImageSize> {
            Some(ImageSize::new(100, 100))
        }

        fn viewport_size(&self) -> ViewportSize {
            ViewportSize::new(50.0, 50.0)
        }
    }

    #[test]
    fn test_ticks_beyond_offscreen_margin_are_culled() {
        let samples = [
            EdgeSample {
                pixel: PixelCoord::new(0.0, 10.0),
                value: 0.0,
            },
            EdgeSample {
                pixel: PixelCoord::new(100.0, 10.0),
                value: 10.0,
            },
        ];
        let ticks = place_ticks(
            &Shifted,
            Shifted.viewport_size(),
            &samples,
            0.0,
            10.0,
            1.0,
            |v| format!("{v}"),
        );

        // 0 lands at x = -25 and 10 at x = 75, both beyond the margin
        let values: Vec<f64> = ticks.iter().map(|t| t.value_deg).collect();
        assert_eq!(values, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_close!(ticks[0].screen.x, -15.0, 1e-9);
        assert_close!(ticks[8].screen.x, 65.0, 1e-9);
    }

    #[test]
    fn test_canvas_scale_capped() {
        assert_eq!(canvas_scale(2.0), 2.0);
        assert_eq!(canvas_scale(8.0), MAX_CANVAS_SCALE);
        assert_eq!(canvas_scale(f64::NAN), 1.0);

        let mut hidpi = viewer();
        hidpi.device_pixel_ratio = 6.0;
        let mut canvas = CommandCanvas::new();
        GridRenderer::new()
            .draw(&hidpi, Some(&Plate), &OverlaySettings::default(), &mut canvas)
            .unwrap();
        assert_eq!(
            canvas.commands()[1],
            DrawCommand::Resize {
                width: 400.0,
                height: 400.0,
                scale: MAX_CANVAS_SCALE,
            }
        );
    }
}
