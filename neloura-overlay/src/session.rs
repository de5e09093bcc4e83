//! Per-viewer overlay state.
//!
//! A [`ViewerSession`] owns everything one open image needs: the canonical
//! header, the parsed WCS and orientation caches, settings, the renderer
//! with its scheduler, and the live readout. Hosts drive it with viewer
//! events, pointer moves and animation frames.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use neloura_wcs::{
    calibrate, normalize, CanonicalHeader, CorrectedTransform, OrientationCache, RawHeader,
    WcsCache, WorldTransform,
};

use crate::canvas::OverlayCanvas;
use crate::error::OverlayError;
use crate::readout::{LiveReadout, PixelSource, PreviewBuffer, ReadoutContext, ReadoutText, ReadoutUpdate};
use crate::render::GridRenderer;
use crate::schedule::RedrawScheduler;
use crate::settings::{OverlaySettings, RefreshTicket, SettingsCache};
use crate::viewer::{viewport_samples, ScreenPoint, ViewerEvent, ViewerGeometry};

/// Names the readiness event is published under.
pub const WCS_READY_EVENTS: [&str; 2] = ["wcs:ready", "wcs-ready"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    WcsReady {
        name: &'static str,
        filepath: String,
        hdu_index: usize,
    },
}

type ReadyCallback = Box<dyn FnOnce(&ViewerSession)>;

pub struct ViewerSession {
    header: Option<Arc<CanonicalHeader>>,
    source: Option<(String, usize)>,
    wcs: WcsCache,
    orientation: OrientationCache,
    viewer: Option<Arc<dyn ViewerGeometry>>,
    viewer_generation: u64,
    settings: SettingsCache,
    renderer: GridRenderer,
    scheduler: RedrawScheduler,
    readout: LiveReadout,
    pixels: Option<Arc<dyn PixelSource>>,
    preview: Option<PreviewBuffer>,
    probe_enabled: bool,
    redraw_wanted: bool,
    needs_clear: bool,
    ready_callbacks: Vec<ReadyCallback>,
    events: Vec<SessionEvent>,
}

impl Default for ViewerSession {
    fn default() -> Self {
        Self::new(SettingsCache::default())
    }
}

impl ViewerSession {
    pub fn new(settings: SettingsCache) -> Self {
        Self {
            header: None,
            source: None,
            wcs: WcsCache::new(),
            orientation: OrientationCache::new(),
            viewer: None,
            viewer_generation: 0,
            settings,
            renderer: GridRenderer::new(),
            scheduler: RedrawScheduler::default(),
            readout: LiveReadout::new(),
            pixels: None,
            preview: None,
            probe_enabled: true,
            redraw_wanted: false,
            needs_clear: false,
            ready_callbacks: Vec::new(),
            events: Vec::new(),
        }
    }

    // ---- header and WCS ----

    /// Normalises and installs the header for `filepath`/`hdu_index`.
    /// Returns whether it carries a usable WCS.
    pub fn load_header(&mut self, filepath: &str, hdu_index: usize, raw: &RawHeader) -> bool {
        let image_size = self.viewer.as_ref().and_then(|v| v.image_size());
        let header = Arc::new(normalize(raw, image_size));
        let parsed = self.wcs.get_or_parse(&header);
        let has_wcs = parsed.has_wcs();

        self.header = Some(header);
        self.source = Some((filepath.to_string(), hdu_index));
        self.orientation.invalidate();
        self.renderer.reset();
        self.redraw_wanted = true;

        info!(filepath, hdu_index, has_wcs, "header loaded");
        self.events.extend(WCS_READY_EVENTS.iter().map(|&name| SessionEvent::WcsReady {
            name,
            filepath: filepath.to_string(),
            hdu_index,
        }));
        self.fire_ready();
        has_wcs
    }

    /// [`load_header`](Self::load_header) from the server's JSON. A payload
    /// that is not a header leaves the session unchanged.
    pub fn load_header_json(&mut self, filepath: &str, hdu_index: usize, value: &Value) -> bool {
        match RawHeader::from_json(value) {
            Ok(raw) => self.load_header(filepath, hdu_index, &raw),
            Err(err) => {
                warn!(filepath, hdu_index, error = %err, "header payload rejected");
                false
            }
        }
    }

    pub fn header(&self) -> Option<&Arc<CanonicalHeader>> {
        self.header.as_ref()
    }

    pub fn source(&self) -> Option<(&str, usize)> {
        self.source.as_ref().map(|(path, hdu)| (path.as_str(), *hdu))
    }

    /// Installs or removes an external full-WCS implementation.
    pub fn set_full_wcs(&mut self, full: Option<Arc<dyn WorldTransform>>) {
        self.wcs.set_full_wcs(full);
        self.orientation.invalidate();
        self.renderer.reset();
        self.redraw_wanted = true;
    }

    pub fn has_wcs(&mut self) -> bool {
        match &self.header {
            Some(header) => self.wcs.get_or_parse(header).has_wcs(),
            None => false,
        }
    }

    /// The current WCS seen through the calibrated orientation, if both a
    /// header with a WCS and a viewer with an open image are present.
    pub fn corrected_transform(&mut self) -> Option<CorrectedTransform> {
        let header = self.header.clone()?;
        let viewer = self.viewer.clone()?;
        let image = viewer.image_size()?;

        let parsed = self.wcs.get_or_parse(&header);
        if !parsed.has_wcs() {
            return None;
        }
        let mapping = self.orientation.get_or_calibrate(
            &header,
            self.viewer_generation,
            image.height,
            || calibrate(parsed.as_ref(), image.height, &viewport_samples(viewer.as_ref())),
        );
        Some(CorrectedTransform::new(parsed, mapping))
    }

    // ---- viewer ----

    pub fn attach_viewer(&mut self, viewer: Arc<dyn ViewerGeometry>) {
        self.viewer = Some(viewer);
        self.viewer_generation += 1;
        self.orientation.invalidate();
        self.redraw_wanted = true;
        self.fire_ready();
    }

    pub fn viewer_generation(&self) -> u64 {
        self.viewer_generation
    }

    pub fn on_viewer_event(&mut self, event: ViewerEvent, now: Instant) {
        debug!(?event, "viewer event");
        match event {
            ViewerEvent::Open => {
                self.viewer_generation += 1;
                self.orientation.invalidate();
                self.scheduler.request(now);
            }
            ViewerEvent::AnimationFinish => {
                self.scheduler.request(now);
            }
            ViewerEvent::Resize => {
                self.orientation.on_resize();
                self.scheduler.request(now);
            }
            ViewerEvent::Close => {
                self.scheduler.cancel();
                self.redraw_wanted = false;
                self.needs_clear = true;
            }
        }
    }

    /// Animation-frame hook. Returns whether the canvas was touched.
    pub fn frame(&mut self, now: Instant, canvas: &mut dyn OverlayCanvas) -> bool {
        if std::mem::take(&mut self.needs_clear) {
            canvas.clear();
            return true;
        }
        if std::mem::take(&mut self.redraw_wanted) {
            self.scheduler.request(now);
        }
        if !self.scheduler.poll(now) {
            return false;
        }

        let Some(viewer) = self.viewer.clone() else {
            self.scheduler.finish(now);
            return false;
        };
        let corrected = self.corrected_transform();
        let transform = corrected.as_ref().map(|t| t as &dyn WorldTransform);
        let result = self.renderer.draw(
            viewer.as_ref(),
            transform,
            self.settings.current(),
            canvas,
        );
        match result {
            Ok(summary) => debug!(ticks = summary.tick_count(), "overlay frame"),
            Err(OverlayError::MissingWcs) => {}
            Err(err) => debug!(error = %err, "overlay frame skipped"),
        }
        self.scheduler.finish(now);
        true
    }

    pub fn scheduler(&self) -> &RedrawScheduler {
        &self.scheduler
    }

    // ---- readout ----

    pub fn set_pixel_source(&mut self, pixels: Option<Arc<dyn PixelSource>>) {
        self.pixels = pixels;
    }

    pub fn set_preview(&mut self, preview: Option<PreviewBuffer>) {
        self.preview = preview;
    }

    pub fn set_probe_enabled(&mut self, enabled: bool) {
        self.probe_enabled = enabled;
    }

    pub fn on_pointer_move(&mut self, screen: ScreenPoint, now: Instant) -> Option<ReadoutUpdate> {
        let viewer = self.viewer.clone()?;
        let corrected = self.corrected_transform();
        let ctx = ReadoutContext {
            viewer: viewer.as_ref(),
            transform: corrected.as_ref().map(|t| t as &dyn WorldTransform),
            header: self.header.as_deref(),
            pixels: self.pixels.as_deref(),
            preview: self.preview.as_ref(),
            label_mode: self.settings.current().label_mode,
            probe_enabled: self.probe_enabled,
        };
        Some(self.readout.on_pointer_move(&ctx, screen, now))
    }

    pub fn apply_probe_response(
        &mut self,
        generation: u64,
        value: f64,
        unit: Option<String>,
        now: Instant,
    ) -> Option<ReadoutText> {
        self.readout.apply_probe_response(generation, value, unit, now)
    }

    // ---- settings ----

    pub fn settings(&self) -> &OverlaySettings {
        self.settings.current()
    }

    pub fn begin_settings_refresh(&mut self, now: Instant) -> Option<RefreshTicket> {
        self.settings.begin_refresh(now)
    }

    pub fn complete_settings_refresh<E>(
        &mut self,
        ticket: RefreshTicket,
        result: Result<Value, E>,
        now: Instant,
    ) -> bool
    where
        E: fmt::Display,
    {
        let changed = self.settings.complete_refresh(ticket, result, now);
        self.redraw_wanted |= changed;
        changed
    }

    pub fn apply_settings_delta(&mut self, delta: &Value) -> bool {
        let changed = self.settings.apply_delta(delta);
        self.redraw_wanted |= changed;
        changed
    }

    // ---- readiness and lifecycle ----

    pub fn is_ready(&self) -> bool {
        self.viewer.is_some() && self.header.is_some()
    }

    /// Runs `callback` once both a viewer and a header are present,
    /// immediately if they already are.
    pub fn on_ready<F>(&mut self, callback: F)
    where
        F: FnOnce(&ViewerSession) + 'static,
    {
        if self.is_ready() {
            callback(self);
        } else {
            self.ready_callbacks.push(Box::new(callback));
        }
    }

    fn fire_ready(&mut self) {
        if !self.is_ready() || self.ready_callbacks.is_empty() {
            return;
        }
        for callback in std::mem::take(&mut self.ready_callbacks) {
            callback(self);
        }
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drops pending readiness callbacks and scheduled frames, detaches the
    /// viewer and clears the canvas on the next frame.
    pub fn teardown(&mut self) {
        self.ready_callbacks.clear();
        self.scheduler.cancel();
        self.viewer = None;
        self.orientation.invalidate();
        self.redraw_wanted = false;
        self.needs_clear = true;
    }
}

impl fmt::Debug for ViewerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewerSession")
            .field("source", &self.source)
            .field("has_header", &self.header.is_some())
            .field("has_viewer", &self.viewer.is_some())
            .field("viewer_generation", &self.viewer_generation)
            .field("orientation", &self.orientation)
            .field("scheduler", &self.scheduler.state())
            .field("pending_ready_callbacks", &self.ready_callbacks.len())
            .finish()
    }
}
