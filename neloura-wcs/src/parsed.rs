use std::fmt;
use std::sync::Arc;

use neloura_core::angle::wrap_ra_degrees;
use tracing::debug;

use crate::coordinate::{PixelCoord, SkyCoord};
use crate::header::CanonicalHeader;
use crate::solver::SolverParams;
use crate::wcs::WorldTransform;

/// The transform derived from one header version.
///
/// Forward and inverse conversions try, in order, the injected full WCS,
/// the closed-form solver and, for projections the solver cannot handle,
/// the linear-CD approximation.
pub struct ParsedWcs {
    header: Arc<CanonicalHeader>,
    solver: Option<SolverParams>,
    full: Option<Arc<dyn WorldTransform>>,
}

impl ParsedWcs {
    pub fn parse(header: Arc<CanonicalHeader>, full: Option<Arc<dyn WorldTransform>>) -> Self {
        let solver = match SolverParams::from_header(&header) {
            Ok(params) => Some(params),
            Err(err) => {
                debug!(error = %err, "header has no usable WCS for the built-in solver");
                None
            }
        };
        Self {
            header,
            solver,
            full,
        }
    }

    pub fn has_wcs(&self) -> bool {
        self.full.is_some() || self.solver.is_some()
    }

    pub fn header(&self) -> &Arc<CanonicalHeader> {
        &self.header
    }

    pub fn solver(&self) -> Option<&SolverParams> {
        self.solver.as_ref()
    }

    /// Whether this was parsed from exactly this header allocation.
    pub fn is_source(&self, header: &Arc<CanonicalHeader>) -> bool {
        Arc::ptr_eq(&self.header, header)
    }

    /// Zero-based pixel to sky, RA in `[0, 360)`.
    pub fn pixel_to_world(&self, x: f64, y: f64) -> Option<SkyCoord> {
        if let Some(sky) = self
            .full
            .as_ref()
            .and_then(|full| full.pixel_to_world(x, y))
            .filter(SkyCoord::is_finite)
        {
            return Some(SkyCoord::new(wrap_ra_degrees(sky.ra), sky.dec));
        }

        let solver = self.solver.as_ref()?;
        let pixel = PixelCoord::new(x, y);
        if solver.kind.is_supported() {
            solver.pixel_to_world(pixel).ok()
        } else {
            solver.linear_pixel_to_world(pixel).ok()
        }
    }

    pub fn world_to_pixel(&self, ra: f64, dec: f64) -> Option<PixelCoord> {
        if let Some(pixel) = self
            .full
            .as_ref()
            .and_then(|full| full.world_to_pixel(ra, dec))
            .filter(PixelCoord::is_finite)
        {
            return Some(pixel);
        }

        let solver = self.solver.as_ref()?;
        let sky = SkyCoord::new(ra, dec);
        if solver.kind.is_supported() {
            solver.world_to_pixel(sky).ok()
        } else {
            solver.linear_world_to_pixel(sky).ok()
        }
    }
}

impl fmt::Debug for ParsedWcs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsedWcs")
            .field("has_wcs", &self.has_wcs())
            .field("solver", &self.solver)
            .field("full", &self.full.is_some())
            .finish_non_exhaustive()
    }
}

impl WorldTransform for ParsedWcs {
    fn pixel_to_world(&self, x: f64, y: f64) -> Option<SkyCoord> {
        ParsedWcs::pixel_to_world(self, x, y)
    }

    fn world_to_pixel(&self, ra: f64, dec: f64) -> Option<PixelCoord> {
        ParsedWcs::world_to_pixel(self, ra, dec)
    }
}

/// Lazily parsed [`ParsedWcs`], keyed by the identity of the header `Arc`.
#[derive(Default)]
pub struct WcsCache {
    parsed: Option<Arc<ParsedWcs>>,
    full: Option<Arc<dyn WorldTransform>>,
}

impl WcsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached parse when it came from `header`, else reparses.
    pub fn get_or_parse(&mut self, header: &Arc<CanonicalHeader>) -> Arc<ParsedWcs> {
        if let Some(parsed) = self.parsed.as_ref().filter(|p| p.is_source(header)) {
            return Arc::clone(parsed);
        }
        let parsed = Arc::new(ParsedWcs::parse(Arc::clone(header), self.full.clone()));
        debug!(has_wcs = parsed.has_wcs(), "parsed WCS for new header");
        self.parsed = Some(Arc::clone(&parsed));
        parsed
    }

    pub fn current(&self) -> Option<Arc<ParsedWcs>> {
        self.parsed.clone()
    }

    /// Installs or removes the full-WCS capability; drops the cached parse.
    pub fn set_full_wcs(&mut self, full: Option<Arc<dyn WorldTransform>>) {
        self.full = full;
        self.parsed = None;
    }

    pub fn invalidate(&mut self) {
        self.parsed = None;
    }
}

impl fmt::Debug for WcsCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WcsCache")
            .field("parsed", &self.parsed)
            .field("full", &self.full.is_some())
            .finish()
    }
}
