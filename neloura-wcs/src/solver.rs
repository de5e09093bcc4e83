//! Closed-form TAN/SIN solver working directly on a canonical header.
//!
//! This is the fast path the overlay uses for every grid sample and pointer
//! move. Pixels are zero-based; CRPIX keeps its one-based FITS meaning, so
//! the reference pixel `CRPIX = 50` is pixel `49` here.

use neloura_core::angle::{wrap_pm180, wrap_ra_degrees};
use neloura_core::constants::{DEG_TO_RAD, RAD_TO_DEG};

use crate::coordinate::{IntermediateCoord, PixelCoord, SkyCoord};
use crate::error::{WcsError, WcsResult};
use crate::header::{CanonicalHeader, KeywordProvider};
use crate::linear::LinearTransform;

const TAN_RADIUS_EPSILON: f64 = 1e-16;
const POLE_COS_EPSILON: f64 = 1e-12;

/// Projection family picked from the CTYPE pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionKind {
    Tan,
    Sin,
    /// Any other code; only the linear approximation applies.
    Other(String),
}

impl ProjectionKind {
    /// TAN wins if either axis names it, then SIN.
    pub fn from_ctypes(ctype1: &str, ctype2: &str) -> Self {
        let c1 = ctype1.to_ascii_uppercase();
        let c2 = ctype2.to_ascii_uppercase();
        if c1.contains("TAN") || c2.contains("TAN") {
            ProjectionKind::Tan
        } else if c1.contains("SIN") || c2.contains("SIN") {
            ProjectionKind::Sin
        } else {
            let code = c1.rsplit('-').next().unwrap_or_default().trim().to_string();
            ProjectionKind::Other(code)
        }
    }

    /// Whether the closed-form formulas cover this projection.
    pub fn is_supported(&self) -> bool {
        !matches!(self, ProjectionKind::Other(_))
    }

    fn mirrors_x(&self) -> bool {
        matches!(self, ProjectionKind::Sin)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverParams {
    pub kind: ProjectionKind,
    pub crval: [f64; 2],
    pub crpix: [f64; 2],
    pub cd: [[f64; 2]; 2],
}

impl SolverParams {
    /// Reads the solver inputs, falling back to a CDELT diagonal when the
    /// header carries no CD matrix.
    pub fn from_header(header: &CanonicalHeader) -> WcsResult<Self> {
        let ctype1 = header.require_string("CTYPE1")?;
        let ctype2 = header.require_string("CTYPE2")?;
        let crval = [
            header.require_float("CRVAL1")?,
            header.require_float("CRVAL2")?,
        ];
        let crpix = [
            header.require_float("CRPIX1")?,
            header.require_float("CRPIX2")?,
        ];
        let cd = match header.cd_matrix() {
            Some(cd) => cd,
            None => [
                [header.require_float("CDELT1")?, 0.0],
                [0.0, header.require_float("CDELT2")?],
            ],
        };

        if !crval
            .iter()
            .chain(crpix.iter())
            .chain(cd.iter().flatten())
            .all(|v| v.is_finite())
        {
            return Err(WcsError::non_finite("solver parameters"));
        }

        Ok(Self {
            kind: ProjectionKind::from_ctypes(&ctype1, &ctype2),
            crval,
            crpix,
            cd,
        })
    }

    fn intermediate(&self, pixel: PixelCoord) -> IntermediateCoord {
        let dx = pixel.x() - self.crpix[0] + 1.0;
        let dy = pixel.y() - self.crpix[1] + 1.0;
        IntermediateCoord::new(
            self.cd[0][0] * dx + self.cd[0][1] * dy,
            self.cd[1][0] * dx + self.cd[1][1] * dy,
        )
    }

    fn linear(&self) -> WcsResult<LinearTransform> {
        LinearTransform::from_cd(self.crpix, self.cd)
    }

    /// Pixel to sky with RA on the `[-180, 180)` branch.
    pub fn solve_signed(&self, pixel: PixelCoord) -> WcsResult<SkyCoord> {
        if !pixel.is_finite() {
            return Err(WcsError::non_finite("pixel input"));
        }
        let inter = self.intermediate(pixel);
        let xi = inter.x_rad();
        let eta = inter.y_rad();
        let ra0 = self.crval[0] * DEG_TO_RAD;
        let (sin_dec0, cos_dec0) = (self.crval[1] * DEG_TO_RAD).sin_cos();

        let (ra, dec) = match &self.kind {
            ProjectionKind::Tan => {
                let h = xi.hypot(eta).max(TAN_RADIUS_EPSILON);
                let delta = h.atan();
                let (sin_d, cos_d) = delta.sin_cos();
                let dec = (cos_d * sin_dec0 + eta * sin_d * cos_dec0 / h)
                    .clamp(-1.0, 1.0)
                    .asin();
                let ra = ra0 + (xi * sin_d).atan2(h * cos_dec0 * cos_d - eta * sin_dec0 * sin_d);
                (ra, dec)
            }
            ProjectionKind::Sin => {
                let l = -xi;
                let m = eta;
                let rho_sq = l * l + m * m;
                if rho_sq > 1.0 {
                    return Err(WcsError::out_of_bounds("outside the SIN projection disk"));
                }
                let n = (1.0 - rho_sq).sqrt();
                let dec = (m * cos_dec0 + n * sin_dec0).clamp(-1.0, 1.0).asin();
                let ra = ra0 + l.atan2(n * cos_dec0 - m * sin_dec0);
                (ra, dec)
            }
            ProjectionKind::Other(code) => return Err(WcsError::unsupported_projection(code)),
        };

        let sky = SkyCoord::new(wrap_pm180(ra * RAD_TO_DEG), dec * RAD_TO_DEG);
        if !sky.is_finite() {
            return Err(WcsError::non_finite("projection solve"));
        }
        Ok(sky)
    }

    /// Pixel to sky with RA in `[0, 360)`.
    pub fn pixel_to_world(&self, pixel: PixelCoord) -> WcsResult<SkyCoord> {
        let sky = self.solve_signed(pixel)?;
        Ok(SkyCoord::new(wrap_ra_degrees(sky.ra), sky.dec))
    }

    /// Closed-form inverse of [`Self::solve_signed`].
    pub fn world_to_pixel(&self, sky: SkyCoord) -> WcsResult<PixelCoord> {
        if !sky.is_finite() {
            return Err(WcsError::non_finite("sky input"));
        }
        let (sin_dec0, cos_dec0) = (self.crval[1] * DEG_TO_RAD).sin_cos();
        let (sin_dec, cos_dec) = (sky.dec * DEG_TO_RAD).sin_cos();
        let (sin_dra, cos_dra) = ((sky.ra - self.crval[0]) * DEG_TO_RAD).sin_cos();

        let cos_c = sin_dec0 * sin_dec + cos_dec0 * cos_dec * cos_dra;
        let along = cos_dec * sin_dra;
        let up = cos_dec0 * sin_dec - sin_dec0 * cos_dec * cos_dra;

        let (xi, eta) = match &self.kind {
            ProjectionKind::Tan => {
                if cos_c <= 0.0 {
                    return Err(WcsError::out_of_bounds(
                        "TAN inverse undefined beyond 90 degrees from the reference",
                    ));
                }
                (along / cos_c, up / cos_c)
            }
            ProjectionKind::Sin => {
                if cos_c < 0.0 {
                    return Err(WcsError::out_of_bounds("SIN inverse on the far hemisphere"));
                }
                (-along, up)
            }
            ProjectionKind::Other(code) => return Err(WcsError::unsupported_projection(code)),
        };

        let pixel = self
            .linear()?
            .intermediate_to_pixel(IntermediateCoord::new(xi * RAD_TO_DEG, eta * RAD_TO_DEG));
        if !pixel.is_finite() {
            return Err(WcsError::non_finite("projection inverse"));
        }
        Ok(pixel)
    }

    /// Flat-sky forward approximation: `ra = ra0 + xi / cos(dec0)`,
    /// `dec = dec0 + eta`.
    pub fn linear_pixel_to_world(&self, pixel: PixelCoord) -> WcsResult<SkyCoord> {
        if !pixel.is_finite() {
            return Err(WcsError::non_finite("pixel input"));
        }
        let cos_dec0 = self.reference_cos_dec()?;
        let inter = self.intermediate(pixel);
        let xi = if self.kind.mirrors_x() {
            -inter.x_deg()
        } else {
            inter.x_deg()
        };
        Ok(SkyCoord::new(
            wrap_ra_degrees(self.crval[0] + xi / cos_dec0),
            self.crval[1] + inter.y_deg(),
        ))
    }

    /// Flat-sky inverse: `xi = dRA cos(dec0)`, `eta = dDec`.
    pub fn linear_world_to_pixel(&self, sky: SkyCoord) -> WcsResult<PixelCoord> {
        if !sky.is_finite() {
            return Err(WcsError::non_finite("sky input"));
        }
        let cos_dec0 = self.reference_cos_dec()?;
        let xi = wrap_pm180(sky.ra - self.crval[0]) * cos_dec0;
        let xi = if self.kind.mirrors_x() { -xi } else { xi };
        let eta = sky.dec - self.crval[1];
        Ok(self
            .linear()?
            .intermediate_to_pixel(IntermediateCoord::new(xi, eta)))
    }

    fn reference_cos_dec(&self) -> WcsResult<f64> {
        let cos_dec0 = (self.crval[1] * DEG_TO_RAD).cos();
        if cos_dec0.abs() < POLE_COS_EPSILON {
            return Err(WcsError::singularity("linear approximation at the pole"));
        }
        Ok(cos_dec0)
    }
}

/// Pixel to sky for a canonical header; `None` when the header lacks a
/// usable WCS, the projection is unsupported or the point is off-sky.
pub fn pixel_to_world(header: &CanonicalHeader, x: f64, y: f64) -> Option<SkyCoord> {
    SolverParams::from_header(header)
        .and_then(|params| params.pixel_to_world(PixelCoord::new(x, y)))
        .ok()
}

/// Closed-form sky to pixel for a canonical header.
pub fn world_to_pixel(header: &CanonicalHeader, ra: f64, dec: f64) -> Option<PixelCoord> {
    SolverParams::from_header(header)
        .and_then(|params| params.world_to_pixel(SkyCoord::new(ra, dec)))
        .ok()
}
