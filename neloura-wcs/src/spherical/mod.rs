use neloura_core::angle::wrap_ra_degrees;
use neloura_core::constants::{DEG_TO_RAD, HALF_PI, RAD_TO_DEG};

use crate::coordinate::{IntermediateCoord, NativeCoord, SkyCoord};
use crate::error::{WcsError, WcsResult};

mod zenithal;

use zenithal::{asin_safe, native_coord_from_radians};
use zenithal::{deproject_arc, deproject_sin, deproject_stg, deproject_tan, deproject_zea};
use zenithal::{project_arc, project_sin, project_stg, project_tan, project_zea};

/// Rotation between native spherical coordinates and equatorial RA/Dec.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalRotation {
    alpha_p: f64,
    delta_p: f64,
    phi_p: f64,
    sin_delta_p: f64,
    cos_delta_p: f64,
}

impl SphericalRotation {
    /// Builds the rotation from the celestial pole `(alpha_p, delta_p)` and
    /// native longitude of that pole, all in degrees.
    pub fn new(alpha_p_deg: f64, delta_p_deg: f64, phi_p_deg: f64) -> Self {
        let delta_p = delta_p_deg * DEG_TO_RAD;
        let (sin_delta_p, cos_delta_p) = delta_p.sin_cos();
        Self {
            alpha_p: alpha_p_deg * DEG_TO_RAD,
            delta_p,
            phi_p: phi_p_deg * DEG_TO_RAD,
            sin_delta_p,
            cos_delta_p,
        }
    }

    fn default_lonpole(delta_0_deg: f64, theta_0_deg: f64) -> f64 {
        if delta_0_deg >= theta_0_deg {
            0.0
        } else {
            180.0
        }
    }

    /// Derives the pole from the reference point `(CRVAL1, CRVAL2)` placed at
    /// native `(0, theta_0)`. `lonpole` and `latpole` follow the FITS keywords.
    pub fn from_crval(
        alpha_0_deg: f64,
        delta_0_deg: f64,
        theta_0_deg: f64,
        lonpole: Option<f64>,
        latpole: Option<f64>,
    ) -> WcsResult<Self> {
        let phi_p_deg = lonpole.unwrap_or_else(|| Self::default_lonpole(delta_0_deg, theta_0_deg));
        let latpole_rad = latpole.unwrap_or(90.0) * DEG_TO_RAD;

        let (sin_delta_0, cos_delta_0) = (delta_0_deg * DEG_TO_RAD).sin_cos();
        let (sin_theta_0, cos_theta_0) = (theta_0_deg * DEG_TO_RAD).sin_cos();
        let (sin_phi_p, cos_phi_p) = (phi_p_deg * DEG_TO_RAD).sin_cos();

        let delta_p = compute_delta_p(
            sin_delta_0,
            sin_theta_0,
            cos_theta_0,
            sin_phi_p,
            cos_phi_p,
            latpole_rad,
        )?;

        let x = -cos_theta_0 * sin_phi_p;
        let y = sin_theta_0 * cos_delta_0 - cos_theta_0 * sin_delta_0 * cos_phi_p;
        let alpha_p_deg = wrap_ra_degrees(alpha_0_deg + x.atan2(y) * RAD_TO_DEG);

        Ok(Self::new(alpha_p_deg, delta_p * RAD_TO_DEG, phi_p_deg))
    }

    pub fn native_to_celestial(&self, native: NativeCoord) -> SkyCoord {
        let phi = native.phi_deg() * DEG_TO_RAD;
        let theta = native.theta_deg() * DEG_TO_RAD;

        let (sin_theta, cos_theta) = theta.sin_cos();
        let (sin_d_phi, cos_d_phi) = (phi - self.phi_p).sin_cos();

        let sin_delta = sin_theta * self.sin_delta_p + cos_theta * self.cos_delta_p * cos_d_phi;
        let delta = asin_safe(sin_delta);

        let x = -cos_theta * sin_d_phi;
        let y = sin_theta * self.cos_delta_p - cos_theta * self.sin_delta_p * cos_d_phi;
        let alpha = self.alpha_p + x.atan2(y);

        SkyCoord::new(wrap_ra_degrees(alpha * RAD_TO_DEG), delta * RAD_TO_DEG)
    }

    pub fn celestial_to_native(&self, sky: SkyCoord) -> NativeCoord {
        let alpha = sky.ra * DEG_TO_RAD;
        let delta = sky.dec * DEG_TO_RAD;

        let (sin_delta, cos_delta) = delta.sin_cos();
        let (sin_d_alpha, cos_d_alpha) = (alpha - self.alpha_p).sin_cos();

        let sin_theta = sin_delta * self.sin_delta_p + cos_delta * self.cos_delta_p * cos_d_alpha;
        let theta = asin_safe(sin_theta);

        let x = -cos_delta * sin_d_alpha;
        let y = sin_delta * self.cos_delta_p - cos_delta * self.sin_delta_p * cos_d_alpha;
        let phi = self.phi_p + x.atan2(y);

        native_coord_from_radians(phi, theta)
    }

    #[inline]
    pub fn phi_p_degrees(&self) -> f64 {
        self.phi_p * RAD_TO_DEG
    }

    #[inline]
    pub fn delta_p_degrees(&self) -> f64 {
        self.delta_p * RAD_TO_DEG
    }
}

fn compute_delta_p(
    sin_delta_0: f64,
    sin_theta_0: f64,
    cos_theta_0: f64,
    sin_phi_p: f64,
    cos_phi_p: f64,
    latpole_rad: f64,
) -> WcsResult<f64> {
    let cos_theta_0_sin_phi_p = cos_theta_0 * sin_phi_p;
    let denom_sq = 1.0 - cos_theta_0_sin_phi_p * cos_theta_0_sin_phi_p;

    if denom_sq.abs() < 1e-15 {
        if sin_delta_0.abs() < 1e-15 {
            return Ok(latpole_rad);
        }
        return Err(WcsError::invalid_parameter(
            "no celestial pole latitude satisfies the reference point and LONPOLE",
        ));
    }

    let arg = sin_delta_0 / denom_sq.sqrt();
    if arg.abs() > 1.0 + 1e-15 {
        return Err(WcsError::invalid_parameter(
            "celestial pole latitude out of range for LONPOLE",
        ));
    }

    let acos_term = arg.clamp(-1.0, 1.0).acos();
    let base = sin_theta_0.atan2(cos_theta_0 * cos_phi_p);

    let delta_p_1 = base + acos_term;
    let delta_p_2 = base - acos_term;

    const BOUNDARY_TOL: f64 = 1e-14;
    let in_range = |v: f64| (-HALF_PI - BOUNDARY_TOL..=HALF_PI + BOUNDARY_TOL).contains(&v);
    let clamp = |v: f64| v.clamp(-HALF_PI, HALF_PI);

    match (in_range(delta_p_1), in_range(delta_p_2)) {
        (true, false) => Ok(clamp(delta_p_1)),
        (false, true) => Ok(clamp(delta_p_2)),
        (true, true) => {
            if (delta_p_1 - latpole_rad).abs() <= (delta_p_2 - latpole_rad).abs() {
                Ok(clamp(delta_p_1))
            } else {
                Ok(clamp(delta_p_2))
            }
        }
        (false, false) => Err(WcsError::invalid_parameter(
            "no celestial pole latitude in [-90, 90]",
        )),
    }
}

/// Zenithal projections supported by [`crate::Wcs`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Tan,
    Sin { xi: f64, eta: f64 },
    Arc,
    Stg,
    Zea,
}

impl Projection {
    pub fn tan() -> Self {
        Self::Tan
    }

    pub fn sin() -> Self {
        Self::Sin { xi: 0.0, eta: 0.0 }
    }

    /// Slant orthographic, with `PV2_1` and `PV2_2` as `xi` and `eta`.
    pub fn sin_with_params(xi: f64, eta: f64) -> Self {
        Self::Sin { xi, eta }
    }

    pub fn arc() -> Self {
        Self::Arc
    }

    pub fn stg() -> Self {
        Self::Stg
    }

    pub fn zea() -> Self {
        Self::Zea
    }

    /// Looks up a projection by its three-letter CTYPE code.
    pub fn from_code(code: &str) -> WcsResult<Self> {
        match code {
            "TAN" => Ok(Self::Tan),
            "SIN" => Ok(Self::sin()),
            "ARC" => Ok(Self::Arc),
            "STG" => Ok(Self::Stg),
            "ZEA" => Ok(Self::Zea),
            other => Err(WcsError::unsupported_projection(other)),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Tan => "TAN",
            Self::Sin { .. } => "SIN",
            Self::Arc => "ARC",
            Self::Stg => "STG",
            Self::Zea => "ZEA",
        }
    }

    /// Native `(phi_0, theta_0)` of the reference point, degrees.
    pub fn native_reference(&self) -> (f64, f64) {
        (0.0, 90.0)
    }

    pub fn project(&self, native: NativeCoord) -> WcsResult<IntermediateCoord> {
        match self {
            Self::Tan => project_tan(native),
            Self::Sin { xi, eta } => project_sin(native, *xi, *eta),
            Self::Arc => project_arc(native),
            Self::Stg => project_stg(native),
            Self::Zea => project_zea(native),
        }
    }

    pub fn deproject(&self, inter: IntermediateCoord) -> WcsResult<NativeCoord> {
        match self {
            Self::Tan => deproject_tan(inter),
            Self::Sin { xi, eta } => deproject_sin(inter, *xi, *eta),
            Self::Arc => deproject_arc(inter),
            Self::Stg => deproject_stg(inter),
            Self::Zea => deproject_zea(inter),
        }
    }
}
