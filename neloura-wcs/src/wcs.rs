use std::collections::HashMap;

use tracing::debug;

use crate::coordinate::{PixelCoord, SkyCoord};
use crate::error::{WcsError, WcsResult};
use crate::header::KeywordProvider;
use crate::linear::LinearTransform;
use crate::spherical::{Projection, SphericalRotation};

/// A complete pixel/sky mapping that can stand in for the built-in solver.
///
/// Pixels are zero-based, angles in degrees. Both directions return `None`
/// instead of an error so implementations can be called from the render
/// loop without ceremony.
pub trait WorldTransform {
    fn pixel_to_world(&self, x: f64, y: f64) -> Option<SkyCoord>;
    fn world_to_pixel(&self, ra: f64, dec: f64) -> Option<PixelCoord>;
}

/// Linear transform, zenithal projection and spherical rotation in one.
#[derive(Debug, Clone)]
pub struct Wcs {
    linear: LinearTransform,
    projection: Projection,
    rotation: SphericalRotation,
    crval_deg: (f64, f64),
}

impl Wcs {
    pub fn new(
        linear: LinearTransform,
        projection: Projection,
        rotation: SphericalRotation,
        crval_deg: (f64, f64),
    ) -> Self {
        Self {
            linear,
            projection,
            rotation,
            crval_deg,
        }
    }

    /// Shorthand for `WcsBuilder::from_header(header)?.build()`.
    pub fn from_header(header: &impl KeywordProvider) -> WcsResult<Self> {
        WcsBuilder::from_header(header)?.build()
    }

    pub fn pixel_to_sky(&self, pixel: PixelCoord) -> WcsResult<SkyCoord> {
        let intermediate = self.linear.pixel_to_intermediate(pixel);
        let native = self.projection.deproject(intermediate)?;
        let sky = self.rotation.native_to_celestial(native);
        if !sky.is_finite() {
            return Err(WcsError::non_finite("pixel to sky"));
        }
        Ok(sky)
    }

    pub fn sky_to_pixel(&self, sky: SkyCoord) -> WcsResult<PixelCoord> {
        let native = self.rotation.celestial_to_native(sky);
        let intermediate = self.projection.project(native)?;
        let pixel = self.linear.intermediate_to_pixel(intermediate);
        if !pixel.is_finite() {
            return Err(WcsError::non_finite("sky to pixel"));
        }
        Ok(pixel)
    }

    pub fn projection_code(&self) -> &'static str {
        self.projection.code()
    }

    pub fn crpix(&self) -> [f64; 2] {
        self.linear.crpix()
    }

    pub fn crval(&self) -> (f64, f64) {
        self.crval_deg
    }

    pub fn pixel_scale(&self) -> f64 {
        self.linear.pixel_scale()
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn rotation(&self) -> &SphericalRotation {
        &self.rotation
    }
}

impl WorldTransform for Wcs {
    fn pixel_to_world(&self, x: f64, y: f64) -> Option<SkyCoord> {
        self.pixel_to_sky(PixelCoord::new(x, y)).ok()
    }

    fn world_to_pixel(&self, ra: f64, dec: f64) -> Option<PixelCoord> {
        self.sky_to_pixel(SkyCoord::new(ra, dec)).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum MatrixSpec {
    #[default]
    None,
    Cd([[f64; 2]; 2]),
    PcCdelt {
        pc: [[f64; 2]; 2],
        cdelt: [f64; 2],
    },
}

#[derive(Debug, Clone, Default)]
pub struct WcsBuilder {
    crpix: Option<[f64; 2]>,
    crval: Option<[f64; 2]>,
    matrix: MatrixSpec,
    projection: Option<Projection>,
    proj_code: Option<String>,
    lonpole: Option<f64>,
    latpole: Option<f64>,
    pv_params: HashMap<(u8, u8), f64>,
}

impl WcsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn crpix(mut self, x: f64, y: f64) -> Self {
        self.crpix = Some([x, y]);
        self
    }

    pub fn crval(mut self, lon: f64, lat: f64) -> Self {
        self.crval = Some([lon, lat]);
        self
    }

    pub fn cd_matrix(mut self, cd: [[f64; 2]; 2]) -> Self {
        self.matrix = MatrixSpec::Cd(cd);
        self
    }

    pub fn pc_cdelt(mut self, pc: [[f64; 2]; 2], cdelt: [f64; 2]) -> Self {
        self.matrix = MatrixSpec::PcCdelt { pc, cdelt };
        self
    }

    pub fn projection(mut self, proj: Projection) -> Self {
        self.projection = Some(proj);
        self
    }

    pub fn proj_code(mut self, code: impl Into<String>) -> Self {
        self.proj_code = Some(code.into());
        self
    }

    pub fn lonpole(mut self, lonpole: f64) -> Self {
        self.lonpole = Some(lonpole);
        self
    }

    pub fn latpole(mut self, latpole: f64) -> Self {
        self.latpole = Some(latpole);
        self
    }

    pub fn pv(mut self, axis: u8, index: u8, value: f64) -> Self {
        self.pv_params.insert((axis, index), value);
        self
    }

    pub fn from_header(header: &impl KeywordProvider) -> WcsResult<Self> {
        let ctype1 = header.require_string("CTYPE1")?;
        let ctype2 = header.require_string("CTYPE2")?;

        let (_, proj_code1) = parse_ctype(&ctype1)?;
        let (_, proj_code2) = parse_ctype(&ctype2)?;

        if proj_code1 != proj_code2 {
            return Err(WcsError::invalid_keyword(
                "CTYPE1/CTYPE2",
                format!("Mismatched projection codes: '{proj_code1}' vs '{proj_code2}'"),
            ));
        }

        let mut builder = Self::new()
            .crpix(header.require_float("CRPIX1")?, header.require_float("CRPIX2")?)
            .crval(header.require_float("CRVAL1")?, header.require_float("CRVAL2")?)
            .proj_code(proj_code1);

        builder.matrix = parse_matrix(header)?;
        builder.lonpole = header.get_float("LONPOLE");
        builder.latpole = header.get_float("LATPOLE");

        for index in 1..=2u8 {
            if let Some(value) = header.get_float(&format!("PV2_{index}")) {
                builder.pv_params.insert((2, index), value);
            }
        }

        Ok(builder)
    }

    pub fn build(self) -> WcsResult<Wcs> {
        let crpix = self.crpix.ok_or_else(|| WcsError::missing_keyword("CRPIX"))?;
        let crval = self.crval.ok_or_else(|| WcsError::missing_keyword("CRVAL"))?;

        let linear = match self.matrix {
            MatrixSpec::Cd(cd) => LinearTransform::from_cd(crpix, cd)?,
            MatrixSpec::PcCdelt { pc, cdelt } => LinearTransform::from_pc_cdelt(crpix, pc, cdelt)?,
            MatrixSpec::None => {
                return Err(WcsError::missing_keyword(
                    "CD1_1 or CDELT1 (no transformation matrix found)",
                ))
            }
        };

        let projection = match (self.projection, self.proj_code.as_deref()) {
            (Some(proj), _) => proj,
            (None, Some(code)) => projection_from_code(code, &self.pv_params)?,
            (None, None) => return Err(WcsError::missing_keyword("CTYPE projection code")),
        };

        let (_, theta_0) = projection.native_reference();
        let rotation =
            SphericalRotation::from_crval(crval[0], crval[1], theta_0, self.lonpole, self.latpole)?;

        debug!(
            projection = projection.code(),
            crval1 = crval[0],
            crval2 = crval[1],
            "built full WCS"
        );

        Ok(Wcs::new(linear, projection, rotation, (crval[0], crval[1])))
    }
}

fn projection_from_code(code: &str, pv: &HashMap<(u8, u8), f64>) -> WcsResult<Projection> {
    match Projection::from_code(code)? {
        Projection::Sin { .. } => {
            let xi = pv.get(&(2, 1)).copied().unwrap_or(0.0);
            let eta = pv.get(&(2, 2)).copied().unwrap_or(0.0);
            Ok(Projection::sin_with_params(xi, eta))
        }
        other => Ok(other),
    }
}

/// Splits `RA---TAN` into the axis prefix and the projection code.
pub fn parse_ctype(ctype: &str) -> WcsResult<(&str, &str)> {
    let ctype = ctype.trim();
    match ctype.find('-') {
        Some(dash) => {
            let prefix = &ctype[..dash];
            let code = ctype[dash..].trim_start_matches('-').trim();
            if code.is_empty() {
                return Err(WcsError::invalid_keyword(
                    "CTYPE",
                    format!("No projection code in '{ctype}'"),
                ));
            }
            Ok((prefix, code))
        }
        None => Err(WcsError::invalid_keyword(
            "CTYPE",
            format!("Invalid CTYPE format (no dash separator): '{ctype}'"),
        )),
    }
}

fn parse_matrix(header: &impl KeywordProvider) -> WcsResult<MatrixSpec> {
    let cd11 = header.get_float("CD1_1");
    let cd12 = header.get_float("CD1_2");
    let cd21 = header.get_float("CD2_1");
    let cd22 = header.get_float("CD2_2");

    if cd11.is_some() || cd12.is_some() || cd21.is_some() || cd22.is_some() {
        return Ok(MatrixSpec::Cd([
            [cd11.unwrap_or(0.0), cd12.unwrap_or(0.0)],
            [cd21.unwrap_or(0.0), cd22.unwrap_or(0.0)],
        ]));
    }

    if let (Some(c1), Some(c2)) = (header.get_float("CDELT1"), header.get_float("CDELT2")) {
        let pc = [
            [
                header.get_float("PC1_1").unwrap_or(1.0),
                header.get_float("PC1_2").unwrap_or(0.0),
            ],
            [
                header.get_float("PC2_1").unwrap_or(0.0),
                header.get_float("PC2_2").unwrap_or(1.0),
            ],
        ];
        return Ok(MatrixSpec::PcCdelt {
            pc,
            cdelt: [c1, c2],
        });
    }

    Err(WcsError::missing_keyword(
        "CD1_1 or CDELT1 (no transformation matrix found)",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::CanonicalHeader;
    use neloura_core::assert_close;

    fn header(code: &str) -> CanonicalHeader {
        let mut header = CanonicalHeader::new();
        header
            .insert("CTYPE1", format!("RA---{code}").as_str())
            .insert("CTYPE2", format!("DEC--{code}").as_str())
            .insert("CRVAL1", 150.0)
            .insert("CRVAL2", 2.5)
            .insert("CRPIX1", 512.0)
            .insert("CRPIX2", 512.0)
            .insert("CD1_1", -0.0002)
            .insert("CD1_2", 0.0)
            .insert("CD2_1", 0.0)
            .insert("CD2_2", 0.0002);
        header
    }

    #[test]
    fn test_parse_ctype() {
        assert_eq!(parse_ctype("RA---TAN").unwrap(), ("RA", "TAN"));
        assert_eq!(parse_ctype("DEC--SIN").unwrap(), ("DEC", "SIN"));
        assert!(parse_ctype("LINEAR").is_err());
        assert!(parse_ctype("RA---").is_err());
    }

    #[test]
    fn test_reference_pixel_is_crval() {
        let wcs = Wcs::from_header(&header("TAN")).unwrap();
        let sky = wcs.pixel_to_world(511.0, 511.0).unwrap();
        assert_close!(sky.ra, 150.0, 1e-9);
        assert_close!(sky.dec, 2.5, 1e-9);
    }

    #[test]
    fn test_roundtrip_all_projections() {
        for code in ["TAN", "SIN", "ARC", "STG", "ZEA"] {
            let wcs = Wcs::from_header(&header(code)).unwrap();
            assert_eq!(wcs.projection_code(), code);
            for &(x, y) in &[(0.0, 0.0), (1023.0, 0.0), (300.5, 800.25)] {
                let sky = wcs.pixel_to_world(x, y).unwrap();
                let back = wcs.world_to_pixel(sky.ra, sky.dec).unwrap();
                assert_close!(back.x(), x, 1e-6, "{code} x");
                assert_close!(back.y(), y, 1e-6, "{code} y");
            }
        }
    }

    #[test]
    fn test_tan_agrees_with_solver() {
        let h = header("TAN");
        let wcs = Wcs::from_header(&h).unwrap();
        let full = wcs.pixel_to_world(100.0, 900.0).unwrap();
        let fast = crate::solver::pixel_to_world(&h, 100.0, 900.0).unwrap();
        assert_close!(full.ra, fast.ra, 1e-9);
        assert_close!(full.dec, fast.dec, 1e-9);
    }

    #[test]
    fn test_sin_pv_parameters() {
        let mut h = header("SIN");
        h.insert("PV2_1", 0.01).insert("PV2_2", -0.02);
        let wcs = Wcs::from_header(&h).unwrap();
        assert_eq!(
            *wcs.projection(),
            Projection::sin_with_params(0.01, -0.02)
        );
    }

    #[test]
    fn test_lonpole_honoured() {
        let mut h = header("TAN");
        h.insert("LONPOLE", 170.0);
        let wcs = Wcs::from_header(&h).unwrap();
        assert_close!(wcs.rotation().phi_p_degrees(), 170.0, 1e-12);
    }

    #[test]
    fn test_mismatched_codes() {
        let mut h = header("TAN");
        h.insert("CTYPE2", "DEC--SIN");
        assert!(matches!(
            Wcs::from_header(&h),
            Err(WcsError::InvalidKeyword { .. })
        ));
    }

    #[test]
    fn test_unsupported_code() {
        assert!(matches!(
            Wcs::from_header(&header("AIT")),
            Err(WcsError::UnsupportedProjection { .. })
        ));
    }

    #[test]
    fn test_builder_requires_matrix() {
        let result = WcsBuilder::new()
            .crpix(1.0, 1.0)
            .crval(0.0, 0.0)
            .projection(Projection::tan())
            .build();
        assert!(matches!(result, Err(WcsError::MissingKeyword { .. })));
    }

    #[test]
    fn test_builder_pc_cdelt() {
        let wcs = WcsBuilder::new()
            .crpix(10.0, 10.0)
            .crval(45.0, 30.0)
            .pc_cdelt([[1.0, 0.0], [0.0, 1.0]], [-0.01, 0.01])
            .projection(Projection::zea())
            .build()
            .unwrap();
        assert_close!(wcs.pixel_scale(), 0.01, 1e-15);
        assert_eq!(wcs.crpix(), [10.0, 10.0]);
    }
}
