use crate::coordinate::{IntermediateCoord, PixelCoord};
use crate::error::{WcsError, WcsResult};
use crate::header::{CanonicalHeader, KeywordProvider};

const DETERMINANT_THRESHOLD: f64 = 1e-15;

/// Affine map between zero-based pixels and intermediate world coordinates.
///
/// CRPIX is kept in the FITS one-based convention; the pixel offset is
/// `p - CRPIX + 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTransform {
    crpix: [f64; 2],
    cd: [[f64; 2]; 2],
    cd_inverse: [[f64; 2]; 2],
    determinant: f64,
}

impl LinearTransform {
    pub fn from_cd(crpix: [f64; 2], cd: [[f64; 2]; 2]) -> WcsResult<Self> {
        if !crpix.iter().chain(cd.iter().flatten()).all(|v| v.is_finite()) {
            return Err(WcsError::non_finite("linear transform parameters"));
        }
        let determinant = cd[0][0] * cd[1][1] - cd[0][1] * cd[1][0];
        if determinant.abs() < DETERMINANT_THRESHOLD {
            return Err(WcsError::non_invertible_matrix(determinant));
        }
        let cd_inverse = compute_inverse(cd, determinant);
        Ok(Self {
            crpix,
            cd,
            cd_inverse,
            determinant,
        })
    }

    pub fn from_pc_cdelt(crpix: [f64; 2], pc: [[f64; 2]; 2], cdelt: [f64; 2]) -> WcsResult<Self> {
        let cd = [
            [cdelt[0] * pc[0][0], cdelt[0] * pc[0][1]],
            [cdelt[1] * pc[1][0], cdelt[1] * pc[1][1]],
        ];
        Self::from_cd(crpix, cd)
    }

    /// Reads CRPIX and the CD matrix, falling back to a CDELT diagonal.
    pub fn from_header(header: &CanonicalHeader) -> WcsResult<Self> {
        let crpix = [
            header.require_float("CRPIX1")?,
            header.require_float("CRPIX2")?,
        ];
        let cd = match header.cd_matrix() {
            Some(cd) => cd,
            None => {
                let cdelt1 = header.require_float("CDELT1")?;
                let cdelt2 = header.require_float("CDELT2")?;
                [[cdelt1, 0.0], [0.0, cdelt2]]
            }
        };
        Self::from_cd(crpix, cd)
    }

    pub fn pixel_to_intermediate(&self, pixel: PixelCoord) -> IntermediateCoord {
        let d0 = pixel.x() - self.crpix[0] + 1.0;
        let d1 = pixel.y() - self.crpix[1] + 1.0;
        let x = self.cd[0][0] * d0 + self.cd[0][1] * d1;
        let y = self.cd[1][0] * d0 + self.cd[1][1] * d1;
        IntermediateCoord::new(x, y)
    }

    pub fn intermediate_to_pixel(&self, inter: IntermediateCoord) -> PixelCoord {
        let x = inter.x_deg();
        let y = inter.y_deg();
        let px = self.cd_inverse[0][0] * x + self.cd_inverse[0][1] * y + self.crpix[0] - 1.0;
        let py = self.cd_inverse[1][0] * x + self.cd_inverse[1][1] * y + self.crpix[1] - 1.0;
        PixelCoord::new(px, py)
    }

    #[inline]
    pub fn crpix(&self) -> [f64; 2] {
        self.crpix
    }

    #[inline]
    pub fn cd_matrix(&self) -> [[f64; 2]; 2] {
        self.cd
    }

    /// Mean pixel scale in degrees per pixel.
    #[inline]
    pub fn pixel_scale(&self) -> f64 {
        libm::sqrt(self.determinant.abs())
    }
}

fn compute_inverse(m: [[f64; 2]; 2], det: f64) -> [[f64; 2]; 2] {
    let inv_det = 1.0 / det;
    [
        [m[1][1] * inv_det, -m[0][1] * inv_det],
        [-m[1][0] * inv_det, m[0][0] * inv_det],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use neloura_core::assert_close;

    #[test]
    fn test_roundtrip_pixel_intermediate_pixel() {
        let transform = LinearTransform::from_cd([512.0, 512.0], [[0.001, 0.0], [0.0, 0.001]]).unwrap();

        let original = PixelCoord::new(256.0, 768.0);
        let intermediate = transform.pixel_to_intermediate(original);
        let recovered = transform.intermediate_to_pixel(intermediate);

        assert_close!(original.x(), recovered.x(), 1e-9);
        assert_close!(original.y(), recovered.y(), 1e-9);
    }

    #[test]
    fn test_reference_pixel_is_zero_based() {
        let transform = LinearTransform::from_cd([50.0, 50.0], [[-0.001, 0.0], [0.0, 0.001]]).unwrap();

        let inter = transform.pixel_to_intermediate(PixelCoord::new(49.0, 49.0));
        assert_eq!(inter.x_deg(), 0.0);
        assert_eq!(inter.y_deg(), 0.0);

        let inter = transform.pixel_to_intermediate(PixelCoord::new(50.0, 49.0));
        assert_close!(inter.x_deg(), -0.001, 1e-15);
    }

    #[test]
    fn test_pc_cdelt_equivalence() {
        let crpix = [100.0, 100.0];
        let transform_cd =
            LinearTransform::from_cd(crpix, [[0.002, 0.001], [-0.001, 0.002]]).unwrap();
        let transform_pc = LinearTransform::from_pc_cdelt(
            crpix,
            [[1.0, 0.5], [-0.5, 1.0]],
            [0.002, 0.002],
        )
        .unwrap();

        assert_eq!(transform_cd.cd_matrix(), transform_pc.cd_matrix());
    }

    #[test]
    fn test_non_invertible_matrix() {
        let result = LinearTransform::from_cd([512.0, 512.0], [[1.0, 2.0], [2.0, 4.0]]);
        match result {
            Err(WcsError::NonInvertibleMatrix { determinant }) => {
                assert_eq!(determinant, 0.0);
            }
            _ => panic!("Expected NonInvertibleMatrix error"),
        }
    }

    #[test]
    fn test_non_finite_rejected() {
        let result = LinearTransform::from_cd([f64::NAN, 1.0], [[1.0, 0.0], [0.0, 1.0]]);
        assert!(matches!(result, Err(WcsError::NonFinite { .. })));
    }

    #[test]
    fn test_from_header_cdelt_fallback() {
        let mut header = CanonicalHeader::new();
        header
            .insert("CRPIX1", 10.0)
            .insert("CRPIX2", 20.0)
            .insert("CDELT1", -0.5)
            .insert("CDELT2", 0.5);
        let transform = LinearTransform::from_header(&header).unwrap();
        assert_eq!(transform.cd_matrix(), [[-0.5, 0.0], [0.0, 0.5]]);
        assert_eq!(transform.crpix(), [10.0, 20.0]);
    }

    #[test]
    fn test_from_header_missing_crpix() {
        let header = CanonicalHeader::new();
        let err = LinearTransform::from_header(&header).unwrap_err();
        assert!(err.to_string().contains("CRPIX1"));
    }

    #[test]
    fn test_pixel_scale() {
        let transform = LinearTransform::from_cd([512.0, 512.0], [[0.001, 0.0], [0.0, 0.001]]).unwrap();
        assert_close!(transform.pixel_scale(), 0.001, 1e-15);
    }
}
