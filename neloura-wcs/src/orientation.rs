//! Empirical resolution of the image row convention.
//!
//! The viewer hands out top-left-origin pixel rows, while the header may
//! have been written for bottom-left rows, and either may be off by half a
//! pixel. Rather than guess, each of four candidate conventions is scored
//! by round-tripping a handful of viewport points through the transform
//! and the one with the smallest mean pixel error wins.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::coordinate::{PixelCoord, SkyCoord};
use crate::header::CanonicalHeader;
use crate::parsed::ParsedWcs;
use crate::wcs::WorldTransform;

/// Scores closer than this are ties; the earlier candidate keeps the win.
const SCORE_TIE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Candidate {
    Invert,
    InvertHalf,
    Direct,
    DirectHalf,
}

impl Candidate {
    /// Evaluation order. Earlier entries win ties.
    pub const ALL: [Candidate; 4] = [
        Candidate::Invert,
        Candidate::InvertHalf,
        Candidate::Direct,
        Candidate::DirectHalf,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Candidate::Invert => "invert",
            Candidate::InvertHalf => "invert+0.5",
            Candidate::Direct => "direct",
            Candidate::DirectHalf => "direct+0.5",
        }
    }

    pub fn flips(self) -> bool {
        matches!(self, Candidate::Invert | Candidate::InvertHalf)
    }

    pub fn offset(self) -> f64 {
        match self {
            Candidate::Invert | Candidate::Direct => 0.0,
            Candidate::InvertHalf | Candidate::DirectHalf => 0.5,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Conversion between viewer rows (top-left origin) and header rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationMapping {
    candidate: Candidate,
    image_height: f64,
}

impl OrientationMapping {
    pub fn new(candidate: Candidate, image_height: u32) -> Self {
        Self {
            candidate,
            image_height: image_height as f64,
        }
    }

    /// No flip, no offset.
    pub fn identity(image_height: u32) -> Self {
        Self::new(Candidate::Direct, image_height)
    }

    pub fn candidate(&self) -> Candidate {
        self.candidate
    }

    pub fn name(&self) -> &'static str {
        self.candidate.name()
    }

    pub fn to_fits_y(&self, y_top_left: f64) -> f64 {
        let offset = self.candidate.offset();
        if self.candidate.flips() {
            (self.image_height - 1.0 - y_top_left) + offset
        } else {
            y_top_left + offset
        }
    }

    pub fn from_fits_y(&self, y_fits: f64) -> f64 {
        let offset = self.candidate.offset();
        if self.candidate.flips() {
            self.image_height - 1.0 - (y_fits - offset)
        } else {
            y_fits - offset
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub mapping: OrientationMapping,
    /// Mean round-trip error per candidate, in [`Candidate::ALL`] order.
    pub scores: [f64; 4],
    /// Set when every candidate failed and the identity mapping was used.
    pub fallback: bool,
}

/// Pixel error of one round trip, `+inf` when any step fails.
pub fn round_trip_error<F, I>(
    mapping: &OrientationMapping,
    forward: &F,
    inverse: &I,
    sample: PixelCoord,
) -> f64
where
    F: Fn(f64, f64) -> Option<SkyCoord>,
    I: Fn(f64, f64) -> Option<PixelCoord>,
{
    let fits_y = mapping.to_fits_y(sample.y());
    let Some(sky) = forward(sample.x(), fits_y).filter(SkyCoord::is_finite) else {
        return f64::INFINITY;
    };
    let Some(pixel) = inverse(sky.ra, sky.dec).filter(PixelCoord::is_finite) else {
        return f64::INFINITY;
    };
    let back = PixelCoord::new(pixel.x(), mapping.from_fits_y(pixel.y()));
    let error = back.distance(sample);
    if error.is_finite() {
        error
    } else {
        f64::INFINITY
    }
}

/// Picks the candidate with the lowest mean round-trip error over `samples`
/// (image pixels of the viewport corners and centre, top-left rows).
pub fn select_mapping<F, I>(
    forward: F,
    inverse: I,
    image_height: u32,
    samples: &[PixelCoord],
) -> Calibration
where
    F: Fn(f64, f64) -> Option<SkyCoord>,
    I: Fn(f64, f64) -> Option<PixelCoord>,
{
    let mut scores = [f64::INFINITY; 4];
    let mut best: Option<(usize, f64)> = None;

    for (index, candidate) in Candidate::ALL.into_iter().enumerate() {
        let mapping = OrientationMapping::new(candidate, image_height);
        let score = if samples.is_empty() {
            f64::INFINITY
        } else {
            let total: f64 = samples
                .iter()
                .map(|&sample| round_trip_error(&mapping, &forward, &inverse, sample))
                .sum();
            total / samples.len() as f64
        };
        scores[index] = score;

        if score.is_finite() {
            match best {
                Some((_, best_score)) if score >= best_score - SCORE_TIE_TOLERANCE => {}
                _ => best = Some((index, score)),
            }
        }
    }

    match best {
        Some((index, score)) => {
            let mapping = OrientationMapping::new(Candidate::ALL[index], image_height);
            debug!(
                mapping = mapping.name(),
                score,
                ?scores,
                "orientation calibrated"
            );
            Calibration {
                mapping,
                scores,
                fallback: false,
            }
        }
        None => {
            warn!(
                samples = samples.len(),
                "all orientation candidates failed; using direct mapping"
            );
            Calibration {
                mapping: OrientationMapping::identity(image_height),
                scores,
                fallback: true,
            }
        }
    }
}

/// [`select_mapping`] over any [`WorldTransform`].
pub fn calibrate(
    transform: &dyn WorldTransform,
    image_height: u32,
    samples: &[PixelCoord],
) -> Calibration {
    select_mapping(
        |x, y| transform.pixel_to_world(x, y),
        |ra, dec| transform.world_to_pixel(ra, dec),
        image_height,
        samples,
    )
}

struct CachedCalibration {
    header: Arc<CanonicalHeader>,
    viewer_generation: u64,
    image_height: u32,
    calibration: Calibration,
}

/// Calibration result per (header identity, viewer generation, image height).
///
/// Resizes keep a successful result: the winning convention belongs to the
/// header, not to the viewport. A fallback result is dropped on resize so
/// the next request samples the new geometry.
#[derive(Default)]
pub struct OrientationCache {
    entry: Option<CachedCalibration>,
}

impl OrientationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        header: &Arc<CanonicalHeader>,
        viewer_generation: u64,
        image_height: u32,
    ) -> Option<&Calibration> {
        self.entry
            .as_ref()
            .filter(|e| {
                Arc::ptr_eq(&e.header, header)
                    && e.viewer_generation == viewer_generation
                    && e.image_height == image_height
            })
            .map(|e| &e.calibration)
    }

    pub fn get_or_calibrate<C>(
        &mut self,
        header: &Arc<CanonicalHeader>,
        viewer_generation: u64,
        image_height: u32,
        calibrate: C,
    ) -> OrientationMapping
    where
        C: FnOnce() -> Calibration,
    {
        if let Some(cached) = self.get(header, viewer_generation, image_height) {
            return cached.mapping;
        }
        let calibration = calibrate();
        let mapping = calibration.mapping;
        self.entry = Some(CachedCalibration {
            header: Arc::clone(header),
            viewer_generation,
            image_height,
            calibration,
        });
        mapping
    }

    /// Drops a fallback result so the next request recalibrates. Returns
    /// whether anything was dropped.
    pub fn on_resize(&mut self) -> bool {
        if self
            .entry
            .as_ref()
            .is_some_and(|e| e.calibration.fallback)
        {
            self.entry = None;
            return true;
        }
        false
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}

impl fmt::Debug for OrientationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrientationCache")
            .field(
                "mapping",
                &self.entry.as_ref().map(|e| e.calibration.mapping.name()),
            )
            .finish()
    }
}

/// A parsed WCS seen through an orientation mapping, so callers can pass
/// viewer (top-left) pixel rows directly.
#[derive(Debug, Clone)]
pub struct CorrectedTransform {
    parsed: Arc<ParsedWcs>,
    mapping: OrientationMapping,
}

impl CorrectedTransform {
    pub fn new(parsed: Arc<ParsedWcs>, mapping: OrientationMapping) -> Self {
        Self { parsed, mapping }
    }

    pub fn mapping(&self) -> OrientationMapping {
        self.mapping
    }

    pub fn parsed(&self) -> &Arc<ParsedWcs> {
        &self.parsed
    }
}

impl WorldTransform for CorrectedTransform {
    fn pixel_to_world(&self, x: f64, y: f64) -> Option<SkyCoord> {
        self.parsed
            .pixel_to_world(x, self.mapping.to_fits_y(y))
            .filter(SkyCoord::is_finite)
    }

    fn world_to_pixel(&self, ra: f64, dec: f64) -> Option<PixelCoord> {
        let pixel = self.parsed.world_to_pixel(ra, dec)?;
        Some(PixelCoord::new(pixel.x(), self.mapping.from_fits_y(pixel.y())))
            .filter(PixelCoord::is_finite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neloura_core::assert_close;

    fn corners(width: f64, height: f64) -> Vec<PixelCoord> {
        vec![
            PixelCoord::new(0.0, 0.0),
            PixelCoord::new(width - 1.0, 0.0),
            PixelCoord::new(0.0, height - 1.0),
            PixelCoord::new(width - 1.0, height - 1.0),
            PixelCoord::new(width / 2.0, height / 2.0),
        ]
    }

    #[test]
    fn test_mapping_formulas() {
        let invert = OrientationMapping::new(Candidate::Invert, 100);
        assert_eq!(invert.to_fits_y(0.0), 99.0);
        assert_eq!(invert.from_fits_y(99.0), 0.0);

        let invert_half = OrientationMapping::new(Candidate::InvertHalf, 100);
        assert_eq!(invert_half.to_fits_y(10.0), 89.5);
        assert_eq!(invert_half.from_fits_y(89.5), 10.0);

        let direct_half = OrientationMapping::new(Candidate::DirectHalf, 100);
        assert_eq!(direct_half.to_fits_y(10.0), 10.5);
        assert_eq!(direct_half.from_fits_y(10.5), 10.0);

        assert_eq!(OrientationMapping::identity(100).name(), "direct");
    }

    #[test]
    fn test_consistent_transform_keeps_first_candidate() {
        // forward and inverse agree, so every candidate round-trips exactly
        let calibration = select_mapping(
            |x, y| Some(SkyCoord::new(x * 0.001, y * 0.001)),
            |ra, dec| Some(PixelCoord::new(ra / 0.001, dec / 0.001)),
            200,
            &corners(200.0, 200.0),
        );
        assert_eq!(calibration.mapping.candidate(), Candidate::Invert);
        assert!(!calibration.fallback);
    }

    #[test]
    fn test_lowest_mean_error_wins() {
        // a slightly stretched inverse hurts rows far from header row zero
        let calibration = select_mapping(
            |x, y| Some(SkyCoord::new(x, y)),
            |ra, dec| Some(PixelCoord::new(ra, dec * 1.01)),
            100,
            &[PixelCoord::new(10.0, 10.0), PixelCoord::new(50.0, 12.0)],
        );
        assert_eq!(calibration.mapping.candidate(), Candidate::Direct);
        assert_close!(calibration.scores[2], 0.11, 1e-9);
        assert!(calibration.scores[0] > calibration.scores[2]);
        assert!(calibration.scores[3] > calibration.scores[2]);
    }

    #[test]
    fn test_forward_failing_for_flipped_rows() {
        // only rows below 150 are on-sky; flipping pushes corners off
        let calibration = select_mapping(
            |x, y| (y < 150.0).then(|| SkyCoord::new(x, y)),
            |ra, dec| Some(PixelCoord::new(ra, dec)),
            200,
            &[PixelCoord::new(10.0, 10.0), PixelCoord::new(20.0, 20.0)],
        );
        assert!(calibration.scores[0].is_infinite());
        assert!(calibration.scores[1].is_infinite());
        assert_eq!(calibration.mapping.candidate(), Candidate::Direct);
    }

    #[test]
    fn test_all_fail_falls_back_to_direct() {
        let calibration = select_mapping(
            |_, _| None,
            |ra, dec| Some(PixelCoord::new(ra, dec)),
            100,
            &corners(100.0, 100.0),
        );
        assert!(calibration.fallback);
        assert_eq!(calibration.mapping.candidate(), Candidate::Direct);
        assert!(calibration.scores.iter().all(|s| s.is_infinite()));
    }

    #[test]
    fn test_non_finite_output_counts_as_failure() {
        let calibration = select_mapping(
            |_, _| Some(SkyCoord::new(f64::NAN, 0.0)),
            |ra, dec| Some(PixelCoord::new(ra, dec)),
            100,
            &corners(100.0, 100.0),
        );
        assert!(calibration.fallback);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let run = || {
            select_mapping(
                |x, y| Some(SkyCoord::new(x, y)),
                |ra, dec| Some(PixelCoord::new(ra, 99.0 - dec)),
                100,
                &corners(100.0, 100.0),
            )
        };
        let first = run();
        for _ in 0..5 {
            assert_eq!(run(), first);
        }
    }

    fn tan_header() -> Arc<CanonicalHeader> {
        let mut header = CanonicalHeader::new();
        header
            .insert("CTYPE1", "RA---TAN")
            .insert("CTYPE2", "DEC--TAN")
            .insert("CRVAL1", 180.0)
            .insert("CRVAL2", 0.0)
            .insert("CRPIX1", 50.0)
            .insert("CRPIX2", 50.0)
            .insert("CD1_1", -0.001)
            .insert("CD1_2", 0.0)
            .insert("CD2_1", 0.0)
            .insert("CD2_2", 0.001);
        Arc::new(header)
    }

    #[test]
    fn test_cache_reuses_until_key_changes() {
        let header = tan_header();
        let mut cache = OrientationCache::new();
        let mut runs = 0;
        let mut calibrate = || {
            runs += 1;
            Calibration {
                mapping: OrientationMapping::new(Candidate::InvertHalf, 100),
                scores: [1.0, 0.0, 1.0, 1.0],
                fallback: false,
            }
        };

        cache.get_or_calibrate(&header, 1, 100, &mut calibrate);
        let mapping = cache.get_or_calibrate(&header, 1, 100, &mut calibrate);
        assert_eq!(mapping.candidate(), Candidate::InvertHalf);
        assert!(!cache.on_resize());
        cache.get_or_calibrate(&header, 1, 100, &mut calibrate);
        cache.get_or_calibrate(&header, 2, 100, &mut calibrate);
        let copy = Arc::new((*header).clone());
        cache.get_or_calibrate(&copy, 2, 100, &mut calibrate);
        assert_eq!(runs, 3);
    }

    #[test]
    fn test_cache_drops_fallback_on_resize() {
        let header = tan_header();
        let mut cache = OrientationCache::new();
        cache.get_or_calibrate(&header, 1, 100, || Calibration {
            mapping: OrientationMapping::identity(100),
            scores: [f64::INFINITY; 4],
            fallback: true,
        });
        assert!(cache.on_resize());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_corrected_transform_flips_rows() {
        let header = tan_header();
        let parsed = Arc::new(ParsedWcs::parse(Arc::clone(&header), None));
        let corrected =
            CorrectedTransform::new(Arc::clone(&parsed), OrientationMapping::new(Candidate::Invert, 100));

        // viewer row 50 is header row 49, the reference pixel
        let sky = corrected.pixel_to_world(49.0, 50.0).unwrap();
        assert_close!(sky.ra, 180.0, 1e-9);
        assert_close!(sky.dec, 0.0, 1e-12);

        let pixel = corrected.world_to_pixel(sky.ra, sky.dec).unwrap();
        assert_close!(pixel.x(), 49.0, 1e-9);
        assert_close!(pixel.y(), 50.0, 1e-9);
    }

    #[test]
    fn test_calibrate_against_parsed_wcs() {
        let parsed = ParsedWcs::parse(tan_header(), None);
        let calibration = calibrate(&parsed, 100, &corners(100.0, 100.0));
        assert!(!calibration.fallback);
        assert!(calibration.scores.iter().all(|s| *s < 1e-6));
    }
}
