//! FITS World Coordinate System support for the Neloura viewer.
//!
//! The pipeline runs in one direction:
//!
//! 1. [`header::normalize`] turns whatever header shape the server sent into
//!    a [`CanonicalHeader`] with a materialised CD matrix.
//! 2. [`solver`] converts pixels to sky positions with closed-form TAN/SIN
//!    formulas; [`Wcs`] is the heavier full implementation that hosts may
//!    inject through [`WorldTransform`].
//! 3. [`ParsedWcs`] chains the available transforms and is cached per
//!    header allocation by [`WcsCache`].
//! 4. [`orientation`] picks the pixel row convention that round-trips best
//!    and exposes the result as a [`CorrectedTransform`].
//!
//! Pixels are zero-based throughout; angles are degrees.

pub mod coordinate;
pub mod error;
pub mod header;
pub mod linear;
pub mod orientation;
pub mod parsed;
pub mod solver;
pub mod spherical;
pub mod wcs;

pub use coordinate::{ImageSize, IntermediateCoord, NativeCoord, PixelCoord, SkyCoord};
pub use error::{WcsError, WcsResult};
pub use header::{
    normalize, parse_card_value, CanonicalHeader, HeaderCard, HeaderValue, KeywordProvider,
    RawHeader,
};
pub use linear::LinearTransform;
pub use orientation::{
    calibrate, select_mapping, Calibration, Candidate, CorrectedTransform, OrientationCache,
    OrientationMapping,
};
pub use parsed::{ParsedWcs, WcsCache};
pub use solver::{pixel_to_world, world_to_pixel, ProjectionKind, SolverParams};
pub use spherical::{Projection, SphericalRotation};
pub use wcs::{parse_ctype, Wcs, WcsBuilder, WorldTransform};
