//! Degree-based angle helpers used by the coordinate overlay.

pub mod format;
pub mod normalize;

pub use format::{format_decimal_degrees, DmsFmt, Fields, HmsFmt};
pub use normalize::{clamp_dec_degrees, unwrap_longitudes, wrap_pm180, wrap_ra_degrees};
