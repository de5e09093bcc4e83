//! Angle normalization for sky coordinates expressed in degrees.
//!
//! The overlay works in degrees end to end, so the helpers here take and
//! return degrees rather than radians.
//!
//! | Quantity | Range | Function |
//! |----------|-------|----------|
//! | Right Ascension (display) | [0, 360) | [`wrap_ra_degrees`] |
//! | Right Ascension (solver branch) | [-180, +180) | [`wrap_pm180`] |
//! | Declination | [-90, +90] | [`clamp_dec_degrees`] |
//!
//! # Branch cuts
//!
//! Sampling RA along a screen edge that crosses the 0/360 (or ±180) line
//! produces a jump of nearly a full turn between two neighbouring samples.
//! [`unwrap_longitudes`] removes those jumps so that interpolation between
//! samples stays meaningful.
//!
//! # Example
//!
//! ```
//! use neloura_core::angle::{unwrap_longitudes, wrap_pm180, wrap_ra_degrees};
//!
//! assert_eq!(wrap_ra_degrees(-90.0), 270.0);
//! assert_eq!(wrap_pm180(270.0), -90.0);
//!
//! let mut ra = vec![359.0, 359.5, 0.0, 0.5];
//! unwrap_longitudes(&mut ra);
//! assert_eq!(ra, vec![359.0, 359.5, 360.0, 360.5]);
//! ```

use crate::constants::{FULL_TURN_DEG, HALF_TURN_DEG};

/// Wraps an angle in degrees to [0, 360).
///
/// Uses Euclidean remainder so negative inputs land on the positive side.
/// A tiny negative input can round to exactly 360.0 after the remainder;
/// that case is folded back to 0.0.
#[inline]
pub fn wrap_ra_degrees(deg: f64) -> f64 {
    let w = deg.rem_euclid(FULL_TURN_DEG);
    if w >= FULL_TURN_DEG {
        0.0
    } else {
        w
    }
}

/// Wraps an angle in degrees to [-180, +180) using `((deg + 540) mod 360) - 180`.
///
/// This is the branch the projection solver reports RA on before callers
/// re-wrap it to [0, 360). Note that +180 maps to -180.
///
/// ```
/// use neloura_core::angle::wrap_pm180;
///
/// assert_eq!(wrap_pm180(180.0), -180.0);
/// assert_eq!(wrap_pm180(-190.0), 170.0);
/// ```
#[inline]
pub fn wrap_pm180(deg: f64) -> f64 {
    let w = (deg + FULL_TURN_DEG + HALF_TURN_DEG).rem_euclid(FULL_TURN_DEG) - HALF_TURN_DEG;
    if w >= HALF_TURN_DEG {
        w - FULL_TURN_DEG
    } else {
        w
    }
}

/// Clamps a declination in degrees to [-90, +90].
#[inline]
pub fn clamp_dec_degrees(deg: f64) -> f64 {
    deg.clamp(-90.0, 90.0)
}

/// Removes full-turn jumps from a sequence of longitudes in place.
///
/// Each element is shifted by a multiple of 360 degrees so that it lies
/// within 180 degrees of its (already unwrapped) predecessor. Non-finite
/// elements are left untouched and do not reset the reference.
pub fn unwrap_longitudes(values: &mut [f64]) {
    let mut previous: Option<f64> = None;
    for value in values.iter_mut() {
        if !value.is_finite() {
            continue;
        }
        if let Some(prev) = previous {
            let mut delta = *value - prev;
            while delta > HALF_TURN_DEG {
                *value -= FULL_TURN_DEG;
                delta -= FULL_TURN_DEG;
            }
            while delta < -HALF_TURN_DEG {
                *value += FULL_TURN_DEG;
                delta += FULL_TURN_DEG;
            }
        }
        previous = Some(*value);
    }
}
