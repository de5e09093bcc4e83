//! Sexagesimal and decimal formatting for axis labels and coordinate readouts.
//!
//! Labels on a coordinate grid only show as many fields as the tick spacing
//! can resolve, so both formatters take a [`Fields`] selector alongside the
//! number of fractional digits for the seconds field.
//!
//! # Notation
//!
//! - Right ascension uses colon-separated hours: `HH:MM:SS.ss`. The angle is
//!   wrapped to [0h, 24h) first.
//! - Declination uses a mandatory sign and colon-separated degrees:
//!   `+DD:MM:SS.s`.
//!
//! Every field is zero-padded to two digits. With seconds shown, the value is
//! rounded to the last fractional digit and carries propagate upward, so
//! 11:59:59.999 at centisecond precision becomes `12:00:00.00` rather than
//! `11:59:60.00`. The coarser levels drop the hidden fields instead, so
//! 00h30m shown as hours only reads `00`.
//!
//! # Example
//!
//! ```
//! use neloura_core::angle::{DmsFmt, Fields, HmsFmt};
//!
//! let ra = HmsFmt { fields: Fields::Seconds, frac_digits: 2 };
//! assert_eq!(ra.fmt(180.0), "12:00:00.00");
//!
//! let dec = DmsFmt { fields: Fields::Minutes, frac_digits: 0 };
//! assert_eq!(dec.fmt(-30.5), "-30:30");
//! ```

use crate::constants::{DEGREES_PER_HOUR, FULL_TURN_DEG, MINUTES_PER_UNIT, SECONDS_PER_UNIT};

/// Tolerance for truncated fields; tick values on a field boundary may
/// land a few ulps below it.
const TRUNCATE_EPSILON: f64 = 1e-9;

/// Which sexagesimal fields a formatter emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Fields {
    /// Leading unit only (`HH` or `±DD`), minutes and seconds dropped.
    Whole,
    /// Leading unit and minutes, seconds dropped.
    Minutes,
    /// Leading unit, minutes and (fractional) seconds.
    Seconds,
}

impl Fields {
    /// Number of fields emitted.
    pub fn count(self) -> usize {
        match self {
            Fields::Whole => 1,
            Fields::Minutes => 2,
            Fields::Seconds => 3,
        }
    }
}

/// Formatter for right ascension in colon-separated hours.
///
/// Input is in degrees; negative angles and angles past 360 are wrapped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HmsFmt {
    pub fields: Fields,
    /// Decimal places on the seconds field. Ignored unless `fields` is
    /// [`Fields::Seconds`].
    pub frac_digits: u8,
}

/// Formatter for declination in signed colon-separated degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DmsFmt {
    pub fields: Fields,
    /// Decimal places on the arcseconds field. Ignored unless `fields` is
    /// [`Fields::Seconds`].
    pub frac_digits: u8,
}

impl HmsFmt {
    /// Formats an angle given in degrees as hours.
    ///
    /// Non-finite input yields an empty string.
    pub fn fmt(&self, degrees: f64) -> String {
        if !degrees.is_finite() {
            return String::new();
        }
        let hours = degrees.rem_euclid(FULL_TURN_DEG) / DEGREES_PER_HOUR;
        let parts = Decomposed::new(hours, self.fields, self.frac_digits);
        // 24h wraps back to 0h after rounding
        let lead = parts.lead % 24;
        parts.render(format!("{lead:02}"))
    }
}

impl DmsFmt {
    /// Formats an angle given in degrees as signed degrees.
    ///
    /// Non-finite input yields an empty string.
    pub fn fmt(&self, degrees: f64) -> String {
        if !degrees.is_finite() {
            return String::new();
        }
        let parts = Decomposed::new(degrees.abs(), self.fields, self.frac_digits);
        let sign = if degrees < 0.0 && !parts.is_zero() {
            '-'
        } else {
            '+'
        };
        let lead = parts.lead;
        parts.render(format!("{sign}{lead:02}"))
    }
}

/// Formats a value as plain decimal degrees.
///
/// With `signed` set, non-negative values get an explicit `+`.
///
/// ```
/// use neloura_core::angle::format_decimal_degrees;
///
/// assert_eq!(format_decimal_degrees(12.5, 2, true), "+12.50");
/// assert_eq!(format_decimal_degrees(-0.26, 1, true), "-0.3");
/// assert_eq!(format_decimal_degrees(271.0, 0, false), "271");
/// ```
pub fn format_decimal_degrees(value: f64, decimals: usize, signed: bool) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let text = format!("{value:.decimals$}");
    if signed && !text.starts_with('-') {
        format!("+{text}")
    } else {
        text
    }
}

/// A non-negative magnitude split into integer components, truncated at
/// the coarse levels and rounded when seconds are shown.
struct Decomposed {
    fields: Fields,
    frac_digits: usize,
    lead: u64,
    minutes: u64,
    /// Seconds scaled by `10^frac_digits`.
    scaled_seconds: u64,
}

impl Decomposed {
    fn new(magnitude: f64, fields: Fields, frac_digits: u8) -> Self {
        let frac_digits = frac_digits as usize;
        match fields {
            Fields::Whole => Self {
                fields,
                frac_digits,
                lead: libm::floor(magnitude + TRUNCATE_EPSILON) as u64,
                minutes: 0,
                scaled_seconds: 0,
            },
            Fields::Minutes => {
                let total = libm::floor(magnitude * MINUTES_PER_UNIT + TRUNCATE_EPSILON) as u64;
                Self {
                    fields,
                    frac_digits,
                    lead: total / 60,
                    minutes: total % 60,
                    scaled_seconds: 0,
                }
            }
            Fields::Seconds => {
                let scale = 10u64.pow(frac_digits as u32);
                let total = libm::round(magnitude * SECONDS_PER_UNIT * scale as f64) as u64;
                let per_minute = 60 * scale;
                let per_lead = 60 * per_minute;
                Self {
                    fields,
                    frac_digits,
                    lead: total / per_lead,
                    minutes: (total % per_lead) / per_minute,
                    scaled_seconds: total % per_minute,
                }
            }
        }
    }

    fn is_zero(&self) -> bool {
        self.lead == 0 && self.minutes == 0 && self.scaled_seconds == 0
    }

    fn render(&self, lead: String) -> String {
        match self.fields {
            Fields::Whole => lead,
            Fields::Minutes => format!("{lead}:{:02}", self.minutes),
            Fields::Seconds => {
                let minutes = self.minutes;
                if self.frac_digits == 0 {
                    format!("{lead}:{minutes:02}:{:02}", self.scaled_seconds)
                } else {
                    let scale = 10u64.pow(self.frac_digits as u32);
                    let whole = self.scaled_seconds / scale;
                    let frac = self.scaled_seconds % scale;
                    format!(
                        "{lead}:{minutes:02}:{whole:02}.{frac:0width$}",
                        width = self.frac_digits
                    )
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hms(fields: Fields) -> HmsFmt {
        HmsFmt {
            fields,
            frac_digits: 2,
        }
    }

    fn dms(fields: Fields) -> DmsFmt {
        DmsFmt {
            fields,
            frac_digits: 1,
        }
    }

    #[test]
    fn test_hms_levels() {
        assert_eq!(hms(Fields::Whole).fmt(180.0), "12");
        assert_eq!(hms(Fields::Minutes).fmt(180.0), "12:00");
        assert_eq!(hms(Fields::Seconds).fmt(180.0), "12:00:00.00");
    }

    #[test]
    fn test_hms_components() {
        // 10h 30m 15.5s
        let deg = (10.0 + 30.0 / 60.0 + 15.5 / 3600.0) * 15.0;
        assert_eq!(hms(Fields::Seconds).fmt(deg), "10:30:15.50");
        assert_eq!(hms(Fields::Minutes).fmt(deg), "10:30");
        assert_eq!(hms(Fields::Whole).fmt(deg), "10");
    }

    #[test]
    fn test_hms_wraps_negative() {
        assert_eq!(hms(Fields::Minutes).fmt(-15.0), "23:00");
        assert_eq!(hms(Fields::Minutes).fmt(375.0), "01:00");
    }

    #[test]
    fn test_hms_rounding_carries() {
        let deg = (11.0 + 59.0 / 60.0 + 59.999 / 3600.0) * 15.0;
        assert_eq!(hms(Fields::Seconds).fmt(deg), "12:00:00.00");
        let almost_midnight = 359.99999999;
        assert_eq!(hms(Fields::Seconds).fmt(almost_midnight), "00:00:00.00");
    }

    #[test]
    fn test_dms_levels() {
        let deg = -(45.0 + 30.0 / 60.0 + 7.26 / 3600.0);
        assert_eq!(dms(Fields::Seconds).fmt(deg), "-45:30:07.3");
        assert_eq!(dms(Fields::Minutes).fmt(deg), "-45:30");
        assert_eq!(dms(Fields::Whole).fmt(deg), "-45");
    }

    #[test]
    fn test_coarse_levels_drop_hidden_fields() {
        // 00h30m
        assert_eq!(hms(Fields::Whole).fmt(7.5), "00");
        assert_eq!(hms(Fields::Minutes).fmt(7.5), "00:30");
        assert_eq!(hms(Fields::Minutes).fmt(359.99999), "23:59");
        assert_eq!(dms(Fields::Whole).fmt(0.6), "+00");
        assert_eq!(dms(Fields::Minutes).fmt(1.0 - 1.0 / 7200.0), "+00:59");
    }

    #[test]
    fn test_coarse_levels_tolerate_boundary_noise() {
        assert_eq!(hms(Fields::Whole).fmt(45.0 - 1e-10), "03");
        assert_eq!(dms(Fields::Minutes).fmt(0.3 - 1e-12), "+00:18");
        assert_eq!(dms(Fields::Whole).fmt(-(2.0 - 1e-12)), "-02");
    }

    #[test]
    fn test_dms_positive_sign_and_padding() {
        assert_eq!(dms(Fields::Minutes).fmt(5.5), "+05:30");
        assert_eq!(dms(Fields::Whole).fmt(0.0), "+00");
    }

    #[test]
    fn test_dms_negative_zero_after_rounding() {
        assert_eq!(dms(Fields::Minutes).fmt(-0.0001), "+00:00");
    }

    #[test]
    fn test_seconds_without_fraction() {
        let fmt = DmsFmt {
            fields: Fields::Seconds,
            frac_digits: 0,
        };
        assert_eq!(fmt.fmt(1.0 + 1.0 / 3600.0), "+01:00:01");
    }

    #[test]
    fn test_non_finite_is_empty() {
        assert_eq!(hms(Fields::Seconds).fmt(f64::NAN), "");
        assert_eq!(dms(Fields::Seconds).fmt(f64::INFINITY), "");
        assert_eq!(format_decimal_degrees(f64::NAN, 2, true), "");
    }

    #[test]
    fn test_fields_ordering() {
        assert!(Fields::Whole < Fields::Minutes);
        assert!(Fields::Minutes < Fields::Seconds);
        assert_eq!(Fields::Seconds.count(), 3);
    }
}
