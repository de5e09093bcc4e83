//! Tick step selection and label formatting.

use neloura_core::angle::{format_decimal_degrees, wrap_ra_degrees, DmsFmt, Fields, HmsFmt};

use crate::settings::LabelMode;

/// Smallest step ever returned by [`choose_step`], degrees.
pub const MIN_STEP_DEG: f64 = 1e-6;
pub const DEFAULT_TARGET_TICKS: usize = 5;
const MAX_DECIMALS: i32 = 6;

/// Picks a 1-2-5 step so that roughly `target` ticks cover `span` degrees.
///
/// ```
/// use neloura_overlay::ticks::choose_step;
///
/// assert_eq!(choose_step(1.0, 5), 0.2);
/// assert_eq!(choose_step(30.0, 5), 10.0);
/// ```
pub fn choose_step(span: f64, target: usize) -> f64 {
    let raw = span.abs() / target.max(1) as f64;
    if !raw.is_finite() || raw <= 0.0 {
        return MIN_STEP_DEG;
    }
    let exp = raw.log10().floor() as i32;
    let base = 10f64.powi(exp);
    let frac = raw / base;
    let nice = if frac <= 1.0 {
        1.0
    } else if frac <= 2.0 {
        2.0
    } else if frac <= 5.0 {
        5.0
    } else {
        10.0
    };
    (nice * base).max(MIN_STEP_DEG)
}

/// Sexagesimal RA fields warranted by a step in degrees.
pub fn ra_fields(step: f64) -> Fields {
    if step <= 0.01 {
        Fields::Seconds
    } else if step <= 0.25 {
        Fields::Minutes
    } else {
        Fields::Whole
    }
}

/// Sexagesimal Dec fields warranted by a step in degrees.
pub fn dec_fields(step: f64) -> Fields {
    if step <= 1.0 / 60.0 {
        Fields::Seconds
    } else if step <= 1.0 {
        Fields::Minutes
    } else {
        Fields::Whole
    }
}

pub fn format_ra(deg: f64, step: f64) -> String {
    HmsFmt {
        fields: ra_fields(step),
        frac_digits: 2,
    }
    .fmt(deg)
}

pub fn format_dec(deg: f64, step: f64) -> String {
    DmsFmt {
        fields: dec_fields(step),
        frac_digits: 1,
    }
    .fmt(deg)
}

/// `clamp(-floor(log10(step)), 0, 6)`.
pub fn decimals_for_step(step: f64) -> usize {
    if !step.is_finite() || step <= 0.0 {
        return MAX_DECIMALS as usize;
    }
    (-(step.log10().floor() as i32)).clamp(0, MAX_DECIMALS) as usize
}

pub fn format_ra_degrees(deg: f64, step: f64) -> String {
    format_decimal_degrees(wrap_ra_degrees(deg), decimals_for_step(step), false)
}

pub fn format_dec_degrees(deg: f64, step: f64) -> String {
    format_decimal_degrees(deg, decimals_for_step(step), true)
}

/// Step and label policy shared by both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPlanner {
    pub mode: LabelMode,
    pub target_ticks: usize,
}

impl Default for TickPlanner {
    fn default() -> Self {
        Self {
            mode: LabelMode::Sexagesimal,
            target_ticks: DEFAULT_TARGET_TICKS,
        }
    }
}

impl TickPlanner {
    pub fn new(mode: LabelMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn step(&self, span: f64) -> f64 {
        choose_step(span, self.target_ticks)
    }

    pub fn ra_label(&self, deg: f64, step: f64) -> String {
        match self.mode {
            LabelMode::Sexagesimal => format_ra(deg, step),
            LabelMode::Degrees => format_ra_degrees(deg, step),
        }
    }

    pub fn dec_label(&self, deg: f64, step: f64) -> String {
        match self.mode {
            LabelMode::Sexagesimal => format_dec(deg, step),
            LabelMode::Degrees => format_dec_degrees(deg, step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_step_buckets() {
        assert_eq!(choose_step(1.0, 5), 0.2);
        assert_eq!(choose_step(0.5, 5), 0.1);
        assert_eq!(choose_step(2.4, 5), 0.5);
        assert_eq!(choose_step(40.0, 5), 10.0);
        assert_eq!(choose_step(-1.0, 5), 0.2);
    }

    #[test]
    fn test_choose_step_degenerate() {
        assert_eq!(choose_step(0.0, 5), MIN_STEP_DEG);
        assert_eq!(choose_step(f64::NAN, 5), MIN_STEP_DEG);
        assert_eq!(choose_step(1e-9, 5), MIN_STEP_DEG);
    }

    #[test]
    fn test_choose_step_monotonic() {
        let mut previous = 0.0;
        let mut span = 1e-7;
        while span < 720.0 {
            let step = choose_step(span, 5);
            assert!(step >= previous, "span {span}: {step} < {previous}");
            previous = step;
            span *= 1.037;
        }
    }

    #[test]
    fn test_format_ra_scenario() {
        assert_eq!(format_ra(180.0, 0.25), "12:00");
    }

    #[test]
    fn test_label_precision_follows_step() {
        assert_eq!(format_ra(180.0, 0.005).matches(':').count(), 2);
        assert_eq!(format_ra(180.0, 5.0), "12");
        assert_eq!(format_dec(-30.5, 0.01), "-30:30:00.0");
        assert_eq!(format_dec(-30.5, 0.5), "-30:30");
        assert_eq!(format_dec(45.0, 5.0), "+45");
        assert_eq!(format_ra(7.5, 0.5), "00");
        assert_eq!(format_dec(0.6, 5.0), "+00");

        let mut previous = Fields::Seconds;
        for step in [0.001, 0.01, 0.02, 0.25, 0.3, 1.0, 2.0, 10.0] {
            let fields = ra_fields(step).min(dec_fields(step));
            assert!(fields <= previous);
            previous = fields;
        }
    }

    #[test]
    fn test_decimal_mode() {
        assert_eq!(decimals_for_step(0.2), 1);
        assert_eq!(decimals_for_step(0.005), 3);
        assert_eq!(decimals_for_step(10.0), 0);
        assert_eq!(decimals_for_step(1e-9), 6);
        assert_eq!(format_ra_degrees(-10.0, 0.5), "350.0");
        assert_eq!(format_dec_degrees(12.34, 0.05), "+12.34");
        assert_eq!(format_dec_degrees(-2.0, 1.0), "-2");
    }

    #[test]
    fn test_planner_modes() {
        let sexagesimal = TickPlanner::default();
        assert_eq!(sexagesimal.ra_label(180.0, 0.25), "12:00");
        let degrees = TickPlanner::new(LabelMode::Degrees);
        assert_eq!(degrees.ra_label(180.0, 0.25), "180.0");
        assert_eq!(degrees.dec_label(-5.0, 2.0), "-5");
        assert_eq!(degrees.step(1.0), 0.2);
    }
}
