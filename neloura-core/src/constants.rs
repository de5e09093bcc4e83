pub const PI: f64 = core::f64::consts::PI;

pub const HALF_PI: f64 = core::f64::consts::FRAC_PI_2;

pub const DEG_TO_RAD: f64 = PI / 180.0;

pub const RAD_TO_DEG: f64 = 180.0 / PI;

pub const FULL_TURN_DEG: f64 = 360.0;

pub const HALF_TURN_DEG: f64 = 180.0;

/// One hour of right ascension spans 15 degrees.
pub const DEGREES_PER_HOUR: f64 = 15.0;

/// Sexagesimal minutes in one hour or one degree.
pub const MINUTES_PER_UNIT: f64 = 60.0;

pub const SECONDS_PER_UNIT: f64 = 3600.0;
