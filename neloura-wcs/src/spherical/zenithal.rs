use neloura_core::angle::wrap_pm180;
use neloura_core::constants::{DEG_TO_RAD, HALF_PI, RAD_TO_DEG};

use crate::coordinate::{IntermediateCoord, NativeCoord};
use crate::error::{WcsError, WcsResult};

#[inline]
pub(crate) fn asin_safe(sin_value: f64) -> f64 {
    sin_value.clamp(-1.0, 1.0).asin()
}

#[inline]
fn pole_native_coord() -> NativeCoord {
    NativeCoord::new(0.0, 90.0)
}

#[inline]
fn radial_to_intermediate(r_theta: f64, phi_rad: f64) -> IntermediateCoord {
    let (ps, pc) = phi_rad.sin_cos();
    IntermediateCoord::new(r_theta * ps * RAD_TO_DEG, -r_theta * pc * RAD_TO_DEG)
}

#[inline]
pub(crate) fn native_coord_from_radians(phi_rad: f64, theta_rad: f64) -> NativeCoord {
    NativeCoord::new(wrap_pm180(phi_rad * RAD_TO_DEG), theta_rad * RAD_TO_DEG)
}

/// Splits an intermediate position into `(phi, R_theta, is_pole)`, radians.
#[inline]
fn intermediate_to_polar(inter: IntermediateCoord) -> (f64, f64, bool) {
    let x = inter.x_deg() * DEG_TO_RAD;
    let y = inter.y_deg() * DEG_TO_RAD;
    let r_theta = x.hypot(y);
    let is_pole = r_theta == 0.0;
    let phi_rad = if is_pole { 0.0 } else { x.atan2(-y) };
    (phi_rad, r_theta, is_pole)
}

fn native_radians(native: NativeCoord) -> (f64, f64) {
    (native.phi_deg() * DEG_TO_RAD, native.theta_deg() * DEG_TO_RAD)
}

pub(crate) fn project_tan(native: NativeCoord) -> WcsResult<IntermediateCoord> {
    let (phi, theta) = native_radians(native);

    if theta == HALF_PI {
        return Ok(IntermediateCoord::new(0.0, 0.0));
    }
    if theta <= 0.0 {
        return Err(WcsError::singularity(
            "TAN projection undefined at theta <= 0",
        ));
    }
    let (rt_sin, rt_cos) = theta.sin_cos();
    Ok(radial_to_intermediate(rt_cos / rt_sin, phi))
}

pub(crate) fn deproject_tan(inter: IntermediateCoord) -> WcsResult<NativeCoord> {
    let (phi, r_theta, is_pole) = intermediate_to_polar(inter);
    if is_pole {
        return Ok(pole_native_coord());
    }
    let theta = 1.0_f64.atan2(r_theta);
    Ok(native_coord_from_radians(phi, theta))
}

pub(crate) fn project_sin(native: NativeCoord, xi: f64, eta: f64) -> WcsResult<IntermediateCoord> {
    let (phi, theta) = native_radians(native);

    if theta == HALF_PI {
        return Ok(IntermediateCoord::new(0.0, 0.0));
    }
    if theta < 0.0 && xi == 0.0 && eta == 0.0 {
        return Err(WcsError::out_of_bounds(
            "SIN projection undefined on the far hemisphere",
        ));
    }

    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();

    let x = (cos_theta * sin_phi + xi * (1.0 - sin_theta)) * RAD_TO_DEG;
    let y = -(cos_theta * cos_phi - eta * (1.0 - sin_theta)) * RAD_TO_DEG;
    Ok(IntermediateCoord::new(x, y))
}

pub(crate) fn deproject_sin(inter: IntermediateCoord, xi: f64, eta: f64) -> WcsResult<NativeCoord> {
    let x = inter.x_deg() * DEG_TO_RAD;
    let y = inter.y_deg() * DEG_TO_RAD;

    let a = xi * xi + eta * eta + 1.0;
    let b = xi * (x - xi) + eta * (y - eta);
    let c = (x - xi) * (x - xi) + (y - eta) * (y - eta) - 1.0;

    let discriminant = b * b - a * c;
    if discriminant < 0.0 {
        return Err(WcsError::out_of_bounds(
            "Point outside SIN projection boundary",
        ));
    }

    let sin_theta = (-b + discriminant.sqrt()) / a;
    if sin_theta.abs() > 1.0 {
        return Err(WcsError::out_of_bounds("Invalid theta in SIN deprojection"));
    }

    let theta = sin_theta.asin();
    let x_adj = x - xi * (1.0 - sin_theta);
    let y_adj = y - eta * (1.0 - sin_theta);
    let phi = x_adj.atan2(-y_adj);

    Ok(native_coord_from_radians(phi, theta))
}

pub(crate) fn project_arc(native: NativeCoord) -> WcsResult<IntermediateCoord> {
    let (phi, theta) = native_radians(native);
    Ok(radial_to_intermediate(HALF_PI - theta, phi))
}

pub(crate) fn deproject_arc(inter: IntermediateCoord) -> WcsResult<NativeCoord> {
    let (phi, r_theta, is_pole) = intermediate_to_polar(inter);
    if is_pole {
        return Ok(pole_native_coord());
    }
    if r_theta > core::f64::consts::PI {
        return Err(WcsError::out_of_bounds("ARC radius exceeds 180 degrees"));
    }
    Ok(native_coord_from_radians(phi, HALF_PI - r_theta))
}

pub(crate) fn project_stg(native: NativeCoord) -> WcsResult<IntermediateCoord> {
    let (phi, theta) = native_radians(native);
    let (sin_theta, cos_theta) = theta.sin_cos();
    let denom = 1.0 + sin_theta;
    if denom.abs() < 1e-15 {
        return Err(WcsError::singularity("STG projection undefined at theta = -90"));
    }
    Ok(radial_to_intermediate(2.0 * cos_theta / denom, phi))
}

pub(crate) fn deproject_stg(inter: IntermediateCoord) -> WcsResult<NativeCoord> {
    let (phi, r_theta, is_pole) = intermediate_to_polar(inter);
    if is_pole {
        return Ok(pole_native_coord());
    }
    let theta = HALF_PI - 2.0 * (r_theta / 2.0).atan();
    Ok(native_coord_from_radians(phi, theta))
}

pub(crate) fn project_zea(native: NativeCoord) -> WcsResult<IntermediateCoord> {
    let (phi, theta) = native_radians(native);
    let r_theta = (2.0 * (1.0 - theta.sin())).max(0.0).sqrt();
    Ok(radial_to_intermediate(r_theta, phi))
}

pub(crate) fn deproject_zea(inter: IntermediateCoord) -> WcsResult<NativeCoord> {
    let (phi, r_theta, is_pole) = intermediate_to_polar(inter);
    if is_pole {
        return Ok(pole_native_coord());
    }
    let half = r_theta / 2.0;
    if half > 1.0 + 1e-12 {
        return Err(WcsError::out_of_bounds("Point outside ZEA projection boundary"));
    }
    let theta = HALF_PI - 2.0 * asin_safe(half);
    Ok(native_coord_from_radians(phi, theta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spherical::Projection;
    use neloura_core::assert_close;

    fn assert_roundtrip(proj: Projection, phi: f64, theta: f64) {
        let original = NativeCoord::new(phi, theta);
        let inter = proj.project(original).unwrap();
        let recovered = proj.deproject(inter).unwrap();
        assert_close!(original.phi_deg(), recovered.phi_deg(), 1e-9, "{:?} phi", proj);
        assert_close!(original.theta_deg(), recovered.theta_deg(), 1e-9, "{:?} theta", proj);
    }

    #[test]
    fn test_reference_point_maps_to_origin() {
        for proj in [
            Projection::tan(),
            Projection::sin(),
            Projection::arc(),
            Projection::stg(),
            Projection::zea(),
        ] {
            let inter = proj.project(NativeCoord::new(0.0, 90.0)).unwrap();
            assert_close!(inter.x_deg(), 0.0, 1e-12, "{:?} x", proj);
            assert_close!(inter.y_deg(), 0.0, 1e-12, "{:?} y", proj);
        }
    }

    #[test]
    fn test_roundtrips() {
        assert_roundtrip(Projection::tan(), 45.0, 80.0);
        assert_roundtrip(Projection::sin(), 30.0, 60.0);
        assert_roundtrip(Projection::sin_with_params(0.1, -0.05), 30.0, 60.0);
        assert_roundtrip(Projection::arc(), -120.0, 10.0);
        assert_roundtrip(Projection::stg(), 170.0, -20.0);
        assert_roundtrip(Projection::zea(), -45.0, -60.0);
    }

    #[test]
    fn test_tan_singularity() {
        let result = Projection::tan().project(NativeCoord::new(0.0, 0.0));
        assert!(matches!(result, Err(WcsError::Singularity { .. })));
    }

    #[test]
    fn test_sin_outside_disk() {
        let result = Projection::sin().deproject(IntermediateCoord::new(60.0, 60.0));
        assert!(matches!(result, Err(WcsError::OutOfBounds { .. })));
    }

    #[test]
    fn test_arc_known_value() {
        let inter = Projection::arc().project(NativeCoord::new(0.0, 0.0)).unwrap();
        assert_close!(inter.x_deg(), 0.0, 1e-12);
        assert_close!(inter.y_deg(), -90.0, 1e-12);
    }
}
