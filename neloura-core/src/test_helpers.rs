//! Float comparison helpers shared by the workspace test suites.

#[track_caller]
pub fn assert_close_within(a: f64, b: f64, tol: f64, ctx: &str) {
    assert!(
        a.is_finite() && b.is_finite(),
        "non-finite value in {}: a={} b={}",
        ctx,
        a,
        b
    );
    let diff = (a - b).abs();
    assert!(
        diff <= tol,
        "{}: |{} - {}| = {:e} exceeds {:e}",
        ctx,
        a,
        b,
        diff,
        tol
    );
}

#[macro_export]
macro_rules! assert_close {
    ($a:expr, $b:expr, $tol:expr) => {
        $crate::test_helpers::assert_close_within(
            $a,
            $b,
            $tol,
            &format!(
                "closeness check failed: {} vs {} (tol={})",
                stringify!($a),
                stringify!($b),
                $tol
            ),
        )
    };
    ($a:expr, $b:expr, $tol:expr, $($arg:tt)*) => {
        $crate::test_helpers::assert_close_within($a, $b, $tol, &format!($($arg)*))
    };
}
