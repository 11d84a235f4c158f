//! Linear range mapping and the log-lux helpers shared by the estimator and
//! the planner.
//!
//! All transcendental functions go through `libm`, so this module works the
//! same on the target and on the host.

/// Smallest illuminance fed into a logarithm. Readings at or below zero are
/// floored to this value.
pub const LUX_EPSILON: f32 = 1.0e-6;

/// Map `x` linearly from `[in_lo, in_hi]` onto `[out_lo, out_hi]`.
///
/// No clamping is performed: inputs outside the input range extrapolate.
/// Callers clamp explicitly (see [`map_clamped`]).
pub fn map_range(x: f32, in_lo: f32, in_hi: f32, out_lo: f32, out_hi: f32) -> f32 {
    (x - in_lo) / (in_hi - in_lo) * (out_hi - out_lo) + out_lo
}

/// Inverse of [`map_range`]: takes a value in the output range back into the
/// input range.
pub fn unmap_range(y: f32, in_lo: f32, in_hi: f32, out_lo: f32, out_hi: f32) -> f32 {
    map_range(y, out_lo, out_hi, in_lo, in_hi)
}

/// [`map_range`] followed by a clamp to the output range.
///
/// Reversed output ranges (`out_lo > out_hi`) are clamped to the same span.
pub fn map_clamped(x: f32, in_lo: f32, in_hi: f32, out_lo: f32, out_hi: f32) -> f32 {
    clamp(map_range(x, in_lo, in_hi, out_lo, out_hi), out_lo, out_hi)
}

/// Clamp `x` into the span between `a` and `b`, whichever order they come in.
///
/// Unlike `f32::clamp` this never panics; a NaN input stays NaN.
pub fn clamp(x: f32, a: f32, b: f32) -> f32 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if x < lo {
        lo
    } else if x > hi {
        hi
    } else {
        x
    }
}

/// Base-10 logarithm of an illuminance, with non-positive input floored at
/// [`LUX_EPSILON`].
pub fn log_lux(lux: f32) -> f32 {
    let lux = if lux > LUX_EPSILON { lux } else { LUX_EPSILON };
    libm::log10f(lux)
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_close {
        ($left:expr, $right:expr) => {{
            let (l, r): (f32, f32) = ($left, $right);
            assert!((l - r).abs() < 1e-3, "{} is not close to {}", l, r);
        }};
    }

    #[test]
    fn test_map_range_endpoints() {
        assert_close!(map_range(0.0, 0.0, 10.0, 5.0, 50.0), 5.0);
        assert_close!(map_range(10.0, 0.0, 10.0, 5.0, 50.0), 50.0);
        assert_close!(map_range(5.0, 0.0, 10.0, 5.0, 50.0), 27.5);
    }

    #[test]
    fn test_map_range_extrapolates() {
        assert_close!(map_range(20.0, 0.0, 10.0, 0.0, 1.0), 2.0);
        assert_close!(map_range(-10.0, 0.0, 10.0, 0.0, 1.0), -1.0);
    }

    #[test]
    fn test_map_clamped() {
        assert_close!(map_clamped(20.0, 0.0, 10.0, 0.0, 1.0), 1.0);
        assert_close!(map_clamped(-10.0, 0.0, 10.0, 0.0, 1.0), 0.0);
        // Reversed output range
        assert_close!(map_clamped(20.0, 0.0, 10.0, 1.0, 0.0), 0.0);
        assert_close!(map_clamped(-10.0, 0.0, 10.0, 1.0, 0.0), 1.0);
    }

    #[test]
    fn test_clamp_nan() {
        assert!(clamp(f32::NAN, 0.0, 1.0).is_nan());
    }

    #[test]
    fn test_log_lux() {
        assert_close!(log_lux(1.0), 0.0);
        assert_close!(log_lux(10_000.0), 4.0);
        assert_close!(log_lux(0.0), -6.0);
        assert_close!(log_lux(-3.0), -6.0);
    }

    #[test]
    fn test_round_trip() {
        for x in [0.5_f32, 1.0, 123.4, 9_999.0] {
            let y = map_range(x, 0.0, 10_000.0, 200.0, 500.0);
            assert_close!(unmap_range(y, 0.0, 10_000.0, 200.0, 500.0), x);
        }
    }

    mod props {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn round_trip_inside_domain(x in 0.0f32..10_000.0) {
                let y = map_range(x, 0.0, 10_000.0, 100.0, 200.0);
                let back = unmap_range(y, 0.0, 10_000.0, 100.0, 200.0);
                prop_assert!((back - x).abs() <= 1e-2 + x.abs() * 1e-5);
            }

            #[test]
            fn clamped_stays_in_range(x in -1.0e6f32..1.0e6) {
                let y = map_clamped(x, 0.0, 10_000.0, 5.0, 50.0);
                prop_assert!((5.0..=50.0).contains(&y));
            }
        }
    }
}
