//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a f64 and clamp it to the i32 range, returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f64>(i32::MIN).unwrap_or(f64::MIN);
    let max = cast::<i32, f64>(i32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).round();
    cast::<f64, i32>(clamped).unwrap_or(0)
}

/// Ratio of a pool value against its capacity, clamped to `[0, 1]`.
///
/// A non-positive capacity yields 0.0 so tier lookups stay total.
#[must_use]
pub fn pool_ratio(value: i32, max: i32) -> f64 {
    if max <= 0 {
        return 0.0;
    }
    let clamped = value.clamp(0, max);
    f64::from(clamped) / f64::from(max)
}

/// Scale a 0-100 percentage onto an absolute pool capacity.
#[must_use]
pub fn pool_from_pct(pct: i32, capacity: i32) -> i32 {
    let pct = pct.clamp(0, 100);
    round_f64_to_i32(f64::from(pct) / 100.0 * f64::from(capacity.max(0)))
}

/// Convert an absolute pool value back to a 0-100 percentage.
///
/// Exact inverse of [`pool_from_pct`] modulo rounding.
#[must_use]
pub fn pct_from_pool(value: i32, capacity: i32) -> i32 {
    if capacity <= 0 {
        return 0;
    }
    let clamped = value.clamp(0, capacity);
    round_f64_to_i32(f64::from(clamped) * 100.0 / f64::from(capacity)).clamp(0, 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_handles_nan() {
        assert_eq!(round_f64_to_i32(f64::NAN), 0);
        assert_eq!(round_f64_to_i32(2.5), 3);
        assert_eq!(round_f64_to_i32(-2.5), -3);
    }

    #[test]
    fn pool_ratio_clamps_inputs() {
        assert!((pool_ratio(50, 100) - 0.5).abs() < f64::EPSILON);
        assert!((pool_ratio(150, 100) - 1.0).abs() < f64::EPSILON);
        assert!((pool_ratio(-3, 100)).abs() < f64::EPSILON);
        assert!((pool_ratio(10, 0)).abs() < f64::EPSILON);
    }

    #[test]
    fn pct_round_trip_within_one_point() {
        for capacity in [60, 85, 95, 240, 270] {
            for pct in 0..=100 {
                let pool = pool_from_pct(pct, capacity);
                let back = pct_from_pool(pool, capacity);
                assert!(
                    (back - pct).abs() <= 1,
                    "pct {pct} capacity {capacity} came back as {back}"
                );
            }
        }
    }
}
