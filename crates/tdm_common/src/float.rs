//! Tolerant floating-point comparison for arrival times and multiplier sums.
//!
//! Arrival times are sums of edge delays accumulated in level order. Two
//! sums describing the same path can differ in the last bits, so equality
//! tests on them go through [`nearly_equal`].

/// Relative tolerance applied to arrival-time comparisons.
pub const TIME_EPSILON: f64 = 1e-9;

/// Returns `true` if `a` and `b` differ by at most `eps · max(1, |a|, |b|)`.
pub fn nearly_equal(a: f64, b: f64, eps: f64) -> bool {
    if a == b {
        return true;
    }
    let scale = 1.0_f64.max(a.abs()).max(b.abs());
    (a - b).abs() <= eps * scale
}
