//! Tolerant comparisons and rounding for geometric quantities.
//!
//! Coordinates extracted from PDF content streams carry floating-point
//! noise, so every comparison in the pipeline goes through these helpers
//! with an explicit tolerance.

/// Round `value` to `prec` decimal places.
pub fn round(value: f64, prec: i32) -> f64 {
    let factor = 10f64.powi(prec);
    (value * factor).round() / factor
}

/// Whether `a` and `b` differ by at most `tolerance`.
pub fn equal(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Whether `a` is larger than `b` by more than `tolerance`.
pub fn larger(a: f64, b: f64, tolerance: f64) -> bool {
    a > b + tolerance
}

/// Whether `a` is smaller than `b` by more than `tolerance`.
pub fn smaller(a: f64, b: f64, tolerance: f64) -> bool {
    a < b - tolerance
}

/// Whether `a` is equal to or larger than `b`, within `tolerance`.
pub fn equal_or_larger(a: f64, b: f64, tolerance: f64) -> bool {
    a >= b - tolerance
}

/// Whether `a` is equal to or smaller than `b`, within `tolerance`.
pub fn equal_or_smaller(a: f64, b: f64, tolerance: f64) -> bool {
    a <= b + tolerance
}

/// Whether `value` lies in `[low, high]`, within `tolerance` on both ends.
pub fn between(value: f64, low: f64, high: f64, tolerance: f64) -> bool {
    equal_or_larger(value, low, tolerance) && equal_or_smaller(value, high, tolerance)
}
