//! Statistical utility functions.

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Round to `decimals` places, ties to even.
///
/// Ties are judged on the scaled binary value, so `2.675` (stored just
/// below the tie) still rounds down to `2.67`.
///
/// # Example
/// ```
/// use seasonality_index::utils::stats::round_to;
///
/// assert_eq!(round_to(12.3456, 2), 12.35);
/// assert_eq!(round_to(-0.004, 2), 0.0);
/// assert_eq!(round_to(0.125, 2), 0.12);
/// ```
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round_ties_even() / factor;
    // Normalise -0.0 so equality checks against 0.0 behave.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Largest absolute value in the slice, ignoring non-finite entries.
pub fn max_abs(values: &[f64]) -> f64 {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold(0.0, |acc: f64, v| acc.max(v.abs()))
}
