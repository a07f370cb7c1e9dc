//! Differencing utilities for ARIMA models.

/// Apply differencing `d` times.
///
/// Each pass shortens the series by one; a series with a single value
/// is returned unchanged.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            break;
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Whether every value of `series` equals the first within `tolerance`.
pub fn is_constant(series: &[f64], tolerance: f64) -> bool {
    match series.first() {
        Some(&first) => series.iter().all(|v| (v - first).abs() <= tolerance),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difference_order_0() {
        let series = vec![1.0, 2.0, 3.0];
        assert_eq!(difference(&series, 0), series);
    }

    #[test]
    fn difference_order_1() {
        let series = vec![1.0, 3.0, 6.0, 10.0, 15.0];
        assert_eq!(difference(&series, 1), vec![2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn difference_order_2() {
        let series = vec![1.0, 3.0, 6.0, 10.0, 15.0];
        assert_eq!(difference(&series, 2), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn difference_short_series() {
        assert!(difference(&[], 1).is_empty());
        assert_eq!(difference(&[4.0], 1), vec![4.0]);
    }

    #[test]
    fn constant_detection() {
        assert!(is_constant(&[0.0, 0.0, 0.0], 0.0));
        assert!(is_constant(&[2.0, 2.0 + 1e-14], 1e-12));
        assert!(!is_constant(&[1.0, 2.0], 1e-12));
        assert!(is_constant(&[], 0.0));
    }
}
