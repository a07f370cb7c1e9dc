//! Growth percentages derived from the index or from revenue.

use crate::core::Granularity;
use crate::utils::stats::round_to;
use serde::{Deserialize, Serialize};

/// How `growth_pct` is computed for a category's buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthPolicy {
    /// `round((index - 1) * 100, 2)`: deviation from the category's own baseline.
    IndexCentered,
    /// Revenue change relative to the previous observed bucket, in percent.
    PeriodOverPeriod,
}

impl GrowthPolicy {
    /// Policy used for a granularity unless overridden.
    ///
    /// Monthly analyses report month-over-month change.
    pub fn for_granularity(granularity: Granularity) -> Self {
        match granularity {
            Granularity::Month => GrowthPolicy::PeriodOverPeriod,
            _ => GrowthPolicy::IndexCentered,
        }
    }

    /// Growth for one category. `revenue` and `index` are in bucket order
    /// and have equal length.
    pub fn apply(&self, revenue: &[f64], index: &[f64]) -> Vec<f64> {
        match self {
            GrowthPolicy::IndexCentered => index_centered(index),
            GrowthPolicy::PeriodOverPeriod => period_over_period(revenue),
        }
    }
}

/// `round((index - 1) * 100, 2)` for every value.
pub fn index_centered(index: &[f64]) -> Vec<f64> {
    index
        .iter()
        .map(|&i| round_to((i - 1.0) * 100.0, 2))
        .collect()
}

/// Percentage change from the previous value.
///
/// The first value and any value following a zero get 0.0.
pub fn period_over_period(revenue: &[f64]) -> Vec<f64> {
    let mut growth = Vec::with_capacity(revenue.len());
    let mut previous: Option<f64> = None;
    for &current in revenue {
        let pct = match previous {
            Some(prev) if prev != 0.0 => (current - prev) / prev * 100.0,
            _ => 0.0,
        };
        growth.push(pct);
        previous = Some(current);
    }
    growth
}
