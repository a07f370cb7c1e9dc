//! Out-of-sample revenue forecasts attached to a report.

use crate::core::{Granularity, IndexedAggregate};
use crate::seasonality::aggregator::BucketTotal;
use crate::seasonality::bucketizer::CategoryFilter;
use serde::Serialize;

/// Steps forecast for a single category's weekly revenue.
pub const WEEKLY_FORECAST_STEPS: usize = 5;
/// Steps forecast for week-of-month revenue totals.
pub const WEEK_OF_MONTH_FORECAST_STEPS: usize = 4;

/// Which revenue series is forecast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastSource {
    /// One category's revenue per bucket.
    Category(String),
    /// Revenue per bucket summed over all categories.
    BucketTotals,
}

impl ForecastSource {
    /// Revenue series in bucket order.
    pub fn series(&self, rows: &[IndexedAggregate], totals: &[BucketTotal]) -> Vec<f64> {
        match self {
            ForecastSource::Category(category) => rows
                .iter()
                .filter(|r| &r.category == category)
                .map(|r| r.revenue)
                .collect(),
            ForecastSource::BucketTotals => totals.iter().map(|t| t.revenue).collect(),
        }
    }

    /// Name used in warnings.
    pub fn label(&self) -> &str {
        match self {
            ForecastSource::Category(category) => category,
            ForecastSource::BucketTotals => "bucket totals",
        }
    }
}

/// A forecast request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastTarget {
    pub source: ForecastSource,
    pub steps: usize,
}

impl ForecastTarget {
    pub fn new(source: ForecastSource, steps: usize) -> Self {
        Self { source, steps }
    }

    /// Forecast made by default for an analysis.
    ///
    /// Weekly analyses of one category forecast that category five weeks
    /// ahead; week-of-month analyses forecast the bucket totals four weeks
    /// ahead. Other analyses make none.
    pub fn for_analysis(granularity: Granularity, filter: &CategoryFilter) -> Option<Self> {
        match (granularity, filter) {
            (Granularity::Week, CategoryFilter::Only(category)) => Some(Self::new(
                ForecastSource::Category(category.clone()),
                WEEKLY_FORECAST_STEPS,
            )),
            (Granularity::WeekOfMonth, _) => Some(Self::new(
                ForecastSource::BucketTotals,
                WEEK_OF_MONTH_FORECAST_STEPS,
            )),
            _ => None,
        }
    }
}

/// Whether and what to forecast.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ForecastMode {
    /// [`ForecastTarget::for_analysis`].
    #[default]
    Auto,
    Disabled,
    Target(ForecastTarget),
}

/// Point forecasts for the buckets after the last observed one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueForecast {
    pub source: ForecastSource,
    /// Length of the series the model was fitted on.
    pub history: usize,
    pub values: Vec<f64>,
}
