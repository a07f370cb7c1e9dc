//! Seasonality index pipeline.
//!
//! Stages, in data-flow order:
//! - [`Bucketizer`]: filter listing rows and assign time buckets
//! - [`aggregate`]: revenue and count per (category, bucket)
//! - [`SeasonalityEstimator`]: per-category index with flat fallback
//! - [`GrowthPolicy`]: growth percentage per bucket
//! - [`ResultMatrix`]: category × bucket pivot
//! - [`RevenueForecast`]: optional ARIMA point forecast of one series
//!
//! [`SeasonalityAnalyzer`] runs all of them for one [`AnalysisConfig`].

mod aggregator;
mod bucketizer;
mod estimator;
mod forecast;
mod growth;
mod matrix;
mod pipeline;

pub use aggregator::{aggregate, bucket_totals, partition, BucketTotal, CategorySeries};
pub use bucketizer::{BucketedRecord, Bucketized, Bucketizer, CategoryFilter};
pub use estimator::{
    CategoryIndex, EstimatorConfig, FallbackReason, IndexPolicy, SeasonalityEstimator,
    SeriesOutcome,
};
pub use forecast::{
    ForecastMode, ForecastSource, ForecastTarget, RevenueForecast, WEEKLY_FORECAST_STEPS,
    WEEK_OF_MONTH_FORECAST_STEPS,
};
pub use growth::{index_centered, period_over_period, GrowthPolicy};
pub use matrix::ResultMatrix;
pub use pipeline::{analyze, AnalysisConfig, SeasonalityAnalyzer, SeasonalityReport};
