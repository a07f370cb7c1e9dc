//! End-to-end seasonality analysis for one granularity.

use crate::core::{Bucket, Granularity, IndexedAggregate, TransactionRecord, LISTING_TYPE};
use crate::error::{Result, SeasonalityError};
use crate::seasonality::aggregator::{aggregate, bucket_totals, partition, BucketTotal};
use crate::seasonality::bucketizer::{Bucketizer, CategoryFilter};
use crate::seasonality::estimator::{
    CategoryIndex, EstimatorConfig, IndexPolicy, SeasonalityEstimator, SeriesOutcome,
};
use crate::seasonality::forecast::{ForecastMode, ForecastTarget, RevenueForecast};
use crate::seasonality::growth::GrowthPolicy;
use crate::seasonality::matrix::ResultMatrix;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Parameters of one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub granularity: Granularity,
    pub category_filter: CategoryFilter,
    /// Restrict rows to one bucket of any granularity (e.g. a single month).
    pub bucket_filter: Option<Bucket>,
    /// Transaction-type tag of the rows to analyse.
    pub listing_type: String,
    /// Overrides [`IndexPolicy::for_granularity`].
    pub index_policy: Option<IndexPolicy>,
    /// Overrides [`GrowthPolicy::for_granularity`].
    pub growth_policy: Option<GrowthPolicy>,
    pub estimator: EstimatorConfig,
    /// Out-of-sample revenue forecast.
    pub forecast: ForecastMode,
    /// Fit categories on the rayon thread pool.
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::new(Granularity::Month)
    }
}

impl AnalysisConfig {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            category_filter: CategoryFilter::All,
            bucket_filter: None,
            listing_type: LISTING_TYPE.to_string(),
            index_policy: None,
            growth_policy: None,
            estimator: EstimatorConfig::default(),
            forecast: ForecastMode::Auto,
            parallel: false,
        }
    }

    pub fn with_category(mut self, filter: CategoryFilter) -> Self {
        self.category_filter = filter;
        self
    }

    pub fn with_bucket_filter(mut self, bucket: Bucket) -> Self {
        self.bucket_filter = Some(bucket);
        self
    }

    pub fn with_index_policy(mut self, policy: IndexPolicy) -> Self {
        self.index_policy = Some(policy);
        self
    }

    pub fn with_growth_policy(mut self, policy: GrowthPolicy) -> Self {
        self.growth_policy = Some(policy);
        self
    }

    pub fn with_forecast(mut self, target: ForecastTarget) -> Self {
        self.forecast = ForecastMode::Target(target);
        self
    }

    pub fn without_forecast(mut self) -> Self {
        self.forecast = ForecastMode::Disabled;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn index_policy(&self) -> IndexPolicy {
        self.index_policy
            .unwrap_or_else(|| IndexPolicy::for_granularity(self.granularity))
    }

    pub fn growth_policy(&self) -> GrowthPolicy {
        self.growth_policy
            .unwrap_or_else(|| GrowthPolicy::for_granularity(self.granularity))
    }

    /// Forecast to run, if any.
    pub fn forecast_target(&self) -> Option<ForecastTarget> {
        match &self.forecast {
            ForecastMode::Auto => {
                ForecastTarget::for_analysis(self.granularity, &self.category_filter)
            }
            ForecastMode::Disabled => None,
            ForecastMode::Target(target) => Some(target.clone()),
        }
    }

    /// Reject configurations that cannot produce a meaningful report.
    pub fn validate(&self) -> Result<()> {
        if self.listing_type.trim().is_empty() {
            return Err(SeasonalityError::InvalidParameter(
                "listing type must not be empty".to_string(),
            ));
        }
        let threshold = self.estimator.degenerate_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(SeasonalityError::InvalidParameter(format!(
                "degenerate threshold must be a non-negative number, got {threshold}"
            )));
        }
        let spec = self.estimator.spec;
        if spec.d == 0 && spec.p == 0 && spec.q == 0 {
            return Err(SeasonalityError::InvalidParameter(
                "model order (0, 0, 0) has nothing to fit".to_string(),
            ));
        }
        if self.estimator.optimizer.max_iter == 0 {
            return Err(SeasonalityError::InvalidParameter(
                "optimizer max_iter must be positive".to_string(),
            ));
        }
        if let ForecastMode::Target(target) = &self.forecast {
            if target.steps == 0 {
                return Err(SeasonalityError::InvalidParameter(
                    "forecast steps must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Everything one analysis run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalityReport {
    pub granularity: Granularity,
    pub index_policy: IndexPolicy,
    pub growth_policy: GrowthPolicy,
    /// Long-form table sorted by category, then bucket.
    pub rows: Vec<IndexedAggregate>,
    pub matrix: ResultMatrix,
    /// Revenue per bucket across all categories.
    pub bucket_totals: Vec<BucketTotal>,
    /// Per-category index outcome.
    pub outcomes: BTreeMap<String, SeriesOutcome>,
    /// Present when a forecast was requested and could be made.
    pub forecast: Option<RevenueForecast>,
    /// Non-fatal problems: invalid timestamps and failed fits.
    pub warnings: Vec<SeasonalityError>,
}

impl SeasonalityReport {
    fn empty(config: &AnalysisConfig, warnings: Vec<SeasonalityError>) -> Self {
        Self {
            granularity: config.granularity,
            index_policy: config.index_policy(),
            growth_policy: config.growth_policy(),
            rows: vec![],
            matrix: ResultMatrix::from_indexed(&[]),
            bucket_totals: vec![],
            outcomes: BTreeMap::new(),
            forecast: None,
            warnings,
        }
    }

    /// True when no rows survived filtering.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows of one category, in bucket order.
    pub fn category_rows<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a IndexedAggregate> + 'a {
        self.rows.iter().filter(move |r| r.category == category)
    }
}

/// Runs the bucketize → aggregate → estimate → growth → pivot pipeline.
#[derive(Debug)]
pub struct SeasonalityAnalyzer {
    config: AnalysisConfig,
    estimator: SeasonalityEstimator,
}

impl SeasonalityAnalyzer {
    /// # Errors
    /// `InvalidParameter` if the configuration fails validation.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let estimator = SeasonalityEstimator::new(config.estimator.clone());
        Ok(Self { config, estimator })
    }

    /// Replace the estimator, e.g. to plug in another smoothing model.
    pub fn with_estimator(mut self, estimator: SeasonalityEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyse `records`.
    ///
    /// An empty selection yields an empty report rather than an error.
    pub fn analyze(&self, records: &[TransactionRecord]) -> Result<SeasonalityReport> {
        let config = &self.config;
        let bucketized = Bucketizer::new(config.granularity)
            .with_listing_type(config.listing_type.clone())
            .with_category_filter(config.category_filter.clone())
            .with_bucket_filter(config.bucket_filter)
            .bucketize(records);
        let mut warnings = bucketized.warnings;

        debug!(
            granularity = %config.granularity,
            input = records.len(),
            kept = bucketized.rows.len(),
            "bucketized records"
        );

        let groups = match aggregate(&bucketized.rows) {
            Ok(groups) => groups,
            Err(SeasonalityError::EmptyInput) => {
                info!(granularity = %config.granularity, "no data after filtering");
                return Ok(SeasonalityReport::empty(config, warnings));
            }
            Err(err) => return Err(err),
        };

        let totals = bucket_totals(&groups);
        let index_policy = config.index_policy();
        let growth_policy = config.growth_policy();

        let indexed = self
            .estimator
            .estimate_all(partition(&groups), index_policy, config.parallel);

        let mut rows = Vec::with_capacity(groups.len());
        let mut outcomes = BTreeMap::new();
        for category in indexed {
            warnings.extend(category.warning());
            rows.extend(indexed_rows(&category, growth_policy));
            outcomes.insert(category.series.category, category.outcome);
        }

        debug!(
            granularity = %config.granularity,
            categories = outcomes.len(),
            rows = rows.len(),
            "seasonality index computed"
        );

        let forecast = config
            .forecast_target()
            .and_then(|target| self.forecast(target, &rows, &totals, &mut warnings));

        let matrix = ResultMatrix::from_indexed(&rows);
        Ok(SeasonalityReport {
            granularity: config.granularity,
            index_policy,
            growth_policy,
            rows,
            matrix,
            bucket_totals: totals,
            outcomes,
            forecast,
            warnings,
        })
    }

    /// Forecast the target series. Short histories are skipped quietly;
    /// failed fits become warnings.
    fn forecast(
        &self,
        target: ForecastTarget,
        rows: &[IndexedAggregate],
        totals: &[BucketTotal],
        warnings: &mut Vec<SeasonalityError>,
    ) -> Option<RevenueForecast> {
        let series = target.source.series(rows, totals);
        match self.estimator.forecast(&series, target.steps) {
            Ok(values) => Some(RevenueForecast {
                source: target.source,
                history: series.len(),
                values,
            }),
            Err(SeasonalityError::InsufficientData { needed, got }) => {
                debug!(
                    source = target.source.label(),
                    needed, got, "not enough history to forecast"
                );
                None
            }
            Err(err) => {
                warn!(source = target.source.label(), error = %err, "forecast failed");
                warnings.push(SeasonalityError::ModelFitFailure {
                    category: target.source.label().to_string(),
                    cause: err.to_string(),
                });
                None
            }
        }
    }
}

fn indexed_rows(category: &CategoryIndex, growth: GrowthPolicy) -> Vec<IndexedAggregate> {
    let series = &category.series;
    let growth_pct = growth.apply(&series.revenue, &category.index);
    series
        .buckets
        .iter()
        .zip(series.revenue.iter().zip(&series.counts))
        .zip(category.index.iter().zip(&growth_pct))
        .map(|((bucket, (revenue, count)), (index, growth))| IndexedAggregate {
            category: series.category.clone(),
            bucket: *bucket,
            revenue: *revenue,
            count: *count,
            revenue_index: *index,
            growth_pct: *growth,
        })
        .collect()
}

/// Run one analysis with `config`.
pub fn analyze(records: &[TransactionRecord], config: AnalysisConfig) -> Result<SeasonalityReport> {
    SeasonalityAnalyzer::new(config)?.analyze(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seasonality::estimator::FallbackReason;
    use approx::assert_relative_eq;

    fn listing(ts: &str, category: &str, price: f64) -> TransactionRecord {
        TransactionRecord::new(ts, category, LISTING_TYPE, Some(price))
    }

    fn monthly(category: &str, revenue: &[f64]) -> Vec<TransactionRecord> {
        revenue
            .iter()
            .enumerate()
            .map(|(i, &r)| listing(&format!("2024-{:02}-15 12:00:00", i + 1), category, r))
            .collect()
    }

    #[test]
    fn policies_follow_granularity() {
        let config = AnalysisConfig::new(Granularity::Week);
        assert_eq!(config.index_policy(), IndexPolicy::MeanRatio);
        assert_eq!(config.growth_policy(), GrowthPolicy::IndexCentered);

        let config = AnalysisConfig::default();
        assert_eq!(config.granularity, Granularity::Month);
        assert_eq!(config.index_policy(), IndexPolicy::ModelBased);
        assert_eq!(config.growth_policy(), GrowthPolicy::PeriodOverPeriod);

        let config = AnalysisConfig::new(Granularity::Hour)
            .with_index_policy(IndexPolicy::MeanRatio)
            .with_growth_policy(GrowthPolicy::PeriodOverPeriod);
        assert_eq!(config.index_policy(), IndexPolicy::MeanRatio);
        assert_eq!(config.growth_policy(), GrowthPolicy::PeriodOverPeriod);
    }

    #[test]
    fn validate_rejects_bad_configs() {
        assert!(AnalysisConfig::default().validate().is_ok());

        let mut config = AnalysisConfig::default();
        config.listing_type = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(SeasonalityError::InvalidParameter(_))
        ));

        let mut config = AnalysisConfig::default();
        config.estimator.degenerate_threshold = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.estimator.spec = crate::models::arima::ARIMASpec::new(0, 0, 0);
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.estimator.optimizer.max_iter = 0;
        assert!(SeasonalityAnalyzer::new(config).is_err());
    }

    #[test]
    fn forecast_target_resolution() {
        use crate::seasonality::forecast::ForecastSource;

        let config = AnalysisConfig::new(Granularity::WeekOfMonth);
        assert_eq!(
            config.forecast_target().map(|t| t.source),
            Some(ForecastSource::BucketTotals)
        );
        assert_eq!(config.clone().without_forecast().forecast_target(), None);

        let target = ForecastTarget::new(ForecastSource::Category("A".to_string()), 0);
        let config = AnalysisConfig::new(Granularity::Month).with_forecast(target);
        assert!(matches!(
            config.validate(),
            Err(SeasonalityError::InvalidParameter(_))
        ));
    }

    #[test]
    fn no_matching_rows_gives_empty_report() {
        let records = vec![TransactionRecord::new(
            "2024-01-01 00:00:00",
            "Cars",
            "Renewal",
            Some(5.0),
        )];
        let report = analyze(&records, AnalysisConfig::new(Granularity::Hour)).unwrap();
        assert!(report.is_empty());
        assert!(report.matrix.is_empty());
        assert!(report.outcomes.is_empty());
        assert!(report.warnings.is_empty());
        assert_eq!(report.index_policy, IndexPolicy::ModelBased);
    }

    #[test]
    fn constant_monthly_series_is_flat() {
        let records = monthly("A", &[100.0, 100.0, 100.0, 100.0]);
        let report = analyze(&records, AnalysisConfig::new(Granularity::Month)).unwrap();

        assert_eq!(report.rows.len(), 4);
        for row in &report.rows {
            assert_relative_eq!(row.revenue_index, 1.0, epsilon = 1e-9);
            assert_relative_eq!(row.growth_pct, 0.0);
            assert_eq!(row.count, 1);
        }
        assert!(matches!(report.outcomes["A"], SeriesOutcome::Fitted(_)));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn short_series_warns_and_falls_back() {
        let mut records = monthly("Short", &[10.0, 20.0]);
        records.extend(monthly("Long", &[10.0, 20.0, 30.0, 25.0, 15.0]));
        let report = analyze(&records, AnalysisConfig::new(Granularity::Month)).unwrap();

        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(
            &report.warnings[0],
            SeasonalityError::ModelFitFailure { category, .. } if category == "Short"
        ));
        assert_eq!(
            report.outcomes["Short"].fallback_reason(),
            Some(&FallbackReason::TooFewObservations { needed: 3, got: 2 })
        );
        for row in report.category_rows("Short") {
            assert_eq!(row.revenue_index, 1.0);
        }
        // Period-over-period growth is independent of the index.
        let growth: Vec<f64> = report.category_rows("Short").map(|r| r.growth_pct).collect();
        assert_eq!(growth, vec![0.0, 100.0]);
    }

    #[test]
    fn parallel_matches_sequential() {
        let mut records = monthly("A", &[10.0, 20.0, 30.0, 25.0, 15.0, 12.0]);
        records.extend(monthly("B", &[5.0, 1.0, 8.0, 3.0, 9.0, 2.0]));
        records.extend(monthly("C", &[0.0, 0.0, 0.0]));

        let sequential = analyze(&records, AnalysisConfig::new(Granularity::Month)).unwrap();
        let parallel = analyze(
            &records,
            AnalysisConfig::new(Granularity::Month).with_parallel(true),
        )
        .unwrap();
        assert_eq!(sequential, parallel);
    }
}
