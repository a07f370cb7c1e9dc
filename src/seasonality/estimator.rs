//! Per-category seasonality index estimation.
//!
//! Each category's revenue series is turned into a dimensionless index
//! centred on 1.0. Two policies exist:
//!
//! - [`IndexPolicy::ModelBased`]: fit ARIMA(1,1,1), take the in-sample fitted
//!   values (first value pinned to the first observation) and divide by
//!   their mean.
//! - [`IndexPolicy::MeanRatio`]: divide the raw revenue by its mean.
//!
//! Whenever the index cannot be computed the category gets the flat index
//! (1.0 everywhere). The outcome is recorded per category as a
//! [`SeriesOutcome`]; one category's failure never touches another's result.

use crate::core::Granularity;
use crate::error::{Result, SeasonalityError};
use crate::models::arima::{ARIMASpec, ARIMA};
use crate::models::BoxedModel;
use crate::seasonality::aggregator::CategorySeries;
use crate::utils::optimization::NelderMeadConfig;
use crate::utils::stats::{max_abs, mean};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// How the seasonality index of a series is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexPolicy {
    /// Smoothed ARIMA fitted values divided by their mean.
    ModelBased,
    /// Raw revenue divided by its mean.
    MeanRatio,
}

impl IndexPolicy {
    /// Policy used for a granularity unless overridden.
    ///
    /// Weekly and week-of-month analyses use the mean ratio; everything else
    /// is model based.
    pub fn for_granularity(granularity: Granularity) -> Self {
        match granularity {
            Granularity::Week | Granularity::WeekOfMonth => IndexPolicy::MeanRatio,
            _ => IndexPolicy::ModelBased,
        }
    }
}

/// Configuration of the seasonality estimator.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorConfig {
    /// Model order.
    pub spec: ARIMASpec,
    /// Series shorter than this take the fallback without attempting a fit.
    pub min_observations: usize,
    /// A revenue mean at or below this is degenerate.
    pub degenerate_threshold: f64,
    /// Optimizer used for coefficient estimation.
    pub optimizer: NelderMeadConfig,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            spec: ARIMASpec::default(),
            min_observations: 3,
            degenerate_threshold: 1e-6,
            optimizer: NelderMeadConfig {
                max_iter: 2000,
                ..Default::default()
            },
        }
    }
}

/// Why a category received the flat index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Too few observed buckets to attempt a fit.
    TooFewObservations { needed: usize, got: usize },
    /// The model could not be fitted.
    ModelFit(SeasonalityError),
    /// The revenue series averages to (almost) zero.
    DegenerateSeries { mean: f64 },
}

impl FallbackReason {
    /// Whether this fallback should be surfaced as a warning.
    ///
    /// Degenerate series are expected and stay silent.
    pub fn is_failure(&self) -> bool {
        !matches!(self, FallbackReason::DegenerateSeries { .. })
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::TooFewObservations { needed, got } => {
                write!(f, "insufficient data: need at least {needed}, got {got}")
            }
            FallbackReason::ModelFit(err) => write!(f, "{err}"),
            FallbackReason::DegenerateSeries { mean } => {
                write!(f, "degenerate series with mean {mean}")
            }
        }
    }
}

/// Result of indexing one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesOutcome {
    /// Index values, one per observed bucket.
    Fitted(Vec<f64>),
    /// The flat index applies.
    Fallback(FallbackReason),
}

impl SeriesOutcome {
    /// Index values for a series of `len` buckets.
    pub fn index(&self, len: usize) -> Vec<f64> {
        match self {
            SeriesOutcome::Fitted(index) => index.clone(),
            SeriesOutcome::Fallback(_) => vec![1.0; len],
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, SeriesOutcome::Fallback(_))
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            SeriesOutcome::Fallback(reason) => Some(reason),
            SeriesOutcome::Fitted(_) => None,
        }
    }
}

/// Indexed series of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryIndex {
    pub series: CategorySeries,
    pub outcome: SeriesOutcome,
    /// Resolved index, flat when the outcome is a fallback.
    pub index: Vec<f64>,
}

impl CategoryIndex {
    /// `ModelFitFailure` warning for failed fits; `None` otherwise.
    pub fn warning(&self) -> Option<SeasonalityError> {
        self.outcome
            .fallback_reason()
            .filter(|reason| reason.is_failure())
            .map(|reason| SeasonalityError::ModelFitFailure {
                category: self.series.category.clone(),
                cause: reason.to_string(),
            })
    }
}

type ModelFactory = Box<dyn Fn(&EstimatorConfig) -> BoxedModel + Send + Sync>;

/// Computes seasonality indices per category.
pub struct SeasonalityEstimator {
    config: EstimatorConfig,
    factory: ModelFactory,
}

impl fmt::Debug for SeasonalityEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeasonalityEstimator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for SeasonalityEstimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}

impl SeasonalityEstimator {
    /// Estimator backed by the configured ARIMA model.
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            factory: Box::new(|config: &EstimatorConfig| -> BoxedModel {
                Box::new(ARIMA::with_spec(config.spec).with_optimizer(config.optimizer.clone()))
            }),
        }
    }

    /// Use a different smoothing model. A fresh model is built per series.
    pub fn with_model_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&EstimatorConfig) -> BoxedModel + Send + Sync + 'static,
    {
        self.factory = Box::new(factory);
        self
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Index one revenue series under `policy`.
    pub fn estimate(&self, values: &[f64], policy: IndexPolicy) -> SeriesOutcome {
        if values.is_empty() {
            return SeriesOutcome::Fitted(vec![]);
        }
        match policy {
            IndexPolicy::ModelBased => self.model_based(values),
            IndexPolicy::MeanRatio => self.normalize(values, 1.0),
        }
    }

    fn model_based(&self, values: &[f64]) -> SeriesOutcome {
        let needed = self.config.min_observations.max(1);
        if values.len() < needed {
            return SeriesOutcome::Fallback(FallbackReason::TooFewObservations {
                needed,
                got: values.len(),
            });
        }

        let revenue_mean = mean(values);
        if !(revenue_mean > self.config.degenerate_threshold) {
            return SeriesOutcome::Fallback(FallbackReason::DegenerateSeries { mean: revenue_mean });
        }

        // Fit on a unit scale; the index is scale-invariant.
        let scale = max_abs(values);
        let scaled: Vec<f64> = values.iter().map(|v| v / scale).collect();

        let mut model = (self.factory)(&self.config);
        if let Err(err) = model.fit(&scaled) {
            return SeriesOutcome::Fallback(FallbackReason::ModelFit(err));
        }

        let mut smoothed = match model.fitted_values() {
            Some(fitted) if fitted.len() == scaled.len() => fitted.to_vec(),
            _ => {
                return SeriesOutcome::Fallback(FallbackReason::ModelFit(
                    SeasonalityError::ComputationError(format!(
                        "{} produced no fitted values",
                        model.name()
                    )),
                ))
            }
        };

        // Differencing consumes the first observation.
        smoothed[0] = scaled[0];

        if smoothed.iter().any(|v| !v.is_finite()) {
            return SeriesOutcome::Fallback(FallbackReason::ModelFit(
                SeasonalityError::ComputationError("fitted values are not finite".to_string()),
            ));
        }
        // Revenue has a positive mean here, so a negative smoothed value is a
        // failed fit rather than a degenerate series.
        if smoothed[1..].iter().any(|v| *v <= 0.0) || !(mean(&smoothed) > 0.0) {
            return SeriesOutcome::Fallback(FallbackReason::ModelFit(
                SeasonalityError::ComputationError(format!(
                    "{} smoothed a positive series to non-positive values",
                    model.name()
                )),
            ));
        }

        self.normalize(&smoothed, scale)
    }

    /// Point forecasts of `values` for `steps` periods, on the revenue scale.
    ///
    /// # Errors
    /// `InsufficientData` below the configured minimum length, or the
    /// model's fit or forecast error.
    pub fn forecast(&self, values: &[f64], steps: usize) -> Result<Vec<f64>> {
        let needed = self.config.min_observations.max(1);
        if values.len() < needed {
            return Err(SeasonalityError::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let scale = max_abs(values);
        let scale = if scale > 0.0 { scale } else { 1.0 };
        let scaled: Vec<f64> = values.iter().map(|v| v / scale).collect();

        let mut model = (self.factory)(&self.config);
        model.fit(&scaled)?;
        let forecast = model.forecast(steps)?;
        Ok(forecast.into_iter().map(|v| v * scale).collect())
    }

    /// Divide `signal` by its mean; `scale` maps the mean back to revenue
    /// units for the degeneracy check.
    fn normalize(&self, signal: &[f64], scale: f64) -> SeriesOutcome {
        let signal_mean = mean(signal);
        let revenue_mean = signal_mean * scale;
        if revenue_mean > self.config.degenerate_threshold {
            SeriesOutcome::Fitted(signal.iter().map(|v| v / signal_mean).collect())
        } else {
            SeriesOutcome::Fallback(FallbackReason::DegenerateSeries { mean: revenue_mean })
        }
    }

    /// Index one category's series, logging fallbacks.
    pub fn estimate_category(&self, series: CategorySeries, policy: IndexPolicy) -> CategoryIndex {
        let outcome = self.estimate(&series.revenue, policy);

        if let Some(reason) = outcome.fallback_reason() {
            if reason.is_failure() {
                warn!(
                    category = %series.category,
                    cause = %reason,
                    "model fit failed, using flat seasonality index"
                );
            } else {
                debug!(category = %series.category, %reason, "flat seasonality index");
            }
        }

        let index = outcome.index(series.len());
        CategoryIndex {
            series,
            outcome,
            index,
        }
    }

    /// Index every series, optionally across the rayon thread pool.
    ///
    /// Results keep the order of `series`.
    pub fn estimate_all(
        &self,
        series: Vec<CategorySeries>,
        policy: IndexPolicy,
        parallel: bool,
    ) -> Vec<CategoryIndex> {
        if parallel {
            series
                .into_par_iter()
                .map(|s| self.estimate_category(s, policy))
                .collect()
        } else {
            series
                .into_iter()
                .map(|s| self.estimate_category(s, policy))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Bucket, Granularity};
    use crate::models::SmoothingModel;
    use approx::assert_relative_eq;

    fn series(category: &str, revenue: &[f64]) -> CategorySeries {
        CategorySeries {
            category: category.to_string(),
            buckets: (0..revenue.len() as u32)
                .map(|h| Bucket::new(Granularity::Hour, h))
                .collect(),
            revenue: revenue.to_vec(),
            counts: vec![1; revenue.len()],
        }
    }

    struct AlwaysFails;

    impl SmoothingModel for AlwaysFails {
        fn fit(&mut self, _values: &[f64]) -> Result<()> {
            Err(SeasonalityError::ComputationError("singular".to_string()))
        }
        fn fitted_values(&self) -> Option<&[f64]> {
            None
        }
        fn forecast(&self, _steps: usize) -> Result<Vec<f64>> {
            Err(SeasonalityError::FitRequired)
        }
        fn name(&self) -> &str {
            "AlwaysFails"
        }
    }

    #[test]
    fn constant_series_gives_unit_index() {
        let est = SeasonalityEstimator::default();
        let outcome = est.estimate(&[100.0, 100.0, 100.0, 100.0], IndexPolicy::ModelBased);
        assert_eq!(outcome, SeriesOutcome::Fitted(vec![1.0; 4]));
    }

    #[test]
    fn all_zero_series_is_degenerate() {
        let est = SeasonalityEstimator::default();
        let outcome = est.estimate(&[0.0, 0.0, 0.0], IndexPolicy::ModelBased);
        assert!(matches!(
            outcome,
            SeriesOutcome::Fallback(FallbackReason::DegenerateSeries { .. })
        ));
        assert_eq!(outcome.index(3), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn single_point_takes_fallback() {
        let est = SeasonalityEstimator::default();
        let outcome = est.estimate(&[42.0], IndexPolicy::ModelBased);
        assert_eq!(
            outcome,
            SeriesOutcome::Fallback(FallbackReason::TooFewObservations { needed: 3, got: 1 })
        );
        assert_eq!(outcome.index(1), vec![1.0]);
    }

    #[test]
    fn two_points_take_fallback() {
        let est = SeasonalityEstimator::default();
        let outcome = est.estimate(&[10.0, 20.0], IndexPolicy::ModelBased);
        assert!(outcome.is_fallback());
    }

    #[test]
    fn short_fluctuating_series_are_fitted_positive() {
        let est = SeasonalityEstimator::default();
        let values = [100.0, 110.0, 95.0, 105.0, 98.0, 108.0, 102.0];
        for len in 4..=values.len() {
            let outcome = est.estimate(&values[..len], IndexPolicy::ModelBased);
            let SeriesOutcome::Fitted(index) = &outcome else {
                panic!("length {len} fell back: {outcome:?}");
            };
            assert_eq!(index.len(), len);
            assert!(index.iter().all(|v| *v > 0.0), "{index:?}");
            assert_relative_eq!(mean(index), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn wide_swing_series_is_fitted_positive() {
        let est = SeasonalityEstimator::default();
        let outcome = est.estimate(&[1130.25, 1439.40, 1617.42, 1359.24], IndexPolicy::ModelBased);
        let SeriesOutcome::Fitted(index) = &outcome else {
            panic!("fell back: {outcome:?}");
        };
        assert!(index.iter().all(|v| *v > 0.0 && v.is_finite()));
        assert_relative_eq!(mean(index), 1.0, epsilon = 1e-9);
    }

    struct Negative;

    impl SmoothingModel for Negative {
        fn fit(&mut self, _values: &[f64]) -> Result<()> {
            Ok(())
        }
        fn fitted_values(&self) -> Option<&[f64]> {
            Some(&[f64::NAN, -1.0, 2.0, 3.0])
        }
        fn forecast(&self, _steps: usize) -> Result<Vec<f64>> {
            Ok(vec![])
        }
        fn name(&self) -> &str {
            "Negative"
        }
    }

    #[test]
    fn non_positive_smoothing_is_a_warned_fit_failure() {
        let est = SeasonalityEstimator::default()
            .with_model_factory(|_| -> BoxedModel { Box::new(Negative) });
        let result = est.estimate_category(series("A", &[5.0, 6.0, 7.0, 8.0]), IndexPolicy::ModelBased);
        assert!(matches!(
            result.outcome.fallback_reason(),
            Some(FallbackReason::ModelFit(_))
        ));
        assert_eq!(result.index, vec![1.0; 4]);
        assert!(result.warning().is_some());
    }

    #[test]
    fn forecast_is_on_revenue_scale() {
        let est = SeasonalityEstimator::default();
        let forecast = est.forecast(&[200.0, 200.0, 200.0], 4).unwrap();
        assert_eq!(forecast, vec![200.0; 4]);

        assert_eq!(
            est.forecast(&[1.0, 2.0], 3),
            Err(SeasonalityError::InsufficientData { needed: 3, got: 2 })
        );

        let failing = SeasonalityEstimator::default()
            .with_model_factory(|_| -> BoxedModel { Box::new(AlwaysFails) });
        assert!(failing.forecast(&[1.0, 2.0, 3.0], 2).is_err());
    }

    #[test]
    fn mean_ratio_policy() {
        let est = SeasonalityEstimator::default();
        let index = est
            .estimate(&[50.0, 100.0, 150.0], IndexPolicy::MeanRatio)
            .index(3);
        assert_eq!(index, vec![0.5, 1.0, 1.5]);

        let single = est.estimate(&[7.0], IndexPolicy::MeanRatio);
        assert_eq!(single, SeriesOutcome::Fitted(vec![1.0]));

        let zero = est.estimate(&[0.0, 0.0], IndexPolicy::MeanRatio);
        assert!(zero.is_fallback());
    }

    #[test]
    fn failing_model_is_isolated_per_category() {
        let est = SeasonalityEstimator::default()
            .with_model_factory(|_| -> BoxedModel { Box::new(AlwaysFails) });
        let results = est.estimate_all(
            vec![series("A", &[1.0, 2.0, 3.0]), series("B", &[5.0, 6.0, 7.0])],
            IndexPolicy::ModelBased,
            false,
        );

        assert_eq!(results.len(), 2);
        for result in &results {
            assert_eq!(result.index, vec![1.0; 3]);
            let warning = result.warning().unwrap();
            assert!(matches!(warning, SeasonalityError::ModelFitFailure { .. }));
            assert!(warning.to_string().contains("singular"));
        }
    }

    #[test]
    fn one_failure_leaves_others_untouched() {
        let est = SeasonalityEstimator::default();
        let results = est.estimate_all(
            vec![
                series("A", &[100.0, 100.0, 100.0, 100.0]),
                series("B", &[5.0]),
                series("C", &[100.0, 110.0, 95.0, 105.0]),
            ],
            IndexPolicy::ModelBased,
            false,
        );

        assert_eq!(results[0].index, vec![1.0; 4]);
        assert!(results[0].warning().is_none());
        assert_eq!(results[1].index, vec![1.0]);
        assert!(results[1].warning().is_some());
        assert!(!results[2].outcome.is_fallback());
        assert!(results[2].warning().is_none());
    }

    #[test]
    fn degenerate_fallback_is_silent() {
        let est = SeasonalityEstimator::default();
        let result = est.estimate_category(series("Z", &[0.0, 0.0, 0.0]), IndexPolicy::ModelBased);
        assert!(result.outcome.is_fallback());
        assert!(result.warning().is_none());
    }

    #[test]
    fn parallel_matches_sequential() {
        let est = SeasonalityEstimator::default();
        let input = vec![
            series("A", &[100.0, 100.0, 100.0, 100.0]),
            series("B", &[3.0, 6.0, 9.0]),
            series("C", &[0.0, 0.0, 0.0]),
            series("D", &[1.0]),
        ];
        let seq = est.estimate_all(input.clone(), IndexPolicy::ModelBased, false);
        let par = est.estimate_all(input, IndexPolicy::ModelBased, true);
        assert_eq!(seq, par);
    }

    #[test]
    fn default_policies() {
        assert_eq!(
            IndexPolicy::for_granularity(Granularity::Week),
            IndexPolicy::MeanRatio
        );
        assert_eq!(
            IndexPolicy::for_granularity(Granularity::WeekOfMonth),
            IndexPolicy::MeanRatio
        );
        assert_eq!(
            IndexPolicy::for_granularity(Granularity::Hour),
            IndexPolicy::ModelBased
        );
    }
}
