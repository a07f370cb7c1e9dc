//! ARIMA (Autoregressive Integrated Moving Average) model.

use crate::error::{Result, SeasonalityError};
use crate::models::arima::diff::{difference, is_constant};
use crate::models::SmoothingModel;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::{max_abs, mean};

/// ARIMA model specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ARIMASpec {
    /// AR order (p)
    pub p: usize,
    /// Differencing order (d)
    pub d: usize,
    /// MA order (q)
    pub q: usize,
}

impl ARIMASpec {
    /// Create a new ARIMA specification.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Total number of parameters.
    pub fn num_params(&self) -> usize {
        self.p + self.q + 1 // AR + MA + intercept
    }

    /// Fewest observations for which a fit is attempted.
    pub fn min_observations(&self) -> usize {
        self.d + self.p.max(self.q) + 1
    }
}

impl Default for ARIMASpec {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

/// ARIMA model estimated by conditional sum of squares.
///
/// The differenced series is modelled as ARMA(p, q). An intercept is only
/// estimated when `d == 0`; with differencing the model carries no drift
/// term. Pre-sample lags and errors are zero, so every differenced
/// observation contributes a residual to the objective.
///
/// Fitted values are one-step-ahead in-sample predictions mapped back to
/// the level scale: with the past known, the one-step error of the level
/// equals the one-step error of the d-th difference, so
/// `fitted[t] = y[t] - residual_diff[t - d]`.
#[derive(Debug, Clone)]
pub struct ARIMA {
    spec: ARIMASpec,
    optimizer: NelderMeadConfig,
    ar_coefficients: Vec<f64>,
    ma_coefficients: Vec<f64>,
    /// Mean of the differenced series; zero when `d > 0`.
    intercept: f64,
    /// Training series.
    history: Vec<f64>,
    /// One-step errors of the differenced series.
    diff_residuals: Vec<f64>,
    /// Fitted values on the level scale.
    fitted: Option<Vec<f64>>,
    iterations: usize,
}

impl ARIMA {
    /// Create a new ARIMA model.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self::with_spec(ARIMASpec::new(p, d, q))
    }

    /// Create a model from a specification.
    pub fn with_spec(spec: ARIMASpec) -> Self {
        Self {
            spec,
            optimizer: NelderMeadConfig {
                max_iter: 2000,
                ..Default::default()
            },
            ar_coefficients: vec![],
            ma_coefficients: vec![],
            intercept: 0.0,
            history: vec![],
            diff_residuals: vec![],
            fitted: None,
            iterations: 0,
        }
    }

    /// Create an ARIMA(1,1,1) model.
    pub fn arima_111() -> Self {
        Self::new(1, 1, 1)
    }

    /// Replace the optimizer configuration.
    pub fn with_optimizer(mut self, config: NelderMeadConfig) -> Self {
        self.optimizer = config;
        self
    }

    /// Get the model specification.
    pub fn spec(&self) -> ARIMASpec {
        self.spec
    }

    /// Get AR coefficients.
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    /// Get MA coefficients.
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    /// Get the intercept.
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Optimizer iterations used by the last fit (0 for closed-form fits).
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    fn has_intercept(&self) -> bool {
        self.spec.d == 0
    }

    /// Next one-step prediction of the differenced series given its past
    /// values and errors.
    fn predict_next(
        past: &[f64],
        errors: &[f64],
        ar: &[f64],
        ma: &[f64],
        intercept: f64,
    ) -> f64 {
        let t = past.len();
        let mut pred = intercept;

        // AR component
        for (i, phi) in ar.iter().enumerate().take(t) {
            pred += phi * (past[t - 1 - i] - intercept);
        }

        // MA component
        for (i, theta) in ma.iter().enumerate().take(t) {
            pred += theta * errors[t - 1 - i];
        }

        pred
    }

    /// One-step residuals of the differenced series, from the first
    /// observation on.
    fn one_step_residuals(diff_series: &[f64], ar: &[f64], ma: &[f64], intercept: f64) -> Vec<f64> {
        let mut residuals = Vec::with_capacity(diff_series.len());
        for t in 0..diff_series.len() {
            let pred = Self::predict_next(&diff_series[..t], &residuals, ar, ma, intercept);
            residuals.push(diff_series[t] - pred);
        }
        residuals
    }

    /// Conditional sum of squares for given parameters.
    fn calculate_css(diff_series: &[f64], ar: &[f64], ma: &[f64], intercept: f64) -> f64 {
        Self::one_step_residuals(diff_series, ar, ma, intercept)
            .iter()
            .map(|e| e * e)
            .sum()
    }

    /// Estimate parameters using conditional least squares.
    fn estimate_parameters(&mut self, diff_series: &[f64]) -> Result<()> {
        let p = self.spec.p;
        let q = self.spec.q;
        let with_intercept = self.has_intercept();
        let centre = if with_intercept { mean(diff_series) } else { 0.0 };

        // A series that sits on its centre is reproduced exactly without ARMA terms.
        let tolerance = 1e-12 * (1.0 + max_abs(diff_series));
        let flat = is_constant(diff_series, tolerance)
            && diff_series
                .first()
                .map_or(true, |first| (first - centre).abs() <= tolerance);
        if (p == 0 && q == 0) || flat {
            self.intercept = centre;
            self.ar_coefficients = vec![0.0; p];
            self.ma_coefficients = vec![0.0; q];
            self.iterations = 0;
            return Ok(());
        }

        let offset = usize::from(with_intercept);
        let mut initial = vec![0.0; offset + p + q];
        if with_intercept {
            initial[0] = centre;
        }
        for i in 0..p {
            initial[offset + i] = 0.1 / (i + 1) as f64;
        }
        for i in 0..q {
            initial[offset + p + i] = 0.1 / (i + 1) as f64;
        }

        // Keep AR stationary and MA invertible.
        let mut bounds = vec![(f64::NEG_INFINITY, f64::INFINITY); offset];
        bounds.extend(std::iter::repeat((-0.99, 0.99)).take(p + q));

        let result = nelder_mead(
            |params| {
                let intercept = if with_intercept { params[0] } else { 0.0 };
                let ar = &params[offset..offset + p];
                let ma = &params[offset + p..];
                Self::calculate_css(diff_series, ar, ma, intercept)
            },
            &initial,
            Some(&bounds),
            self.optimizer.clone(),
        );

        self.iterations = result.iterations;
        if !result.converged {
            return Err(SeasonalityError::ComputationError(format!(
                "parameter estimation did not converge after {} iterations",
                result.iterations
            )));
        }

        let point = &result.optimal_point;
        self.intercept = if with_intercept { point[0] } else { 0.0 };
        self.ar_coefficients = point[offset..offset + p].to_vec();
        self.ma_coefficients = point[offset + p..].to_vec();
        Ok(())
    }

    /// Point forecasts for the next `steps` periods on the level scale.
    ///
    /// Future errors are taken as zero; the differenced forecasts are
    /// integrated back from the last observed values.
    pub fn forecast(&self, steps: usize) -> Result<Vec<f64>> {
        if self.fitted.is_none() {
            return Err(SeasonalityError::FitRequired);
        }

        let d = self.spec.d;
        let mut past = difference(&self.history, d);
        let mut errors = self.diff_residuals.clone();
        let observed = past.len();
        for _ in 0..steps {
            let next = Self::predict_next(
                &past,
                &errors,
                &self.ar_coefficients,
                &self.ma_coefficients,
                self.intercept,
            );
            past.push(next);
            errors.push(0.0);
        }

        let mut forecasts = past.split_off(observed);
        for k in (0..d).rev() {
            let level = difference(&self.history, k);
            let mut last = level.last().copied().ok_or(SeasonalityError::FitRequired)?;
            for value in forecasts.iter_mut() {
                last += *value;
                *value = last;
            }
        }

        if forecasts.iter().any(|v| !v.is_finite()) {
            return Err(SeasonalityError::ComputationError(
                "forecast is not finite".to_string(),
            ));
        }
        Ok(forecasts)
    }
}

impl Default for ARIMA {
    fn default() -> Self {
        Self::arima_111()
    }
}

impl SmoothingModel for ARIMA {
    fn fit(&mut self, values: &[f64]) -> Result<()> {
        self.fitted = None;

        let min_len = self.spec.min_observations();
        if values.len() < min_len {
            return Err(SeasonalityError::InsufficientData {
                needed: min_len,
                got: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(SeasonalityError::ComputationError(
                "series contains non-finite values".to_string(),
            ));
        }

        let d = self.spec.d;
        let diff_series = difference(values, d);
        self.estimate_parameters(&diff_series)?;

        let residuals = Self::one_step_residuals(
            &diff_series,
            &self.ar_coefficients,
            &self.ma_coefficients,
            self.intercept,
        );

        let mut fitted = vec![f64::NAN; values.len()];
        for t in d..values.len() {
            fitted[t] = values[t] - residuals[t - d];
        }

        if fitted[d..].iter().any(|v| !v.is_finite()) {
            return Err(SeasonalityError::ComputationError(
                "fitted values are not finite".to_string(),
            ));
        }

        self.history = values.to_vec();
        self.diff_residuals = residuals;
        self.fitted = Some(fitted);
        Ok(())
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn forecast(&self, steps: usize) -> Result<Vec<f64>> {
        ARIMA::forecast(self, steps)
    }

    fn name(&self) -> &str {
        "ARIMA"
    }
}
