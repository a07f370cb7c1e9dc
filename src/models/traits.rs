//! Trait implemented by models that produce an in-sample smoothed signal.

use crate::error::Result;

/// A model fitted to one ordered series whose in-sample one-step fitted
/// values are used as a smoothed signal.
///
/// Implementations are plain values with no shared state, so one instance
/// can be created per category and fitted independently.
pub trait SmoothingModel {
    /// Fit the model to `values`.
    fn fit(&mut self, values: &[f64]) -> Result<()>;

    /// In-sample fitted values on the scale of the input, one per observation.
    ///
    /// Positions the model cannot predict (e.g. observations consumed by
    /// differencing) are `NaN`.
    fn fitted_values(&self) -> Option<&[f64]>;

    /// Point forecasts for the `steps` periods after the fitted series.
    fn forecast(&self, steps: usize) -> Result<Vec<f64>>;

    /// Get the model name.
    fn name(&self) -> &str;

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.fitted_values().is_some()
    }
}

/// Type alias for boxed model trait objects.
pub type BoxedModel = Box<dyn SmoothingModel + Send>;
