//! ARIMA (Autoregressive Integrated Moving Average) smoothing model.
//!
//! Orders are fixed by the caller; there is no order search.

mod diff;
mod model;

pub use diff::{difference, is_constant};
pub use model::{ARIMASpec, ARIMA};
