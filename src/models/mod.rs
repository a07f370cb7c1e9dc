//! Models used to smooth per-category revenue series.

pub mod arima;
mod traits;

pub use traits::{BoxedModel, SmoothingModel};
