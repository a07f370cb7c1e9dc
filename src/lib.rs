//! # seasonality-index
//!
//! Revenue seasonality indices for categorised marketplace listings.
//!
//! Listing transactions are bucketed by hour, day, weekday, week,
//! week-of-month or month, aggregated per top-level category, and turned
//! into a revenue index by smoothing each category's series with an
//! ARIMA(1,1,1) model and normalising by its mean. Categories whose series
//! cannot be fitted fall back to a flat index of 1.0.
//!
//! ```no_run
//! use seasonality_index::prelude::*;
//!
//! let records = seasonality_index::ingest::load_dataset("transactions.csv", "categories.csv")?;
//! let report = analyze(&records, AnalysisConfig::new(Granularity::Weekday))?;
//! for row in &report.rows {
//!     println!("{} {} {:.3}", row.category, row.bucket, row.revenue_index);
//! }
//! # Ok::<(), SeasonalityError>(())
//! ```

#![allow(clippy::upper_case_acronyms)]

pub mod core;
pub mod error;
pub mod ingest;
pub mod models;
pub mod seasonality;
pub mod summary;
pub mod utils;

pub use error::{Result, SeasonalityError};

pub mod prelude {
    pub use crate::core::{Bucket, Granularity, IndexedAggregate, TransactionRecord};
    pub use crate::error::{Result, SeasonalityError};
    pub use crate::seasonality::{
        analyze, AnalysisConfig, CategoryFilter, GrowthPolicy, IndexPolicy, ResultMatrix,
        SeasonalityAnalyzer, SeasonalityReport,
    };
}
