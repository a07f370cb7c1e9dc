//! Transaction rows and the aggregates derived from them.

use crate::core::bucket::Bucket;
use serde::{Deserialize, Serialize};

/// Separator token used in category paths such as `Cars --_-- Sedans`.
pub const PATH_SEPARATOR: &str = "--_--";

/// Transaction-type tag of the rows the analysis looks at.
pub const LISTING_TYPE: &str = "Listing";

/// A single input row. Never mutated by the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub timestamp: String,
    /// Level-1 category label.
    pub category: String,
    pub transaction_type: String,
    /// Missing or non-numeric prices are `None`.
    pub price: Option<f64>,
    pub transaction_id: String,
    pub user_id: String,
}

impl TransactionRecord {
    pub fn new(
        timestamp: impl Into<String>,
        category: impl Into<String>,
        transaction_type: impl Into<String>,
        price: Option<f64>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            category: category.into(),
            transaction_type: transaction_type.into(),
            price,
            transaction_id: String::new(),
            user_id: String::new(),
        }
    }

    pub fn with_ids(mut self, transaction_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.transaction_id = transaction_id.into();
        self.user_id = user_id.into();
        self
    }

    /// Price used for revenue sums; missing and non-finite prices count as zero.
    pub fn revenue(&self) -> f64 {
        match self.price {
            Some(p) if p.is_finite() => p,
            _ => 0.0,
        }
    }

    /// Category label with path separators removed and whitespace trimmed.
    pub fn normalized_category(&self) -> String {
        normalize_category(&self.category)
    }
}

/// Strip path separator tokens and surrounding whitespace from a label.
pub fn normalize_category(label: &str) -> String {
    label.replace(PATH_SEPARATOR, "").trim().to_string()
}

/// Top-level category of a `--_--`-separated path.
pub fn level_one(full_path: &str) -> String {
    let head = full_path.split(PATH_SEPARATOR).next().unwrap_or_default();
    normalize_category(head)
}

/// Revenue and transaction count for one (category, bucket) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAggregate {
    pub category: String,
    pub bucket: Bucket,
    pub revenue: f64,
    pub count: usize,
}

/// A [`GroupAggregate`] with its seasonality index and growth percentage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedAggregate {
    pub category: String,
    pub bucket: Bucket,
    pub revenue: f64,
    pub count: usize,
    pub revenue_index: f64,
    pub growth_pct: f64,
}

impl IndexedAggregate {
    pub fn from_group(group: &GroupAggregate, revenue_index: f64, growth_pct: f64) -> Self {
        Self {
            category: group.category.clone(),
            bucket: group.bucket,
            revenue: group.revenue,
            count: group.count,
            revenue_index,
            growth_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revenue_treats_missing_price_as_zero() {
        let rec = TransactionRecord::new("2024-01-01", "Cars", LISTING_TYPE, None);
        assert_eq!(rec.revenue(), 0.0);

        let rec = TransactionRecord::new("2024-01-01", "Cars", LISTING_TYPE, Some(f64::NAN));
        assert_eq!(rec.revenue(), 0.0);

        let rec = TransactionRecord::new("2024-01-01", "Cars", LISTING_TYPE, Some(12.5));
        assert_eq!(rec.revenue(), 12.5);
    }

    #[test]
    fn category_normalization() {
        assert_eq!(normalize_category("  Cars --_--"), "Cars");
        assert_eq!(normalize_category("Property"), "Property");
        assert_eq!(level_one("Cars --_-- Sedans --_-- Toyota"), "Cars");
        assert_eq!(level_one("Electronics"), "Electronics");
        assert_eq!(level_one(""), "");
    }

    #[test]
    fn with_ids_sets_identifiers() {
        let rec = TransactionRecord::new("2024-01-01", "Cars", LISTING_TYPE, Some(1.0))
            .with_ids("t-1", "u-9");
        assert_eq!(rec.transaction_id, "t-1");
        assert_eq!(rec.user_id, "u-9");
    }
}
