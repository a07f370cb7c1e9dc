//! Row filtering and bucket assignment.

use crate::core::{Bucket, Granularity, TransactionRecord, LISTING_TYPE};
use crate::error::SeasonalityError;
use tracing::warn;

/// Which categories take part in an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    /// Every category.
    #[default]
    All,
    /// Only the named (normalized) category.
    Only(String),
}

impl CategoryFilter {
    pub fn only(category: impl Into<String>) -> Self {
        CategoryFilter::Only(category.into())
    }

    pub fn matches(&self, category: &str) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => wanted == category,
        }
    }
}

impl std::str::FromStr for CategoryFilter {
    type Err = std::convert::Infallible;

    /// `"All"` (any case) selects every category; anything else names one.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Only(s.to_string()))
        }
    }
}

/// A record that passed filtering, with its normalized category and bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketedRecord<'a> {
    pub record: &'a TransactionRecord,
    pub category: String,
    pub bucket: Bucket,
}

impl BucketedRecord<'_> {
    pub fn revenue(&self) -> f64 {
        self.record.revenue()
    }
}

/// Output of [`Bucketizer::bucketize`].
#[derive(Debug, Clone, Default)]
pub struct Bucketized<'a> {
    pub rows: Vec<BucketedRecord<'a>>,
    /// One `InvalidTimestamp` per skipped row.
    pub warnings: Vec<SeasonalityError>,
}

/// Filters records to listings of the selected categories and assigns buckets.
#[derive(Debug, Clone)]
pub struct Bucketizer {
    granularity: Granularity,
    listing_type: String,
    category_filter: CategoryFilter,
    bucket_filter: Option<Bucket>,
}

impl Bucketizer {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            listing_type: LISTING_TYPE.to_string(),
            category_filter: CategoryFilter::All,
            bucket_filter: None,
        }
    }

    pub fn with_listing_type(mut self, listing_type: impl Into<String>) -> Self {
        self.listing_type = listing_type.into();
        self
    }

    pub fn with_category_filter(mut self, filter: CategoryFilter) -> Self {
        self.category_filter = filter;
        self
    }

    /// Keep only records falling in `bucket` (which may use another granularity,
    /// e.g. month 3 for a week-of-month analysis).
    pub fn with_bucket_filter(mut self, bucket: Option<Bucket>) -> Self {
        self.bucket_filter = bucket;
        self
    }

    /// Whether the record survives the transaction-type and category filters.
    ///
    /// Records without a category never do.
    pub fn accepts(&self, record: &TransactionRecord) -> bool {
        if record.transaction_type != self.listing_type {
            return false;
        }
        let category = record.normalized_category();
        !category.is_empty() && self.category_filter.matches(&category)
    }

    /// Filter and bucket `records`.
    ///
    /// Rows with unparseable timestamps are dropped and reported in
    /// [`Bucketized::warnings`]; they never abort the run.
    pub fn bucketize<'a>(&self, records: &'a [TransactionRecord]) -> Bucketized<'a> {
        let mut out = Bucketized::default();

        for (row, record) in records.iter().enumerate() {
            if !self.accepts(record) {
                continue;
            }

            let ts = match crate::core::parse_timestamp(&record.timestamp) {
                Ok(ts) => ts,
                Err(err) => {
                    warn!(row, timestamp = %record.timestamp, "skipping row with invalid timestamp");
                    out.warnings.push(match err {
                        SeasonalityError::InvalidTimestamp { value, reason } => {
                            SeasonalityError::InvalidTimestamp {
                                value,
                                reason: format!("row {row}: {reason}"),
                            }
                        }
                        other => other,
                    });
                    continue;
                }
            };

            if let Some(wanted) = self.bucket_filter {
                if wanted.granularity().bucket_of(&ts) != wanted {
                    continue;
                }
            }

            out.rows.push(BucketedRecord {
                record,
                category: record.normalized_category(),
                bucket: self.granularity.bucket_of(&ts),
            });
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(ts: &str, category: &str, price: f64) -> TransactionRecord {
        TransactionRecord::new(ts, category, LISTING_TYPE, Some(price))
    }

    #[test]
    fn drops_non_listing_rows() {
        let records = vec![
            listing("2024-01-01 10:00:00", "Cars", 10.0),
            TransactionRecord::new("2024-01-01 11:00:00", "Cars", "Renewal", Some(5.0)),
        ];
        let out = Bucketizer::new(Granularity::Hour).bucketize(&records);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].bucket.ordinal(), 10);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn applies_category_filter_on_normalized_labels() {
        let records = vec![
            listing("2024-01-01 10:00:00", " Cars --_--", 10.0),
            listing("2024-01-01 10:00:00", "Property", 10.0),
        ];
        let out = Bucketizer::new(Granularity::Hour)
            .with_category_filter(CategoryFilter::only("Cars"))
            .bucketize(&records);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].category, "Cars");
    }

    #[test]
    fn invalid_timestamps_become_warnings() {
        let records = vec![
            listing("garbage", "Cars", 10.0),
            listing("2024-01-01 10:00:00", "Cars", 10.0),
        ];
        let out = Bucketizer::new(Granularity::Day).bucketize(&records);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.warnings.len(), 1);
        assert!(matches!(
            &out.warnings[0],
            SeasonalityError::InvalidTimestamp { reason, .. } if reason.starts_with("row 0:")
        ));
    }

    #[test]
    fn uncategorised_rows_are_skipped() {
        let records = vec![
            listing("2024-01-01 10:00:00", "", 10.0),
            listing("2024-01-01 10:00:00", "Cars", 10.0),
        ];
        let bucketizer = Bucketizer::new(Granularity::Hour);
        assert!(!bucketizer.accepts(&records[0]));
        let out = bucketizer.bucketize(&records);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].category, "Cars");
    }

    #[test]
    fn invalid_timestamps_of_filtered_rows_are_ignored() {
        let records = vec![TransactionRecord::new("garbage", "Cars", "Renewal", None)];
        let out = Bucketizer::new(Granularity::Day).bucketize(&records);
        assert!(out.rows.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn bucket_filter_restricts_to_one_month() {
        let records = vec![
            listing("2024-03-02", "Cars", 1.0),
            listing("2024-04-02", "Cars", 1.0),
        ];
        let out = Bucketizer::new(Granularity::WeekOfMonth)
            .with_bucket_filter(Some(Bucket::new(Granularity::Month, 3)))
            .bucketize(&records);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].bucket, Bucket::new(Granularity::WeekOfMonth, 1));
    }

    #[test]
    fn custom_listing_type() {
        let records = vec![TransactionRecord::new("2024-01-01", "Cars", "Sale", Some(1.0))];
        let bucketizer = Bucketizer::new(Granularity::Month).with_listing_type("Sale");
        assert!(bucketizer.accepts(&records[0]));
        assert_eq!(bucketizer.bucketize(&records).rows.len(), 1);
    }

    #[test]
    fn category_filter_from_str() {
        assert_eq!("All".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "Cars".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::only("Cars")
        );
    }
}
