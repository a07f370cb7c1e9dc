//! Grouping bucketed rows into per-(category, bucket) aggregates.

use crate::core::{Bucket, GroupAggregate};
use crate::error::{Result, SeasonalityError};
use crate::seasonality::bucketizer::BucketedRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Sum revenue and count rows per observed (category, bucket).
///
/// Output is sorted by category and then bucket order. Combinations with no
/// rows are never produced.
///
/// # Errors
/// `EmptyInput` when `rows` is empty.
pub fn aggregate(rows: &[BucketedRecord<'_>]) -> Result<Vec<GroupAggregate>> {
    if rows.is_empty() {
        return Err(SeasonalityError::EmptyInput);
    }

    let mut groups: BTreeMap<(&str, Bucket), (f64, usize)> = BTreeMap::new();
    for row in rows {
        let entry = groups
            .entry((row.category.as_str(), row.bucket))
            .or_insert((0.0, 0));
        entry.0 += row.revenue();
        entry.1 += 1;
    }

    Ok(groups
        .into_iter()
        .map(|((category, bucket), (revenue, count))| GroupAggregate {
            category: category.to_string(),
            bucket,
            revenue,
            count,
        })
        .collect())
}

/// The ordered revenue series of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySeries {
    pub category: String,
    pub buckets: Vec<Bucket>,
    pub revenue: Vec<f64>,
    pub counts: Vec<usize>,
}

impl CategorySeries {
    pub fn len(&self) -> usize {
        self.revenue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revenue.is_empty()
    }
}

/// Split aggregates into one series per category, each in bucket order.
pub fn partition(groups: &[GroupAggregate]) -> Vec<CategorySeries> {
    let mut by_category: BTreeMap<&str, Vec<&GroupAggregate>> = BTreeMap::new();
    for group in groups {
        by_category.entry(group.category.as_str()).or_default().push(group);
    }

    by_category
        .into_iter()
        .map(|(category, mut members)| {
            members.sort_by_key(|g| g.bucket);
            CategorySeries {
                category: category.to_string(),
                buckets: members.iter().map(|g| g.bucket).collect(),
                revenue: members.iter().map(|g| g.revenue).collect(),
                counts: members.iter().map(|g| g.count).collect(),
            }
        })
        .collect()
}

/// Revenue and count for one bucket across all categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketTotal {
    pub bucket: Bucket,
    pub revenue: f64,
    pub count: usize,
}

/// Total revenue per bucket across categories, in bucket order.
pub fn bucket_totals(groups: &[GroupAggregate]) -> Vec<BucketTotal> {
    let mut totals: BTreeMap<Bucket, (f64, usize)> = BTreeMap::new();
    for group in groups {
        let entry = totals.entry(group.bucket).or_insert((0.0, 0));
        entry.0 += group.revenue;
        entry.1 += group.count;
    }
    totals
        .into_iter()
        .map(|(bucket, (revenue, count))| BucketTotal {
            bucket,
            revenue,
            count,
        })
        .collect()
}
