//! Category × bucket pivot of the seasonality index.

use crate::core::{Bucket, Granularity, IndexedAggregate};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Dense matrix of seasonality indices.
///
/// Rows are the sorted distinct categories and columns are buckets in
/// granularity order. Cells without an observation hold 0.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultMatrix {
    categories: Vec<String>,
    buckets: Vec<Bucket>,
    /// Row-major: `values[row][column]`.
    values: Vec<Vec<f64>>,
}

impl ResultMatrix {
    /// Pivot with one column per bucket observed in any category.
    pub fn from_indexed(rows: &[IndexedAggregate]) -> Self {
        let buckets: BTreeSet<Bucket> = rows.iter().map(|r| r.bucket).collect();
        Self::pivot(rows, buckets.into_iter().collect())
    }

    /// Pivot with every bucket of `granularity` as a column, observed or not.
    ///
    /// Rows whose bucket belongs to another granularity are ignored.
    pub fn with_full_domain(rows: &[IndexedAggregate], granularity: Granularity) -> Self {
        Self::pivot(rows, granularity.buckets())
    }

    fn pivot(rows: &[IndexedAggregate], buckets: Vec<Bucket>) -> Self {
        let categories: Vec<String> = rows
            .iter()
            .map(|r| r.category.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        let row_of: BTreeMap<&str, usize> = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        let col_of: BTreeMap<Bucket, usize> =
            buckets.iter().enumerate().map(|(i, b)| (*b, i)).collect();

        let mut values = vec![vec![0.0; buckets.len()]; categories.len()];
        for r in rows {
            if let (Some(&i), Some(&j)) = (row_of.get(r.category.as_str()), col_of.get(&r.bucket)) {
                values[i][j] = r.revenue_index;
            }
        }

        Self {
            categories,
            buckets,
            values,
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.categories.len(), self.buckets.len())
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Index values of one category, in column order.
    pub fn row(&self, category: &str) -> Option<&[f64]> {
        self.categories
            .iter()
            .position(|c| c == category)
            .map(|i| self.values[i].as_slice())
    }

    /// Cell value; `None` when the category or bucket is not a row/column.
    pub fn get(&self, category: &str, bucket: Bucket) -> Option<f64> {
        let j = self.buckets.iter().position(|b| *b == bucket)?;
        self.row(category).map(|row| row[j])
    }

    /// Non-zero cells as (category, bucket, value).
    pub fn non_zero_cells(&self) -> impl Iterator<Item = (&str, Bucket, f64)> + '_ {
        self.categories.iter().enumerate().flat_map(move |(i, category)| {
            self.buckets
                .iter()
                .enumerate()
                .filter_map(move |(j, bucket)| {
                    let v = self.values[i][j];
                    (v != 0.0).then_some((category.as_str(), *bucket, v))
                })
        })
    }
}
