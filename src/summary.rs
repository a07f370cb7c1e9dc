//! Transaction, revenue and user totals per calendar period.
//!
//! These run over every record regardless of transaction type and give the
//! overall shape of a dataset before any seasonality analysis.

use crate::core::{parse_timestamp, TransactionRecord};
use chrono::Datelike;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

/// Totals for one year, or one month of a year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub year: i32,
    /// `None` for yearly totals.
    pub month: Option<u32>,
    pub total_transactions: usize,
    pub total_revenue: f64,
    /// Distinct non-empty user identifiers.
    pub total_users: usize,
}

#[derive(Default)]
struct Accumulator<'a> {
    transactions: usize,
    revenue: f64,
    users: HashSet<&'a str>,
}

impl<'a> Accumulator<'a> {
    fn add(&mut self, record: &'a TransactionRecord) {
        self.transactions += 1;
        self.revenue += record.revenue();
        if !record.user_id.is_empty() {
            self.users.insert(record.user_id.as_str());
        }
    }
}

fn summarize<'a, K, F>(records: &'a [TransactionRecord], key: F) -> BTreeMap<K, Accumulator<'a>>
where
    K: Ord,
    F: Fn(chrono::NaiveDateTime) -> K,
{
    let mut groups: BTreeMap<K, Accumulator<'a>> = BTreeMap::new();
    for record in records {
        match parse_timestamp(&record.timestamp) {
            Ok(ts) => groups.entry(key(ts)).or_default().add(record),
            Err(err) => warn!(error = %err, "skipping record in period summary"),
        }
    }
    groups
}

/// One row per (year, month), in calendar order.
pub fn monthly_summary(records: &[TransactionRecord]) -> Vec<PeriodSummary> {
    summarize(records, |ts| (ts.year(), ts.month()))
        .into_iter()
        .map(|((year, month), acc)| PeriodSummary {
            year,
            month: Some(month),
            total_transactions: acc.transactions,
            total_revenue: acc.revenue,
            total_users: acc.users.len(),
        })
        .collect()
}

/// One row per year, in calendar order.
pub fn yearly_totals(records: &[TransactionRecord]) -> Vec<PeriodSummary> {
    summarize(records, |ts| ts.year())
        .into_iter()
        .map(|(year, acc)| PeriodSummary {
            year,
            month: None,
            total_transactions: acc.transactions,
            total_revenue: acc.revenue,
            total_users: acc.users.len(),
        })
        .collect()
}
