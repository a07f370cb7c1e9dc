//! CSV ingestion of transactions and categories, and CSV export of results.
//!
//! The transaction export carries a `CATEGORY_ID`; the category export maps
//! ids to `--_--`-separated paths. Records are labelled with the Level-1
//! (top) segment of their category path.

use crate::core::{level_one, IndexedAggregate, TransactionRecord};
use crate::error::{Result, SeasonalityError};
use crate::seasonality::ResultMatrix;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

const TRANSACTION_COLUMNS: &[&[&str]] = &[
    &["TIMESTAMP"],
    &["CATEGORY_ID"],
    &["TRANSACTION_TYPE"],
    &["PRICE"],
    &["TRANSACTION_ID", "TRANSCATION_ID"],
    &["USER_ID"],
];

const CATEGORY_COLUMNS: &[&[&str]] = &[&["CAT_ID"], &["FULL_PATH"]];

/// One row of the transactions export.
#[derive(Debug, Deserialize)]
struct RawTransaction {
    #[serde(rename = "TIMESTAMP")]
    timestamp: String,
    #[serde(rename = "CATEGORY_ID")]
    category_id: String,
    #[serde(rename = "TRANSACTION_TYPE")]
    transaction_type: String,
    #[serde(rename = "PRICE")]
    price: String,
    #[serde(rename = "TRANSACTION_ID", alias = "TRANSCATION_ID")]
    transaction_id: String,
    #[serde(rename = "USER_ID")]
    user_id: String,
}

/// One row of the categories export.
#[derive(Debug, Deserialize)]
struct RawCategory {
    #[serde(rename = "CAT_ID")]
    cat_id: String,
    #[serde(rename = "FULL_PATH")]
    full_path: String,
}

/// Category id → Level-1 label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTable {
    levels: HashMap<String, String>,
}

impl CategoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a category by its full path.
    pub fn insert(&mut self, id: impl AsRef<str>, full_path: &str) {
        self.levels
            .insert(id.as_ref().trim().to_string(), level_one(full_path));
    }

    /// Level-1 label of a category id.
    pub fn level_one(&self, id: &str) -> Option<&str> {
        self.levels.get(id.trim()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

fn require_columns<R: Read>(reader: &mut csv::Reader<R>, required: &[&[&str]]) -> Result<()> {
    let headers = reader.headers()?;
    for names in required {
        if !names.iter().any(|name| headers.iter().any(|h| h.trim() == *name)) {
            return Err(SeasonalityError::MissingColumn(names[0].to_string()));
        }
    }
    Ok(())
}

fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|p| p.is_finite())
}

/// Read the categories export (`CAT_ID`, `FULL_PATH`).
///
/// # Errors
/// `MissingColumn` if a required header is absent; `Csv` on malformed rows.
pub fn read_categories<R: Read>(reader: R) -> Result<CategoryTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    require_columns(&mut reader, CATEGORY_COLUMNS)?;

    let mut table = CategoryTable::new();
    for row in reader.deserialize::<RawCategory>() {
        let row = row?;
        table.insert(&row.cat_id, &row.full_path);
    }
    Ok(table)
}

/// Read the transactions export and label each row with its Level-1 category.
///
/// Unparseable prices become `None`. Rows whose category id is unknown keep
/// an empty category: they count towards period summaries but never enter a
/// seasonality analysis.
///
/// # Errors
/// `MissingColumn` if a required header is absent; `Csv` on malformed rows.
pub fn read_transactions<R: Read>(
    reader: R,
    categories: &CategoryTable,
) -> Result<Vec<TransactionRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    require_columns(&mut reader, TRANSACTION_COLUMNS)?;

    let mut records = Vec::new();
    let mut unmatched = 0usize;
    for row in reader.deserialize::<RawTransaction>() {
        let row = row?;
        let category = match categories.level_one(&row.category_id) {
            Some(category) => category.to_string(),
            None => {
                unmatched += 1;
                String::new()
            }
        };
        records.push(TransactionRecord {
            timestamp: row.timestamp,
            category,
            transaction_type: row.transaction_type.trim().to_string(),
            price: parse_price(&row.price),
            transaction_id: row.transaction_id,
            user_id: row.user_id,
        });
    }

    debug!(
        loaded = records.len(),
        unmatched, "read transactions"
    );
    Ok(records)
}

/// Read both exports from disk.
pub fn load_dataset(
    transactions: impl AsRef<Path>,
    categories: impl AsRef<Path>,
) -> Result<Vec<TransactionRecord>> {
    let categories = read_categories(std::fs::File::open(categories)?)?;
    read_transactions(std::fs::File::open(transactions)?, &categories)
}

/// Write the long-form table. The bucket column is named after the granularity.
pub fn write_indexed<W: Write>(rows: &[IndexedAggregate], writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    let bucket_header = rows
        .first()
        .map(|r| r.bucket.granularity().name())
        .unwrap_or("bucket");
    out.write_record([
        "category",
        bucket_header,
        "revenue",
        "count",
        "revenue_index",
        "growth_pct",
    ])?;
    for r in rows {
        out.write_record([
            r.category.clone(),
            r.bucket.label(),
            r.revenue.to_string(),
            r.count.to_string(),
            r.revenue_index.to_string(),
            r.growth_pct.to_string(),
        ])?;
    }
    out.flush()?;
    Ok(())
}

/// Write the matrix with one header column per bucket.
pub fn write_matrix<W: Write>(matrix: &ResultMatrix, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    let mut header = vec!["category".to_string()];
    header.extend(matrix.buckets().iter().map(|b| b.label()));
    out.write_record(&header)?;

    for (category, values) in matrix.categories().iter().zip(matrix.values()) {
        let mut record = vec![category.clone()];
        record.extend(values.iter().map(|v| v.to_string()));
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}
