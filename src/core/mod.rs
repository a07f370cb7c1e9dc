//! Core data structures: granularities, buckets, records and aggregates.

mod bucket;
mod record;

pub use bucket::{parse_timestamp, Bucket, Granularity};
pub use record::{
    level_one, normalize_category, GroupAggregate, IndexedAggregate, TransactionRecord,
    LISTING_TYPE, PATH_SEPARATOR,
};
