//! Chronological ordering of assembled chains.

use chrono::{DateTime, Utc};

use crate::model::record::MessageRecord;
use crate::parser::date::parse_date;

/// Sort key for a record: its parsed `Date:`, or `None` when missing or
/// unparsable. `None` orders before every real timestamp.
pub fn timestamp(record: &MessageRecord) -> Option<DateTime<Utc>> {
    match parse_date(&record.date) {
        Ok(dt) => Some(dt),
        Err(e) => {
            tracing::debug!(id = %record.id, error = %e, "Ordering message at minimum timestamp");
            None
        }
    }
}

/// Sort `chain` ascending by date.
///
/// Stable: records with equal or absent timestamps keep discovery order.
pub fn order(chain: &mut [&MessageRecord]) {
    chain.sort_by_cached_key(|record| timestamp(record));
}
