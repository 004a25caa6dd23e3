//! Query engine: read-only predicates over a collection snapshot.
//!
//! Stateless by design - every function takes the collection it scans and
//! never mutates. All scans are brute-force linear passes in the
//! collection's insertion order, which is also the result order. "No
//! matches" is an empty result, never an error.

use crate::collection::Collection;
use dynamickv_core::{Error, Record, Result};

/// Exact-id lookup; delegates to the collection store.
pub fn by_id(collection: &Collection, id: &str) -> Option<Record> {
    collection.get(id)
}

/// Inclusive numeric range over a named field.
///
/// A record matches iff the field is numeric (int or float) and
/// `min <= value <= max`. Non-numeric or missing fields exclude the
/// record - that is not an error. Fails with `Error::Validation` only if
/// `min > max`.
pub fn by_range(collection: &Collection, field: &str, min: f64, max: f64) -> Result<Vec<Record>> {
    if min > max {
        return Err(Error::validation(format!(
            "range lower bound {} exceeds upper bound {}",
            min, max
        )));
    }

    Ok(collection
        .snapshot()
        .into_iter()
        .filter(|record| {
            record
                .field(field)
                .and_then(|value| value.as_number())
                .map(|n| n >= min && n <= max)
                .unwrap_or(false)
        })
        .collect())
}

/// Case-insensitive substring match over a named string field.
///
/// An empty needle matches every record that has the field as a string.
pub fn by_substring(collection: &Collection, field: &str, needle: &str) -> Vec<Record> {
    let needle = needle.to_lowercase();
    collection
        .snapshot()
        .into_iter()
        .filter(|record| {
            record
                .field(field)
                .and_then(|value| value.as_str())
                .map(|s| s.to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
        .collect()
}
