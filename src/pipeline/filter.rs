// src/pipeline/filter.rs

//! Date window filtering.

use chrono::{DateTime, Utc};

use crate::models::Timestamped;

/// Keep items created strictly after `cutoff`, preserving order.
pub fn filter_by_cutoff<T: Timestamped>(items: Vec<T>, cutoff: DateTime<Utc>) -> Vec<T> {
    items
        .into_iter()
        .filter(|item| item.taken_at() > cutoff)
        .collect()
}
