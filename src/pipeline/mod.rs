//! Pipeline stages for a scrape run.
//!
//! - `filter`: keep media newer than a cutoff
//! - `records`: turn media into sheet rows
//! - `fetch`: one target, lookup through mapping
//! - `batch`: all targets over a bounded worker pool
//! - `run`: targets in, records out

pub mod batch;
pub mod fetch;
pub mod filter;
pub mod records;
pub mod run;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{BatchReport, run_batch};
pub use fetch::{FetchJob, FetchOutcome, FetchStage, Jitter, TargetFailure, TargetRecords, Window};
pub use filter::filter_by_cutoff;
pub use records::{format_timestamp, map_records};
pub use run::run_scrape;
