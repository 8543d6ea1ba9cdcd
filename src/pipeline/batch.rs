// src/pipeline/batch.rs

//! Fan-out of fetch jobs over a bounded worker pool.

use futures::stream::{self, StreamExt};

use crate::models::Record;
use crate::pipeline::fetch::{FetchJob, TargetFailure};
use crate::services::MediaSource;

/// Everything one batch produced.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Number of targets dispatched
    pub targets: usize,
    pub posts: Vec<Record>,
    pub stories: Vec<Record>,
    pub failures: Vec<TargetFailure>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.targets - self.failures.len()
    }
}

/// Run `job` for every target with at most `workers` in flight.
///
/// Results are gathered in `targets` order no matter which job finishes
/// first. A failed target is logged and contributes no records.
pub async fn run_batch(
    job: &FetchJob,
    source: &dyn MediaSource,
    targets: &[String],
    workers: usize,
) -> BatchReport {
    let mut report = BatchReport {
        targets: targets.len(),
        ..BatchReport::default()
    };

    let mut results = stream::iter(targets)
        .map(|target| job.run(source, target))
        .buffered(workers.max(1));

    while let Some(outcome) = results.next().await {
        match outcome {
            Ok(records) => {
                report.posts.extend(records.posts);
                report.stories.extend(records.stories);
            }
            Err(failure) => {
                log::error!("Error while fetching @{}: {}", failure.target, failure.error);
                report.failures.push(failure);
            }
        }
    }

    report
}
