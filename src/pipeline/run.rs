// src/pipeline/run.rs

//! Full scrape: read targets, fetch, write.

use chrono::Utc;

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::batch::{BatchReport, run_batch};
use crate::pipeline::fetch::FetchJob;
use crate::services::MediaSource;
use crate::storage::{RecordSink, TargetSource};
use crate::utils::log;

/// Run one scrape against an already authenticated `source`.
///
/// Records are written with one append per sink after every target has
/// been processed; a failing target only shrinks the output.
pub async fn run_scrape(
    config: &Config,
    source: &dyn MediaSource,
    targets: &dyn TargetSource,
    posts: &dyn RecordSink,
    stories: &dyn RecordSink,
) -> Result<BatchReport> {
    let start_time = Utc::now();
    log::header("Instagram scrape starting");

    log::step(1, 3, "Reading target usernames");
    let names = targets.read_targets().await?;
    log::info(&format!("Target username list length: {}", names.len()));

    log::step(2, 3, "Fetching posts and stories");
    let job = FetchJob::from_config(&config.scrape, config.instagram.media_amount, start_time)?;
    let report = run_batch(&job, source, &names, config.scrape.workers).await;

    log::step(3, 3, "Writing results");
    for (sink, records) in [(posts, &report.posts), (stories, &report.stories)] {
        let written = sink.append_records(records).await?;
        sink.finish().await?;
        log::sub_item(&format!("{}: {} rows", sink.name(), written));
    }

    if !report.failures.is_empty() {
        log::warn(&format!("{} target(s) failed:", report.failures.len()));
        for failure in &report.failures {
            log::sub_item(&failure.to_string());
        }
    }

    let elapsed = Utc::now() - start_time;
    log::summary(
        "Scrape complete",
        &[
            ("Targets", report.targets.to_string()),
            ("Succeeded", report.succeeded().to_string()),
            ("Failed", report.failures.len().to_string()),
            ("Posts", report.posts.len().to_string()),
            ("Stories", report.stories.len().to_string()),
            ("Elapsed", format!("{}s", elapsed.num_seconds())),
        ],
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::pipeline::testing::{FakeSource, FakeUser, MemorySink, StaticTargets, media_at};

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.scrape.jitter_min_ms = 0;
        config.scrape.jitter_max_ms = 0;
        config
    }

    #[tokio::test]
    async fn three_target_scenario() {
        let now = Utc::now();
        let source = FakeSource::new()
            .with_user(
                "A",
                FakeUser::new("11")
                    .posts(vec![
                        media_at("1", Some("recent"), now - Duration::days(1)),
                        media_at("2", Some("stale"), now - Duration::days(10)),
                    ])
                    .stories(vec![media_at("3", None, now - Duration::hours(2))]),
            )
            .with_user("B", FakeUser::new("22").fail_media())
            .with_user("C", FakeUser::new("33"));

        let targets = StaticTargets(vec!["A".into(), "B".into(), "C".into()]);
        let posts = MemorySink::default();
        let stories = MemorySink::default();

        let report = run_scrape(&fast_config(), &source, &targets, &posts, &stories)
            .await
            .unwrap();

        let written_posts = posts.written.lock().unwrap().clone();
        let written_stories = stories.written.lock().unwrap().clone();
        assert_eq!(written_posts.len(), 1);
        assert_eq!(written_posts[0].owner_id, "11");
        assert_eq!(written_posts[0].link, "https://www.instagram.com/p/recent/");
        assert_eq!(written_stories.len(), 1);
        assert_eq!(written_stories[0].link, "https://www.instagram.com/stories/A/3/");

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].target, "B");

        assert_eq!(*posts.appends.lock().unwrap(), 1);
        assert_eq!(*stories.appends.lock().unwrap(), 1);
        assert!(*posts.finished.lock().unwrap());
        assert!(*stories.finished.lock().unwrap());
    }

    #[tokio::test]
    async fn header_row_is_treated_as_a_target() {
        let source = FakeSource::new().with_user("alice", FakeUser::new("1"));
        let targets = StaticTargets(vec!["username".into(), "alice".into()]);
        let posts = MemorySink::default();
        let stories = MemorySink::default();

        let report = run_scrape(&fast_config(), &source, &targets, &posts, &stories)
            .await
            .unwrap();

        assert_eq!(report.targets, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].target, "username");
        assert!(posts.written.lock().unwrap().is_empty());
    }
}
