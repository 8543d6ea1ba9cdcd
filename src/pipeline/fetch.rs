// src/pipeline/fetch.rs

//! Per-target fetch job.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;

use crate::error::{AppError, Result};
use crate::models::{MediaKind, Record, ScrapeConfig};
use crate::pipeline::filter::filter_by_cutoff;
use crate::pipeline::records::map_records;
use crate::services::MediaSource;

/// Cutoff instants shared by every target of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub posts_cutoff: DateTime<Utc>,
    pub stories_cutoff: DateTime<Utc>,
}

impl Window {
    pub fn ending_at(
        now: DateTime<Utc>,
        post_window: chrono::Duration,
        story_window: chrono::Duration,
    ) -> Result<Self> {
        let cutoff = |window: chrono::Duration| {
            now.checked_sub_signed(window).ok_or_else(|| {
                AppError::validation(format!("window of {window} ends before the representable range"))
            })
        };
        Ok(Self {
            posts_cutoff: cutoff(post_window)?,
            stories_cutoff: cutoff(story_window)?,
        })
    }
}

/// Random pause taken before each target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    min: Duration,
    max: Duration,
}

impl Jitter {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Draw a delay uniformly from `[min, max]`.
    pub fn sample(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        if max <= min {
            return self.min;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

/// Step of the job that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    /// Username to account id lookup
    Resolve,
    Media,
    Stories,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStage::Resolve => write!(f, "user lookup"),
            FetchStage::Media => write!(f, "media fetch"),
            FetchStage::Stories => write!(f, "story fetch"),
        }
    }
}

/// Why one target produced no records.
#[derive(Debug, Error)]
#[error("@{target} failed during {stage}: {error}")]
pub struct TargetFailure {
    pub target: String,
    pub stage: FetchStage,
    #[source]
    pub error: AppError,
}

impl TargetFailure {
    pub fn new(target: &str, stage: FetchStage, error: AppError) -> Self {
        Self {
            target: target.to_string(),
            stage,
            error,
        }
    }
}

/// Records produced for one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetRecords {
    pub posts: Vec<Record>,
    pub stories: Vec<Record>,
}

pub type FetchOutcome = std::result::Result<TargetRecords, TargetFailure>;

/// Lookup, fetch, filter and map for one username at a time.
#[derive(Debug, Clone)]
pub struct FetchJob {
    window: Window,
    media_amount: usize,
    jitter: Jitter,
}

impl FetchJob {
    pub fn new(window: Window, media_amount: usize, jitter: Jitter) -> Self {
        Self {
            window,
            media_amount,
            jitter,
        }
    }

    /// Job whose window ends at `now`.
    pub fn from_config(
        config: &ScrapeConfig,
        media_amount: usize,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let window = Window::ending_at(now, config.post_window()?, config.story_window()?)?;
        let (min, max) = config.jitter();
        Ok(Self::new(window, media_amount, Jitter::new(min, max)))
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Run the job for `target` against `source`.
    ///
    /// Always waits the jitter delay first, whatever happens afterwards.
    pub async fn run(&self, source: &dyn MediaSource, target: &str) -> FetchOutcome {
        let delay = self.jitter.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let user_id = source
            .user_id_from_username(target)
            .await
            .map_err(|e| TargetFailure::new(target, FetchStage::Resolve, e))?;
        log::info!("User id @{}: {}", target, user_id);

        let media = source
            .user_medias(&user_id, self.media_amount)
            .await
            .map_err(|e| TargetFailure::new(target, FetchStage::Media, e))?;
        let stories = source
            .user_stories(&user_id)
            .await
            .map_err(|e| TargetFailure::new(target, FetchStage::Stories, e))?;

        let recent_posts = filter_by_cutoff(media, self.window.posts_cutoff);
        let recent_stories = filter_by_cutoff(stories, self.window.stories_cutoff);

        Ok(TargetRecords {
            posts: map_records(&recent_posts, MediaKind::Post, &user_id, target),
            stories: map_records(&recent_stories, MediaKind::Story, &user_id, target),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::pipeline::testing::{FakeSource, FakeUser, media_at};

    fn job(now: DateTime<Utc>) -> FetchJob {
        let window =
            Window::ending_at(now, ChronoDuration::days(7), ChronoDuration::hours(10)).unwrap();
        FetchJob::new(window, 50, Jitter::none())
    }

    #[test]
    fn window_offsets() {
        let now = Utc::now();
        let window =
            Window::ending_at(now, ChronoDuration::days(7), ChronoDuration::hours(10)).unwrap();
        assert_eq!(now - window.posts_cutoff, ChronoDuration::days(7));
        assert_eq!(now - window.stories_cutoff, ChronoDuration::hours(10));
    }

    #[test]
    fn from_config_uses_configured_windows() {
        let now = Utc::now();
        let job = FetchJob::from_config(&ScrapeConfig::default(), 50, now).unwrap();
        assert_eq!(job.window().posts_cutoff, now - ChronoDuration::days(7));
        assert_eq!(job.window().stories_cutoff, now - ChronoDuration::hours(10));
    }

    #[test]
    fn from_config_rejects_out_of_range_windows() {
        let now = Utc::now();

        let mut config = ScrapeConfig::default();
        config.post_window_days = i64::MAX / 2;
        assert!(matches!(
            FetchJob::from_config(&config, 50, now),
            Err(AppError::Validation(_))
        ));

        let mut config = ScrapeConfig::default();
        config.story_window_hours = -5;
        assert!(FetchJob::from_config(&config, 50, now).is_err());

        let mut config = ScrapeConfig::default();
        config.post_window_days = 100_000_000_000;
        assert!(FetchJob::from_config(&config, 50, now).is_err());
    }

    #[test]
    fn jitter_stays_in_range() {
        let jitter = Jitter::new(Duration::from_secs(2), Duration::from_secs(5));
        for _ in 0..100 {
            let d = jitter.sample();
            assert!(d >= Duration::from_secs(2) && d <= Duration::from_secs(5));
        }
        assert_eq!(Jitter::none().sample(), Duration::ZERO);
    }

    #[test]
    fn inverted_jitter_bounds_are_swapped() {
        let jitter = Jitter::new(Duration::from_secs(5), Duration::from_secs(2));
        let d = jitter.sample();
        assert!(d >= Duration::from_secs(2) && d <= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn filters_and_maps_both_kinds() {
        let now = Utc::now();
        let source = FakeSource::new().with_user(
            "alice",
            FakeUser::new("100")
                .posts(vec![
                    media_at("p1", Some("NEW"), now - ChronoDuration::days(1)),
                    media_at("p2", Some("OLD"), now - ChronoDuration::days(8)),
                    media_at("p3", None, now - ChronoDuration::days(2)),
                ])
                .stories(vec![
                    media_at("s1", None, now - ChronoDuration::hours(1)),
                    media_at("s2", None, now - ChronoDuration::hours(11)),
                ]),
        );

        let records = job(now).run(&source, "alice").await.unwrap();

        let post_links: Vec<_> = records.posts.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(
            post_links,
            vec!["https://www.instagram.com/p/NEW/", "Link unavailable"]
        );
        assert_eq!(records.stories.len(), 1);
        assert_eq!(
            records.stories[0].link,
            "https://www.instagram.com/stories/alice/s1/"
        );
        assert!(records.posts.iter().all(|r| r.owner_id == "100"));
    }

    #[tokio::test]
    async fn unknown_user_fails_at_resolve() {
        let failure = job(Utc::now())
            .run(&FakeSource::new(), "ghost")
            .await
            .unwrap_err();

        assert_eq!(failure.target, "ghost");
        assert_eq!(failure.stage, FetchStage::Resolve);
        assert!(matches!(failure.error, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn story_failure_is_reported_with_stage() {
        let source = FakeSource::new().with_user("carol", FakeUser::new("7").fail_stories());
        let failure = job(Utc::now()).run(&source, "carol").await.unwrap_err();

        assert_eq!(failure.stage, FetchStage::Stories);
        assert!(failure.to_string().starts_with("@carol failed during story fetch"));
    }
}
