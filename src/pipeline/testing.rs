//! In-memory stand-ins for the external services.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{MediaItem, Record};
use crate::services::MediaSource;
use crate::storage::{RecordSink, TargetSource};

pub fn media_at(pk: &str, code: Option<&str>, taken_at: DateTime<Utc>) -> MediaItem {
    MediaItem {
        id: format!("{pk}_owner"),
        pk: pk.to_string(),
        code: code.map(str::to_string),
        taken_at,
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeUser {
    id: String,
    posts: Vec<MediaItem>,
    stories: Vec<MediaItem>,
    fail_media: bool,
    fail_stories: bool,
    delay: Duration,
}

impl FakeUser {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    pub fn posts(mut self, posts: Vec<MediaItem>) -> Self {
        self.posts = posts;
        self
    }

    pub fn stories(mut self, stories: Vec<MediaItem>) -> Self {
        self.stories = stories;
        self
    }

    pub fn fail_media(mut self) -> Self {
        self.fail_media = true;
        self
    }

    pub fn fail_stories(mut self) -> Self {
        self.fail_stories = true;
        self
    }

    /// Slow down the username lookup.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
pub struct FakeSource {
    users: HashMap<String, FakeUser>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, name: &str, user: FakeUser) -> Self {
        self.users.insert(name.to_string(), user);
        self
    }

    fn by_id(&self, user_id: &str) -> Result<&FakeUser> {
        self.users
            .values()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::not_found(format!("user id {user_id}")))
    }
}

#[async_trait]
impl MediaSource for FakeSource {
    async fn user_id_from_username(&self, username: &str) -> Result<String> {
        let user = self
            .users
            .get(username)
            .ok_or_else(|| AppError::not_found(format!("@{username}")))?;
        if !user.delay.is_zero() {
            tokio::time::sleep(user.delay).await;
        }
        Ok(user.id.clone())
    }

    async fn user_medias(&self, user_id: &str, amount: usize) -> Result<Vec<MediaItem>> {
        let user = self.by_id(user_id)?;
        if user.fail_media {
            return Err(AppError::instagram(500, "media feed exploded"));
        }
        Ok(user.posts.iter().take(amount).cloned().collect())
    }

    async fn user_stories(&self, user_id: &str) -> Result<Vec<MediaItem>> {
        let user = self.by_id(user_id)?;
        if user.fail_stories {
            return Err(AppError::instagram(500, "story reel exploded"));
        }
        Ok(user.stories.clone())
    }
}

pub struct StaticTargets(pub Vec<String>);

#[async_trait]
impl TargetSource for StaticTargets {
    async fn read_targets(&self) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
pub struct MemorySink {
    pub written: Mutex<Vec<Record>>,
    pub appends: Mutex<usize>,
    pub finished: Mutex<bool>,
}

#[async_trait]
impl RecordSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append_records(&self, records: &[Record]) -> Result<usize> {
        self.written.lock().unwrap().extend_from_slice(records);
        *self.appends.lock().unwrap() += 1;
        Ok(records.len())
    }

    async fn finish(&self) -> Result<()> {
        *self.finished.lock().unwrap() = true;
        Ok(())
    }
}
