//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Instagram client and session settings
    #[serde(default)]
    pub instagram: InstagramConfig,

    /// Spreadsheet location and worksheet names
    #[serde(default)]
    pub sheets: SheetsConfig,

    /// Time windows and worker pool
    #[serde(default)]
    pub scrape: ScrapeConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.instagram.user_agent.trim().is_empty() {
            return Err(AppError::validation("instagram.user_agent is empty"));
        }
        if self.instagram.timeout_secs == 0 {
            return Err(AppError::validation("instagram.timeout_secs must be > 0"));
        }
        if self.instagram.media_amount == 0 {
            return Err(AppError::validation("instagram.media_amount must be > 0"));
        }
        if self.sheets.spreadsheet_id.trim().is_empty() {
            return Err(AppError::validation("sheets.spreadsheet_id is empty"));
        }
        let names = [
            &self.sheets.targets_sheet,
            &self.sheets.posts_sheet,
            &self.sheets.stories_sheet,
        ];
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(AppError::validation("worksheet names must not be empty"));
        }
        if self.sheets.new_sheet_rows == 0 || self.sheets.new_sheet_cols == 0 {
            return Err(AppError::validation(
                "sheets.new_sheet_rows and sheets.new_sheet_cols must be > 0",
            ));
        }
        if self.scrape.workers == 0 {
            return Err(AppError::validation("scrape.workers must be > 0"));
        }
        let now = Utc::now();
        for window in [self.scrape.post_window()?, self.scrape.story_window()?] {
            if now.checked_sub_signed(window).is_none() {
                return Err(AppError::validation(
                    "scrape window reaches past the earliest representable date",
                ));
            }
        }
        if self.scrape.jitter_min_ms > self.scrape.jitter_max_ms {
            return Err(AppError::validation(
                "scrape.jitter_min_ms must not exceed scrape.jitter_max_ms",
            ));
        }
        Ok(())
    }
}

/// How the challenge code should be delivered when Instagram asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMethod {
    Sms,
    #[default]
    Email,
}

impl VerifyMethod {
    /// Value of the `choice` field in the challenge form.
    pub fn choice(self) -> &'static str {
        match self {
            VerifyMethod::Sms => "0",
            VerifyMethod::Email => "1",
        }
    }
}

/// Instagram private API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramConfig {
    /// Base URL of the private API
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Mobile app User-Agent header
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// `X-IG-App-ID` header value
    #[serde(default = "defaults::app_id")]
    pub app_id: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Serialized login session, reused across runs
    #[serde(default = "defaults::session_file")]
    pub session_file: PathBuf,

    /// Maximum posts and reels fetched per target
    #[serde(default = "defaults::media_amount")]
    pub media_amount: usize,

    /// Delivery channel requested for challenge codes
    #[serde(default)]
    pub verify_method: VerifyMethod,
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::api_base(),
            user_agent: defaults::user_agent(),
            app_id: defaults::app_id(),
            timeout_secs: defaults::timeout(),
            session_file: defaults::session_file(),
            media_amount: defaults::media_amount(),
            verify_method: VerifyMethod::default(),
        }
    }
}

/// Google Sheets settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// Base URL of the Sheets v4 API
    #[serde(default = "defaults::sheets_api_base")]
    pub api_base: String,

    /// Service-account key file
    #[serde(default = "defaults::credentials_file")]
    pub credentials_file: PathBuf,

    /// Spreadsheet key from the sheet URL
    #[serde(default = "defaults::spreadsheet_id")]
    pub spreadsheet_id: String,

    /// Worksheet whose first column lists target usernames
    #[serde(default = "defaults::targets_sheet")]
    pub targets_sheet: String,

    #[serde(default = "defaults::posts_sheet")]
    pub posts_sheet: String,

    #[serde(default = "defaults::stories_sheet")]
    pub stories_sheet: String,

    /// Grid size of newly created worksheets
    #[serde(default = "defaults::new_sheet_rows")]
    pub new_sheet_rows: u32,

    #[serde(default = "defaults::new_sheet_cols")]
    pub new_sheet_cols: u32,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::sheets_api_base(),
            credentials_file: defaults::credentials_file(),
            spreadsheet_id: defaults::spreadsheet_id(),
            targets_sheet: defaults::targets_sheet(),
            posts_sheet: defaults::posts_sheet(),
            stories_sheet: defaults::stories_sheet(),
            new_sheet_rows: defaults::new_sheet_rows(),
            new_sheet_cols: defaults::new_sheet_cols(),
        }
    }
}

/// Batch behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Concurrent fetch jobs
    #[serde(default = "defaults::workers")]
    pub workers: usize,

    /// Posts older than this many days are dropped
    #[serde(default = "defaults::post_window_days")]
    pub post_window_days: i64,

    /// Stories older than this many hours are dropped
    #[serde(default = "defaults::story_window_hours")]
    pub story_window_hours: i64,

    /// Random delay before each target, lower bound
    #[serde(default = "defaults::jitter_min_ms")]
    pub jitter_min_ms: u64,

    /// Random delay before each target, upper bound
    #[serde(default = "defaults::jitter_max_ms")]
    pub jitter_max_ms: u64,
}

impl ScrapeConfig {
    /// Age limit for posts. Must be positive and representable.
    pub fn post_window(&self) -> Result<TimeDelta> {
        TimeDelta::try_days(self.post_window_days)
            .filter(|w| *w > TimeDelta::zero())
            .ok_or_else(|| {
                AppError::validation(format!(
                    "scrape.post_window_days out of range: {}",
                    self.post_window_days
                ))
            })
    }

    /// Age limit for stories. Must be positive and representable.
    pub fn story_window(&self) -> Result<TimeDelta> {
        TimeDelta::try_hours(self.story_window_hours)
            .filter(|w| *w > TimeDelta::zero())
            .ok_or_else(|| {
                AppError::validation(format!(
                    "scrape.story_window_hours out of range: {}",
                    self.story_window_hours
                ))
            })
    }

    pub fn jitter(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.jitter_min_ms),
            Duration::from_millis(self.jitter_max_ms),
        )
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            workers: defaults::workers(),
            post_window_days: defaults::post_window_days(),
            story_window_hours: defaults::story_window_hours(),
            jitter_min_ms: defaults::jitter_min_ms(),
            jitter_max_ms: defaults::jitter_max_ms(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Instagram defaults
    pub fn api_base() -> String {
        "https://i.instagram.com/api/v1".into()
    }
    pub fn user_agent() -> String {
        "Instagram 269.0.0.18.75 Android (26/8.0.0; 480dpi; 1080x1920; OnePlus; 6T Dev; devitron; qcom; en_US; 314665256)".into()
    }
    pub fn app_id() -> String {
        "567067343352427".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn session_file() -> PathBuf {
        PathBuf::from("./instagram_session.json")
    }
    pub fn media_amount() -> usize {
        50
    }

    // Sheets defaults
    pub fn sheets_api_base() -> String {
        "https://sheets.googleapis.com/v4".into()
    }
    pub fn credentials_file() -> PathBuf {
        PathBuf::from("credentials.json")
    }
    pub fn spreadsheet_id() -> String {
        "1n361E435E0EJdMFSYmZc5U1_W6q_McZkEOUqOzv8Cmo".into()
    }
    pub fn targets_sheet() -> String {
        "UserList".into()
    }
    pub fn posts_sheet() -> String {
        "Posts".into()
    }
    pub fn stories_sheet() -> String {
        "Stories".into()
    }
    pub fn new_sheet_rows() -> u32 {
        1000
    }
    pub fn new_sheet_cols() -> u32 {
        10
    }

    // Scrape defaults
    pub fn workers() -> usize {
        5
    }
    pub fn post_window_days() -> i64 {
        7
    }
    pub fn story_window_hours() -> i64 {
        10
    }
    pub fn jitter_min_ms() -> u64 {
        2_000
    }
    pub fn jitter_max_ms() -> u64 {
        5_000
    }
}
