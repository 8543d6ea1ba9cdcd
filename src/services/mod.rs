//! Service layer for the scraper application.
//!
//! This module contains the clients for the two external services:
//! - Instagram private API (`InstagramClient`) and its login flow (`SessionManager`)
//! - Google Sheets v4 API (`SheetsClient`) with service-account auth (`TokenProvider`)

mod auth;
mod instagram;
mod session;
mod sheets;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::MediaItem;

pub use auth::{ServiceAccountKey, TokenProvider, SHEETS_SCOPE};
pub use instagram::{InstagramClient, LoginGrant};
pub use session::{AccountApi, CodePrompt, DeviceIds, Session, SessionManager};
pub use sheets::{GridProperties, SheetProperties, SheetsClient, requests};

/// Read access to one authenticated Instagram account.
///
/// Implementations are shared by every fetch job in a batch, so calls
/// take `&self` and must be safe to run concurrently.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Resolve a username to its numeric account id.
    async fn user_id_from_username(&self, username: &str) -> Result<String>;

    /// Fetch up to `amount` of the newest posts and reels.
    async fn user_medias(&self, user_id: &str, amount: usize) -> Result<Vec<MediaItem>>;

    /// Fetch the currently visible stories.
    async fn user_stories(&self, user_id: &str) -> Result<Vec<MediaItem>>;
}

/// Spreadsheet calls the worksheet storage makes.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Properties of every worksheet.
    async fn list_sheets(&self) -> Result<Vec<SheetProperties>>;

    /// Properties of the worksheet named `title`, if any.
    async fn find_sheet(&self, title: &str) -> Result<Option<SheetProperties>> {
        Ok(self
            .list_sheets()
            .await?
            .into_iter()
            .find(|s| s.title == title))
    }

    /// Add a worksheet with the given grid size.
    async fn add_sheet(&self, title: &str, rows: u32, cols: u32) -> Result<SheetProperties>;

    /// Cells of one 1-based column, top to bottom.
    async fn column_values(&self, title: &str, column: u32) -> Result<Vec<String>>;

    /// Append rows after the last non-empty row.
    async fn append_rows(&self, title: &str, rows: &[Vec<String>]) -> Result<()>;

    /// Run structural requests; returns one reply per request.
    async fn batch_update(&self, requests: Vec<Value>) -> Result<Vec<Value>>;
}
