// src/models/mod.rs

//! Domain models for the scraper application.

mod config;
mod media;
mod record;

// Re-export all public types
pub use config::{Config, InstagramConfig, ScrapeConfig, SheetsConfig, VerifyMethod};
pub use media::{MediaItem, MediaKind, RawMediaItem, Timestamped, collect_media};
pub use record::{LINK_UNAVAILABLE, RECORD_HEADER, Record};
