// src/config.rs

//! Configuration loading utilities.
//!
//! The TOML file carries everything except the Instagram login, which
//! comes from the environment (optionally seeded from a `.env` file).

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Config;

pub const USERNAME_VAR: &str = "INSTAGRAM_USERNAME";
pub const PASSWORD_VAR: &str = "INSTAGRAM_PASSWORD";

/// Instagram account login.
#[derive(Clone)]
pub struct InstagramCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for InstagramCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstagramCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl InstagramCredentials {
    /// Read credentials from the process environment, loading `.env` first.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("Failed to read .env file: {}", e);
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build credentials from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::config(format!("{key} is not set")))
        };

        Ok(Self {
            username: read(USERNAME_VAR)?,
            password: read(PASSWORD_VAR)?,
        })
    }
}

/// Load and validate the configuration file.
///
/// Falls back to defaults if the file cannot be read.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_default(path);
    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid config {path:?}: {e}")))?;
    Ok(config)
}
