// src/error.rs

//! Unified error handling for the scraper application.

use std::fmt;

use thiserror::Error;

/// Result type alias for scraper operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Service-account token signing failed
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Google Sheets API returned a non-success status
    #[error("Sheets API error (status {status}): {message}")]
    Sheets { status: u16, message: String },

    /// Instagram API returned a non-success status
    #[error("Instagram API error (status {status}): {message}")]
    Instagram { status: u16, message: String },

    /// The stored session is no longer accepted
    #[error("Login required: session is not valid")]
    LoginRequired,

    /// Instagram demands interactive verification
    #[error("Challenge required at {api_path} (step: {})", step_name.as_deref().unwrap_or("unknown"))]
    ChallengeRequired {
        api_path: String,
        step_name: Option<String>,
    },

    /// Username or password rejected
    #[error("Bad credentials: {0}")]
    BadCredentials(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Console prompt failed
    #[error("Prompt error: {0}")]
    Prompt(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a Sheets API error.
    pub fn sheets(status: u16, message: impl fmt::Display) -> Self {
        Self::Sheets {
            status,
            message: message.to_string(),
        }
    }

    /// Create an Instagram API error.
    pub fn instagram(status: u16, message: impl fmt::Display) -> Self {
        Self::Instagram {
            status,
            message: message.to_string(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Whether this error means the session must be recreated.
    pub fn is_login_required(&self) -> bool {
        matches!(self, Self::LoginRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_message_includes_step() {
        let err = AppError::ChallengeRequired {
            api_path: "/challenge/1/abc/".to_string(),
            step_name: Some("select_verify_method".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Challenge required at /challenge/1/abc/ (step: select_verify_method)"
        );
    }

    #[test]
    fn challenge_message_without_step() {
        let err = AppError::ChallengeRequired {
            api_path: "/challenge/".to_string(),
            step_name: None,
        };
        assert!(err.to_string().ends_with("(step: unknown)"));
    }

    #[test]
    fn login_required_detection() {
        assert!(AppError::LoginRequired.is_login_required());
        assert!(!AppError::config("x").is_login_required());
    }
}
