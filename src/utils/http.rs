// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::Response;

use crate::error::Result;
use crate::models::InstagramConfig;

/// Create a configured asynchronous HTTP client for the Instagram API.
pub fn create_client(config: &InstagramConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Create a plain client for Google APIs.
pub fn create_google_client(timeout_secs: u64) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

/// Split a response into its status code and body text.
pub async fn status_and_body(resp: Response) -> (u16, String) {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    (status, body)
}
