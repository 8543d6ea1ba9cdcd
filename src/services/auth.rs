// src/services/auth.rs

//! Google service-account authentication.
//!
//! Signs an RS256 assertion with the key file's private key and trades it
//! for a short-lived access token (OAuth 2.0 JWT bearer grant).

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::utils::http;

/// OAuth scope for reading and writing spreadsheets.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Lifetime requested for each assertion.
const ASSERTION_TTL_SECS: i64 = 3600;

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Contents of a service-account key file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_TTL_SECS
}

impl ServiceAccountKey {
    /// Read a key file downloaded from the Google Cloud console.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("Cannot read credentials file {path:?}: {e}"))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            AppError::config(format!("Invalid credentials file {path:?}: {e}"))
        })
    }

    /// Build the signed assertion for `scope`.
    pub fn sign_assertion(&self, scope: &str, now: DateTime<Utc>) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let claims = Claims {
            iss: self.client_email.clone(),
            scope: scope.to_string(),
            aud: self.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ASSERTION_TTL_SECS)).timestamp(),
        };

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())?;
        Ok(encode(&header, &claims, &key)?)
    }
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

/// Hands out cached access tokens, refreshing them when they near expiry.
pub struct TokenProvider {
    http: reqwest::Client,
    key: ServiceAccountKey,
    scope: String,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenProvider {
    pub fn new(key: ServiceAccountKey, scope: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            http: http::create_google_client(timeout_secs)?,
            key,
            scope: scope.into(),
            cached: Mutex::new(None),
        })
    }

    /// Service account this provider signs for.
    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// A valid bearer token.
    pub async fn token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let token = self.fetch(now).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch(&self, now: DateTime<Utc>) -> Result<AccessToken> {
        log::debug!("Requesting access token for {}", self.key.client_email);
        let assertion = self.key.sign_assertion(&self.scope, now)?;

        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let (status, body) = http::status_and_body(resp).await;
            return Err(AppError::sheets(status, format!("token exchange failed: {body}")));
        }

        let token: TokenResponse = resp.json().await?;
        Ok(AccessToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{DecodingKey, Validation, decode};

    use super::*;

    const KEY_JSON: &str = include_str!("../../testdata/service_account.json");
    const PUBLIC_PEM: &str = include_str!("../../testdata/service_account.pub.pem");

    #[test]
    fn key_file_parses() {
        let key: ServiceAccountKey = serde_json::from_str(KEY_JSON).unwrap();
        assert_eq!(
            key.client_email,
            "scraper@instasheet-test.iam.gserviceaccount.com"
        );
        assert_eq!(key.token_uri, "https://oauth2.googleapis.com/token");
        assert_eq!(key.private_key_id.as_deref(), Some("test-key-1"));
    }

    #[test]
    fn missing_key_file_is_config_error() {
        let err = ServiceAccountKey::load(Path::new("/no/such/credentials.json")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn assertion_verifies_with_public_key() {
        let key: ServiceAccountKey = serde_json::from_str(KEY_JSON).unwrap();
        let now = Utc::now();
        let jwt = key.sign_assertion(SHEETS_SCOPE, now).unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&["https://oauth2.googleapis.com/token"]);
        let decoded = decode::<Claims>(
            &jwt,
            &DecodingKey::from_rsa_pem(PUBLIC_PEM.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.header.kid.as_deref(), Some("test-key-1"));
        assert_eq!(decoded.claims.iss, key.client_email);
        assert_eq!(decoded.claims.scope, SHEETS_SCOPE);
        assert_eq!(decoded.claims.exp - decoded.claims.iat, ASSERTION_TTL_SECS);
    }

    #[test]
    fn token_freshness_respects_margin() {
        let now = Utc::now();
        let token = AccessToken {
            value: "t".to_string(),
            expires_at: now + Duration::seconds(30),
        };
        assert!(!token.is_fresh(now));

        let token = AccessToken {
            value: "t".to_string(),
            expires_at: now + Duration::seconds(600),
        };
        assert!(token.is_fresh(now));
    }

    #[tokio::test]
    async fn cached_token_is_reused() {
        let key: ServiceAccountKey = serde_json::from_str(KEY_JSON).unwrap();
        let provider = TokenProvider::new(key, SHEETS_SCOPE, 5).unwrap();
        *provider.cached.lock().await = Some(AccessToken {
            value: "cached-token".to_string(),
            expires_at: Utc::now() + Duration::seconds(600),
        });

        assert_eq!(provider.token().await.unwrap(), "cached-token");
    }
}
