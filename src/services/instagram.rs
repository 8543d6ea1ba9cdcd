// src/services/instagram.rs

//! Instagram private API client.
//!
//! Speaks the mobile app endpoints under `i.instagram.com/api/v1`. A client
//! is built around one [`Session`]; it never mutates it, so the same handle
//! can be shared by every fetch job of a batch.

use std::future::Future;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::RequestBuilder;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{InstagramConfig, MediaItem, MediaKind, RawMediaItem, VerifyMethod, collect_media};
use crate::services::MediaSource;
use crate::services::session::{AccountApi, Session};
use crate::utils::http;

/// Upper bound on items requested per feed page.
const FEED_PAGE_SIZE: usize = 33;

/// Result of a successful login or challenge submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub user_id: String,
    /// `Bearer IGT:...` value from the `ig-set-authorization` header
    pub authorization: Option<String>,
}

/// Error body returned by the private API.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    challenge: Option<ChallengeBody>,
}

#[derive(Debug, Deserialize)]
struct ChallengeBody {
    api_path: String,
    #[serde(default)]
    step_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserRef {
    #[serde(deserialize_with = "id_string")]
    pk: String,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    user: UserRef,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    logged_in_user: UserRef,
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    items: Vec<RawMediaItem>,
    #[serde(default)]
    more_available: bool,
    #[serde(default)]
    next_max_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReelResponse {
    #[serde(default)]
    reel: Option<Reel>,
}

#[derive(Debug, Deserialize)]
struct Reel {
    #[serde(default)]
    items: Vec<RawMediaItem>,
}

/// Authenticated (or about-to-authenticate) Instagram API handle.
pub struct InstagramClient {
    http: reqwest::Client,
    api_base: Url,
    app_id: String,
    session: Session,
}

impl InstagramClient {
    /// Create a client bound to `session`.
    pub fn new(config: &InstagramConfig, session: Session) -> Result<Self> {
        let api_base = Url::parse(config.api_base.trim_end_matches('/'))?;
        Ok(Self {
            http: http::create_client(config)?,
            api_base,
            app_id: config.app_id.clone(),
            session,
        })
    }

    /// The session this client sends.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// One page of `feed/user/{id}/`.
    async fn feed_page(
        &self,
        user_id: &str,
        count: usize,
        max_id: Option<String>,
    ) -> Result<FeedResponse> {
        let mut url = self.endpoint(&["feed", "user", user_id])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("count", &count.to_string());
            if let Some(id) = &max_id {
                query.append_pair("max_id", id);
            }
        }
        let page: FeedResponse = self.get_json(url).await?;
        log::debug!("Feed page for {}: {} items", user_id, page.items.len());
        Ok(page)
    }

    /// Build `{api_base}/{segments...}/`.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| AppError::config("instagram.api_base cannot be a base URL"))?;
            path.pop_if_empty();
            path.extend(segments);
            path.push("");
        }
        Ok(url)
    }

    /// Challenge paths are absolute paths under the API root.
    fn challenge_url(&self, api_path: &str) -> Result<Url> {
        let base = self.api_base.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{}/{}", base, api_path.trim_start_matches('/')))?)
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let device = &self.session.device;
        let pairs = [
            ("x-ig-app-id", self.app_id.as_str()),
            ("x-ig-device-id", device.uuid.as_str()),
            ("x-ig-android-id", device.device_id.as_str()),
            ("x-ig-app-locale", "en_US"),
            ("x-ig-capabilities", "3brTvx0="),
            ("x-ig-connection-type", "WIFI"),
        ];
        for (name, value) in pairs {
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(name, value);
            }
        }
        if !self.session.user_agent.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&self.session.user_agent) {
                headers.insert(reqwest::header::USER_AGENT, value);
            }
        }
        if let Some(auth) = &self.session.authorization {
            if let Ok(value) = HeaderValue::from_str(auth) {
                headers.insert(reqwest::header::AUTHORIZATION, value);
            }
        }
        if let Some(user_id) = &self.session.user_id {
            if let Ok(value) = HeaderValue::from_str(user_id) {
                headers.insert("ig-u-ds-user-id", value);
            }
        }
        headers
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let request = self.http.get(url).headers(self.headers());
        let (body, _) = self.send(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn post_signed<T: DeserializeOwned>(
        &self,
        url: Url,
        payload: &serde_json::Value,
    ) -> Result<(T, HeaderMap)> {
        let signed = format!("SIGNATURE.{}", serde_json::to_string(payload)?);
        let request = self
            .http
            .post(url)
            .headers(self.headers())
            .form(&[("signed_body", signed.as_str())]);
        let (body, headers) = self.send(request).await?;
        Ok((serde_json::from_str(&body)?, headers))
    }

    async fn send(&self, request: RequestBuilder) -> Result<(String, HeaderMap)> {
        let resp = request.send().await?;
        let headers = resp.headers().clone();
        let success = resp.status().is_success();
        let (status, body) = http::status_and_body(resp).await;
        if !success {
            return Err(classify_error(status, &body));
        }
        Ok((body, headers))
    }
}

#[async_trait]
impl AccountApi for InstagramClient {
    fn into_session(self) -> Session {
        self.session
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginGrant> {
        let device = &self.session.device;
        let payload = serde_json::json!({
            "jazoest": jazoest(&device.phone_id),
            "country_codes": r#"[{"country_code":"1","source":["default"]}]"#,
            "phone_id": device.phone_id,
            "enc_password": format!("#PWD_INSTAGRAM:0:{}:{}", chrono::Utc::now().timestamp(), password),
            "username": username,
            "adid": "",
            "guid": device.uuid,
            "device_id": device.device_id,
            "google_tokens": "[]",
            "login_attempt_count": "0",
        });

        let url = self.endpoint(&["accounts", "login"])?;
        let (body, headers) = self.post_signed::<LoginResponse>(url, &payload).await?;
        Ok(LoginGrant {
            user_id: body.logged_in_user.pk,
            authorization: authorization_header(&headers),
        })
    }

    async fn current_user(&self) -> Result<String> {
        let mut url = self.endpoint(&["accounts", "current_user"])?;
        url.query_pairs_mut().append_pair("edit", "true");
        let info: UserInfoResponse = self.get_json(url).await?;
        Ok(info.user.pk)
    }

    async fn challenge_select(&self, api_path: &str, method: VerifyMethod) -> Result<()> {
        let url = self.challenge_url(api_path)?;
        let payload = serde_json::json!({ "choice": method.choice() });
        self.post_signed::<serde_json::Value>(url, &payload).await?;
        Ok(())
    }

    async fn challenge_submit(&self, api_path: &str, code: &str) -> Result<LoginGrant> {
        let url = self.challenge_url(api_path)?;
        let payload = serde_json::json!({ "security_code": code });
        let (body, headers) = self.post_signed::<LoginResponse>(url, &payload).await?;
        Ok(LoginGrant {
            user_id: body.logged_in_user.pk,
            authorization: authorization_header(&headers),
        })
    }
}

#[async_trait]
impl MediaSource for InstagramClient {
    async fn user_id_from_username(&self, username: &str) -> Result<String> {
        let url = self.endpoint(&["users", username, "usernameinfo"])?;
        let info: UserInfoResponse = self.get_json(url).await?;
        Ok(info.user.pk)
    }

    async fn user_medias(&self, user_id: &str, amount: usize) -> Result<Vec<MediaItem>> {
        let raw = walk_feed(amount, |count, max_id| self.feed_page(user_id, count, max_id)).await?;
        Ok(collect_media(raw, MediaKind::Post))
    }

    async fn user_stories(&self, user_id: &str) -> Result<Vec<MediaItem>> {
        let url = self.endpoint(&["feed", "user", user_id, "story"])?;
        let resp: ReelResponse = self.get_json(url).await?;
        let raw = resp.reel.map(|r| r.items).unwrap_or_default();
        Ok(collect_media(raw, MediaKind::Story))
    }
}

/// Follow `next_max_id` until `amount` items are collected or the feed ends.
///
/// `fetch_page` receives the number of items still wanted (capped at
/// [`FEED_PAGE_SIZE`]) and the cursor of the previous page.
async fn walk_feed<F, Fut>(amount: usize, mut fetch_page: F) -> Result<Vec<RawMediaItem>>
where
    F: FnMut(usize, Option<String>) -> Fut,
    Fut: Future<Output = Result<FeedResponse>>,
{
    let mut raw = Vec::new();
    let mut max_id: Option<String> = None;

    while raw.len() < amount {
        let count = (amount - raw.len()).min(FEED_PAGE_SIZE);
        let page = fetch_page(count, max_id.take()).await?;
        let empty = page.items.is_empty();
        raw.extend(page.items);

        match page.next_max_id {
            Some(next) if page.more_available && !empty => max_id = Some(next),
            _ => break,
        }
    }

    raw.truncate(amount);
    Ok(raw)
}

/// Map a failed response to the matching error variant.
fn classify_error(status: u16, body: &str) -> AppError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message.clone().unwrap_or_else(|| body.trim().to_string());

    if let Some(challenge) = parsed.challenge {
        return AppError::ChallengeRequired {
            api_path: challenge.api_path,
            step_name: challenge.step_name,
        };
    }

    match (message.as_str(), parsed.error_type.as_deref()) {
        ("login_required", _) => AppError::LoginRequired,
        (_, Some("bad_password" | "invalid_user" | "invalid_credentials")) => {
            AppError::BadCredentials(message)
        }
        _ if status == 401 => AppError::LoginRequired,
        _ if status == 404 => AppError::not_found(message),
        _ => AppError::instagram(status, message),
    }
}

fn authorization_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get("ig-set-authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.ends_with(':'))
        .map(str::to_string)
}

/// Checksum field the login form expects next to the phone id.
fn jazoest(phone_id: &str) -> String {
    let sum: u32 = phone_id.bytes().map(u32::from).sum();
    format!("2{sum}")
}

fn id_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
