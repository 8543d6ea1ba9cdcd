// src/services/session.rs

//! Login session persistence and the login flow.
//!
//! A session is stored as pretty JSON next to the binary (by default
//! `./instagram_session.json`) and reused until Instagram rejects it.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::InstagramCredentials;
use crate::error::{AppError, Result};
use crate::models::{InstagramConfig, VerifyMethod};
use crate::services::instagram::{InstagramClient, LoginGrant};

/// Source of one-time challenge codes.
///
/// The CLI asks on the console; tests hand back a fixed code.
pub trait CodePrompt: Send + Sync {
    fn verification_code(&self, message: &str) -> Result<String>;
}

/// Device identity presented to Instagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIds {
    /// `android-` followed by 16 hex digits
    pub device_id: String,
    pub phone_id: String,
    pub uuid: String,
}

impl DeviceIds {
    /// Derive stable ids from the account name so that recreated sessions
    /// look like the same phone.
    pub fn for_username(username: &str) -> Self {
        let digest = |salt: &str| Sha256::digest(format!("{salt}:{username}").as_bytes());

        let device_hash = hex::encode(digest("device"));
        let phone = Self::uuid_from(&digest("phone"));
        let uuid = Self::uuid_from(&digest("uuid"));

        Self {
            device_id: format!("android-{}", &device_hash[..16]),
            phone_id: phone.to_string(),
            uuid: uuid.to_string(),
        }
    }

    fn uuid_from(hash: &[u8]) -> Uuid {
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash[..16]);
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}

/// Serialized login state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,

    #[serde(default)]
    pub user_id: Option<String>,

    /// `Authorization` header value
    #[serde(default)]
    pub authorization: Option<String>,

    pub device: DeviceIds,

    /// User-Agent the session was created with; kept on reuse
    #[serde(default)]
    pub user_agent: String,

    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

impl Session {
    /// Fresh, unauthenticated session for `username`.
    pub fn new(username: &str, user_agent: &str) -> Self {
        Self {
            username: username.to_string(),
            user_id: None,
            authorization: None,
            device: DeviceIds::for_username(username),
            user_agent: user_agent.to_string(),
            last_login: None,
        }
    }

    /// Whether this session can be sent without logging in first.
    pub fn is_authorized(&self) -> bool {
        self.authorization.is_some()
    }

    /// Apply a login grant, keeping the previous token if none was issued.
    pub fn authorized(mut self, grant: LoginGrant) -> Result<Self> {
        self.user_id = Some(grant.user_id);
        if grant.authorization.is_some() {
            self.authorization = grant.authorization;
        }
        if self.authorization.is_none() {
            return Err(AppError::instagram(
                200,
                "login succeeded but no authorization token was issued",
            ));
        }
        self.last_login = Some(Utc::now());
        Ok(self)
    }

    /// Load a session file. Returns `None` if it does not exist.
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Write the session atomically (write to temp, then rename).
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Remove a session file if present.
    pub async fn delete(path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

/// Account endpoints the login flow talks to.
#[async_trait]
pub trait AccountApi: Send + Sync {
    /// Consume the handle, keeping its session.
    fn into_session(self) -> Session
    where
        Self: Sized;

    /// Check that the session is still accepted. Returns the account id.
    async fn current_user(&self) -> Result<String>;

    /// Password login. Does not touch the stored session.
    async fn login(&self, username: &str, password: &str) -> Result<LoginGrant>;

    /// Ask for the challenge code to be sent over `method`.
    async fn challenge_select(&self, api_path: &str, method: VerifyMethod) -> Result<()>;

    /// Submit the one-time challenge code.
    async fn challenge_submit(&self, api_path: &str, code: &str) -> Result<LoginGrant>;
}

/// Runs the login flow once per process, before any fetch job starts.
pub struct SessionManager<'a> {
    config: &'a InstagramConfig,
    credentials: &'a InstagramCredentials,
}

impl<'a> SessionManager<'a> {
    pub fn new(config: &'a InstagramConfig, credentials: &'a InstagramCredentials) -> Self {
        Self {
            config,
            credentials,
        }
    }

    /// Produce an authenticated Instagram client.
    pub async fn login(&self, prompt: &dyn CodePrompt) -> Result<InstagramClient> {
        self.login_with(|session| InstagramClient::new(self.config, session), prompt)
            .await
    }

    /// Login flow over any [`AccountApi`]; `connect` wraps a session in a handle.
    ///
    /// Reuses the stored session when it is still accepted, deletes it and
    /// logs in again when it is not, and resolves a verification challenge
    /// through `prompt` when one is demanded.
    pub async fn login_with<A, F>(&self, connect: F, prompt: &dyn CodePrompt) -> Result<A>
    where
        A: AccountApi,
        F: Fn(Session) -> Result<A>,
    {
        let path = self.config.session_file.as_path();

        match Session::load(path).await {
            Ok(Some(session))
                if session.username == self.credentials.username && session.is_authorized() =>
            {
                let client = connect(session)?;
                match client.current_user().await {
                    Ok(user_id) => {
                        log::info!("Reusing session from {} (user id {})", path.display(), user_id);
                        return Ok(client);
                    }
                    Err(e) if e.is_login_required() => {
                        log::warn!("Session is not valid. Authenticating again...");
                        Session::delete(path).await?;
                    }
                    Err(AppError::ChallengeRequired { api_path, step_name }) => {
                        let grant = self
                            .resolve_challenge(&client, &api_path, step_name.as_deref(), prompt)
                            .await?;
                        return self.persist(&connect, client.into_session(), grant).await;
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(Some(_)) => {
                log::info!("Stored session is for another account or incomplete. Authenticating...");
            }
            Ok(None) => {
                log::info!("Session was not found. Authenticating...");
            }
            Err(e) => {
                log::warn!("Session file {} is unreadable ({}). Authenticating...", path.display(), e);
                Session::delete(path).await?;
            }
        }

        self.fresh_login(&connect, prompt).await
    }

    async fn fresh_login<A, F>(&self, connect: &F, prompt: &dyn CodePrompt) -> Result<A>
    where
        A: AccountApi,
        F: Fn(Session) -> Result<A>,
    {
        let session = Session::new(&self.credentials.username, &self.config.user_agent);
        let client = connect(session)?;

        let grant = match client
            .login(&self.credentials.username, &self.credentials.password)
            .await
        {
            Ok(grant) => grant,
            Err(AppError::ChallengeRequired { api_path, step_name }) => {
                self.resolve_challenge(&client, &api_path, step_name.as_deref(), prompt)
                    .await?
            }
            Err(e) => return Err(e),
        };

        self.persist(connect, client.into_session(), grant).await
    }

    async fn resolve_challenge<A: AccountApi>(
        &self,
        client: &A,
        api_path: &str,
        step_name: Option<&str>,
        prompt: &dyn CodePrompt,
    ) -> Result<LoginGrant> {
        log::warn!("Challenge detected. Please complete the verification.");

        if step_name == Some("select_verify_method") {
            log::info!(
                "Requesting verification code via {:?}",
                self.config.verify_method
            );
            client
                .challenge_select(api_path, self.config.verify_method)
                .await?;
        }

        let code = prompt.verification_code("Enter the verification code sent to your email/phone")?;
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::Prompt("empty verification code".to_string()));
        }

        client.challenge_submit(api_path, code).await
    }

    async fn persist<A, F>(&self, connect: &F, session: Session, grant: LoginGrant) -> Result<A>
    where
        A: AccountApi,
        F: Fn(Session) -> Result<A>,
    {
        let session = session.authorized(grant)?;
        let path = self.config.session_file.as_path();
        session.save(path).await?;
        log::info!("Session saved to {}", path.display());
        connect(session)
    }
}
