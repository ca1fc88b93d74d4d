//! Service-account credentials for the Chat API (OAuth2 JWT bearer grant).
//!
//! The key file is read on each token acquisition, so rotating it on disk
//! takes effect without a restart. Tokens are cached until shortly before
//! they expire.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{ChatError, ConfigError};
use crate::traits::CredentialProvider;
use crate::types::AccessToken;

pub const CHAT_BOT_SCOPE: &str = "https://www.googleapis.com/auth/chat.bot";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens closer than this to expiry are refreshed before use.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// The fields of a service-account JSON key this provider needs.
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
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub async fn load(path: &Path) -> Result<Self, ChatError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            ChatError::auth(format!("cannot read keyfile {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            ChatError::auth(format!("keyfile {} is not a service account key: {}", path.display(), e))
        })
    }

    /// Signed RS256 assertion for the given scope, issued at `now`.
    pub fn assertion(&self, scope: &str, now: i64) -> Result<String, ChatError> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| ChatError::auth(format!("invalid private key: {}", e)))?;
        encode(&header, &claims, &key)
            .map_err(|e| ChatError::auth(format!("failed to sign assertion: {}", e)))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// OAuth2 token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    #[allow(dead_code)]
    #[serde(default)]
    token_type: Option<String>,
}

/// Bearer tokens for a Google service account, cached until near expiry.
#[derive(Clone)]
pub struct ServiceAccountCredentials {
    client: reqwest::Client,
    keyfile: PathBuf,
    scope: String,
    token_cache: Arc<RwLock<Option<AccessToken>>>,
}

impl ServiceAccountCredentials {
    pub fn new(keyfile: impl Into<PathBuf>, client: reqwest::Client) -> Result<Self, ConfigError> {
        let keyfile = keyfile.into();
        if keyfile.as_os_str().is_empty() {
            return Err(ConfigError::Empty("keyfile"));
        }
        Ok(Self {
            client,
            keyfile,
            scope: CHAT_BOT_SCOPE.to_string(),
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn keyfile(&self) -> &Path {
        &self.keyfile
    }

    async fn fetch_token(&self) -> Result<AccessToken, ChatError> {
        let key = ServiceAccountKey::load(&self.keyfile).await?;
        let assertion = key.assertion(&self.scope, chrono::Utc::now().timestamp())?;

        let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];
        let resp = self
            .client
            .post(&key.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| ChatError::auth(format!("OAuth2 token request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ChatError::auth(format!(
                "OAuth2 token request rejected ({}): {}",
                status, body
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| ChatError::auth(format!("OAuth2 token response parse error: {}", e)))?;

        Ok(AccessToken::new(
            token.access_token,
            Some(Instant::now() + Duration::from_secs(token.expires_in)),
        ))
    }
}

#[async_trait]
impl CredentialProvider for ServiceAccountCredentials {
    async fn access_token(&self) -> Result<AccessToken, ChatError> {
        {
            let cache = self.token_cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.is_fresh(REFRESH_MARGIN) {
                    return Ok(cached.clone());
                }
            }
        }

        let token = self.fetch_token().await?;
        tracing::debug!(keyfile = %self.keyfile.display(), "acquired chat.bot access token");
        *self.token_cache.write().await = Some(token.clone());
        Ok(token)
    }

    async fn invalidate(&self) {
        *self.token_cache.write().await = None;
    }
}

/// A fixed bearer token, for tests and for hosts that manage tokens
/// themselves.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    token: AccessToken,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token, None),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn access_token(&self) -> Result<AccessToken, ChatError> {
        Ok(self.token.clone())
    }
}
