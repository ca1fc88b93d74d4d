//! Google Chat REST client for creating messages in a space.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use tracing::Span;

use crate::error::{ApiFailure, ChatError, ConfigError};
use crate::traits::{ChatClient, CredentialProvider};
use crate::types::{MessageParams, SentMessage};

pub const DEFAULT_ENDPOINT: &str = "https://chat.googleapis.com";

/// Transport settings fixed when the client is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub endpoint: String,
    /// Route every request through this proxy. `None` means a direct
    /// connection, ignoring proxy environment variables.
    pub https_proxy: Option<String>,
    pub request_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            https_proxy: None,
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Build the HTTP client shared by the chat client and the token provider.
pub fn http_client(options: &ClientOptions) -> Result<reqwest::Client, ConfigError> {
    let mut builder = reqwest::Client::builder().timeout(options.request_timeout);
    builder = match options.https_proxy {
        Some(ref url) => {
            let proxy = reqwest::Proxy::all(url).map_err(|e| ConfigError::InvalidProxy {
                url: url.clone(),
                reason: e.to_string(),
            })?;
            builder.proxy(proxy)
        }
        None => builder.no_proxy(),
    };
    builder
        .build()
        .map_err(|e| ConfigError::Client(e.to_string()))
}

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    text: &'a str,
}

/// Google Chat API client.
#[derive(Clone)]
pub struct GoogleChatClient {
    client: reqwest::Client,
    endpoint: Url,
    https_proxy: Option<String>,
    credentials: Arc<dyn CredentialProvider>,
    span: Span,
}

impl GoogleChatClient {
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        options: &ClientOptions,
    ) -> Result<Self, ConfigError> {
        Self::with_http_client(http_client(options)?, credentials, options)
    }

    /// Reuse an already configured HTTP client.
    pub fn with_http_client(
        client: reqwest::Client,
        credentials: Arc<dyn CredentialProvider>,
        options: &ClientOptions,
    ) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(&options.endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            url: options.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(ConfigError::InvalidEndpoint {
                url: options.endpoint.clone(),
                reason: "not a base URL".to_string(),
            });
        }

        Ok(Self {
            client,
            endpoint,
            https_proxy: options.https_proxy.clone(),
            credentials,
            span: tracing::info_span!("google_chat"),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn https_proxy(&self) -> Option<&str> {
        self.https_proxy.as_deref()
    }

    /// `{endpoint}/v1/spaces/{id}/messages`, with the id escaped as one path
    /// segment so record-supplied spaces cannot leave the messages resource.
    fn message_url(&self, params: &MessageParams) -> Result<Url, ChatError> {
        let invalid = |reason: &str| {
            ChatError::Destination(ApiFailure {
                status: 0,
                body: reason.to_string(),
                params: params.request_params(),
            })
        };

        let id = params.space_id();
        if matches!(id, "" | "." | "..") {
            return Err(invalid("invalid space name"));
        }

        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| invalid("endpoint cannot carry a path"))?
            .pop_if_empty()
            .extend(["v1", "spaces", id, "messages"]);
        Ok(url)
    }

    /// Post `params.text` into `params.space`.
    pub async fn post_message(&self, params: &MessageParams) -> Result<SentMessage, ChatError> {
        tracing::info!(
            parent: &self.span,
            space = %params.space,
            bytes = params.text.len(),
            "out_google_chat: post_message"
        );

        let url = self.message_url(params)?;
        let token = self.credentials.access_token().await?;

        let resp = self
            .client
            .post(url)
            .bearer_auth(token.secret())
            .json(&CreateMessage { text: &params.text })
            .send()
            .await
            .map_err(|e| request_error(e, params))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<SentMessage>().await.unwrap_or_default());
        }

        let body = resp.text().await.unwrap_or_default();
        let failure = ApiFailure {
            status: status.as_u16(),
            body,
            params: params.request_params(),
        };

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                self.credentials.invalidate().await;
                ChatError::Auth {
                    message: failure.to_string(),
                    failure: Some(failure),
                }
            }
            StatusCode::NOT_FOUND => ChatError::Destination(failure),
            _ => ChatError::Api(failure),
        })
    }
}

#[async_trait]
impl ChatClient for GoogleChatClient {
    async fn send(&self, params: &MessageParams) -> Result<SentMessage, ChatError> {
        self.post_message(params).await
    }
}

/// Classify a request that produced no HTTP response.
fn request_error(e: reqwest::Error, params: &MessageParams) -> ChatError {
    if e.is_builder() {
        // The request could not even be formed (e.g. an unusable space).
        return ChatError::Api(ApiFailure {
            status: 0,
            body: e.to_string(),
            params: params.request_params(),
        });
    }
    ChatError::Transport {
        message: e.to_string(),
        timeout: e.is_timeout(),
    }
}
