use async_trait::async_trait;

use crate::error::ChatError;
use crate::types::{AccessToken, MessageParams, SentMessage};

/// A remote chat API that can post a text message into a space.
///
/// One call per payload. Implementations must not retry internally; the
/// dispatcher decides whether a failure goes back to the host.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Create a message in `params.space` with `params.text`.
    async fn send(&self, params: &MessageParams) -> Result<SentMessage, ChatError>;
}

/// Source of bearer credentials for the chat API.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Return a credential valid for at least the next request.
    ///
    /// Any failure is reported as [`ChatError::Auth`].
    async fn access_token(&self) -> Result<AccessToken, ChatError>;

    /// Drop any cached credential so the next call acquires a fresh one.
    async fn invalidate(&self) {}
}
