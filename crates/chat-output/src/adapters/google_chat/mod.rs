//! Google Chat adapter: `spaces.messages.create` over REST, authorized
//! with a service account's `chat.bot` token.

pub mod api;
pub mod auth;

pub use api::{http_client, ClientOptions, GoogleChatClient, DEFAULT_ENDPOINT};
pub use auth::{ServiceAccountCredentials, ServiceAccountKey, StaticCredentials, CHAT_BOT_SCOPE};
