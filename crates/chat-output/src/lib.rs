//! Buffered log output that forwards records to Google Chat spaces.
//!
//! A host hands over batches of `(tag, time, record)` events. Each batch is
//! grouped by destination space, every record is rendered through a `%s`
//! message template, and one message per space is created through the
//! Google Chat API using a service account's `chat.bot` token.
//!
//! # Failure policy
//! - Configuration problems fail [`GoogleChatOutput::configure`].
//! - Transport failures (including timeouts) are returned so the host
//!   retries the whole batch.
//! - Auth, missing-space and other API errors are logged and the affected
//!   message is dropped.

pub mod adapters;
pub mod config;
pub mod decode;
pub mod dispatcher;
pub mod error;
pub mod output;
pub mod payload;
pub mod template;
pub mod timefmt;
pub mod traits;
pub mod types;

pub use adapters::google_chat::{
    ClientOptions, GoogleChatClient, ServiceAccountCredentials, StaticCredentials,
};
pub use config::{OutputConfig, OutputSettings};
pub use decode::{decode_batch, encode_batch};
pub use dispatcher::Dispatcher;
pub use error::{ApiFailure, ChatError, ConfigError, DecodeError, RequestParams};
pub use output::GoogleChatOutput;
pub use payload::{Destination, PayloadBuilder};
pub use template::Template;
pub use timefmt::{TimeFormatter, TimeZoneSetting};
pub use traits::{ChatClient, CredentialProvider};
pub use types::{Batch, DispatchReport, Event, MessageParams, Payload, Record, SentMessage};
