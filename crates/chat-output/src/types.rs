use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RequestParams, FILTERED};

/// Field map of a single log event.
pub type Record = serde_json::Map<String, Value>;

/// One `(tag, time, record)` tuple handed over by the host pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub tag: String,
    /// Epoch seconds.
    pub time: i64,
    pub record: Record,
}

impl Event {
    pub fn new(tag: impl Into<String>, time: i64, record: Record) -> Self {
        Self {
            tag: tag.into(),
            time,
            record,
        }
    }
}

/// One flush cycle's worth of events, in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    events: Vec<Event>,
}

impl Batch {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl FromIterator<Event> for Batch {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Accumulated text for one destination within one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub space: String,
    pub text: String,
}

impl Payload {
    pub fn params(&self) -> MessageParams {
        MessageParams {
            space: self.space.clone(),
            text: self.text.clone(),
        }
    }
}

/// Parameters of a single "create message in space" call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageParams {
    pub space: String,
    pub text: String,
}

impl MessageParams {
    pub fn new(space: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            space: space.into(),
            text: text.into(),
        }
    }

    /// Resource name of the target space (`spaces/<id>`).
    pub fn space_name(&self) -> String {
        format!("spaces/{}", self.space_id())
    }

    /// The space id with one leading `spaces/` removed. Used verbatim as a
    /// single URL path segment, so it may contain any character.
    pub fn space_id(&self) -> &str {
        self.space.strip_prefix("spaces/").unwrap_or(&self.space)
    }

    pub(crate) fn request_params(&self) -> RequestParams {
        RequestParams::new()
            .with("space", self.space.clone())
            .with("text", self.text.clone())
    }
}

/// Message resource returned by a successful send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    /// Resource name, e.g. `spaces/AAAA/messages/BBBB`.
    #[serde(default)]
    pub name: Option<String>,
}

/// Outcome of a dispatch that completed without a transient failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub events: usize,
    pub payloads: usize,
    pub delivered: usize,
    pub discarded: usize,
}

/// Bearer credential with an optional expiry.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: Option<Instant>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: Option<Instant>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// True when the token stays valid for at least `margin` from now.
    pub fn is_fresh(&self, margin: Duration) -> bool {
        match self.expires_at {
            Some(at) => at > Instant::now() + margin,
            None => true,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &FILTERED)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Render a record value the way it appears inside message text.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
