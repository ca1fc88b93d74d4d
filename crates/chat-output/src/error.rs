use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Replacement for credential-like request parameters in error output.
pub const FILTERED: &str = "[FILTERED]";

/// Parameter names whose values never appear in error text.
const SENSITIVE_PARAMS: &[&str] = &[
    "token",
    "access_token",
    "authorization",
    "assertion",
    "private_key",
];

/// Startup-time configuration failures. Never raised while dispatching.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`{0}` is required")]
    Missing(&'static str),

    #[error("`{0}` is an empty string")]
    Empty(&'static str),

    #[error(
        "string specifier '%s' for `{field}` and `{keys_field}` do not match \
         ({slots} slot(s), {keys} key(s))"
    )]
    TemplateMismatch {
        field: &'static str,
        keys_field: &'static str,
        slots: usize,
        keys: usize,
    },

    #[error("invalid https_proxy `{url}`: {reason}")]
    InvalidProxy { url: String, reason: String },

    #[error("invalid endpoint `{url}`: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("unknown timezone `{0}`")]
    UnknownTimezone(String),

    #[error("invalid time_format `{0}`")]
    InvalidTimeFormat(String),

    #[error("failed to read configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("HTTP client init: {0}")]
    Client(String),
}

/// Errors surfaced by a [`ChatClient`](crate::traits::ChatClient) send.
///
/// Only [`ChatError::Transport`] is transient; the dispatcher hands it back to
/// the host so the whole batch can be retried. Everything else is logged and
/// the payload is dropped.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("authentication error: {message}")]
    Auth {
        message: String,
        failure: Option<ApiFailure>,
    },

    #[error("space not found: {0}")]
    Destination(ApiFailure),

    #[error("transport error: {message}")]
    Transport { message: String, timeout: bool },

    #[error("api error: {0}")]
    Api(ApiFailure),
}

impl ChatError {
    pub fn auth(message: impl Into<String>) -> Self {
        ChatError::Auth {
            message: message.into(),
            failure: None,
        }
    }

    /// Whether the host should retry the batch that produced this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChatError::Transport { .. })
    }

    /// Short label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::Auth { .. } => "auth",
            ChatError::Destination(_) => "destination",
            ChatError::Transport { timeout: true, .. } => "timeout",
            ChatError::Transport { .. } => "transport",
            ChatError::Api(_) => "api",
        }
    }

    /// The remote response behind this error, if the request got that far.
    pub fn failure(&self) -> Option<&ApiFailure> {
        match self {
            ChatError::Auth { failure, .. } => failure.as_ref(),
            ChatError::Destination(f) | ChatError::Api(f) => Some(f),
            ChatError::Transport { .. } => None,
        }
    }
}

/// A non-2xx response together with the parameters of the request that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub status: u16,
    pub body: String,
    pub params: RequestParams,
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "res.code:{}, res.body:{}, req_params:{}",
            self.status,
            self.body,
            self.params.redacted()
        )
    }
}

/// Ordered request parameters attached to errors for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams(BTreeMap<String, String>);

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Copy with every sensitive value replaced by [`FILTERED`].
    pub fn redacted(&self) -> Self {
        let inner = self
            .0
            .iter()
            .map(|(k, v)| {
                let value = if SENSITIVE_PARAMS.contains(&k.to_ascii_lowercase().as_str()) {
                    FILTERED.to_string()
                } else {
                    v.clone()
                };
                (k.clone(), value)
            })
            .collect();
        Self(inner)
    }
}

impl fmt::Display for RequestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {:?}", k, v)?;
        }
        f.write_str("}")
    }
}

/// A host buffer that could not be decoded into a batch.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("line {line}: invalid JSON: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: {reason}")]
    Shape { line: usize, reason: String },
}
