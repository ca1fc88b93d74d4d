use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::adapters::google_chat::{ClientOptions, DEFAULT_ENDPOINT};
use crate::error::ConfigError;
use crate::payload::{Destination, PayloadBuilder};
use crate::template::Template;
use crate::timefmt::{TimeFormatter, TimeZoneSetting, DEFAULT_TIME_FORMAT};

/// Raw output configuration as written by the operator.
///
/// Parsed from TOML; validated once into [`OutputSettings`]. Keys of older
/// plugin versions (`api_key`, `team`, `rtm`, ...) are accepted and ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Space to post into, or a `%s` template when `space_keys` is set.
    pub space: Option<String>,
    /// Record fields that fill the `%s` slots of `space`.
    #[serde(deserialize_with = "deserialize_keys")]
    pub space_keys: Option<Vec<String>>,
    /// Message template. Defaults to `%s`.
    pub message: Option<String>,
    /// Record fields that fill the `%s` slots of `message`. Defaults to `message`.
    #[serde(deserialize_with = "deserialize_keys")]
    pub message_keys: Option<Vec<String>>,
    /// Service account JSON key.
    pub keyfile: Option<PathBuf>,
    pub https_proxy: Option<String>,
    /// Prefix every line with the event tag.
    #[serde(alias = "verbose_fallback")]
    pub include_context: bool,
    pub time_format: String,
    pub localtime: bool,
    pub utc: bool,
    pub timezone: Option<String>,
    pub include_time_key: bool,
    pub include_tag_key: bool,
    pub time_key: String,
    pub tag_key: String,
    pub endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            space: None,
            space_keys: None,
            message: None,
            message_keys: None,
            keyfile: None,
            https_proxy: None,
            include_context: false,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            localtime: true,
            utc: false,
            timezone: None,
            include_time_key: true,
            include_tag_key: true,
            time_key: "time".to_string(),
            tag_key: "tag".to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: 15,
        }
    }
}

/// Accept either a TOML array or a comma-separated string.
fn deserialize_keys<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Keys {
        List(Vec<String>),
        Csv(String),
    }

    Ok(Option::<Keys>::deserialize(deserializer)?.map(|keys| match keys {
        Keys::List(list) => list,
        Keys::Csv(csv) => split_keys(&csv),
    }))
}

pub fn split_keys(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Validated, immutable settings derived from an [`OutputConfig`].
#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub destination: Destination,
    pub message: Template,
    pub time: TimeFormatter,
    pub time_key: Option<String>,
    pub tag_key: Option<String>,
    pub include_context: bool,
    pub keyfile: PathBuf,
    pub client: ClientOptions,
}

impl OutputSettings {
    pub fn payload_builder(&self) -> PayloadBuilder {
        PayloadBuilder::new(self.destination.clone(), self.message.clone())
            .with_time_formatter(self.time.clone())
            .with_reserved_keys(self.time_key.clone(), self.tag_key.clone())
            .with_context(self.include_context)
    }
}

impl OutputConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Check every startup invariant and compile the templates.
    pub fn validate(&self) -> Result<OutputSettings, ConfigError> {
        let space = match self.space.as_deref() {
            None => return Err(ConfigError::Missing("space")),
            Some(s) if s.trim().is_empty() => return Err(ConfigError::Empty("space")),
            Some(s) => unescape(s),
        };

        let keyfile = match self.keyfile {
            None => return Err(ConfigError::Missing("keyfile")),
            Some(ref p) if p.as_os_str().is_empty() => return Err(ConfigError::Empty("keyfile")),
            Some(ref p) => p.clone(),
        };

        let destination = match self.space_keys {
            Some(ref keys) => Destination::Templated(Template::compile(
                &space,
                keys,
                "space",
                "space_keys",
            )?),
            None => Destination::Fixed(space),
        };

        let message_keys = self
            .message_keys
            .clone()
            .unwrap_or_else(|| vec!["message".to_string()]);
        let message = Template::compile(
            self.message.as_deref().unwrap_or("%s"),
            &message_keys,
            "message",
            "message_keys",
        )?;

        let zone = TimeZoneSetting::resolve(self.timezone.as_deref(), self.utc || !self.localtime)?;
        let time = TimeFormatter::new(&self.time_format, zone)?;

        if let Some(ref url) = self.https_proxy {
            reqwest::Proxy::all(url).map_err(|e| ConfigError::InvalidProxy {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        }
        reqwest::Url::parse(&self.endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            url: self.endpoint.clone(),
            reason: e.to_string(),
        })?;

        Ok(OutputSettings {
            destination,
            message,
            time,
            time_key: self.include_time_key.then(|| self.time_key.clone()),
            tag_key: self.include_tag_key.then(|| self.tag_key.clone()),
            include_context: self.include_context,
            keyfile,
            client: ClientOptions {
                endpoint: self.endpoint.clone(),
                https_proxy: self.https_proxy.clone(),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
            },
        })
    }
}

/// Percent-decode a configured space; malformed escapes are kept verbatim.
fn unescape(space: &str) -> String {
    urlencoding::decode(space)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| space.to_string())
}
