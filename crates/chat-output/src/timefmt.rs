use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;

use crate::error::ConfigError;

pub const DEFAULT_TIME_FORMAT: &str = "%H:%M:%S";

/// Zone in which event timestamps are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeZoneSetting {
    Local,
    Utc,
    Named(Tz),
}

impl TimeZoneSetting {
    /// `timezone` wins over `utc`, which wins over local time.
    pub fn resolve(timezone: Option<&str>, utc: bool) -> Result<Self, ConfigError> {
        match timezone {
            Some(name) => name
                .parse::<Tz>()
                .map(TimeZoneSetting::Named)
                .map_err(|_| ConfigError::UnknownTimezone(name.to_string())),
            None if utc => Ok(TimeZoneSetting::Utc),
            None => Ok(TimeZoneSetting::Local),
        }
    }
}

/// Renders epoch seconds with a strftime pattern in a fixed zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeFormatter {
    format: String,
    zone: TimeZoneSetting,
}

impl TimeFormatter {
    pub fn new(format: &str, zone: TimeZoneSetting) -> Result<Self, ConfigError> {
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::InvalidTimeFormat(format.to_string()));
        }
        Ok(Self {
            format: format.to_string(),
            zone,
        })
    }

    pub fn zone(&self) -> TimeZoneSetting {
        self.zone
    }

    pub fn format(&self, epoch_secs: i64) -> String {
        let Some(at) = DateTime::<Utc>::from_timestamp(epoch_secs, 0) else {
            return epoch_secs.to_string();
        };
        match self.zone {
            TimeZoneSetting::Utc => at.format(&self.format).to_string(),
            TimeZoneSetting::Local => at.with_timezone(&Local).format(&self.format).to_string(),
            TimeZoneSetting::Named(tz) => at.with_timezone(&tz).format(&self.format).to_string(),
        }
    }
}

impl Default for TimeFormatter {
    fn default() -> Self {
        Self {
            format: DEFAULT_TIME_FORMAT.to_string(),
            zone: TimeZoneSetting::Local,
        }
    }
}
