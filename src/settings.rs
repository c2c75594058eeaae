use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::export::ExportOptions;
use crate::{AppError, Result};

pub const SETTINGS_FILE: &str = "settings.toml";
pub const DEFAULT_MAX_THREAD_MESSAGES: u16 = 300;
pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";

/// Conversation type filter used when looking up the channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ChannelType {
    #[serde(rename = "public_channel")]
    #[value(name = "public_channel", alias = "public")]
    Public,
    #[default]
    #[serde(rename = "private_channel")]
    #[value(name = "private_channel", alias = "private")]
    Private,
}

impl ChannelType {
    pub fn as_api_str(self) -> &'static str {
        match self {
            ChannelType::Public => "public_channel",
            ChannelType::Private => "private_channel",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// Timezones the export can be rendered in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum DisplayTimezone {
    #[serde(rename = "US/Alaska")]
    #[value(name = "US/Alaska")]
    Alaska,
    #[serde(rename = "US/Arizona")]
    #[value(name = "US/Arizona")]
    Arizona,
    #[serde(rename = "US/Central")]
    #[value(name = "US/Central")]
    Central,
    #[serde(rename = "US/Eastern")]
    #[value(name = "US/Eastern")]
    Eastern,
    #[serde(rename = "US/Hawaii")]
    #[value(name = "US/Hawaii")]
    Hawaii,
    #[serde(rename = "US/Mountain")]
    #[value(name = "US/Mountain")]
    Mountain,
    #[default]
    #[serde(rename = "US/Pacific")]
    #[value(name = "US/Pacific")]
    Pacific,
}

impl DisplayTimezone {
    pub fn label(self) -> &'static str {
        match self {
            DisplayTimezone::Alaska => "US/Alaska",
            DisplayTimezone::Arizona => "US/Arizona",
            DisplayTimezone::Central => "US/Central",
            DisplayTimezone::Eastern => "US/Eastern",
            DisplayTimezone::Hawaii => "US/Hawaii",
            DisplayTimezone::Mountain => "US/Mountain",
            DisplayTimezone::Pacific => "US/Pacific",
        }
    }

    pub fn tz(self) -> Tz {
        match self {
            DisplayTimezone::Alaska => chrono_tz::US::Alaska,
            DisplayTimezone::Arizona => chrono_tz::US::Arizona,
            DisplayTimezone::Central => chrono_tz::US::Central,
            DisplayTimezone::Eastern => chrono_tz::US::Eastern,
            DisplayTimezone::Hawaii => chrono_tz::US::Hawaii,
            DisplayTimezone::Mountain => chrono_tz::US::Mountain,
            DisplayTimezone::Pacific => chrono_tz::US::Pacific,
        }
    }
}

impl fmt::Display for DisplayTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub export: ExportSettings,
}

/// Every field is optional so the file and the command line can each fill
/// in part of the configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportSettings {
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default, rename = "channel-type")]
    pub channel_type: Option<ChannelType>,
    #[serde(default)]
    pub timezone: Option<DisplayTimezone>,
    #[serde(default, rename = "max-thread-messages")]
    pub max_thread_messages: Option<u16>,
    #[serde(default, rename = "output-dir")]
    pub output_dir: Option<PathBuf>,
    #[serde(default, rename = "api-base-url")]
    pub api_base_url: Option<String>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| AppError::ReadFile {
            path: path.display().to_string(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| AppError::TomlParse(e.to_string()))
    }
}

impl ExportSettings {
    /// Values set in `other` win over values set in `self`.
    pub fn overridden_by(self, other: ExportSettings) -> ExportSettings {
        ExportSettings {
            channel: other.channel.or(self.channel),
            channel_type: other.channel_type.or(self.channel_type),
            timezone: other.timezone.or(self.timezone),
            max_thread_messages: other.max_thread_messages.or(self.max_thread_messages),
            output_dir: other.output_dir.or(self.output_dir),
            api_base_url: other.api_base_url.or(self.api_base_url),
        }
    }

    pub fn into_options(self) -> Result<ExportOptions> {
        let channel_name = self
            .channel
            .filter(|name| !name.trim().is_empty())
            .ok_or(AppError::MissingSetting("channel"))?;

        let max_thread_messages = self
            .max_thread_messages
            .unwrap_or(DEFAULT_MAX_THREAD_MESSAGES);
        if max_thread_messages == 0 {
            return Err(AppError::InvalidSetting {
                name: "max-thread-messages",
                value: max_thread_messages.to_string(),
                reason: "must be at least 1",
            });
        }

        Ok(ExportOptions {
            channel_name,
            channel_type: self.channel_type.unwrap_or_default(),
            timezone: self.timezone.unwrap_or_default(),
            max_thread_messages,
            output_dir: self.output_dir.unwrap_or_else(default_output_dir),
        })
    }
}

/// `~/Desktop`, or the working directory when there is no home.
pub fn default_output_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("Desktop"))
        .unwrap_or_else(|| PathBuf::from("."))
}
