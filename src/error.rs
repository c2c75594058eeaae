use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("SLACK_TOKEN environment variable not set")]
    MissingToken,

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid Slack timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("missing setting: {0} (pass it on the command line or in settings.toml)")]
    MissingSetting(&'static str),

    #[error("invalid setting: {name} = {value} ({reason})")]
    InvalidSetting {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Slack API error: {0}")]
    SlackApi(String),

    #[error("Slack API token rejected ({0}); check the token and its scopes")]
    SlackAuth(String),

    #[error("Slack rate limit error: retry after {retry_after_secs}s")]
    SlackRateLimit { retry_after_secs: u64 },

    #[error("the {channel_type} named {name} is not available")]
    ChannelNotFound { channel_type: String, name: String },

    #[error("thread {thread_ts} exceeds the maximum threaded message count ({max})")]
    ThreadOverflow { max: u16, thread_ts: String },

    #[error("failed to read file at {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write file at {path}: {source}")]
    WriteFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
