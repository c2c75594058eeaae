use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::RETRY_AFTER;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use slack_morphism::prelude::{SlackBotId, SlackChannelId, SlackCursorId, SlackTs, SlackUserId};
use tracing::debug;
use url::Url;

use crate::settings::ChannelType;
use crate::{AppError, Result};

/// Page size for channel and history listings.
const PAGE_LIMIT: &str = "200";

/// Slack error codes that mean the token itself is unusable.
const AUTH_ERRORS: &[&str] = &[
    "not_authed",
    "invalid_auth",
    "account_inactive",
    "token_revoked",
    "token_expired",
    "no_permission",
    "missing_scope",
];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub next_cursor: Option<SlackCursorId>,
}

/// Slack sends an empty string instead of omitting the cursor.
fn next_cursor(metadata: &Option<ResponseMetadata>) -> Option<&SlackCursorId> {
    metadata
        .as_ref()
        .and_then(|meta| meta.next_cursor.as_ref())
        .filter(|cursor| !cursor.0.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelRecord {
    pub id: SlackChannelId,
    #[serde(default)]
    pub name: Option<String>,
}

/// One page of `conversations.list`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelsPage {
    #[serde(default)]
    pub channels: Vec<ChannelRecord>,
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
}

impl ChannelsPage {
    pub fn next_cursor(&self) -> Option<&SlackCursorId> {
        next_cursor(&self.response_metadata)
    }
}

/// One page of `conversations.history` or `conversations.replies`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesPage {
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
}

impl MessagesPage {
    pub fn next_cursor(&self) -> Option<&SlackCursorId> {
        next_cursor(&self.response_metadata)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileRecord {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotProfile {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockRecord {
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageRecord {
    pub ts: SlackTs,
    #[serde(default)]
    pub user: Option<SlackUserId>,
    #[serde(default)]
    pub bot_id: Option<SlackBotId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub thread_ts: Option<SlackTs>,
    #[serde(default)]
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub bot_profile: Option<BotProfile>,
    #[serde(default)]
    pub blocks: Vec<BlockRecord>,
}

/// Who posted a message, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuthorRef<'a> {
    User(&'a SlackUserId),
    Bot(&'a SlackBotId),
    Username(&'a str),
}

/// Where a message sits relative to threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadPosition {
    Standalone,
    Root,
    Reply,
}

impl MessageRecord {
    pub fn author(&self) -> Option<AuthorRef<'_>> {
        if let Some(user) = &self.user {
            Some(AuthorRef::User(user))
        } else if let Some(bot) = &self.bot_id {
            Some(AuthorRef::Bot(bot))
        } else {
            self.username.as_deref().map(AuthorRef::Username)
        }
    }

    pub fn thread_position(&self) -> ThreadPosition {
        match &self.thread_ts {
            None => ThreadPosition::Standalone,
            Some(thread_ts) if *thread_ts == self.ts => ThreadPosition::Root,
            Some(_) => ThreadPosition::Reply,
        }
    }

    pub fn is_giphy(&self) -> bool {
        self.bot_profile
            .as_ref()
            .and_then(|profile| profile.name.as_deref())
            == Some("giphy")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: SlackUserId,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotRecord {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize)]
struct UserInfoResponse {
    user: UserRecord,
}

#[derive(Deserialize)]
struct BotInfoResponse {
    bot: BotRecord,
}

/// The Slack Web API methods the exporter consumes.
pub trait SlackApi {
    fn list_channels(
        &self,
        channel_type: ChannelType,
        cursor: Option<&SlackCursorId>,
    ) -> Result<ChannelsPage>;

    fn channel_history(
        &self,
        channel: &SlackChannelId,
        cursor: Option<&SlackCursorId>,
        oldest: &SlackTs,
    ) -> Result<MessagesPage>;

    fn thread_replies(
        &self,
        channel: &SlackChannelId,
        thread_ts: &SlackTs,
        limit: u16,
    ) -> Result<MessagesPage>;

    fn user_info(&self, user: &SlackUserId) -> Result<UserRecord>;

    fn bot_info(&self, bot: &SlackBotId) -> Result<BotRecord>;
}

pub struct SlackWebClient {
    client: Client,
    base_url: String,
    token: String,
}

impl SlackWebClient {
    pub fn new(token: &str, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::SlackApi(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn method_url(&self, method: &str, params: &[(&str, &str)]) -> Result<Url> {
        Url::parse_with_params(&format!("{}/{}", self.base_url, method), params)
            .map_err(|e| AppError::SlackApi(format!("{method}: invalid URL: {e}")))
    }

    fn call<T: DeserializeOwned>(&self, method: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = self.method_url(method, params)?;
        debug!(method, "calling Slack API");

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .map_err(|e| AppError::SlackApi(format!("{method}: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse().ok())
                .unwrap_or(0);
            return Err(AppError::SlackRateLimit { retry_after_secs });
        }
        if !status.is_success() {
            return Err(AppError::SlackApi(format!("{method}: HTTP {status}")));
        }

        let body = response
            .text()
            .map_err(|e| AppError::SlackApi(format!("{method}: {e}")))?;
        parse_api_response(method, &body)
    }
}

impl SlackApi for SlackWebClient {
    fn list_channels(
        &self,
        channel_type: ChannelType,
        cursor: Option<&SlackCursorId>,
    ) -> Result<ChannelsPage> {
        let mut params = vec![
            ("types", channel_type.as_api_str()),
            ("exclude_archived", "true"),
            ("limit", PAGE_LIMIT),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.0.as_str()));
        }
        self.call("conversations.list", &params)
    }

    fn channel_history(
        &self,
        channel: &SlackChannelId,
        cursor: Option<&SlackCursorId>,
        oldest: &SlackTs,
    ) -> Result<MessagesPage> {
        let mut params = vec![
            ("channel", channel.0.as_str()),
            ("oldest", oldest.0.as_str()),
            ("limit", PAGE_LIMIT),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.0.as_str()));
        }
        self.call("conversations.history", &params)
    }

    fn thread_replies(
        &self,
        channel: &SlackChannelId,
        thread_ts: &SlackTs,
        limit: u16,
    ) -> Result<MessagesPage> {
        let limit = limit.to_string();
        let params = [
            ("channel", channel.0.as_str()),
            ("ts", thread_ts.0.as_str()),
            ("oldest", thread_ts.0.as_str()),
            ("limit", limit.as_str()),
        ];
        self.call("conversations.replies", &params)
    }

    fn user_info(&self, user: &SlackUserId) -> Result<UserRecord> {
        let response: UserInfoResponse = self.call("users.info", &[("user", user.0.as_str())])?;
        Ok(response.user)
    }

    fn bot_info(&self, bot: &SlackBotId) -> Result<BotRecord> {
        let response: BotInfoResponse = self.call("bots.info", &[("bot", bot.0.as_str())])?;
        Ok(response.bot)
    }
}

#[derive(Deserialize)]
struct ApiStatus {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Check the `ok` flag of a Slack response envelope, then decode the body.
pub fn parse_api_response<T: DeserializeOwned>(method: &str, body: &str) -> Result<T> {
    let status: ApiStatus =
        serde_json::from_str(body).map_err(|e| AppError::JsonParse(format!("{method}: {e}")))?;

    if !status.ok {
        let code = status
            .error
            .unwrap_or_else(|| "unknown_error".to_string());
        if AUTH_ERRORS.contains(&code.as_str()) {
            return Err(AppError::SlackAuth(code));
        }
        return Err(AppError::SlackApi(format!("{method}: {code}")));
    }

    serde_json::from_str(body).map_err(|e| AppError::JsonParse(format!("{method}: {e}")))
}
