//! Scripted in-memory Slack API for unit tests.

use std::cell::RefCell;
use std::collections::HashMap;

use slack_morphism::prelude::{SlackBotId, SlackChannelId, SlackCursorId, SlackTs, SlackUserId};

use crate::settings::ChannelType;
use crate::slack::{
    BotRecord, ChannelRecord, ChannelsPage, MessageRecord, MessagesPage, ResponseMetadata,
    SlackApi, UserRecord,
};
use crate::{AppError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListChannels { channel_type: ChannelType, cursor: Option<String> },
    History { cursor: Option<String>, oldest: String },
    Replies { thread_ts: String, limit: u16 },
    UserInfo(String),
    BotInfo(String),
}

#[derive(Default)]
pub struct FakeSlack {
    channel_pages: Vec<Vec<ChannelRecord>>,
    history_pages: Vec<Vec<MessageRecord>>,
    replies: HashMap<String, (Vec<MessageRecord>, bool)>,
    users: RefCell<HashMap<String, UserRecord>>,
    bots: HashMap<String, BotRecord>,
    list_error: Option<String>,
    calls: RefCell<Vec<Call>>,
}

fn parse<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
    serde_json::from_value(value).unwrap()
}

/// Pages after the first are addressed as `page-N`; the last page carries
/// Slack's empty cursor.
fn page_index(cursor: Option<&SlackCursorId>) -> usize {
    cursor
        .and_then(|c| c.0.strip_prefix("page-"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

fn metadata_after(index: usize, total: usize) -> Option<ResponseMetadata> {
    let next = if index + 1 < total {
        format!("page-{}", index + 1)
    } else {
        String::new()
    };
    Some(ResponseMetadata {
        next_cursor: Some(SlackCursorId(next)),
    })
}

impl FakeSlack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel_pages(mut self, pages: Vec<Vec<serde_json::Value>>) -> Self {
        self.channel_pages = pages
            .into_iter()
            .map(|page| page.into_iter().map(parse).collect())
            .collect();
        self
    }

    /// Pages are given the way Slack returns them: newest message first.
    pub fn with_history_pages(mut self, pages: Vec<Vec<serde_json::Value>>) -> Self {
        self.history_pages = pages
            .into_iter()
            .map(|page| page.into_iter().map(parse).collect())
            .collect();
        self
    }

    pub fn with_replies(
        mut self,
        thread_ts: &str,
        messages: Vec<serde_json::Value>,
        has_more: bool,
    ) -> Self {
        self.replies.insert(
            thread_ts.to_string(),
            (messages.into_iter().map(parse).collect(), has_more),
        );
        self
    }

    pub fn with_user(self, value: serde_json::Value) -> Self {
        self.set_user(value);
        self
    }

    pub fn with_bot(mut self, id: &str, name: &str) -> Self {
        self.bots.insert(
            id.to_string(),
            parse(serde_json::json!({"id": id, "name": name})),
        );
        self
    }

    pub fn with_list_error(mut self, code: &str) -> Self {
        self.list_error = Some(code.to_string());
        self
    }

    /// Replace what upstream reports for a user between lookups.
    pub fn set_user(&self, value: serde_json::Value) {
        let user: UserRecord = parse(value);
        self.users.borrow_mut().insert(user.id.0.clone(), user);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count_calls(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

pub fn user(id: &str, real_name: &str, display_name: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "real_name": real_name,
        "profile": {"real_name": real_name, "display_name": display_name}
    })
}

impl SlackApi for FakeSlack {
    fn list_channels(
        &self,
        channel_type: ChannelType,
        cursor: Option<&SlackCursorId>,
    ) -> Result<ChannelsPage> {
        self.record(Call::ListChannels {
            channel_type,
            cursor: cursor.map(|c| c.0.clone()),
        });
        if let Some(code) = &self.list_error {
            return Err(AppError::SlackAuth(code.clone()));
        }

        let index = page_index(cursor);
        Ok(ChannelsPage {
            channels: self.channel_pages.get(index).cloned().unwrap_or_default(),
            response_metadata: metadata_after(index, self.channel_pages.len()),
        })
    }

    fn channel_history(
        &self,
        _channel: &SlackChannelId,
        cursor: Option<&SlackCursorId>,
        oldest: &SlackTs,
    ) -> Result<MessagesPage> {
        self.record(Call::History {
            cursor: cursor.map(|c| c.0.clone()),
            oldest: oldest.0.clone(),
        });

        let index = page_index(cursor);
        Ok(MessagesPage {
            messages: self.history_pages.get(index).cloned().unwrap_or_default(),
            has_more: index + 1 < self.history_pages.len(),
            response_metadata: metadata_after(index, self.history_pages.len()),
        })
    }

    fn thread_replies(
        &self,
        _channel: &SlackChannelId,
        thread_ts: &SlackTs,
        limit: u16,
    ) -> Result<MessagesPage> {
        self.record(Call::Replies {
            thread_ts: thread_ts.0.clone(),
            limit,
        });

        let (messages, has_more) = self
            .replies
            .get(&thread_ts.0)
            .cloned()
            .ok_or_else(|| AppError::SlackApi("conversations.replies: thread_not_found".into()))?;
        Ok(MessagesPage {
            messages,
            has_more,
            response_metadata: None,
        })
    }

    fn user_info(&self, user: &SlackUserId) -> Result<UserRecord> {
        self.record(Call::UserInfo(user.0.clone()));
        self.users
            .borrow()
            .get(&user.0)
            .cloned()
            .ok_or_else(|| AppError::SlackApi("users.info: user_not_found".into()))
    }

    fn bot_info(&self, bot: &SlackBotId) -> Result<BotRecord> {
        self.record(Call::BotInfo(bot.0.clone()));
        self.bots
            .get(&bot.0)
            .cloned()
            .ok_or_else(|| AppError::SlackApi("bots.info: bot_not_found".into()))
    }
}
