use chrono::DateTime;
use chrono_tz::Tz;
use slack_morphism::prelude::{SlackTs, SlackUserId};

use crate::identity::{IdentityId, IdentityResolver};
use crate::mentions::replace_mentions;
use crate::settings::DisplayTimezone;
use crate::slack::{AuthorRef, MessageRecord, SlackApi};
use crate::{AppError, Result};

pub const ATTACHMENT_UNAVAILABLE: &str = "[ ATTACHMENT NO LONGER AVAILABLE ]";

const DATE_FORMAT: &str = "%m/%d/%Y %H:%M:%S";
const TIME_FORMAT: &str = "%I:%M:%S %p";

/// One line of the export.
///
/// `primary_*` is the top-level message's time; `thread_*` is the time of
/// the message the row is about. Both are equal for unthreaded messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub primary_date: String,
    pub primary_time: String,
    pub thread_date: String,
    pub thread_time: String,
    pub author: String,
    pub message: String,
    pub attachment: String,
}

impl ExportRow {
    pub fn header(timezone: DisplayTimezone) -> [String; 7] {
        [
            format!("DATETIME ({})", timezone.label()),
            "TIME".to_string(),
            format!("THREADED MSG DATE ({})", timezone.label()),
            "THREADED MSG TIME".to_string(),
            "AUTHOR".to_string(),
            "MESSAGE".to_string(),
            "ATTACHMENTS".to_string(),
        ]
    }

    pub fn fields(&self) -> [&str; 7] {
        [
            &self.primary_date,
            &self.primary_time,
            &self.thread_date,
            &self.thread_time,
            &self.author,
            &self.message,
            &self.attachment,
        ]
    }
}

pub fn slack_ts_to_datetime(ts: &SlackTs, tz: Tz) -> Result<DateTime<Tz>> {
    let seconds: f64 = ts
        .0
        .parse()
        .ok()
        .filter(|seconds: &f64| seconds.is_finite())
        .ok_or_else(|| AppError::InvalidTimestamp(ts.0.clone()))?;
    let utc = DateTime::from_timestamp(seconds as i64, 0)
        .ok_or_else(|| AppError::InvalidTimestamp(ts.0.clone()))?;
    Ok(utc.with_timezone(&tz))
}

/// The link to show for a message's attachment, or an empty string.
pub fn attachment_link(message: &MessageRecord) -> String {
    if let Some(file) = message.files.first() {
        return if file.mode.as_deref() == Some("hosted") {
            file.permalink.clone().unwrap_or_default()
        } else {
            ATTACHMENT_UNAVAILABLE.to_string()
        };
    }

    if message.is_giphy() {
        return message
            .blocks
            .first()
            .and_then(|block| block.image_url.clone())
            .unwrap_or_default();
    }

    String::new()
}

pub struct RowFormatter {
    tz: Tz,
}

impl RowFormatter {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Build the row for `message`, which is `root` itself or one of the
    /// replies in `root`'s thread.
    pub fn format<A: SlackApi>(
        &self,
        root: &MessageRecord,
        message: &MessageRecord,
        resolver: &mut IdentityResolver<'_, A>,
    ) -> Result<ExportRow> {
        let primary = slack_ts_to_datetime(&root.ts, self.tz)?;
        let own = slack_ts_to_datetime(&message.ts, self.tz)?;

        let author = match message.author() {
            Some(AuthorRef::User(user)) => resolver.resolve_full_name(IdentityId::User(user))?,
            Some(AuthorRef::Bot(bot)) => resolver.resolve_full_name(IdentityId::Bot(bot))?,
            Some(AuthorRef::Username(name)) => name.to_string(),
            None => String::new(),
        };

        let text = replace_mentions(&message.text, |id| {
            resolver.resolve_display_name(&SlackUserId(id.to_string()))
        })?;

        Ok(ExportRow {
            primary_date: primary.format(DATE_FORMAT).to_string(),
            primary_time: primary.format(TIME_FORMAT).to_string(),
            thread_date: own.format(DATE_FORMAT).to_string(),
            thread_time: own.format(TIME_FORMAT).to_string(),
            author,
            message: text,
            attachment: attachment_link(message),
        })
    }
}
