use std::iter::Rev;
use std::vec;

use chrono::{Datelike, Months, NaiveDate, TimeZone};
use chrono_tz::Tz;
use slack_morphism::prelude::{SlackChannelId, SlackCursorId, SlackTs};
use tracing::debug;

use crate::slack::{MessageRecord, SlackApi};
use crate::{AppError, Result};

/// How far back the export reaches, in whole months before the current one.
const HISTORY_MONTHS: u32 = 11;

/// Midnight on the first day of the month `HISTORY_MONTHS` before `today`,
/// in `tz`, as a Slack timestamp.
pub fn oldest_cutoff(today: NaiveDate, tz: Tz) -> Result<SlackTs> {
    let first_day = today
        .checked_sub_months(Months::new(HISTORY_MONTHS))
        .and_then(|date| date.with_day(1))
        .ok_or_else(|| AppError::InvalidDate(today.to_string()))?;
    let midnight = first_day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::InvalidDate(first_day.to_string()))?;
    let local = tz
        .from_local_datetime(&midnight)
        .earliest()
        .ok_or_else(|| AppError::InvalidDate(first_day.to_string()))?;

    Ok(SlackTs(format!("{}.000000", local.timestamp())))
}

/// Top-level messages of a channel, oldest first.
///
/// With only `oldest` set, Slack pages forward in time from the cutoff but
/// lists each page newest first. The walker reverses one page at a time and
/// only requests the next page once the current one is drained. An error
/// ends the walk.
pub struct HistoryWalker<'a, A> {
    api: &'a A,
    channel: SlackChannelId,
    oldest: SlackTs,
    cursor: Option<SlackCursorId>,
    page: Rev<vec::IntoIter<MessageRecord>>,
    pages_fetched: usize,
    finished: bool,
}

impl<'a, A: SlackApi> HistoryWalker<'a, A> {
    pub fn new(api: &'a A, channel: SlackChannelId, oldest: SlackTs) -> Self {
        Self {
            api,
            channel,
            oldest,
            cursor: None,
            page: Vec::new().into_iter().rev(),
            pages_fetched: 0,
            finished: false,
        }
    }

    #[cfg(test)]
    fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    fn fetch_page(&mut self) -> Result<()> {
        let page = self
            .api
            .channel_history(&self.channel, self.cursor.as_ref(), &self.oldest)?;
        self.pages_fetched += 1;
        debug!(
            page = self.pages_fetched,
            messages = page.messages.len(),
            has_more = page.has_more,
            "fetched history page"
        );

        self.cursor = match page.next_cursor() {
            Some(cursor) if page.has_more => Some(cursor.clone()),
            _ => None,
        };
        self.finished = self.cursor.is_none();
        self.page = page.messages.into_iter().rev();
        Ok(())
    }
}

impl<A: SlackApi> Iterator for HistoryWalker<'_, A> {
    type Item = Result<MessageRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(message) = self.page.next() {
                return Some(Ok(message));
            }
            if self.finished {
                return None;
            }
            if let Err(e) = self.fetch_page() {
                self.finished = true;
                return Some(Err(e));
            }
        }
    }
}

/// Replies of the thread rooted at `root`, in the order Slack returns them.
///
/// A single request is made with `limit = max_messages`. If Slack reports more
/// replies beyond that, the thread would be truncated, so this fails with
/// [`AppError::ThreadOverflow`] instead.
pub fn expand_thread<A: SlackApi>(
    api: &A,
    channel: &SlackChannelId,
    root: &MessageRecord,
    max_messages: u16,
) -> Result<Vec<MessageRecord>> {
    let page = api.thread_replies(channel, &root.ts, max_messages)?;
    if page.has_more {
        return Err(AppError::ThreadOverflow {
            max: max_messages,
            thread_ts: root.ts.0.clone(),
        });
    }

    debug!(thread_ts = %root.ts.0, replies = page.messages.len(), "expanded thread");
    Ok(page.messages)
}
