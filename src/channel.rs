use slack_morphism::prelude::{SlackChannelId, SlackCursorId};
use tracing::{debug, info};

use crate::settings::ChannelType;
use crate::slack::SlackApi;
use crate::{AppError, Result};

/// Walk the non-archived channels of `channel_type` until one is named `name`.
///
/// The first match wins. Each page is requested once; the search stops at
/// the first page without a next cursor.
pub fn find_channel_id<A: SlackApi>(
    api: &A,
    name: &str,
    channel_type: ChannelType,
) -> Result<SlackChannelId> {
    let mut cursor: Option<SlackCursorId> = None;
    let mut pages = 0;

    loop {
        let page = api.list_channels(channel_type, cursor.as_ref())?;
        pages += 1;
        debug!(page = pages, channels = page.channels.len(), "fetched channel page");

        if let Some(channel) = page
            .channels
            .iter()
            .find(|channel| channel.name.as_deref() == Some(name))
        {
            info!(channel = name, id = %channel.id.0, "found channel");
            return Ok(channel.id.clone());
        }

        match page.next_cursor() {
            Some(next) => cursor = Some(next.clone()),
            None => break,
        }
    }

    Err(AppError::ChannelNotFound {
        channel_type: channel_type.to_string(),
        name: name.to_string(),
    })
}
