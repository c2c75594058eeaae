use std::path::PathBuf;

use chrono::{DateTime, Utc};
use slack_morphism::prelude::{SlackChannelId, SlackTs};
use tracing::{debug, info, warn};

use crate::Result;
use crate::channel::find_channel_id;
use crate::history::{HistoryWalker, expand_thread, oldest_cutoff};
use crate::identity::IdentityResolver;
use crate::row::RowFormatter;
use crate::settings::{ChannelType, DisplayTimezone};
use crate::sink::CsvSink;
use crate::slack::{SlackApi, ThreadPosition};

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub channel_name: String,
    pub channel_type: ChannelType,
    pub timezone: DisplayTimezone,
    pub max_thread_messages: u16,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub file_name: String,
    pub rows: usize,
}

/// `<channel>_CHANNEL_CONVO_<MM_DD_YYYY_HH_MM_SS_TZ>.csv`, in the display
/// timezone.
pub fn export_file_name(channel_name: &str, now: DateTime<Utc>, timezone: DisplayTimezone) -> String {
    let local = now.with_timezone(&timezone.tz());
    format!(
        "{}_CHANNEL_CONVO_{}.csv",
        channel_name,
        local.format("%m_%d_%Y_%H_%M_%S_%Z")
    )
}

/// Export one channel to a new CSV file in `options.output_dir`.
///
/// Nothing is created when the channel cannot be found. Once the file exists,
/// any failure deletes it again so a run leaves either a complete export or
/// nothing.
pub fn export_channel<A: SlackApi>(
    api: &A,
    options: &ExportOptions,
    now: DateTime<Utc>,
) -> Result<ExportSummary> {
    let channel_id = find_channel_id(api, &options.channel_name, options.channel_type)?;

    let tz = options.timezone.tz();
    let oldest = oldest_cutoff(now.with_timezone(&tz).date_naive(), tz)?;
    info!(channel = %options.channel_name, oldest = %oldest.0, "exporting history");

    let file_name = export_file_name(&options.channel_name, now, options.timezone);
    let path = options.output_dir.join(&file_name);
    let mut sink = CsvSink::create(&path, options.timezone)?;

    if let Err(e) = write_history(api, &channel_id, &oldest, options, &mut sink) {
        warn!(path = %sink.path().display(), "export aborted, removing partial file");
        sink.discard();
        return Err(e);
    }

    let rows = sink.finish()?;
    info!(rows, path = %path.display(), "export complete");
    Ok(ExportSummary {
        path,
        file_name,
        rows,
    })
}

fn write_history<A: SlackApi>(
    api: &A,
    channel_id: &SlackChannelId,
    oldest: &SlackTs,
    options: &ExportOptions,
    sink: &mut CsvSink,
) -> Result<()> {
    let formatter = RowFormatter::new(options.timezone.tz());
    let mut resolver = IdentityResolver::new(api);

    for message in HistoryWalker::new(api, channel_id.clone(), oldest.clone()) {
        let message = message?;

        match message.thread_position() {
            ThreadPosition::Standalone => {
                let row = formatter.format(&message, &message, &mut resolver)?;
                sink.write_row(&row)?;
            }
            ThreadPosition::Root => {
                let replies =
                    expand_thread(api, channel_id, &message, options.max_thread_messages)?;
                for reply in &replies {
                    let row = formatter.format(&message, reply, &mut resolver)?;
                    sink.write_row(&row)?;
                }
            }
            ThreadPosition::Reply => {
                debug!(ts = %message.ts.0, "skipping reply already covered by its thread");
            }
        }
    }

    Ok(())
}
