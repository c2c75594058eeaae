use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::settings::{ChannelType, DisplayTimezone, ExportSettings, SETTINGS_FILE};

#[derive(Parser)]
#[command(name = "slack-channel-export")]
#[command(about = "Export the history of one Slack channel, threads included, to a CSV file")]
pub struct Cli {
    /// Log more (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export a channel's messages and thread replies to CSV
    ExportChannel(ExportArgs),
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Channel name, without the leading '#'
    #[arg(short, long)]
    pub channel: Option<String>,

    /// Conversation type to search, defaults to private_channel
    #[arg(long, value_enum)]
    pub channel_type: Option<ChannelType>,

    /// Timezone for dates and times in the export, defaults to US/Pacific
    #[arg(short, long, value_enum)]
    pub timezone: Option<DisplayTimezone>,

    /// Largest thread that can be exported, defaults to 300
    #[arg(short, long)]
    pub max_thread_messages: Option<u16>,

    /// Directory for the CSV file, defaults to ~/Desktop
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Slack Web API base URL
    #[arg(long)]
    pub api_base_url: Option<String>,

    /// Settings file path
    #[arg(long, default_value = SETTINGS_FILE)]
    pub config: PathBuf,
}

impl ExportArgs {
    pub fn to_settings(&self) -> ExportSettings {
        ExportSettings {
            channel: self.channel.clone(),
            channel_type: self.channel_type,
            timezone: self.timezone,
            max_thread_messages: self.max_thread_messages,
            output_dir: self.output_dir.clone(),
            api_base_url: self.api_base_url.clone(),
        }
    }
}
