use chrono::Utc;

use crate::cli::ExportArgs;
use crate::error::Result;
use crate::export::export_channel;
use crate::load_token;
use crate::settings::{DEFAULT_API_BASE_URL, Settings};
use crate::slack::SlackWebClient;

pub fn run_export_channel(args: ExportArgs) -> Result<()> {
    let token = load_token()?;

    let settings = Settings::load(&args.config)?;
    let merged = settings.export.overridden_by(args.to_settings());
    let api_base_url = merged
        .api_base_url
        .clone()
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let options = merged.into_options()?;

    let client = SlackWebClient::new(&token, &api_base_url)?;

    println!(
        "Exporting {} {} to {}...",
        options.channel_type,
        options.channel_name,
        options.output_dir.display()
    );

    let summary = export_channel(&client, &options, Utc::now())?;

    println!(
        "\n >>> The export is now complete. <<<\n >>> The CSV file, [ {} ], was created in {} with {} rows. <<<\n",
        summary.file_name,
        options.output_dir.display(),
        summary.rows
    );
    Ok(())
}
