pub mod channel;
pub mod cli;
pub mod commands;
pub mod error;
pub mod export;
pub mod history;
pub mod identity;
pub mod mentions;
pub mod row;
pub mod settings;
pub mod sink;
pub mod slack;

#[cfg(test)]
mod testing;

pub use cli::{Cli, Commands, ExportArgs};
pub use error::{AppError, Result};
pub use export::{ExportOptions, ExportSummary, export_channel};

pub fn load_token() -> Result<String> {
    std::env::var("SLACK_TOKEN")
        .ok()
        .filter(|token| !token.is_empty())
        .ok_or(AppError::MissingToken)
}
