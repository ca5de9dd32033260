//! Command dispatch: bridges CLI args -> core/store calls -> output formatting.

pub mod config_cmd;
pub mod decode;
pub mod history;
pub mod monitor;
pub mod tags;
pub mod util;
pub mod zones;

use std::path::PathBuf;

use clap::ValueEnum;
use zonetrack_config::Config;
use zonetrack_db::SqliteDirectory;

use crate::cli::{ColorMode, Command, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Everything a handler needs: the loaded config with CLI overrides applied.
pub struct Context {
    pub config: Config,
    pub database: PathBuf,
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
    pub yes: bool,
}

impl Context {
    /// Load the config file (or `--config`) and layer the global flags on top.
    pub fn load(global: &GlobalOpts) -> Result<Self, CliError> {
        let config = match &global.config {
            Some(path) => zonetrack_config::load_config_from(path)?,
            None => zonetrack_config::load_config()?,
        };

        let format = match global.output {
            Some(format) => format,
            None => parse_setting("defaults.output", &config.defaults.output)?,
        };
        let color_mode: ColorMode = match global.color {
            Some(mode) => mode,
            None => parse_setting("defaults.color", &config.defaults.color)?,
        };
        let database = global
            .database
            .clone()
            .unwrap_or_else(|| config.database_path());

        Ok(Self {
            config,
            database,
            format,
            color: output::should_color(color_mode),
            quiet: global.quiet,
            yes: global.yes,
        })
    }

    pub fn open_store(&self) -> Result<SqliteDirectory, CliError> {
        tracing::debug!(path = %self.database.display(), "opening tag store");
        SqliteDirectory::open(&self.database).map_err(|e| CliError::store(e, &self.database))
    }

    pub fn print(&self, rendered: &str) {
        output::print_output(rendered, self.quiet);
    }
}

fn parse_setting<E: ValueEnum>(field: &str, value: &str) -> Result<E, CliError> {
    E::from_str(value, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}

/// Dispatch a config-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context) -> Result<(), CliError> {
    match cmd {
        Command::Monitor(args) => monitor::handle(args, ctx).await,
        Command::Zones(args) => zones::handle(&args, ctx),
        Command::Tags(args) => tags::handle(args, ctx),
        Command::History(args) => history::handle(&args, ctx),
        Command::Decode(args) => decode::handle(&args, ctx),
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command must be handled before dispatch".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_parse_case_insensitively() {
        let format: OutputFormat = parse_setting("defaults.output", "JSON-compact").unwrap_or(OutputFormat::Table);
        assert_eq!(format, OutputFormat::JsonCompact);
        assert!(parse_setting::<ColorMode>("defaults.color", "sometimes").is_err());
    }
}
