//! Clap derive structures for the `zonetrack` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// zonetrack -- live RFID zone monitor for the grooming floor
#[derive(Debug, Parser)]
#[command(
    name = "zonetrack",
    version,
    about = "Track tagged customers across RFID reader zones",
    long_about = "Listens to the RFID reader zones on the shop controllers, keeps a\n\
        live queue of who is where, and manages the tag directory and read history.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "ZONETRACK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Tag database (overrides store.database)
    #[arg(long, env = "ZONETRACK_DATABASE", global = true)]
    pub database: Option<PathBuf>,

    /// Output format (defaults to defaults.output, then table)
    #[arg(long, short = 'o', env = "ZONETRACK_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, env = "ZONETRACK_COLOR", global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to every zone and follow the live queue
    #[command(alias = "run")]
    Monitor(MonitorArgs),

    /// Show the configured reader zones
    #[command(alias = "z")]
    Zones(ZonesArgs),

    /// Manage the tag directory
    #[command(alias = "t")]
    Tags(TagsArgs),

    /// Query the read log
    #[command(alias = "h")]
    History(HistoryArgs),

    /// Run the frame decoder on a payload
    Decode(DecodeArgs),

    /// Manage the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Monitor ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MonitorArgs {
    /// Use an in-memory tag directory instead of the database
    #[arg(long)]
    pub ephemeral: bool,

    /// Don't connect on start; wait for a `connect` console command
    #[arg(long)]
    pub no_connect: bool,
}

// ── Zones ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ZonesArgs {
    #[command(subcommand)]
    pub command: ZonesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ZonesCommand {
    /// List configured zones
    #[command(alias = "ls")]
    List,
}

// ── Tags ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TagsArgs {
    #[command(subcommand)]
    pub command: TagsCommand,
}

#[derive(Debug, Subcommand)]
pub enum TagsCommand {
    /// Register a tag to a customer
    Add(TagAddArgs),

    /// List registered tags, most recently seen first
    #[command(alias = "ls")]
    List,

    /// Show a tag and its recent reads
    Show {
        /// Tag id
        tag_id: String,
    },

    /// Remove a tag from the directory (its reads are kept)
    #[command(alias = "rm")]
    Remove {
        /// Tag id
        tag_id: String,
    },
}

#[derive(Debug, Args)]
pub struct TagAddArgs {
    /// Tag id as reported by the readers
    pub tag_id: String,

    /// Customer name
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Dog name
    #[arg(long)]
    pub dog: Option<String>,

    /// Dog breed
    #[arg(long)]
    pub breed: Option<String>,

    /// Vehicle description
    #[arg(long)]
    pub vehicle: Option<String>,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,
}

// ── History ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Only reads from this zone ordinal
    #[arg(long, short = 'z', value_parser = clap::value_parser!(u8).range(1..=8))]
    pub zone: Option<u8>,

    /// Start date (YYYY-MM-DD, local) or RFC 3339 timestamp, inclusive
    #[arg(long)]
    pub from: Option<String>,

    /// End date (YYYY-MM-DD, local, whole day included) or RFC 3339 timestamp
    #[arg(long)]
    pub to: Option<String>,

    /// Only reads of this tag
    #[arg(long, short = 't')]
    pub tag: Option<String>,

    /// Maximum rows
    #[arg(long, short = 'n', default_value = "1000")]
    pub limit: usize,
}

// ── Decode ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Payload text exactly as a reader would send it
    pub payload: String,

    /// Treat the payload as hex-encoded raw bytes
    #[arg(long)]
    pub hex: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file with the stock zone table
    Init,

    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
