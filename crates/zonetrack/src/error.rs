//! CLI error types with miette diagnostics.
//!
//! Maps core, config and store errors into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use zonetrack_config::ConfigError;
use zonetrack_core::CoreError;
use zonetrack_db::DbError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to zone reader at {addr}")]
    #[diagnostic(
        code(zonetrack::connection_failed),
        help(
            "Check that the controller is powered and the reader service is running.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { addr: String, reason: String },

    #[error("No zone came online")]
    #[diagnostic(
        code(zonetrack::all_offline),
        help("Check the zone table with: zonetrack zones list")
    )]
    AllZonesOffline,

    #[error("Timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(zonetrack::timeout),
        help("Raise link.connect_timeout_ms or store.timeout_ms in the config file.")
    )]
    Timeout { timeout_ms: u64 },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(zonetrack::not_found),
        help("Run: zonetrack {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{resource_type} '{identifier}' already exists")]
    #[diagnostic(code(zonetrack::conflict))]
    Conflict {
        resource_type: String,
        identifier: String,
    },

    #[error("No tag id could be decoded from the payload")]
    #[diagnostic(
        code(zonetrack::undecodable),
        help(
            "Hex dumps need a space between bytes; JSON needs one of\n\
             rfid_tag, tagId, tag_id or epc."
        )
    )]
    Undecodable,

    // ── Store ────────────────────────────────────────────────────────

    #[error("Tag store error: {message}")]
    #[diagnostic(
        code(zonetrack::store),
        help("Database: {path}")
    )]
    Store { message: String, path: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(zonetrack::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(zonetrack::config),
        help("Inspect the effective values with: zonetrack config show")
    )]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(zonetrack::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Lifecycle ────────────────────────────────────────────────────

    #[error("The monitor stopped unexpectedly")]
    #[diagnostic(code(zonetrack::monitor_stopped))]
    MonitorStopped,

    #[error("Internal error: {0}")]
    #[diagnostic(code(zonetrack::internal))]
    Internal(String),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::AllZonesOffline => exit_code::CONNECTION,
            Self::NotFound { .. } | Self::Undecodable => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the database path to store failures.
    pub fn store(err: DbError, path: &std::path::Path) -> Self {
        match CoreError::from(err) {
            CoreError::Store { message } => Self::Store {
                message,
                path: path.display().to_string(),
            },
            other => other.into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { addr, reason } => CliError::ConnectionFailed { addr, reason },

            CoreError::LinkLost { reason } => CliError::ConnectionFailed {
                addr: "(zone link)".into(),
                reason,
            },

            CoreError::Timeout { timeout_ms } | CoreError::StoreTimeout { timeout_ms, .. } => {
                CliError::Timeout { timeout_ms }
            }

            CoreError::ZoneNotFound { identifier } => CliError::NotFound {
                resource_type: "zone".into(),
                identifier,
                list_command: "zones list".into(),
            },

            CoreError::TagNotFound { tag_id } => CliError::NotFound {
                resource_type: "tag".into(),
                identifier: tag_id,
                list_command: "tags list".into(),
            },

            CoreError::TagExists { tag_id } => CliError::Conflict {
                resource_type: "tag".into(),
                identifier: tag_id,
            },

            CoreError::Store { message } => CliError::Store {
                message,
                path: "(unknown)".into(),
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::MonitorStopped => CliError::MonitorStopped,

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}
