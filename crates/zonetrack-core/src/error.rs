// ── Core error types ──
//
// Domain errors from zonetrack-core. Consumers never see raw socket
// errors; the `From<zonetrack_wire::Error>` impl folds transport failures
// into connection variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to zone reader at {addr}: {reason}")]
    ConnectionFailed { addr: String, reason: String },

    #[error("Zone reader connect timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Zone link lost: {reason}")]
    LinkLost { reason: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Zone not found: {identifier}")]
    ZoneNotFound { identifier: String },

    #[error("Tag not found: {tag_id}")]
    TagNotFound { tag_id: String },

    #[error("Tag already registered: {tag_id}")]
    TagExists { tag_id: String },

    // ── Store errors ─────────────────────────────────────────────────
    #[error("Tag store error: {message}")]
    Store { message: String },

    #[error("Tag store {operation} timed out after {timeout_ms}ms")]
    StoreTimeout { operation: String, timeout_ms: u64 },

    // ── Validation / configuration ───────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Monitor is not running")]
    MonitorStopped,

    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<zonetrack_wire::Error> for CoreError {
    fn from(err: zonetrack_wire::Error) -> Self {
        match err {
            zonetrack_wire::Error::Connect { addr, source } => CoreError::ConnectionFailed {
                addr,
                reason: source.to_string(),
            },
            zonetrack_wire::Error::ConnectTimeout { timeout_ms, .. } => {
                CoreError::Timeout { timeout_ms }
            }
            e @ (zonetrack_wire::Error::Read(_) | zonetrack_wire::Error::Closed) => {
                CoreError::LinkLost {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_error_keeps_address() {
        let err = zonetrack_wire::Error::Connect {
            addr: "192.168.1.201:5001".into(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        match CoreError::from(err) {
            CoreError::ConnectionFailed { addr, .. } => assert_eq!(addr, "192.168.1.201:5001"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn closed_maps_to_link_lost() {
        assert!(matches!(
            CoreError::from(zonetrack_wire::Error::Closed),
            CoreError::LinkLost { .. }
        ));
    }
}
