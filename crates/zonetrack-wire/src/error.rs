use thiserror::Error;

/// Top-level error type for the `zonetrack-wire` crate.
///
/// Covers the link-level failure modes: establishing a connection,
/// losing it, and reading from it. `zonetrack-core` maps these into
/// zone status strings.
#[derive(Debug, Error)]
pub enum Error {
    // ── Connection ──────────────────────────────────────────────────
    /// Initial connect attempt failed (refused, unreachable, DNS, ...).
    #[error("Cannot connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Connect attempt did not complete in time.
    #[error("Connect to {addr} timed out after {timeout_ms}ms")]
    ConnectTimeout { addr: String, timeout_ms: u64 },

    // ── Established link ────────────────────────────────────────────
    /// Socket read failed while listening.
    #[error("Read failed: {0}")]
    Read(#[from] std::io::Error),

    /// Reader closed the connection.
    #[error("Connection closed by reader")]
    Closed,
}
