// zonetrack-core: presence tracking between zone links and consumers (CLI).

pub mod config;
pub mod directory;
pub mod error;
pub mod model;
pub mod monitor;
pub mod registry;
pub mod tracker;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{MAX_ZONE_ORDINAL, MonitorConfig};
pub use directory::{InMemoryDirectory, TagDirectory};
pub use error::CoreError;
pub use monitor::{Command, CommandResult, Monitor, MonitorEvent};
pub use registry::{ConnectOutcome, ZoneRegistry};
pub use tracker::PresenceTracker;

pub use model::{
    ConnectionHealth, CustomerRecord, DisplayColor, LookupOutcome, PresenceEntry, ReadRecord,
    Snapshot, StatusSummary, TagSighting, ZoneConfig, ZoneStatus, ZoneVisit,
};

// Link-level types consumers need without depending on zonetrack-wire.
pub use zonetrack_wire::{FrameKind, LinkState, ReconnectPolicy};
