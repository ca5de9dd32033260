// ── Domain model ──

pub mod customer;
pub mod presence;
pub mod zone;

use std::sync::Arc;

pub use customer::{CustomerRecord, LookupOutcome, ReadRecord};
pub use presence::{PresenceEntry, StatusSummary, TagSighting, ZoneVisit};
pub use zone::{ConnectionHealth, DisplayColor, ZoneConfig, ZoneStatus};

/// Ordered point-in-time copy published through a `watch` channel.
pub type Snapshot<T> = Arc<Vec<Arc<T>>>;
