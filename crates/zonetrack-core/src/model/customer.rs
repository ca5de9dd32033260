// ── Customer / tag directory types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Customer data registered against a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub tag_id: String,
    pub customer_name: String,
    pub dog_name: String,
    pub dog_breed: String,
    pub vehicle: String,
    pub notes: String,
    pub created_at: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl CustomerRecord {
    /// A record with only the tag id set.
    pub fn bare(tag_id: impl Into<String>) -> Self {
        Self {
            tag_id: tag_id.into(),
            customer_name: String::new(),
            dog_name: String::new(),
            dog_breed: String::new(),
            vehicle: String::new(),
            notes: String::new(),
            created_at: None,
            last_seen: None,
        }
    }
}

/// Result of resolving a tag against the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupOutcome {
    Found(CustomerRecord),
    NotFound,
    Failed { error: String },
}

impl LookupOutcome {
    pub fn customer(&self) -> Option<&CustomerRecord> {
        match self {
            Self::Found(record) => Some(record),
            Self::NotFound | Self::Failed { .. } => None,
        }
    }

    /// Name shown in the queue: customer name, or a placeholder.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Found(record) if !record.customer_name.is_empty() => &record.customer_name,
            Self::Found(_) | Self::NotFound => "Unknown Customer",
            Self::Failed { .. } => "Lookup Error",
        }
    }
}

/// One tag read, as handed to the directory's read log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRecord {
    pub tag_id: String,
    pub zone_ordinal: u8,
    pub zone_name: String,
    pub controller_id: String,
    pub controller_ip: String,
    pub read_at: DateTime<Utc>,
}
