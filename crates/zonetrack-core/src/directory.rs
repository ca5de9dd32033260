// ── Tag directory seam ──
//
// The monitor logs every read and resolves tags to customers through a
// `TagDirectory`. Implementations are synchronous; the monitor runs them
// on the blocking pool under a timeout.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::error::CoreError;
use crate::model::{CustomerRecord, ReadRecord};

/// Customer directory and read log.
pub trait TagDirectory: Send + Sync + 'static {
    /// Append one read to the read log.
    fn log_read(&self, read: &ReadRecord) -> Result<(), CoreError>;

    /// Resolve a tag and mark it seen at `seen_at`. `Ok(None)` means the
    /// tag is not registered.
    fn lookup_and_touch(
        &self,
        tag_id: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<Option<CustomerRecord>, CoreError>;
}

/// Process-local directory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    tags: DashMap<String, CustomerRecord>,
    reads: Mutex<Vec<ReadRecord>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a customer. Fails if the tag id is empty or taken.
    pub fn register(&self, mut record: CustomerRecord) -> Result<(), CoreError> {
        let tag_id = record.tag_id.trim().to_owned();
        if tag_id.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "tag id is required".into(),
            });
        }
        if self.tags.contains_key(&tag_id) {
            return Err(CoreError::TagExists { tag_id });
        }
        record.tag_id.clone_from(&tag_id);
        record.created_at.get_or_insert_with(Utc::now);
        self.tags.insert(tag_id, record);
        Ok(())
    }

    pub fn get(&self, tag_id: &str) -> Option<CustomerRecord> {
        self.tags.get(tag_id).map(|r| r.value().clone())
    }

    /// Every logged read, oldest first.
    pub fn reads(&self) -> Vec<ReadRecord> {
        self.reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TagDirectory for InMemoryDirectory {
    fn log_read(&self, read: &ReadRecord) -> Result<(), CoreError> {
        self.reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(read.clone());
        Ok(())
    }

    fn lookup_and_touch(
        &self,
        tag_id: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<Option<CustomerRecord>, CoreError> {
        Ok(self.tags.get_mut(tag_id).map(|mut record| {
            record.last_seen = Some(seen_at);
            record.clone()
        }))
    }
}
