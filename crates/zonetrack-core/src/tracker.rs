// ── Presence tracker ──
//
// In-memory queue of tagged customers. One entry per tag id; repeated
// sightings extend the entry's visit history instead of creating a new
// one. Owned by the monitor loop, so no interior locking.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::model::{LookupOutcome, PresenceEntry, StatusSummary, TagSighting, ZoneVisit};

/// Queue of present tags in arrival order.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    entries: IndexMap<String, Arc<PresenceEntry>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sighting. Returns the updated entry and whether it was
    /// newly created.
    pub fn on_sighting(
        &mut self,
        sighting: &TagSighting,
        lookup: LookupOutcome,
    ) -> (Arc<PresenceEntry>, bool) {
        let visit = ZoneVisit {
            zone_ordinal: sighting.zone_ordinal,
            zone_name: sighting.zone_name.clone(),
            at: sighting.at,
        };

        if let Some(slot) = self.entries.get_mut(&sighting.tag_id) {
            let entry = Arc::make_mut(slot);
            // History is append-only: the most recently processed read is
            // the current zone, whatever timestamp the reader stamped on it.
            entry.visits.push(visit);
            entry.updated_at = sighting.at;
            entry.lookup = lookup;
            return (Arc::clone(slot), false);
        }

        let entry = Arc::new(PresenceEntry {
            tag_id: sighting.tag_id.clone(),
            arrived_at: sighting.at,
            updated_at: sighting.at,
            lookup,
            visits: vec![visit],
        });
        self.entries
            .insert(sighting.tag_id.clone(), Arc::clone(&entry));
        (entry, true)
    }

    /// Remove one entry. Removing an absent tag is a no-op.
    pub fn remove(&mut self, tag_id: &str) -> Option<Arc<PresenceEntry>> {
        self.entries.shift_remove(tag_id)
    }

    /// Remove everything. Returns how many entries were dropped.
    pub fn remove_all(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }

    pub fn get(&self, tag_id: &str) -> Option<&Arc<PresenceEntry>> {
        self.entries.get(tag_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Arc<PresenceEntry>> {
        self.entries.values()
    }

    /// Ordered point-in-time copy for publishing.
    pub fn snapshot(&self) -> Arc<Vec<Arc<PresenceEntry>>> {
        Arc::new(self.entries.values().cloned().collect())
    }

    pub fn status_summary(&self) -> StatusSummary {
        StatusSummary::from_entries(self.entries.values())
    }
}
