// ── Presence / queue types ──

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::customer::LookupOutcome;

/// A decoded tag read attributed to a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSighting {
    pub tag_id: String,
    pub zone_ordinal: u8,
    pub zone_name: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneVisit {
    pub zone_ordinal: u8,
    pub zone_name: String,
    pub at: DateTime<Utc>,
}

/// One queued customer, keyed by tag id.
///
/// `visits` is never empty and is kept in the order reads were processed;
/// the last visit is the entry's current zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    pub tag_id: String,
    pub arrived_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lookup: LookupOutcome,
    pub visits: Vec<ZoneVisit>,
}

impl PresenceEntry {
    pub fn current_visit(&self) -> Option<&ZoneVisit> {
        self.visits.last()
    }

    pub fn current_zone(&self) -> Option<u8> {
        self.current_visit().map(|v| v.zone_ordinal)
    }

    /// Zone path like `Z1 → Z3 → Z5`.
    pub fn route(&self) -> String {
        self.visits
            .iter()
            .map(|v| format!("Z{}", v.zone_ordinal))
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

/// Queue occupancy: total plus a count per current zone.
///
/// Zones with nobody in them are absent from `by_zone`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total: usize,
    pub by_zone: BTreeMap<u8, usize>,
}

impl StatusSummary {
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a Arc<PresenceEntry>>,
    {
        let mut summary = Self::default();
        for entry in entries {
            summary.total += 1;
            if let Some(zone) = entry.current_zone() {
                *summary.by_zone.entry(zone).or_default() += 1;
            }
        }
        summary
    }
}

impl fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.total == 1 { "customer" } else { "customers" };
        write!(f, "{} {noun} waiting", self.total)?;
        if !self.by_zone.is_empty() {
            let breakdown = self
                .by_zone
                .iter()
                .map(|(zone, count)| format!("Z{zone}:{count}"))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, " - {breakdown}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn summary_line() {
        let summary = StatusSummary {
            total: 3,
            by_zone: BTreeMap::from([(3, 2), (1, 1)]),
        };
        assert_eq!(summary.to_string(), "3 customers waiting - Z1:1, Z3:2");
        assert_eq!(StatusSummary::default().to_string(), "0 customers waiting");

        let single = StatusSummary {
            total: 1,
            by_zone: BTreeMap::from([(5, 1)]),
        };
        assert_eq!(single.to_string(), "1 customer waiting - Z5:1");
    }
}
