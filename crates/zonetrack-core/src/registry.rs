// ── Zone registry ──
//
// Fixed table of zones and their links, enumerated in ordinal order.
// Link handles are shared with callers for connect/disconnect; the
// status table is written only by the monitor loop and published to
// readers through a `watch` channel.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use indexmap::IndexMap;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use zonetrack_wire::{LinkEvent, LinkEventKind, LinkState, ReconnectPolicy, ZoneLink};

use crate::error::CoreError;
use crate::model::{ConnectionHealth, Snapshot, ZoneConfig, ZoneStatus};

/// Result of connecting one zone during [`ZoneRegistry::connect_all`].
#[derive(Debug)]
pub struct ConnectOutcome {
    pub zone: String,
    pub ordinal: u8,
    pub result: Result<(), CoreError>,
}

struct ZoneSlot {
    config: ZoneConfig,
    link: ZoneLink,
}

pub struct ZoneRegistry {
    slots: IndexMap<String, ZoneSlot>,
    status: watch::Sender<Snapshot<ZoneStatus>>,
}

impl ZoneRegistry {
    /// Build the registry. Every link starts disconnected and reports to
    /// the sender paired with its zone.
    pub fn new(
        zones: Vec<(ZoneConfig, mpsc::Sender<LinkEvent>)>,
        policy: ReconnectPolicy,
    ) -> Self {
        let mut zones = zones;
        zones.sort_by_key(|(config, _)| config.ordinal);

        let rows: Vec<Arc<ZoneStatus>> = zones
            .iter()
            .map(|(config, _)| Arc::new(ZoneStatus::new(config.clone())))
            .collect();
        let (status, _) = watch::channel(Arc::new(rows));

        let slots = zones
            .into_iter()
            .map(|(config, events)| {
                let link = ZoneLink::new(config.endpoint(), policy, events);
                (config.name.clone(), ZoneSlot { config, link })
            })
            .collect();

        Self { slots, status }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Zone configs in ordinal order.
    pub fn zones(&self) -> impl Iterator<Item = &ZoneConfig> {
        self.slots.values().map(|slot| &slot.config)
    }

    pub fn by_name(&self, name: &str) -> Option<&ZoneConfig> {
        self.slots.get(name).map(|slot| &slot.config)
    }

    pub fn by_ordinal(&self, ordinal: u8) -> Option<&ZoneConfig> {
        self.slot_by_ordinal(ordinal).map(|slot| &slot.config)
    }

    fn slot_by_ordinal(&self, ordinal: u8) -> Option<&ZoneSlot> {
        self.slots.values().find(|slot| slot.config.ordinal == ordinal)
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Connect every zone concurrently. Partial success is normal; each
    /// zone reports its own outcome.
    pub async fn connect_all(&self) -> Vec<ConnectOutcome> {
        let attempts = self.slots.values().map(|slot| async move {
            ConnectOutcome {
                zone: slot.config.name.clone(),
                ordinal: slot.config.ordinal,
                result: slot.link.connect().await.map_err(CoreError::from),
            }
        });
        let outcomes = join_all(attempts).await;

        let connected = outcomes.iter().filter(|o| o.result.is_ok()).count();
        info!(connected, total = outcomes.len(), "connect-all finished");
        outcomes
    }

    pub async fn disconnect_all(&self) {
        join_all(self.slots.values().map(|slot| slot.link.disconnect())).await;
        debug!("all zone links disconnected");
    }

    pub async fn connect_zone(&self, ordinal: u8) -> Result<(), CoreError> {
        let slot = self.require(ordinal)?;
        slot.link.connect().await.map_err(CoreError::from)
    }

    pub async fn disconnect_zone(&self, ordinal: u8) -> Result<(), CoreError> {
        let slot = self.require(ordinal)?;
        slot.link.disconnect().await;
        Ok(())
    }

    fn require(&self, ordinal: u8) -> Result<&ZoneSlot, CoreError> {
        self.slot_by_ordinal(ordinal)
            .ok_or_else(|| CoreError::ZoneNotFound {
                identifier: ordinal.to_string(),
            })
    }

    // ── Status observation ───────────────────────────────────────────

    pub fn snapshot(&self) -> Snapshot<ZoneStatus> {
        self.status.borrow().clone()
    }

    /// Number of listening zones, computed from the current table.
    pub fn connected_count(&self) -> usize {
        self.status
            .borrow()
            .iter()
            .filter(|row| row.is_connected())
            .count()
    }

    pub fn health(&self) -> ConnectionHealth {
        ConnectionHealth::from_counts(self.connected_count(), self.len())
    }

    // ── Status mutation (monitor loop only) ──────────────────────────

    /// Fold a link state or failure event into the status table.
    pub(crate) fn apply_link_event(&self, event: &LinkEvent) -> Option<Arc<ZoneStatus>> {
        match &event.kind {
            LinkEventKind::State(state) => {
                let state = *state;
                self.update(event.zone, |row| {
                    row.state = state;
                    if state == LinkState::Listening {
                        row.last_error = None;
                    }
                })
            }
            LinkEventKind::Failure { reason } => {
                let reason = reason.clone();
                self.update(event.zone, |row| row.last_error = Some(reason))
            }
            LinkEventKind::Tag { .. } => None,
        }
    }

    /// Count a logged read against its zone.
    pub(crate) fn record_activity(
        &self,
        ordinal: u8,
        tag_id: &str,
        at: DateTime<Utc>,
    ) -> Option<Arc<ZoneStatus>> {
        self.update(ordinal, |row| {
            row.tag_count += 1;
            row.last_activity = Some(at);
            row.last_tag = Some(tag_id.to_owned());
        })
    }

    fn update(&self, ordinal: u8, apply: impl FnOnce(&mut ZoneStatus)) -> Option<Arc<ZoneStatus>> {
        let mut changed = None;
        self.status.send_if_modified(|snapshot| {
            let rows = Arc::make_mut(snapshot);
            let Some(row) = rows.iter_mut().find(|r| r.zone.ordinal == ordinal) else {
                return false;
            };
            apply(Arc::make_mut(row));
            changed = Some(Arc::clone(row));
            true
        });
        changed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::DisplayColor;

    fn registry(ordinals: &[u8]) -> (ZoneRegistry, Vec<mpsc::Receiver<LinkEvent>>) {
        let mut zones = Vec::new();
        let mut receivers = Vec::new();
        for &ordinal in ordinals {
            let (tx, rx) = mpsc::channel(8);
            zones.push((
                ZoneConfig {
                    name: format!("Zone {ordinal}"),
                    ordinal,
                    controller_id: "pr-rpi001".into(),
                    host: "127.0.0.1".into(),
                    port: 5000 + u16::from(ordinal),
                    color: DisplayColor::rgb(0xAD, 0xD8, 0xE6),
                },
                tx,
            ));
            receivers.push(rx);
        }
        (ZoneRegistry::new(zones, ReconnectPolicy::default()), receivers)
    }

    fn state(zone: u8, state: LinkState) -> LinkEvent {
        LinkEvent {
            zone,
            at: Utc::now(),
            kind: LinkEventKind::State(state),
        }
    }

    #[tokio::test]
    async fn zones_enumerate_in_ordinal_order() {
        let (registry, _rx) = registry(&[3, 1, 2]);
        let order: Vec<u8> = registry.zones().map(|z| z.ordinal).collect();
        assert_eq!(order, vec![1, 2, 3]);
        let rows: Vec<u8> = registry.snapshot().iter().map(|r| r.zone.ordinal).collect();
        assert_eq!(rows, vec![1, 2, 3]);
        assert_eq!(registry.by_name("Zone 2").unwrap().ordinal, 2);
    }

    #[tokio::test]
    async fn connected_count_follows_state() {
        let (registry, _rx) = registry(&[1, 2, 3]);
        assert_eq!(registry.connected_count(), 0);
        assert_eq!(registry.health(), ConnectionHealth::Offline);

        registry.apply_link_event(&state(1, LinkState::Listening));
        registry.apply_link_event(&state(2, LinkState::Listening));
        assert_eq!(registry.connected_count(), 2);
        assert_eq!(registry.health(), ConnectionHealth::Partial);

        registry.apply_link_event(&state(3, LinkState::Listening));
        assert_eq!(registry.health(), ConnectionHealth::AllOnline);

        registry.apply_link_event(&state(2, LinkState::Reconnecting));
        assert_eq!(registry.connected_count(), 2);
    }

    #[tokio::test]
    async fn failure_then_listening_clears_error() {
        let (registry, _rx) = registry(&[1]);
        let row = registry
            .apply_link_event(&LinkEvent {
                zone: 1,
                at: Utc::now(),
                kind: LinkEventKind::Failure {
                    reason: "refused".into(),
                },
            })
            .unwrap();
        assert_eq!(row.last_error.as_deref(), Some("refused"));

        let row = registry.apply_link_event(&state(1, LinkState::Listening)).unwrap();
        assert_eq!(row.last_error, None);
    }

    #[tokio::test]
    async fn activity_counts_reads() {
        let (registry, _rx) = registry(&[4]);
        let now = Utc::now();
        registry.record_activity(4, "A", now);
        let row = registry.record_activity(4, "B", now).unwrap();
        assert_eq!(row.tag_count, 2);
        assert_eq!(row.last_tag.as_deref(), Some("B"));
        assert_eq!(row.last_activity, Some(now));
        assert!(registry.record_activity(7, "C", now).is_none());
    }

    #[tokio::test]
    async fn unknown_zone_is_an_error() {
        let (registry, _rx) = registry(&[1]);
        assert!(matches!(
            registry.connect_zone(9).await,
            Err(CoreError::ZoneNotFound { .. })
        ));
    }
}
