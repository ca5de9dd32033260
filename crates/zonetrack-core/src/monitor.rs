// ── Monitor ──
//
// Runs the whole ingestion pipeline for a site:
//
//   zone link ──► enrichment task (per zone) ──► owner loop ──► watch / broadcast
//
// Each enrichment task logs reads and resolves tags through the
// directory, in that zone's read order. The owner loop is the only
// writer of presence and zone status; operator commands reach it over
// the same channel as link traffic.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zonetrack_wire::{LinkEvent, LinkEventKind};

use crate::config::MonitorConfig;
use crate::directory::TagDirectory;
use crate::error::CoreError;
use crate::model::{
    ConnectionHealth, LookupOutcome, PresenceEntry, ReadRecord, Snapshot, StatusSummary,
    TagSighting, ZoneConfig, ZoneStatus,
};
use crate::registry::{ConnectOutcome, ZoneRegistry};
use crate::tracker::PresenceTracker;

const OWNER_CHANNEL_SIZE: usize = 256;
const LINK_CHANNEL_SIZE: usize = 64;
const EVENT_CHANNEL_SIZE: usize = 256;

// ── Public events and commands ───────────────────────────────────────

/// Change notifications for presentation layers.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    EntryUpdated {
        entry: Arc<PresenceEntry>,
        is_new: bool,
    },
    EntryRemoved {
        tag_id: String,
    },
    QueueCleared {
        removed: usize,
    },
    ZoneStatusChanged(Arc<ZoneStatus>),
}

/// Operator commands applied by the owner loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Remove { tag_id: String },
    RemoveAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    /// Whether the tag was present.
    Removed(bool),
    /// How many entries were dropped.
    Cleared(usize),
}

struct CommandEnvelope {
    command: Command,
    response_tx: oneshot::Sender<CommandResult>,
}

enum OwnerMsg {
    Link(LinkEvent),
    Activity {
        zone: u8,
        tag_id: String,
        at: chrono::DateTime<chrono::Utc>,
    },
    Sighting {
        sighting: TagSighting,
        lookup: LookupOutcome,
    },
    Command(CommandEnvelope),
}

// ── Monitor ──────────────────────────────────────────────────────────

/// Handle to a running monitor. Cheaply cloneable.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    config: MonitorConfig,
    registry: Arc<ZoneRegistry>,
    queue: watch::Receiver<Snapshot<PresenceEntry>>,
    event_tx: broadcast::Sender<MonitorEvent>,
    owner_tx: mpsc::Sender<OwnerMsg>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Monitor {
    /// Validate the configuration and spawn the owner loop and one
    /// enrichment task per zone. Links start disconnected; call
    /// [`connect_all`](Self::connect_all) to start listening.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: MonitorConfig, directory: Arc<dyn TagDirectory>) -> Result<Self, CoreError> {
        config.validate()?;

        let cancel = CancellationToken::new();
        let (owner_tx, owner_rx) = mpsc::channel(OWNER_CHANNEL_SIZE);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (queue_tx, queue_rx) = watch::channel(Arc::new(Vec::new()));

        let mut handles = Vec::with_capacity(config.zones.len() + 1);
        let mut zones = Vec::with_capacity(config.zones.len());
        for zone in &config.zones {
            let (link_tx, link_rx) = mpsc::channel(LINK_CHANNEL_SIZE);
            let pipeline = Enricher {
                zone: zone.clone(),
                directory: Arc::clone(&directory),
                store_timeout: config.store_timeout,
                owner_tx: owner_tx.clone(),
            };
            handles.push(tokio::spawn(enrichment_task(pipeline, link_rx, cancel.clone())));
            zones.push((zone.clone(), link_tx));
        }

        let registry = Arc::new(ZoneRegistry::new(zones, config.link));

        let owner = OwnerState {
            tracker: PresenceTracker::new(),
            registry: Arc::clone(&registry),
            queue_tx,
            event_tx: event_tx.clone(),
        };
        handles.push(tokio::spawn(owner_task(owner, owner_rx, cancel.clone())));

        info!(zones = registry.len(), "monitor started");

        Ok(Self {
            inner: Arc::new(MonitorInner {
                config,
                registry,
                queue: queue_rx,
                event_tx,
                owner_tx,
                cancel,
                task_handles: Mutex::new(handles),
            }),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<ZoneRegistry> {
        &self.inner.registry
    }

    pub fn zone(&self, ordinal: u8) -> Option<&ZoneConfig> {
        self.inner.registry.by_ordinal(ordinal)
    }

    // ── Control surface ──────────────────────────────────────────────

    /// Connect every zone. Individual zone failures are reported in the
    /// outcomes; the error case is only for a stopped monitor.
    pub async fn connect_all(&self) -> Result<Vec<ConnectOutcome>, CoreError> {
        self.ensure_running()?;
        Ok(self.inner.registry.connect_all().await)
    }

    pub async fn disconnect_all(&self) {
        self.inner.registry.disconnect_all().await;
    }

    pub async fn connect_zone(&self, ordinal: u8) -> Result<(), CoreError> {
        self.ensure_running()?;
        self.inner.registry.connect_zone(ordinal).await
    }

    pub async fn disconnect_zone(&self, ordinal: u8) -> Result<(), CoreError> {
        self.inner.registry.disconnect_zone(ordinal).await
    }

    /// Drop one tag from the queue. Returns whether it was present.
    pub async fn remove(&self, tag_id: impl Into<String>) -> Result<bool, CoreError> {
        match self
            .execute(Command::Remove {
                tag_id: tag_id.into(),
            })
            .await?
        {
            CommandResult::Removed(existed) => Ok(existed),
            CommandResult::Cleared(_) => Err(CoreError::Internal("unexpected command result".into())),
        }
    }

    /// Empty the queue. Returns how many entries were dropped.
    pub async fn remove_all(&self) -> Result<usize, CoreError> {
        match self.execute(Command::RemoveAll).await? {
            CommandResult::Cleared(n) => Ok(n),
            CommandResult::Removed(_) => Err(CoreError::Internal("unexpected command result".into())),
        }
    }

    /// Send a command to the owner loop and wait for its result.
    pub async fn execute(&self, command: Command) -> Result<CommandResult, CoreError> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .owner_tx
            .send(OwnerMsg::Command(CommandEnvelope {
                command,
                response_tx: tx,
            }))
            .await
            .map_err(|_| CoreError::MonitorStopped)?;

        rx.await.map_err(|_| CoreError::MonitorStopped)
    }

    /// Disconnect every zone, stop background tasks, and wait for them.
    pub async fn shutdown(&self) {
        self.inner.registry.disconnect_all().await;
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("monitor stopped");
    }

    fn ensure_running(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            Err(CoreError::MonitorStopped)
        } else {
            Ok(())
        }
    }

    // ── State observation ────────────────────────────────────────────

    pub fn events(&self) -> broadcast::Receiver<MonitorEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn zones_snapshot(&self) -> Snapshot<ZoneStatus> {
        self.inner.registry.snapshot()
    }

    pub fn queue_snapshot(&self) -> Snapshot<PresenceEntry> {
        self.inner.queue.borrow().clone()
    }

    pub fn entry(&self, tag_id: &str) -> Option<Arc<PresenceEntry>> {
        self.inner
            .queue
            .borrow()
            .iter()
            .find(|e| e.tag_id == tag_id)
            .cloned()
    }

    pub fn status_summary(&self) -> StatusSummary {
        StatusSummary::from_entries(self.inner.queue.borrow().iter())
    }

    pub fn connected_count(&self) -> usize {
        self.inner.registry.connected_count()
    }

    pub fn health(&self) -> ConnectionHealth {
        self.inner.registry.health()
    }
}

// ── Enrichment (per zone) ────────────────────────────────────────────

struct Enricher {
    zone: ZoneConfig,
    directory: Arc<dyn TagDirectory>,
    store_timeout: Duration,
    owner_tx: mpsc::Sender<OwnerMsg>,
}

async fn enrichment_task(
    pipeline: Enricher,
    mut link_rx: mpsc::Receiver<LinkEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = link_rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let delivered = match event.kind {
            LinkEventKind::Tag { tag_id, kind } => {
                debug!(zone = %pipeline.zone.name, tag_id = %tag_id, %kind, "tag sighted");
                pipeline
                    .enrich(TagSighting {
                        tag_id,
                        zone_ordinal: pipeline.zone.ordinal,
                        zone_name: pipeline.zone.name.clone(),
                        at: event.at,
                    })
                    .await
            }
            LinkEventKind::State(_) | LinkEventKind::Failure { .. } => {
                pipeline.owner_tx.send(OwnerMsg::Link(event)).await.is_ok()
            }
        };

        if !delivered {
            break;
        }
    }
    debug!(zone = %pipeline.zone.name, "enrichment task exiting");
}

impl Enricher {
    /// Log → count → look up → hand to the tracker. Returns `false` once
    /// the owner loop is gone.
    async fn enrich(&self, sighting: TagSighting) -> bool {
        let read = ReadRecord {
            tag_id: sighting.tag_id.clone(),
            zone_ordinal: self.zone.ordinal,
            zone_name: self.zone.name.clone(),
            controller_id: self.zone.controller_id.clone(),
            controller_ip: self.zone.host.clone(),
            read_at: sighting.at,
        };
        if let Err(e) = self
            .blocking("log_read", move |dir| dir.log_read(&read))
            .await
        {
            warn!(zone = %self.zone.name, tag_id = %sighting.tag_id, error = %e, "read log failed");
        }

        let activity = OwnerMsg::Activity {
            zone: self.zone.ordinal,
            tag_id: sighting.tag_id.clone(),
            at: sighting.at,
        };
        if self.owner_tx.send(activity).await.is_err() {
            return false;
        }

        let tag_id = sighting.tag_id.clone();
        let seen_at = sighting.at;
        let lookup = match self
            .blocking("lookup", move |dir| dir.lookup_and_touch(&tag_id, seen_at))
            .await
        {
            Ok(Some(record)) => LookupOutcome::Found(record),
            Ok(None) => LookupOutcome::NotFound,
            Err(e) => {
                warn!(zone = %self.zone.name, tag_id = %sighting.tag_id, error = %e, "customer lookup failed");
                LookupOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        self.owner_tx
            .send(OwnerMsg::Sighting { sighting, lookup })
            .await
            .is_ok()
    }

    /// Run a directory call on the blocking pool, bounded by the store
    /// timeout.
    async fn blocking<T, F>(&self, operation: &'static str, call: F) -> Result<T, CoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn TagDirectory) -> Result<T, CoreError> + Send + 'static,
    {
        let directory = Arc::clone(&self.directory);
        let task = tokio::task::spawn_blocking(move || call(directory.as_ref()));

        match tokio::time::timeout(self.store_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(CoreError::Internal(format!("{operation} task failed: {join}"))),
            Err(_) => Err(CoreError::StoreTimeout {
                operation: operation.into(),
                timeout_ms: u64::try_from(self.store_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

// ── Owner loop ───────────────────────────────────────────────────────

struct OwnerState {
    tracker: PresenceTracker,
    registry: Arc<ZoneRegistry>,
    queue_tx: watch::Sender<Snapshot<PresenceEntry>>,
    event_tx: broadcast::Sender<MonitorEvent>,
}

async fn owner_task(mut state: OwnerState, mut rx: mpsc::Receiver<OwnerMsg>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            msg = rx.recv() => {
                let Some(msg) = msg else { break };
                state.handle(msg);
            }
        }
    }
    debug!("owner loop exiting");
}

impl OwnerState {
    fn handle(&mut self, msg: OwnerMsg) {
        match msg {
            OwnerMsg::Link(event) => {
                if let Some(row) = self.registry.apply_link_event(&event) {
                    self.notify(MonitorEvent::ZoneStatusChanged(row));
                }
            }
            OwnerMsg::Activity { zone, tag_id, at } => {
                if let Some(row) = self.registry.record_activity(zone, &tag_id, at) {
                    self.notify(MonitorEvent::ZoneStatusChanged(row));
                }
            }
            OwnerMsg::Sighting { sighting, lookup } => {
                let (entry, is_new) = self.tracker.on_sighting(&sighting, lookup);
                if is_new {
                    info!(
                        tag_id = %entry.tag_id,
                        zone = %sighting.zone_name,
                        customer = %entry.lookup.display_name(),
                        "customer arrived"
                    );
                } else {
                    debug!(tag_id = %entry.tag_id, zone = %sighting.zone_name, "customer moved");
                }
                self.publish();
                self.notify(MonitorEvent::EntryUpdated { entry, is_new });
            }
            OwnerMsg::Command(envelope) => {
                let result = self.apply(envelope.command);
                let _ = envelope.response_tx.send(result);
            }
        }
    }

    fn apply(&mut self, command: Command) -> CommandResult {
        match command {
            Command::Remove { tag_id } => {
                let existed = self.tracker.remove(&tag_id).is_some();
                if existed {
                    info!(tag_id = %tag_id, "removed from queue");
                    self.publish();
                    self.notify(MonitorEvent::EntryRemoved { tag_id });
                }
                CommandResult::Removed(existed)
            }
            Command::RemoveAll => {
                let removed = self.tracker.remove_all();
                if removed > 0 {
                    info!(removed, "queue cleared");
                    self.publish();
                    self.notify(MonitorEvent::QueueCleared { removed });
                }
                CommandResult::Cleared(removed)
            }
        }
    }

    fn publish(&self) {
        self.queue_tx.send_replace(self.tracker.snapshot());
    }

    fn notify(&self, event: MonitorEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }
}
