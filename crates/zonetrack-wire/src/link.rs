//! TCP link to a single zone reader.
//!
//! A [`ZoneLink`] owns at most one live session: a socket plus the
//! background task reading from it. Every decoded tag and every state
//! transition is reported on the `mpsc` channel handed to
//! [`ZoneLink::new`], tagged with the zone ordinal.
//!
//! Failure handling is flat. When an established link dies
//! the session waits `failure_delay`, closes the socket, waits
//! `settle_delay`, then makes exactly one reconnect attempt. If that
//! attempt fails the link stays down until someone calls
//! [`connect`](ZoneLink::connect) again. An initial connect failure is
//! never retried.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::decode::{FrameKind, decode_frame};
use crate::error::Error;

// ── ZoneEndpoint ─────────────────────────────────────────────────────

/// Where a zone's reader lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneEndpoint {
    /// Display name, e.g. `"Bathing"`.
    pub name: String,
    /// Zone number, unique across the site.
    pub ordinal: u8,
    pub host: String,
    pub port: u16,
}

impl ZoneEndpoint {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── ReconnectPolicy ──────────────────────────────────────────────────

/// Timings for the connect and reconnect sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Wait after a link failure before tearing the socket down. Default: 5s.
    pub failure_delay: Duration,
    /// Wait between teardown and the reconnect attempt. Default: 1s.
    pub settle_delay: Duration,
    /// Upper bound on a single TCP connect. Default: 10s.
    pub connect_timeout: Duration,
    /// Size of the per-read buffer. Default: 1024 bytes.
    pub read_buffer: usize,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            failure_delay: Duration::from_secs(5),
            settle_delay: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(10),
            read_buffer: 1024,
        }
    }
}

// ── Events ───────────────────────────────────────────────────────────

/// Lifecycle state of a zone link.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Listening,
    Reconnecting,
}

impl LinkState {
    /// Only a listening link counts as connected.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Listening)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEventKind {
    /// The link moved to a new state.
    State(LinkState),
    /// A connect attempt failed or an established link broke.
    Failure { reason: String },
    /// A frame decoded to a tag id.
    Tag { tag_id: String, kind: FrameKind },
}

/// Something that happened on one zone link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEvent {
    pub zone: u8,
    pub at: DateTime<Utc>,
    pub kind: LinkEventKind,
}

// ── ZoneLink ─────────────────────────────────────────────────────────

/// Connection manager for one zone reader.
pub struct ZoneLink {
    shared: Arc<LinkShared>,
}

struct LinkShared {
    endpoint: ZoneEndpoint,
    policy: ReconnectPolicy,
    events: mpsc::Sender<LinkEvent>,
    session: Mutex<Option<Session>>,
    next_generation: AtomicU64,
}

struct Session {
    generation: u64,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Session {
    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && self.task.as_ref().is_none_or(|t| !t.is_finished())
    }
}

impl ZoneLink {
    pub fn new(
        endpoint: ZoneEndpoint,
        policy: ReconnectPolicy,
        events: mpsc::Sender<LinkEvent>,
    ) -> Self {
        Self {
            shared: Arc::new(LinkShared {
                endpoint,
                policy,
                events,
                session: Mutex::new(None),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn endpoint(&self) -> &ZoneEndpoint {
        &self.shared.endpoint
    }

    /// Whether a session is connecting, listening, or reconnecting.
    pub fn is_active(&self) -> bool {
        self.shared
            .lock_session()
            .as_ref()
            .is_some_and(Session::is_live)
    }

    /// Open the link and start listening.
    ///
    /// Returns once the socket is established and the read loop is
    /// running. A no-op on a link that already has a live session. On
    /// failure the link reports `Failure` then `Disconnected` and stays
    /// down.
    pub async fn connect(&self) -> Result<(), Error> {
        let shared = &self.shared;
        let (generation, cancel) = {
            let mut session = shared.lock_session();
            if session.as_ref().is_some_and(Session::is_live) {
                tracing::debug!(zone = %shared.endpoint.name, "Link already active");
                return Ok(());
            }
            let generation = shared.next_generation.fetch_add(1, Ordering::Relaxed);
            let cancel = CancellationToken::new();
            *session = Some(Session {
                generation,
                cancel: cancel.clone(),
                task: None,
            });
            (generation, cancel)
        };

        shared.emit(LinkEventKind::State(LinkState::Connecting)).await;

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            opened = open_stream(&shared.endpoint, &shared.policy) => opened,
        };

        match opened {
            Ok(stream) => {
                tracing::info!(
                    zone = %shared.endpoint.name,
                    addr = %shared.endpoint.addr(),
                    "Zone link listening"
                );
                // A disconnect that raced the socket open owns the final
                // state event; the fresh socket is dropped unread.
                if !shared
                    .emit_or_cancel(&cancel, LinkEventKind::State(LinkState::Listening))
                    .await
                    || cancel.is_cancelled()
                {
                    return Ok(());
                }

                let task = tokio::spawn(run_session(
                    Arc::clone(shared),
                    stream,
                    cancel,
                    generation,
                ));
                if let Some(active) = shared.lock_session().as_mut() {
                    if active.generation == generation {
                        active.task = Some(task);
                    }
                }
                Ok(())
            }
            Err(e) => {
                shared.clear_session(generation);
                tracing::warn!(zone = %shared.endpoint.name, error = %e, "Zone connect failed");
                shared
                    .emit(LinkEventKind::Failure {
                        reason: e.to_string(),
                    })
                    .await;
                shared.emit(LinkEventKind::State(LinkState::Disconnected)).await;
                Err(e)
            }
        }
    }

    /// Stop listening and close the socket. Idempotent.
    ///
    /// Cancels any pending reconnect. No tag events from the closed
    /// session are delivered after the `Disconnected` state event.
    pub async fn disconnect(&self) {
        let Some(session) = self.shared.lock_session().take() else {
            return;
        };
        session.cancel.cancel();
        if let Some(task) = session.task {
            if let Err(e) = task.await {
                tracing::debug!(zone = %self.shared.endpoint.name, error = %e, "Link task ended abnormally");
            }
        }

        tracing::info!(zone = %self.shared.endpoint.name, "Zone link disconnected");
        self.shared
            .emit(LinkEventKind::State(LinkState::Disconnected))
            .await;
    }
}

impl Drop for ZoneLink {
    fn drop(&mut self) {
        if let Some(session) = self.shared.lock_session().take() {
            session.cancel.cancel();
        }
    }
}

impl LinkShared {
    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the session slot if it still belongs to `generation`.
    fn clear_session(&self, generation: u64) {
        let mut session = self.lock_session();
        if session.as_ref().is_some_and(|s| s.generation == generation) {
            *session = None;
        }
    }

    async fn emit(&self, kind: LinkEventKind) {
        let event = LinkEvent {
            zone: self.endpoint.ordinal,
            at: Utc::now(),
            kind,
        };
        // Receiver gone means the owner is shutting down.
        let _ = self.events.send(event).await;
    }

    /// Emit unless the session is cancelled first. Returns `false` if
    /// cancelled.
    async fn emit_or_cancel(&self, cancel: &CancellationToken, kind: LinkEventKind) -> bool {
        tokio::select! {
            biased;
            () = cancel.cancelled() => false,
            () = self.emit(kind) => true,
        }
    }
}

// ── Session loop ─────────────────────────────────────────────────────

async fn open_stream(endpoint: &ZoneEndpoint, policy: &ReconnectPolicy) -> Result<TcpStream, Error> {
    let addr = endpoint.addr();
    tracing::debug!(zone = %endpoint.name, addr = %addr, "Connecting to zone reader");

    match tokio::time::timeout(policy.connect_timeout, TcpStream::connect(&addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(Error::Connect { addr, source }),
        Err(_) => Err(Error::ConnectTimeout {
            addr,
            timeout_ms: u64::try_from(policy.connect_timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// Sleep for `delay`. Returns `false` if cancelled first.
async fn sleep_or_cancel(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}

/// Read → decode → emit until cancelled or the reconnect attempt fails.
async fn run_session(
    shared: Arc<LinkShared>,
    mut stream: TcpStream,
    cancel: CancellationToken,
    generation: u64,
) {
    let zone = shared.endpoint.name.clone();
    let mut buf = vec![0_u8; shared.policy.read_buffer.max(1)];

    loop {
        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            read = stream.read(&mut buf) => read,
        };

        let failure = match read {
            Ok(0) => Error::Closed,
            Ok(n) => {
                let Some(chunk) = buf.get(..n) else { continue };
                match decode_frame(chunk) {
                    Some(decoded) => {
                        tracing::debug!(zone = %zone, tag = %decoded.tag_id, kind = %decoded.kind, "Tag read");
                        let kind = LinkEventKind::Tag {
                            tag_id: decoded.tag_id,
                            kind: decoded.kind,
                        };
                        if !shared.emit_or_cancel(&cancel, kind).await {
                            return;
                        }
                    }
                    None => tracing::trace!(zone = %zone, bytes = n, "Frame carried no tag"),
                }
                continue;
            }
            Err(e) => Error::Read(e),
        };

        if cancel.is_cancelled() {
            return;
        }

        tracing::warn!(zone = %zone, error = %failure, "Zone link failed, reconnecting");
        let reason = failure.to_string();
        if !shared.emit_or_cancel(&cancel, LinkEventKind::Failure { reason }).await
            || !shared
                .emit_or_cancel(&cancel, LinkEventKind::State(LinkState::Reconnecting))
                .await
        {
            return;
        }

        if !sleep_or_cancel(&cancel, shared.policy.failure_delay).await {
            return;
        }
        drop(stream);
        if !sleep_or_cancel(&cancel, shared.policy.settle_delay).await {
            return;
        }

        let reopened = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            reopened = open_stream(&shared.endpoint, &shared.policy) => reopened,
        };

        match reopened {
            Ok(fresh) => {
                tracing::info!(zone = %zone, "Zone link re-established");
                stream = fresh;
                if !shared
                    .emit_or_cancel(&cancel, LinkEventKind::State(LinkState::Listening))
                    .await
                {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(zone = %zone, error = %e, "Reconnect failed, link stays down");
                shared.clear_session(generation);
                shared
                    .emit(LinkEventKind::Failure {
                        reason: e.to_string(),
                    })
                    .await;
                shared.emit(LinkEventKind::State(LinkState::Disconnected)).await;
                return;
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
