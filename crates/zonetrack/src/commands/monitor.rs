//! `monitor`: live zone monitor with an operator console on stdin.
//!
//! Sightings and zone status changes stream to stdout as they happen.
//! Operator commands are read line by line from stdin; Ctrl-C (or `quit`)
//! disconnects every zone and exits.

use std::io::IsTerminal;
use std::sync::Arc;

use serde_json::json;
use tabled::Tabled;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use zonetrack_core::{
    InMemoryDirectory, Monitor, MonitorEvent, PresenceEntry, TagDirectory, ZoneStatus,
};

use crate::cli::{MonitorArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Console commands ────────────────────────────────────────────────

const CONSOLE_HELP: &str = "\
commands:
  connect [zone]      connect all zones, or one zone by number
  disconnect [zone]   disconnect all zones, or one zone by number
  remove <tag>        drop a tag from the queue
  clear               empty the queue
  queue               show the queue
  zones               show zone status
  status              queue summary and connection health
  help                this text
  quit                disconnect and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleCommand {
    Connect(Option<u8>),
    Disconnect(Option<u8>),
    Remove(String),
    Clear,
    Queue,
    Zones,
    Status,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse one console line. Blank lines yield `Ok(None)`.
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();
        if words.next().is_some() {
            return Err(format!("too many arguments to '{verb}'"));
        }

        let zone = |arg: Option<&str>| -> Result<Option<u8>, String> {
            arg.map(|raw| {
                raw.trim_start_matches(['z', 'Z'])
                    .parse::<u8>()
                    .map_err(|_| format!("'{raw}' is not a zone number"))
            })
            .transpose()
        };
        let bare = |cmd: Self| match arg {
            Some(extra) => Err(format!("'{verb}' takes no argument (got '{extra}')")),
            None => Ok(Some(cmd)),
        };

        match verb.to_ascii_lowercase().as_str() {
            "connect" | "c" => Ok(Some(Self::Connect(zone(arg)?))),
            "disconnect" | "d" => Ok(Some(Self::Disconnect(zone(arg)?))),
            "remove" | "rm" => arg
                .map(|tag| Some(Self::Remove(tag.to_owned())))
                .ok_or_else(|| "usage: remove <tag>".to_owned()),
            "clear" => bare(Self::Clear),
            "queue" | "q" => bare(Self::Queue),
            "zones" | "z" => bare(Self::Zones),
            "status" | "s" => bare(Self::Status),
            "help" | "?" => bare(Self::Help),
            "quit" | "exit" => bare(Self::Quit),
            other => Err(format!("unknown command '{other}' (try 'help')")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct QueueRow {
    #[tabled(rename = "Tag")]
    tag_id: String,
    #[tabled(rename = "Customer")]
    customer: String,
    #[tabled(rename = "Dog")]
    dog: String,
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Arrived")]
    arrived: String,
    #[tabled(rename = "Updated")]
    updated: String,
    #[tabled(rename = "Route")]
    route: String,
}

#[derive(Tabled)]
struct ZoneStatusRow {
    #[tabled(rename = "#")]
    ordinal: u8,
    #[tabled(rename = "Zone")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Reads")]
    reads: u64,
    #[tabled(rename = "Last Tag")]
    last_tag: String,
    #[tabled(rename = "Last Activity")]
    last_activity: String,
}

fn zone_status_row(z: &Arc<ZoneStatus>, color: bool) -> ZoneStatusRow {
    ZoneStatusRow {
        ordinal: z.zone.ordinal,
        name: output::zone_paint(&z.zone.name, z.zone.color, color),
        status: z.status_text(),
        reads: z.tag_count,
        last_tag: z.last_tag.clone().unwrap_or_else(|| "-".into()),
        last_activity: z.last_activity.map_or_else(|| "-".into(), util::local_clock),
    }
}

fn dog_name(entry: &PresenceEntry) -> String {
    entry
        .lookup
        .customer()
        .map(|c| c.dog_name.clone())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| "-".into())
}

// ── Console ─────────────────────────────────────────────────────────

struct Console<'a> {
    monitor: &'a Monitor,
    ctx: &'a Context,
}

impl Console<'_> {
    fn structured(&self) -> bool {
        matches!(
            self.ctx.format,
            OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml
        )
    }

    fn say(&self, line: &str) {
        self.ctx.print(line);
    }

    /// Zone label like `Z3 Grooming Room 1`, in the zone's color.
    fn zone_label(&self, ordinal: u8) -> String {
        match self.monitor.zone(ordinal) {
            Some(zone) => output::zone_paint(
                &format!("Z{ordinal} {}", zone.name),
                zone.color,
                self.ctx.color,
            ),
            None => format!("Z{ordinal}"),
        }
    }

    async fn connect(&self, zone: Option<u8>) -> Result<(), CliError> {
        match zone {
            Some(ordinal) => {
                if let Err(e) = self.monitor.connect_zone(ordinal).await {
                    self.say(&format!("{}: {e}", self.zone_label(ordinal)));
                }
            }
            None => {
                let outcomes = self.monitor.connect_all().await?;
                for outcome in outcomes {
                    if let Err(e) = outcome.result {
                        warn!(zone = outcome.ordinal, error = %e, "zone did not connect");
                    }
                }
                self.say(&format!(
                    "{} of {} zones listening ({})",
                    self.monitor.connected_count(),
                    self.monitor.registry().len(),
                    self.monitor.health()
                ));
            }
        }
        Ok(())
    }

    async fn disconnect(&self, zone: Option<u8>) -> Result<(), CliError> {
        match zone {
            Some(ordinal) => {
                if let Err(e) = self.monitor.disconnect_zone(ordinal).await {
                    self.say(&format!("{}: {e}", self.zone_label(ordinal)));
                }
            }
            None => {
                self.monitor.disconnect_all().await;
                info!("all zones disconnected by operator");
            }
        }
        Ok(())
    }

    /// Run one operator command. Failures are reported on the console;
    /// only a stopped monitor ends the session.
    async fn execute(&self, cmd: ConsoleCommand) -> Result<Flow, CliError> {
        match self.run(cmd).await {
            Err(CliError::MonitorStopped) => Err(CliError::MonitorStopped),
            Err(e) => {
                warn!(error = %e, "console command failed");
                self.say(&e.to_string());
                Ok(Flow::Continue)
            }
            flow => flow,
        }
    }

    async fn run(&self, cmd: ConsoleCommand) -> Result<Flow, CliError> {
        debug!(command = ?cmd, "console command");
        match cmd {
            ConsoleCommand::Connect(zone) => self.connect(zone).await?,
            ConsoleCommand::Disconnect(zone) => self.disconnect(zone).await?,
            ConsoleCommand::Remove(tag_id) => {
                if !self.monitor.remove(tag_id.as_str()).await? {
                    self.say(&format!("{tag_id} is not in the queue"));
                }
            }
            ConsoleCommand::Clear => {
                let removed = self.monitor.remove_all().await?;
                if removed == 0 {
                    self.say("queue already empty");
                }
            }
            ConsoleCommand::Queue => self.show_queue(),
            ConsoleCommand::Zones => self.show_zones(),
            ConsoleCommand::Status => self.show_status(),
            ConsoleCommand::Help => self.say(CONSOLE_HELP),
            ConsoleCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn show_queue(&self) {
        let queue = self.monitor.queue_snapshot();
        if queue.is_empty() && !self.structured() {
            self.say("queue is empty");
            return;
        }
        let out = output::render_list(
            self.ctx.format,
            &queue,
            |e| QueueRow {
                tag_id: e.tag_id.clone(),
                customer: e.lookup.display_name().to_owned(),
                dog: dog_name(e),
                zone: e
                    .current_zone()
                    .map_or_else(|| "-".into(), |z| self.zone_label(z)),
                arrived: util::local_clock(e.arrived_at),
                updated: util::local_clock(e.updated_at),
                route: e.route(),
            },
            |e| e.tag_id.clone(),
        );
        self.say(&out);
    }

    fn show_zones(&self) {
        let zones = self.monitor.zones_snapshot();
        let out = output::render_list(
            self.ctx.format,
            &zones,
            |z| zone_status_row(z, self.ctx.color),
            |z| format!("{}\t{}", z.zone.ordinal, z.status_text()),
        );
        self.say(&out);
    }

    fn show_status(&self) {
        let summary = self.monitor.status_summary();
        let health = self.monitor.health();
        let connected = self.monitor.connected_count();
        let total = self.monitor.registry().len();

        if self.structured() {
            let value = json!({
                "summary": summary,
                "health": health,
                "connected": connected,
                "zones": total,
            });
            let out = output::render_single(self.ctx.format, &value, |_| String::new(), |_| String::new());
            self.say(&out);
        } else {
            self.say(&format!("{summary}\n{health} ({connected}/{total} zones listening)"));
        }
    }

    // ── Live events ─────────────────────────────────────────────────

    fn show_event(&self, event: &MonitorEvent) {
        if self.structured() {
            let value = match event {
                MonitorEvent::EntryUpdated { entry, is_new } => {
                    json!({ "event": "entry_updated", "is_new": is_new, "entry": entry })
                }
                MonitorEvent::EntryRemoved { tag_id } => {
                    json!({ "event": "entry_removed", "tag_id": tag_id })
                }
                MonitorEvent::QueueCleared { removed } => {
                    json!({ "event": "queue_cleared", "removed": removed })
                }
                MonitorEvent::ZoneStatusChanged(status) => json!({
                    "event": "zone_status",
                    "zone": status.zone.ordinal,
                    "name": status.zone.name,
                    "state": status.state,
                    "status": status.status_text(),
                }),
            };
            // One event per line regardless of pretty/compact choice
            self.say(&output::render_json_compact(&value));
            return;
        }

        let line = match event {
            MonitorEvent::EntryUpdated { entry, is_new } => {
                let Some(visit) = entry.current_visit() else {
                    return;
                };
                let tag = if *is_new { "NEW " } else { "MOVE" };
                format!(
                    "{} {} {} ({}) {} -> {}  [{}]",
                    output::dim(&util::local_clock(visit.at), self.ctx.color),
                    output::bold(tag, self.ctx.color),
                    entry.lookup.display_name(),
                    dog_name(entry),
                    entry.tag_id,
                    self.zone_label(visit.zone_ordinal),
                    entry.route(),
                )
            }
            MonitorEvent::EntryRemoved { tag_id } => format!("removed {tag_id}"),
            MonitorEvent::QueueCleared { removed } => format!("queue cleared ({removed} removed)"),
            MonitorEvent::ZoneStatusChanged(status) => format!(
                "{}: {}",
                self.zone_label(status.zone.ordinal),
                status.status_text()
            ),
        };
        self.say(&line);
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: MonitorArgs, ctx: &Context) -> Result<(), CliError> {
    let directory: Arc<dyn TagDirectory> = if args.ephemeral {
        info!("using in-memory tag directory");
        Arc::new(InMemoryDirectory::new())
    } else {
        Arc::new(ctx.open_store()?)
    };

    let monitor = Monitor::start(ctx.config.to_monitor_config(), directory)?;
    let mut events = monitor.events();
    let console = Console {
        monitor: &monitor,
        ctx,
    };

    let interactive = std::io::stdin().is_terminal();
    if !args.no_connect {
        console.connect(None).await?;
        if monitor.connected_count() == 0 && !interactive {
            monitor.shutdown().await;
            return Err(CliError::AllZonesOffline);
        }
    }
    if interactive && !console.structured() {
        console.say("type 'help' for commands");
    }

    let result = console_loop(&console, &mut events).await;

    monitor.shutdown().await;
    info!("monitor exited");
    result
}

async fn console_loop(
    console: &Console<'_>,
    events: &mut tokio::sync::broadcast::Receiver<MonitorEvent>,
) -> Result<(), CliError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            biased;

            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                return Ok(());
            }

            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match ConsoleCommand::parse(&line) {
                    Ok(Some(cmd)) => {
                        if console.execute(cmd).await? == Flow::Quit {
                            return Ok(());
                        }
                    }
                    Ok(None) => {}
                    Err(msg) => console.say(&msg),
                },
                Ok(None) => {
                    debug!("stdin closed; running until interrupted");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "console input failed; running until interrupted");
                    stdin_open = false;
                }
            },

            event = events.recv() => match event {
                Ok(event) => console.show_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream lagged");
                }
                Err(RecvError::Closed) => return Err(CliError::MonitorStopped),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use zonetrack_config::Config;

    fn quiet_context() -> Context {
        Context {
            config: Config::default(),
            database: std::path::PathBuf::from("unused.db"),
            format: OutputFormat::Plain,
            color: false,
            quiet: true,
            yes: false,
        }
    }

    #[tokio::test]
    async fn unknown_zone_does_not_end_the_session() {
        let ctx = quiet_context();
        let monitor = Monitor::start(
            ctx.config.to_monitor_config(),
            Arc::new(InMemoryDirectory::new()),
        )
        .unwrap();
        let console = Console {
            monitor: &monitor,
            ctx: &ctx,
        };

        for cmd in [
            ConsoleCommand::Connect(Some(9)),
            ConsoleCommand::Disconnect(Some(9)),
            ConsoleCommand::Remove("never-seen".into()),
        ] {
            assert_eq!(console.execute(cmd).await.unwrap(), Flow::Continue);
        }
        assert_eq!(
            console.execute(ConsoleCommand::Quit).await.unwrap(),
            Flow::Quit
        );

        monitor.shutdown().await;
        assert!(matches!(
            console.execute(ConsoleCommand::Clear).await,
            Err(CliError::MonitorStopped)
        ));
    }

    #[test]
    fn parses_console_commands() {
        assert_eq!(ConsoleCommand::parse("   ").unwrap(), None);
        assert_eq!(
            ConsoleCommand::parse("connect").unwrap(),
            Some(ConsoleCommand::Connect(None))
        );
        assert_eq!(
            ConsoleCommand::parse("disconnect z3").unwrap(),
            Some(ConsoleCommand::Disconnect(Some(3)))
        );
        assert_eq!(
            ConsoleCommand::parse("remove E2801160600002084A7D1B23").unwrap(),
            Some(ConsoleCommand::Remove("E2801160600002084A7D1B23".into()))
        );
        assert_eq!(ConsoleCommand::parse("QUIT").unwrap(), Some(ConsoleCommand::Quit));
        assert_eq!(ConsoleCommand::parse("clear").unwrap(), Some(ConsoleCommand::Clear));
    }

    #[test]
    fn rejects_bad_console_input() {
        assert!(ConsoleCommand::parse("remove").is_err());
        assert!(ConsoleCommand::parse("connect lobby").is_err());
        assert!(ConsoleCommand::parse("clear now").is_err());
        assert!(ConsoleCommand::parse("remove a b").is_err());
        assert!(ConsoleCommand::parse("dance").is_err());
    }
}
