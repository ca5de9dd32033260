//! Read-log command handler.

use tabled::Tabled;
use zonetrack_config::Config;
use zonetrack_db::{DbError, HistoryFilter, ReadEntry};

use crate::cli::HistoryArgs;
use crate::error::CliError;
use crate::output;

use super::util::{self, DateBound};
use super::Context;

#[derive(Tabled)]
pub(crate) struct ReadRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Tag")]
    tag_id: String,
    #[tabled(rename = "Customer")]
    customer: String,
    #[tabled(rename = "Dog")]
    dog: String,
    #[tabled(rename = "Controller")]
    controller: String,
}

/// Table row for a read; the zone label uses the configured zone color
/// when the zone is still in the table.
pub(crate) fn read_row(r: &ReadEntry, config: &Config, color: bool) -> ReadRow {
    let label = format!("Z{} {}", r.zone_ordinal, r.zone_name);
    let zone = match config.zones.iter().find(|z| z.ordinal == r.zone_ordinal) {
        Some(z) => output::zone_paint(&label, z.color, color),
        None => label,
    };
    ReadRow {
        time: util::local_time(r.read_at),
        zone,
        tag_id: r.tag_id.clone(),
        customer: r.customer_name.clone().unwrap_or_else(|| "-".into()),
        dog: r.dog_name.clone().unwrap_or_else(|| "-".into()),
        controller: format!("{} ({})", r.controller_id, r.controller_ip),
    }
}

fn filter_from(args: &HistoryArgs) -> Result<HistoryFilter, CliError> {
    let from = args
        .from
        .as_deref()
        .map(|raw| util::parse_bound("from", raw, DateBound::Start))
        .transpose()?;
    let to = args
        .to
        .as_deref()
        .map(|raw| util::parse_bound("to", raw, DateBound::End))
        .transpose()?;

    if let (Some(from), Some(to)) = (from, to) {
        if from >= to {
            return Err(CliError::Validation {
                field: "to".into(),
                reason: "must be after --from".into(),
            });
        }
    }
    if args.limit == 0 {
        return Err(CliError::Validation {
            field: "limit".into(),
            reason: "must be greater than zero".into(),
        });
    }

    Ok(HistoryFilter {
        zone: args.zone,
        from,
        to,
        tag_id: args.tag.clone(),
        limit: args.limit,
    })
}

pub fn handle(args: &HistoryArgs, ctx: &Context) -> Result<(), CliError> {
    let filter = filter_from(args)?;
    let store = ctx.open_store()?;
    let reads = store
        .zone_history(&filter)
        .map_err(|e: DbError| CliError::store(e, &ctx.database))?;
    tracing::debug!(rows = reads.len(), "history query");

    let out = output::render_list(
        ctx.format,
        &reads,
        |r| read_row(r, &ctx.config, ctx.color),
        |r| format!("{}\t{}\t{}", r.read_at.to_rfc3339(), r.zone_ordinal, r.tag_id),
    );
    ctx.print(&out);
    Ok(())
}
