//! Tag directory command handlers.

use serde::Serialize;
use tabled::Tabled;
use zonetrack_core::CustomerRecord;
use zonetrack_db::{DbError, ReadEntry};

use crate::cli::{TagAddArgs, TagsArgs, TagsCommand};
use crate::error::CliError;
use crate::output;

use super::history::{ReadRow, read_row};
use super::{Context, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct TagRow {
    #[tabled(rename = "Tag")]
    tag_id: String,
    #[tabled(rename = "Customer")]
    customer: String,
    #[tabled(rename = "Dog")]
    dog: String,
    #[tabled(rename = "Breed")]
    breed: String,
    #[tabled(rename = "Vehicle")]
    vehicle: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
}

fn tag_row(r: &CustomerRecord) -> TagRow {
    TagRow {
        tag_id: r.tag_id.clone(),
        customer: r.customer_name.clone(),
        dog: r.dog_name.clone(),
        breed: r.dog_breed.clone(),
        vehicle: r.vehicle.clone(),
        last_seen: r.last_seen.map_or_else(|| "never".into(), util::local_time),
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}

fn detail(r: &CustomerRecord) -> String {
    [
        format!("Tag:       {}", r.tag_id),
        format!("Customer:  {}", or_dash(&r.customer_name)),
        format!("Dog:       {}", or_dash(&r.dog_name)),
        format!("Breed:     {}", or_dash(&r.dog_breed)),
        format!("Vehicle:   {}", or_dash(&r.vehicle)),
        format!("Notes:     {}", or_dash(&r.notes)),
        format!(
            "Created:   {}",
            r.created_at.map_or_else(|| "-".into(), util::local_time)
        ),
        format!(
            "Last seen: {}",
            r.last_seen.map_or_else(|| "never".into(), util::local_time)
        ),
    ]
    .join("\n")
}

/// Structured `tags show` payload.
#[derive(Serialize)]
struct TagDetail {
    #[serde(flatten)]
    record: CustomerRecord,
    reads: Vec<ReadEntry>,
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: TagsArgs, ctx: &Context) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let store_err = |e: DbError| CliError::store(e, &ctx.database);

    match args.command {
        TagsCommand::Add(add) => {
            let stored = store.register_tag(&record_from(add)).map_err(store_err)?;
            tracing::info!(tag_id = %stored.tag_id, "tag registered");
            let out = output::render_single(ctx.format, &stored, detail, |r| r.tag_id.clone());
            ctx.print(&out);
            Ok(())
        }

        TagsCommand::List => {
            let tags = store.list_tags().map_err(store_err)?;
            let out = output::render_list(ctx.format, &tags, tag_row, |r| r.tag_id.clone());
            ctx.print(&out);
            Ok(())
        }

        TagsCommand::Show { tag_id } => {
            let record = store
                .get_tag(&tag_id)
                .map_err(store_err)?
                .ok_or_else(|| CliError::NotFound {
                    resource_type: "tag".into(),
                    identifier: tag_id.clone(),
                    list_command: "tags list".into(),
                })?;
            let reads = store.tag_history(&tag_id).map_err(store_err)?;
            let color = ctx.color;

            let payload = TagDetail { record, reads };
            let out = output::render_single(
                ctx.format,
                &payload,
                |d| {
                    let mut text = detail(&d.record);
                    if d.reads.is_empty() {
                        text.push_str("\n\nNo reads recorded.");
                    } else {
                        let rows: Vec<ReadRow> =
                            d.reads.iter().map(|r| read_row(r, &ctx.config, color)).collect();
                        text.push_str("\n\nRecent reads:\n");
                        text.push_str(&output::render_table(&rows));
                    }
                    text
                },
                |d| d.record.tag_id.clone(),
            );
            ctx.print(&out);
            Ok(())
        }

        TagsCommand::Remove { tag_id } => {
            if !util::confirm(
                &format!("Remove tag '{tag_id}' from the directory?"),
                "tags remove",
                ctx.yes,
            )? {
                return Ok(());
            }
            store.delete_tag(&tag_id).map_err(store_err)?;
            tracing::info!(tag_id = %tag_id, "tag removed");
            if !ctx.quiet {
                eprintln!("Removed tag {tag_id}");
            }
            Ok(())
        }
    }
}

fn record_from(add: TagAddArgs) -> CustomerRecord {
    CustomerRecord {
        customer_name: add.name.unwrap_or_default(),
        dog_name: add.dog.unwrap_or_default(),
        dog_breed: add.breed.unwrap_or_default(),
        vehicle: add.vehicle.unwrap_or_default(),
        notes: add.notes.unwrap_or_default(),
        ..CustomerRecord::bare(add.tag_id)
    }
}
