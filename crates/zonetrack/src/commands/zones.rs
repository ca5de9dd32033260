//! Zone command handlers.

use tabled::Tabled;
use zonetrack_core::ZoneConfig;

use crate::cli::{ZonesArgs, ZonesCommand};
use crate::error::CliError;
use crate::output;

use super::Context;

#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "#")]
    ordinal: u8,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Controller")]
    controller: String,
    #[tabled(rename = "Address")]
    addr: String,
    #[tabled(rename = "Color")]
    color: String,
}

fn row(zone: &ZoneConfig, color: bool) -> ZoneRow {
    ZoneRow {
        ordinal: zone.ordinal,
        name: output::zone_paint(&zone.name, zone.color, color),
        controller: zone.controller_id.clone(),
        addr: zone.addr(),
        color: zone.color.to_string(),
    }
}

pub fn handle(args: &ZonesArgs, ctx: &Context) -> Result<(), CliError> {
    match args.command {
        ZonesCommand::List => {
            let mut zones = ctx.config.zones.clone();
            zones.sort_by_key(|z| z.ordinal);
            let out = output::render_list(
                ctx.format,
                &zones,
                |z| row(z, ctx.color),
                |z| format!("{}\t{}", z.ordinal, z.name),
            );
            ctx.print(&out);
            Ok(())
        }
    }
}
