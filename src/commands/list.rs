use anyhow::{Context as _, Result};
use iiskit::{Descriptor, ResourceType};

use crate::Context;
use crate::cli::ListArgs;
use crate::ui;

const MAX_CELL: usize = 60;
const MISSING: &str = "-";

pub fn run(ctx: &Context, args: ListArgs) -> Result<()> {
    let resource_type = ResourceType::from(args.resource_type);
    let records = ctx
        .client()
        .list(resource_type)
        .with_context(|| format!("Failed to list {resource_type} records"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        ui::info(&format!("No {resource_type} records."));
        return Ok(());
    }

    for line in render(resource_type, &records) {
        println!("{line}");
    }
    if !ctx.quiet {
        ui::dim(&format!("{} {resource_type} record(s)", records.len()));
    }
    Ok(())
}

/// Attributes shown as table columns.
fn columns(resource_type: ResourceType) -> &'static [&'static str] {
    match resource_type {
        ResourceType::AppPool => &["APPPOOL.NAME", "RuntimeVersion", "PipelineMode", "state"],
        ResourceType::Site => &["SITE.NAME", "SITE.ID", "bindings", "state"],
        ResourceType::App => &["APP.NAME", "path", "APPPOOL.NAME"],
        ResourceType::Vdir => &["VDIR.NAME", "physicalPath"],
    }
}

fn render(resource_type: ResourceType, records: &[Descriptor]) -> Vec<String> {
    let headers = columns(resource_type);
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| {
            headers
                .iter()
                .map(|key| ui::truncate(record.get(key).unwrap_or(MISSING), MAX_CELL))
                .collect()
        })
        .collect();
    ui::table(headers, &rows)
}
