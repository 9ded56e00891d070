use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use fx_engine::effects::EntityFilter;

pub fn run(path: &Path) -> Result<(), String> {
    let (registry, components) = super::load_definitions(path, &[])?;

    println!(
        "  All checks passed for '{}'.",
        path.display().to_string().bold()
    );
    println!(
        "  {} effect kinds, {} components",
        registry.len(),
        components.names().len()
    );

    if registry.is_empty() {
        return Ok(());
    }
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Kind", "Grants", "Instance", "Alert", "Gating"]);
    for def in registry.definitions() {
        let mut gating = Vec::new();
        if let Some(filter) = &def.gating.whitelist {
            gating.push(format!("only {}", describe_filter(filter)));
        }
        if let Some(filter) = &def.gating.blacklist {
            gating.push(format!("not {}", describe_filter(filter)));
        }
        table.add_row(vec![
            def.kind.to_string(),
            list_or_dash(&def.components),
            list_or_dash(&def.instance_components),
            def.alert
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string),
            if gating.is_empty() {
                "-".to_string()
            } else {
                gating.join("; ")
            },
        ]);
    }
    println!("{table}");
    Ok(())
}

fn list_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn describe_filter(filter: &EntityFilter) -> String {
    let mut parts: Vec<String> = filter.components.clone();
    parts.extend(filter.tags.iter().map(|t| format!("#{t}")));
    if parts.is_empty() {
        "nothing".to_string()
    } else {
        parts.join("|")
    }
}
