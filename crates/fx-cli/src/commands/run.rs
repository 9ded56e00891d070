use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use fx_core::World;
use fx_engine::{AlertCommand, EffectEventKind, SimConfig, Simulation, Timestamp};

use crate::scenario::{Scenario, ScenarioSystem};

pub fn run(
    definitions: &Path,
    scenario_path: &Path,
    ticks: Option<u64>,
    json: bool,
    verbose: bool,
) -> Result<(), String> {
    let scenario = Scenario::from_file(scenario_path)?;
    let (registry, components) =
        super::load_definitions(definitions, &scenario.component_names())?;
    scenario.validate(&registry)?;
    let ticks = ticks.unwrap_or(scenario.ticks);

    let mut world = World::new();
    let targets = scenario.populate(&mut world, &components)?;

    let config = SimConfig::default()
        .with_tick_length(scenario.tick_length())
        .with_max_events(1000);
    let mut sim = Simulation::new(world, registry, components, config);
    sim.add_system(ScenarioSystem::new(scenario.actions.clone(), targets.clone()));

    sim.init()
        .map_err(|e| format!("simulation init failed: {e}"))?;
    let mut alerts: Vec<(Timestamp, AlertCommand)> = Vec::new();
    for _ in 0..ticks {
        let at = sim.now();
        sim.tick().map_err(|e| format!("simulation error: {e}"))?;
        alerts.extend(sim.effects_mut().drain_alerts().into_iter().map(|a| (at, a)));
    }

    let records = sim.effects().records(sim.world());
    if json {
        let out = serde_json::to_string_pretty(&records)
            .map_err(|e| format!("cannot serialize effects: {e}"))?;
        println!("{out}");
        return Ok(());
    }

    let executed = sim
        .get_system::<ScenarioSystem>()
        .map_or(0, ScenarioSystem::executed);
    println!(
        "  {} '{}' {}",
        "Scenario".bold(),
        scenario_path.display(),
        format!("({ticks} ticks, {}ms/tick)", scenario.tick_length_ms).dimmed()
    );
    println!(
        "  {} entities, {} actions run, {} lifecycle events",
        targets.len(),
        executed,
        sim.events().len()
    );
    println!("  Clock: {}", sim.now());
    println!();

    if verbose {
        println!("  {}", "Lifecycle Log".bold().underline());
        println!();
        for event in sim.events().events() {
            let label = format!("[{:>8}]", event.time.to_string()).dimmed();
            println!("  {label} {}", colorize_event(&event.kind, &event.description));
        }
        if sim.events().is_empty() {
            println!("  {}", "(no events)".dimmed());
        }
        println!();

        println!("  {}", "Alerts".bold().underline());
        println!();
        for (at, command) in &alerts {
            let label = format!("[{:>8}]", at.to_string()).dimmed();
            println!("  {label} {}", describe_alert(sim.world(), command));
        }
        if alerts.is_empty() {
            println!("  {}", "(no alerts)".dimmed());
        }
        println!();
    } else {
        let denied: Vec<_> = sim
            .events()
            .events()
            .iter()
            .filter(|e| matches!(e.kind, EffectEventKind::Denied { .. }))
            .collect();
        if !denied.is_empty() {
            println!("  {}", "Notable Events".bold().underline());
            for event in &denied {
                println!("  {}  {}", "DENIED".red().bold(), event.description);
            }
            println!();
        }
    }

    println!("  {}", "Active Effects".bold().underline());
    println!();
    if records.is_empty() {
        println!("  {}", "(none)".dimmed());
        return Ok(());
    }

    let now = sim.now();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Target", "Effect", "Remaining", "Alert"]);
    for record in &records {
        let remaining = match (record.start_time, record.end_time) {
            (Some(start), _) => format!("starts in {:.2}s", now.until(start).as_secs_f64()),
            (None, Some(end)) => format!("{:.2}s", now.until(end).as_secs_f64()),
            (None, None) => "permanent".to_string(),
        };
        table.add_row(vec![
            sim.world().entity_name(record.target).to_string(),
            record.kind.to_string(),
            remaining,
            record
                .alert
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn colorize_event(kind: &EffectEventKind, desc: &str) -> String {
    match kind {
        EffectEventKind::Applied { .. } => desc.green().to_string(),
        EffectEventKind::Scheduled { .. } => desc.blue().to_string(),
        EffectEventKind::EndTimeChanged { .. } => desc.cyan().to_string(),
        EffectEventKind::Removed { .. } => desc.yellow().to_string(),
        EffectEventKind::Denied { .. } => desc.red().to_string(),
    }
}

fn describe_alert(world: &World, command: &AlertCommand) -> String {
    match command {
        AlertCommand::Show {
            target,
            alert,
            cooldown: Some((start, end)),
        } => format!(
            "show {alert} on {} (cooldown {start} to {end})",
            world.entity_name(*target)
        ),
        AlertCommand::Show {
            target,
            alert,
            cooldown: None,
        } => format!("show {alert} on {}", world.entity_name(*target)),
        AlertCommand::Clear { target, alert } => {
            format!("clear {alert} on {}", world.entity_name(*target))
        }
    }
}
