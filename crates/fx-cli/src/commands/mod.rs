pub mod check;
pub mod run;

use std::fs;
use std::path::Path;

use fx_core::ComponentRegistry;
use fx_engine::EffectRegistry;

/// Load and validate a definition file.
///
/// Components named in data files have no Rust type behind them, so every
/// name a definition mentions is registered as a marker. `extra` adds names
/// from elsewhere, e.g. components a scenario puts on its entities.
fn load_definitions(
    path: &Path,
    extra: &[String],
) -> Result<(EffectRegistry, ComponentRegistry), String> {
    let source = fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {e}", path.display()))?;
    let registry = EffectRegistry::from_json(&source)
        .map_err(|e| format!("{}: {e}", path.display()))?;

    let mut components = ComponentRegistry::new();
    for name in component_names(&registry).into_iter().chain(extra.iter().cloned()) {
        components.register_marker(name);
    }
    registry
        .validate(&components)
        .map_err(|e| format!("{}: {e}", path.display()))?;
    Ok((registry, components))
}

/// Every component name the definitions refer to, sorted and deduplicated.
fn component_names(registry: &EffectRegistry) -> Vec<String> {
    let mut names: Vec<String> = registry
        .definitions()
        .flat_map(|def| {
            let filters = [&def.gating.whitelist, &def.gating.blacklist]
                .into_iter()
                .flatten()
                .flat_map(|f| f.components.iter());
            def.components
                .iter()
                .chain(&def.instance_components)
                .chain(filters)
                .cloned()
                .collect::<Vec<_>>()
        })
        .collect();
    names.sort();
    names.dedup();
    names
}
