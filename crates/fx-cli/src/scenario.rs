//! Scripted scenarios: a starting cast of entities plus timed effect calls.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::time::Duration;

use fx_core::{ComponentRegistry, EntityId, World};
use fx_engine::effects::EffectKind;
use fx_engine::{EffectRegistry, ResetPolicy, SimContext, SimResult, System};
use serde::Deserialize;

fn default_tick_length_ms() -> u64 {
    1000
}

fn default_ticks() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default = "default_tick_length_ms")]
    pub tick_length_ms: u64,
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    #[serde(default)]
    pub entities: Vec<EntitySpec>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntitySpec {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub components: Vec<String>,
}

/// One effect call, run at the start of tick `at`.
#[derive(Debug, Clone, Deserialize)]
pub struct Action {
    pub at: u64,
    pub target: String,
    #[serde(flatten)]
    pub op: Op,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Apply {
        kind: String,
        /// Omit for a permanent effect.
        #[serde(default)]
        seconds: Option<f64>,
        /// Seconds before a new effect starts.
        #[serde(default)]
        delay: Option<f64>,
        #[serde(default)]
        policy: ResetPolicy,
    },
    Remove {
        kind: String,
    },
    RemoveAll,
    AddTime {
        kind: String,
        seconds: f64,
    },
    /// Omitting `seconds` removes the effect.
    RemoveTime {
        kind: String,
        #[serde(default)]
        seconds: Option<f64>,
    },
    SetTime {
        kind: String,
        seconds: f64,
    },
}

impl Op {
    fn kind(&self) -> Option<&str> {
        match self {
            Op::Apply { kind, .. }
            | Op::Remove { kind }
            | Op::AddTime { kind, .. }
            | Op::RemoveTime { kind, .. }
            | Op::SetTime { kind, .. } => Some(kind),
            Op::RemoveAll => None,
        }
    }

    fn durations(&self) -> Vec<f64> {
        match self {
            Op::Apply { seconds, delay, .. } => seconds.iter().chain(delay).copied().collect(),
            Op::RemoveTime { seconds, .. } => seconds.iter().copied().collect(),
            Op::AddTime { seconds, .. } | Op::SetTime { seconds, .. } => vec![*seconds],
            Op::Remove { .. } | Op::RemoveAll => Vec::new(),
        }
    }
}

impl Scenario {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let source = fs::read_to_string(path)
            .map_err(|e| format!("cannot read '{}': {e}", path.display()))?;
        serde_json::from_str(&source).map_err(|e| format!("{}: {e}", path.display()))
    }

    pub fn tick_length(&self) -> Duration {
        Duration::from_millis(self.tick_length_ms)
    }

    /// Components the scenario puts on its entities.
    pub fn component_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entities
            .iter()
            .flat_map(|e| e.components.iter().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Reject anything the engine would refuse to run: unknown kinds,
    /// unknown or duplicate entities, and durations that are not finite
    /// and non-negative.
    pub fn validate(&self, registry: &EffectRegistry) -> Result<(), String> {
        if self.tick_length_ms == 0 {
            return Err("tick_length_ms must be positive".to_string());
        }
        let mut names = BTreeSet::new();
        for entity in &self.entities {
            if !names.insert(entity.name.as_str()) {
                return Err(format!("duplicate entity '{}'", entity.name));
            }
        }
        for (i, action) in self.actions.iter().enumerate() {
            if !names.contains(action.target.as_str()) {
                return Err(format!("action {i}: unknown target '{}'", action.target));
            }
            if let Some(kind) = action.op.kind()
                && !registry.contains(&EffectKind::new(kind))
            {
                return Err(format!("action {i}: unknown effect kind '{kind}'"));
            }
            if let Some(seconds) = action
                .op
                .durations()
                .into_iter()
                .find(|s| Duration::try_from_secs_f64(*s).is_err())
            {
                return Err(format!("action {i}: invalid duration {seconds}"));
            }
        }
        Ok(())
    }

    /// Spawn the scenario's entities. Returns them by name.
    pub fn populate(
        &self,
        world: &mut World,
        components: &ComponentRegistry,
    ) -> Result<BTreeMap<String, EntityId>, String> {
        let mut targets = BTreeMap::new();
        for spec in &self.entities {
            let tags: Vec<&str> = spec.tags.iter().map(String::as_str).collect();
            let id = world.spawn_tagged(spec.name.clone(), &tags);
            for name in &spec.components {
                let component = components.create(name).map_err(|e| e.to_string())?;
                world
                    .attach_boxed(id, component)
                    .map_err(|e| e.to_string())?;
            }
            targets.insert(spec.name.clone(), id);
        }
        Ok(targets)
    }
}

/// Runs scenario actions as their tick comes up.
#[derive(Debug)]
pub struct ScenarioSystem {
    actions: Vec<Action>,
    targets: BTreeMap<String, EntityId>,
    executed: usize,
}

impl ScenarioSystem {
    pub fn new(actions: Vec<Action>, targets: BTreeMap<String, EntityId>) -> Self {
        Self {
            actions,
            targets,
            executed: 0,
        }
    }

    pub fn executed(&self) -> usize {
        self.executed
    }

    fn execute(ctx: &mut SimContext<'_>, target: EntityId, op: &Op) -> bool {
        let secs = |s: f64| Duration::try_from_secs_f64(s).unwrap_or_default();
        match op {
            Op::Apply {
                kind,
                seconds,
                delay: Some(delay),
                policy,
            } => ctx
                .apply_delayed(
                    target,
                    &EffectKind::new(kind.as_str()),
                    seconds.map(secs),
                    secs(*delay),
                    *policy,
                )
                .is_ok(),
            Op::Apply {
                kind,
                seconds,
                delay: None,
                policy,
            } => ctx
                .apply(target, &EffectKind::new(kind.as_str()), seconds.map(secs), *policy)
                .is_ok(),
            Op::Remove { kind } => ctx.remove(target, &EffectKind::new(kind.as_str())),
            Op::RemoveAll => ctx.effects.remove_all(ctx.world, target) > 0,
            Op::AddTime { kind, seconds } => {
                ctx.effects
                    .add_time(ctx.world, target, &EffectKind::new(kind.as_str()), secs(*seconds))
            }
            Op::RemoveTime { kind, seconds } => ctx.effects.remove_time(
                ctx.world,
                target,
                &EffectKind::new(kind.as_str()),
                seconds.map(secs),
            ),
            Op::SetTime { kind, seconds } => {
                ctx.effects
                    .set_time(ctx.world, target, &EffectKind::new(kind.as_str()), secs(*seconds))
            }
        }
    }
}

impl System for ScenarioSystem {
    fn name(&self) -> &str {
        "scenario"
    }

    fn tick(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let tick = ctx.tick();
        for action in self.actions.iter().filter(|a| a.at == tick) {
            let Some(&target) = self.targets.get(&action.target) else {
                tracing::warn!(entity = %action.target, "scenario target not spawned");
                continue;
            };
            let done = Self::execute(ctx, target, &action.op);
            tracing::info!(tick, entity = %action.target, op = ?action.op, done, "scenario action");
            self.executed += 1;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
