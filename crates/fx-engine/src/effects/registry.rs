use std::collections::BTreeMap;

use fx_core::{ComponentRegistry, PrototypeId};
use serde::{Deserialize, Serialize};

use super::alert::AlertId;
use super::gating::{EntityFilter, GatingPolicy};
use crate::error::{EffectError, EffectResult};

/// Names an effect definition. An instance's kind is the prototype it was
/// spawned from.
pub type EffectKind = PrototypeId;

/// The immutable description of an effect kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDefinition {
    /// The effect kind.
    pub kind: EffectKind,
    /// Components granted to the target while the effect is active.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
    /// Components placed on the instance entity itself.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instance_components: Vec<String>,
    /// Alert shown while the effect is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<AlertId>,
    /// Which targets may receive the effect.
    #[serde(flatten)]
    pub gating: GatingPolicy,
}

impl EffectDefinition {
    /// An empty definition of `kind`.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: EffectKind::new(kind),
            components: Vec::new(),
            instance_components: Vec::new(),
            alert: None,
            gating: GatingPolicy::default(),
        }
    }

    /// Grant a component to the target while active.
    pub fn granting(mut self, component: impl Into<String>) -> Self {
        self.components.push(component.into());
        self
    }

    /// Put a component on the instance entity.
    pub fn with_instance_component(mut self, component: impl Into<String>) -> Self {
        self.instance_components.push(component.into());
        self
    }

    /// Show `alert` while the effect is active.
    pub fn with_alert(mut self, alert: impl Into<String>) -> Self {
        self.alert = Some(AlertId::new(alert));
        self
    }

    /// Accept only targets matching `filter`.
    pub fn with_whitelist(mut self, filter: EntityFilter) -> Self {
        self.gating.whitelist = Some(filter);
        self
    }

    /// Refuse targets matching `filter`.
    pub fn with_blacklist(mut self, filter: EntityFilter) -> Self {
        self.gating.blacklist = Some(filter);
        self
    }

    fn validate(&self, components: &ComponentRegistry) -> EffectResult<()> {
        let invalid = |reason: String| EffectError::InvalidDefinition {
            kind: self.kind.clone(),
            reason,
        };
        if self.kind.as_str().trim().is_empty() {
            return Err(invalid("kind must not be empty".to_string()));
        }
        for name in self.components.iter().chain(&self.instance_components) {
            if !components.contains(name) {
                return Err(invalid(format!("unknown component '{name}'")));
            }
        }
        for (i, name) in self.components.iter().enumerate() {
            if self.components[..i].contains(name) {
                return Err(invalid(format!("component '{name}' granted twice")));
            }
        }
        Ok(())
    }
}

/// Definitions on disk: either a bare list or `{ "effects": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DefinitionFile {
    List(Vec<EffectDefinition>),
    Wrapped { effects: Vec<EffectDefinition> },
}

/// All known effect kinds. Filled at load time and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct EffectRegistry {
    definitions: BTreeMap<EffectKind, EffectDefinition>,
}

impl EffectRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Defining the same kind again with identical
    /// contents is a no-op; with different contents it is an error.
    pub fn define(&mut self, definition: EffectDefinition) -> EffectResult<()> {
        match self.definitions.get(&definition.kind) {
            Some(existing) if *existing == definition => Ok(()),
            Some(_) => Err(EffectError::ConflictingDefinition(definition.kind)),
            None => {
                self.definitions.insert(definition.kind.clone(), definition);
                Ok(())
            }
        }
    }

    /// The definition of `kind`.
    pub fn lookup(&self, kind: &EffectKind) -> EffectResult<&EffectDefinition> {
        self.definitions
            .get(kind)
            .ok_or_else(|| EffectError::UnknownKind(kind.clone()))
    }

    /// Whether `kind` is defined.
    pub fn contains(&self, kind: &EffectKind) -> bool {
        self.definitions.contains_key(kind)
    }

    /// All kinds, sorted.
    pub fn kinds(&self) -> impl Iterator<Item = &EffectKind> {
        self.definitions.keys()
    }

    /// Definitions in kind order.
    pub fn definitions(&self) -> impl Iterator<Item = &EffectDefinition> {
        self.definitions.values()
    }

    /// Number of defined kinds.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether no kinds are defined.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Parse definitions from JSON and define each of them.
    pub fn load_json(&mut self, json: &str) -> EffectResult<usize> {
        let file: DefinitionFile = serde_json::from_str(json)?;
        let definitions = match file {
            DefinitionFile::List(defs) | DefinitionFile::Wrapped { effects: defs } => defs,
        };
        let count = definitions.len();
        for definition in definitions {
            self.define(definition)?;
        }
        Ok(count)
    }

    /// A registry holding just the definitions in `json`.
    pub fn from_json(json: &str) -> EffectResult<Self> {
        let mut registry = Self::new();
        registry.load_json(json)?;
        Ok(registry)
    }

    /// Check every definition against the component factory, so a typo in a
    /// data file fails at load time rather than on first application.
    pub fn validate(&self, components: &ComponentRegistry) -> EffectResult<()> {
        self.definitions
            .values()
            .try_for_each(|def| def.validate(components))
    }
}
