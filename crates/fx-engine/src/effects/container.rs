use fx_core::{Component, EntityId};

use super::registry::EffectKind;

/// One entry in a target's container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    /// The instance entity.
    pub instance: EntityId,
    /// Kept so an instance destroyed behind the engine's back can still have
    /// its grants revoked.
    pub kind: EffectKind,
    /// Whether the instance has started and so holds grants.
    pub started: bool,
}

/// The effect instances applied to a target, in application order.
///
/// Attached to a target on its first application and kept afterwards, even
/// when empty. Only the effect engine mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusEffectContainer {
    entries: Vec<ContainerEntry>,
}

impl Component for StatusEffectContainer {
    const NAME: &'static str = "StatusEffectContainer";
}

impl StatusEffectContainer {
    /// Instance IDs in application order.
    pub fn instances(&self) -> Vec<EntityId> {
        self.entries.iter().map(|e| e.instance).collect()
    }

    /// Entries in application order.
    pub fn entries(&self) -> &[ContainerEntry] {
        &self.entries
    }

    /// Whether `instance` is listed.
    pub fn contains(&self, instance: EntityId) -> bool {
        self.entries.iter().any(|e| e.instance == instance)
    }

    /// Number of listed instances.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no instances are listed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(&mut self, instance: EntityId, kind: EffectKind, started: bool) {
        if !self.contains(instance) {
            self.entries.push(ContainerEntry {
                instance,
                kind,
                started,
            });
        }
    }

    pub(crate) fn mark_started(&mut self, instance: EntityId) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.instance == instance) {
            entry.started = true;
        }
    }

    pub(crate) fn remove(&mut self, instance: EntityId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.instance != instance);
        self.entries.len() != before
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
