use std::collections::BTreeSet;

use fx_core::{EntityId, World};
use serde::{Deserialize, Serialize};

use super::alert::AlertId;
use super::authority::Authority;
use super::container::StatusEffectContainer;
use super::instance::StatusEffect;
use super::registry::EffectKind;
use super::StatusEffects;
use crate::clock::Timestamp;

/// A flat description of one active effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectRecord {
    /// The instance entity.
    pub instance: EntityId,
    /// The entity the effect is applied to.
    pub target: EntityId,
    /// The effect kind.
    pub kind: EffectKind,
    /// When a delayed effect will start. Absent once started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Timestamp>,
    /// When the effect expires, or `None` if permanent.
    pub end_time: Option<Timestamp>,
    /// Alert the effect is bound to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<AlertId>,
}

impl<A: Authority> StatusEffects<A> {
    /// Every active effect in the world, grouped by target in ID order, each
    /// group in application order.
    pub fn records(&self, world: &World) -> Vec<EffectRecord> {
        world
            .entities_with::<StatusEffectContainer>()
            .into_iter()
            .flat_map(|target| {
                self.active_effects(world, target)
                    .into_iter()
                    .filter_map(move |instance| {
                        let effect = world.get::<StatusEffect>(instance)?;
                        Some(EffectRecord {
                            instance,
                            target,
                            kind: effect.kind().clone(),
                            start_time: effect.start_time(),
                            end_time: effect.end_time(),
                            alert: effect.alert().cloned(),
                        })
                    })
            })
            .collect()
    }

    /// Reconstruct containers and the grant ledger from the instance
    /// entities in `world`, e.g. after loading it. Instances whose target is
    /// gone are destroyed. Instances still waiting to start are indexed but
    /// claim no grants. Returns the number of instances indexed.
    pub fn rebuild(&mut self, world: &mut World) -> usize {
        self.grants.clear();
        for target in world.entities_with::<StatusEffectContainer>() {
            if let Some(container) = world.get_mut::<StatusEffectContainer>(target) {
                container.clear();
            }
        }

        let mut indexed = 0;
        let mut alerts: BTreeSet<(EntityId, AlertId)> = BTreeSet::new();
        for instance in world.entities_with::<StatusEffect>() {
            let Some(effect) = world.get::<StatusEffect>(instance).cloned() else {
                continue;
            };
            let target = effect.applied_to();
            if world.parent_of(instance) != Some(target) || !world.contains(target) {
                tracing::warn!(%instance, %target, "destroying orphaned effect instance");
                let _ = world.destroy(instance);
                continue;
            }

            if !world.has::<StatusEffectContainer>(target)
                && let Err(e) = world.attach(target, StatusEffectContainer::default())
            {
                tracing::error!(error = %e, %target, "cannot rebuild container");
                continue;
            }
            if let Some(container) = world.get_mut::<StatusEffectContainer>(target) {
                container.insert(instance, effect.kind().clone(), effect.is_started());
            }

            match self.registry.lookup(effect.kind()) {
                Ok(_) if !effect.is_started() => {}
                Ok(definition) => {
                    if let Err(e) =
                        self.grants
                            .adopt(world, &self.components, target, &definition.components)
                    {
                        tracing::error!(error = %e, %target, "cannot restore granted components");
                    }
                }
                Err(e) => tracing::warn!(error = %e, %instance, "instance of unknown kind"),
            }
            if let Some(alert) = effect.alert() {
                alerts.insert((target, alert.clone()));
            }
            indexed += 1;
        }

        for (target, alert) in alerts {
            self.alerts.refresh(world, self.now, target, &alert);
        }
        tracing::debug!(indexed, "effect state rebuilt");
        indexed
    }
}
