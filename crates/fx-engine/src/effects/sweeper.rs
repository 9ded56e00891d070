use fx_core::{EntityId, World};

use super::authority::ServerAuthority;
use super::container::{ContainerEntry, StatusEffectContainer};
use super::instance::StatusEffect;
use super::notify::EffectRemoved;
use super::StatusEffects;
use crate::event::{EffectEvent, EffectEventKind};

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Delayed instances whose start time came.
    pub started: usize,
    /// Instances removed because their time ran out.
    pub expired: usize,
    /// Container entries dropped because their instance was destroyed
    /// outside the engine.
    pub reaped: usize,
}

impl SweepReport {
    /// Instances that left the world, expired or reaped.
    pub fn total(&self) -> usize {
        self.expired + self.reaped
    }
}

impl StatusEffects<ServerAuthority> {
    /// Start every delayed effect that is due, then remove every effect
    /// whose end time has been reached. Run once per step, after game logic.
    ///
    /// An effect whose start and end both fall within the same step starts
    /// and then expires. Candidates are collected first and re-checked one by one right before
    /// removal, since removing one effect can run handlers that extend or
    /// remove others.
    pub fn sweep(&mut self, world: &mut World) -> SweepReport {
        let reaped = self.reap_orphans(world);
        let started = self.start_due(world);

        let now = self.now;
        let candidates: Vec<EntityId> = world
            .entities_with::<StatusEffect>()
            .into_iter()
            .filter(|id| world.get::<StatusEffect>(*id).is_some_and(|e| e.is_expired(now)))
            .collect();

        let mut expired = 0;
        for instance in candidates {
            let still_expired = world
                .get::<StatusEffect>(instance)
                .is_some_and(|e| e.is_expired(now));
            if still_expired && self.remove_instance(world, instance) {
                expired += 1;
            }
        }

        let pruned = self.grants.prune(world);
        if started + expired + reaped + pruned > 0 {
            tracing::debug!(started, expired, reaped, pruned, %now, "sweep");
        }
        SweepReport {
            started,
            expired,
            reaped,
        }
    }

    /// Drop container entries whose instance no longer exists and undo what
    /// they granted.
    fn reap_orphans(&mut self, world: &mut World) -> usize {
        let mut reaped = 0;
        for target in world.entities_with::<StatusEffectContainer>() {
            let stale: Vec<ContainerEntry> = world
                .get::<StatusEffectContainer>(target)
                .map(|c| {
                    c.entries()
                        .iter()
                        .filter(|e| !world.contains(e.instance))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();

            for entry in stale {
                if let Some(container) = world.get_mut::<StatusEffectContainer>(target) {
                    container.remove(entry.instance);
                }
                tracing::warn!(kind = %entry.kind, %target, instance = %entry.instance,
                    "effect instance destroyed outside the engine");

                let mut removed = EffectRemoved {
                    target,
                    instance: entry.instance,
                    kind: entry.kind.clone(),
                };
                self.raise(world, target, &mut removed);
                let alert = self
                    .registry
                    .lookup(&entry.kind)
                    .ok()
                    .and_then(|d| d.alert.clone());
                self.release(world, target, &entry.kind, alert.as_ref(), entry.started);
                self.log.push(EffectEvent::new(
                    self.now,
                    EffectEventKind::Removed {
                        target,
                        instance: entry.instance,
                        kind: entry.kind.clone(),
                    },
                    format!("{} lost from {}", entry.kind, world.entity_name(target)),
                ));
                reaped += 1;
            }
        }
        reaped
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::{FixedClock, Timestamp};
    use crate::effects::testing::{engine, kind};
    use crate::effects::{AlertCommand, AlertId, ResetPolicy};

    fn at(effects: &mut StatusEffects<ServerAuthority>, secs: u64) {
        effects.sync_clock(&FixedClock(Timestamp::from_secs(secs)));
    }

    #[test]
    fn expires_exactly_at_end_time() {
        let mut world = World::new();
        let target = world.spawn("Kael");
        let mut effects = engine();
        effects
            .add_or_refresh(&mut world, target, &kind("Muted"), Some(Duration::from_secs(3)), ResetPolicy::Reset)
            .unwrap();

        at(&mut effects, 2);
        assert_eq!(effects.sweep(&mut world).expired, 0);
        assert!(effects.has(&world, target, &kind("Muted")));

        at(&mut effects, 3);
        assert_eq!(effects.sweep(&mut world).expired, 1);
        assert!(!effects.has(&world, target, &kind("Muted")));
        assert!(!world.has_named(target, "Muted"));
    }

    #[test]
    fn permanent_effects_never_expire() {
        let mut world = World::new();
        let target = world.spawn("Kael");
        let mut effects = engine();
        effects
            .add_or_refresh(&mut world, target, &kind("Muted"), None, ResetPolicy::Reset)
            .unwrap();
        at(&mut effects, 1_000_000);
        assert_eq!(effects.sweep(&mut world).total(), 0);
        assert!(effects.has(&world, target, &kind("Muted")));
    }

    #[test]
    fn removal_handler_extending_another_candidate_saves_it() {
        let mut world = World::new();
        let target = world.spawn("Kael");
        let mut effects = engine();
        effects.bus_mut().subscribe_all::<EffectRemoved, _>(|ctx, entity, ev| {
            if entity == ev.target && ev.kind.as_str() == "Muted" {
                ctx.effects
                    .add_time(ctx.world, ev.target, &kind("Burning"), Duration::from_secs(10));
            }
        });
        for name in ["Muted", "Burning"] {
            effects
                .add_or_refresh(&mut world, target, &kind(name), Some(Duration::from_secs(1)), ResetPolicy::Reset)
                .unwrap();
        }

        at(&mut effects, 1);
        let report = effects.sweep(&mut world);
        assert_eq!(report.expired, 1);
        assert!(effects.has(&world, target, &kind("Burning")));
        assert_eq!(
            effects.end_time(&world, target, &kind("Burning")),
            Some(Some(Timestamp::from_secs(11)))
        );
    }

    #[test]
    fn reaps_instances_destroyed_behind_the_engine() {
        let mut world = World::new();
        let target = world.spawn("Kael");
        let mut effects = engine();
        let instance = effects
            .add_or_refresh(&mut world, target, &kind("Stun"), None, ResetPolicy::Reset)
            .unwrap();
        effects.drain_alerts();

        world.destroy(instance).unwrap();
        let report = effects.sweep(&mut world);
        assert_eq!(report.reaped, 1);
        assert!(effects.active_effects(&world, target).is_empty());
        assert!(!world.has_named(target, "Stunned"));
        assert_eq!(
            effects.drain_alerts(),
            vec![AlertCommand::Clear {
                target,
                alert: AlertId::new("stun")
            }]
        );
    }

    #[test]
    fn destroyed_targets_leave_no_ledger_entries() {
        let mut world = World::new();
        let target = world.spawn("Kael");
        let mut effects = engine();
        effects
            .add_or_refresh(&mut world, target, &kind("Stun"), None, ResetPolicy::Reset)
            .unwrap();
        world.destroy(target).unwrap();
        effects.sweep(&mut world);
        assert!(effects.grants().is_empty());
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn delayed_effect_starts_when_due() {
        let mut world = World::new();
        let target = world.spawn("Kael");
        let mut effects = engine();
        let stun = kind("Stun");
        let instance = effects
            .add_or_refresh_delayed(
                &mut world,
                target,
                &stun,
                Some(Duration::from_secs(3)),
                Some(Duration::from_secs(2)),
                ResetPolicy::Reset,
            )
            .unwrap();

        assert!(effects.has(&world, target, &stun));
        assert!(!world.has_named(target, "Stunned"));
        assert!(effects.drain_alerts().is_empty());
        assert_eq!(effects.end_time(&world, target, &stun), Some(Some(Timestamp::from_secs(5))));

        at(&mut effects, 1);
        assert_eq!(effects.sweep(&mut world).started, 0);
        assert!(!world.has_named(target, "Stunned"));

        at(&mut effects, 2);
        assert_eq!(effects.sweep(&mut world).started, 1);
        assert!(world.get::<StatusEffect>(instance).unwrap().is_started());
        assert!(world.has_named(target, "Stunned"));
        assert_eq!(
            effects.drain_alerts(),
            vec![AlertCommand::Show {
                target,
                alert: AlertId::new("stun"),
                cooldown: Some((Timestamp::from_secs(2), Timestamp::from_secs(5))),
            }]
        );
        let events = effects.log().events();
        assert!(matches!(events[0].kind, EffectEventKind::Scheduled { .. }));
        assert!(matches!(events[1].kind, EffectEventKind::Applied { .. }));

        at(&mut effects, 5);
        assert_eq!(effects.sweep(&mut world).expired, 1);
        assert!(!world.has_named(target, "Stunned"));
        assert!(effects.grants().is_empty());
    }

    #[test]
    fn pending_effect_removed_before_start_grants_nothing() {
        let mut world = World::new();
        let target = world.spawn("Kael");
        let mut effects = engine();
        effects
            .add_or_refresh_delayed(
                &mut world,
                target,
                &kind("Stun"),
                None,
                Some(Duration::from_secs(5)),
                ResetPolicy::Reset,
            )
            .unwrap();
        assert!(effects.remove(&mut world, target, &kind("Stun")));
        assert!(effects.grants().is_empty());
        assert!(effects.drain_alerts().is_empty());

        at(&mut effects, 5);
        assert_eq!(effects.sweep(&mut world), SweepReport::default());
    }

    #[test]
    fn earlier_delay_moves_the_start_forward() {
        let mut world = World::new();
        let target = world.spawn("Kael");
        let mut effects = engine();
        let muted = kind("Muted");
        let instance = effects
            .add_or_refresh_delayed(
                &mut world,
                target,
                &muted,
                Some(Duration::from_secs(2)),
                Some(Duration::from_secs(10)),
                ResetPolicy::Reset,
            )
            .unwrap();

        at(&mut effects, 1);
        effects
            .add_or_refresh_delayed(
                &mut world,
                target,
                &muted,
                Some(Duration::from_secs(2)),
                Some(Duration::from_secs(2)),
                ResetPolicy::Reset,
            )
            .unwrap();
        let effect = world.get::<StatusEffect>(instance).unwrap();
        assert_eq!(effect.start_time(), Some(Timestamp::from_secs(3)));
        assert_eq!(effect.end_time(), Some(Timestamp::from_secs(5)));

        at(&mut effects, 3);
        assert_eq!(effects.sweep(&mut world).started, 1);
        assert!(world.has_named(target, "Muted"));
    }

    #[test]
    fn delay_on_a_started_effect_is_ignored() {
        let mut world = World::new();
        let target = world.spawn("Kael");
        let mut effects = engine();
        let muted = kind("Muted");
        effects
            .add_or_refresh(&mut world, target, &muted, Some(Duration::from_secs(5)), ResetPolicy::Reset)
            .unwrap();
        effects
            .add_or_refresh_delayed(
                &mut world,
                target,
                &muted,
                Some(Duration::from_secs(5)),
                Some(Duration::from_secs(10)),
                ResetPolicy::Reset,
            )
            .unwrap();
        assert_eq!(effects.end_time(&world, target, &muted), Some(Some(Timestamp::from_secs(5))));
        assert!(world.has_named(target, "Muted"));
    }
}
