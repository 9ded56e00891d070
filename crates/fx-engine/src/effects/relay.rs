use fx_core::{EntityId, World};

use super::authority::Authority;
use super::instance::StatusEffect;
use super::StatusEffects;

/// How the caller handed the event over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// The caller gets the event back as a return value.
    ByValue,
    /// The caller's event is modified in place.
    ByRef,
}

/// An event aimed at `target`, offered to one of its active effects.
///
/// Subscribe to `Relayed<E>` by an instance component to intercept `E`.
/// Changes to `args` carry over to the next effect and back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Relayed<E> {
    /// The entity the event was aimed at.
    pub target: EntityId,
    /// How the result reaches the caller.
    pub mode: RelayMode,
    /// The event itself. Handlers may modify it.
    pub args: E,
}

impl<A: Authority> StatusEffects<A> {
    /// Pass `event` through every active effect on `target`, in application
    /// order, and return it.
    pub fn relay<E: 'static>(&mut self, world: &mut World, target: EntityId, event: E) -> E {
        self.relay_with_mode(world, target, event, RelayMode::ByValue)
    }

    /// Like [`relay`](Self::relay), for an event the caller keeps.
    pub fn relay_in_place<E: Default + 'static>(
        &mut self,
        world: &mut World,
        target: EntityId,
        event: &mut E,
    ) {
        let args = std::mem::take(event);
        *event = self.relay_with_mode(world, target, args, RelayMode::ByRef);
    }

    fn relay_with_mode<E: 'static>(
        &mut self,
        world: &mut World,
        target: EntityId,
        event: E,
        mode: RelayMode,
    ) -> E {
        // Effects added by a handler wait for the next relay. Removed ones
        // and ones still waiting to start are skipped.
        let instances = self.active_effects(world, target);
        let mut relayed = Relayed {
            target,
            mode,
            args: event,
        };
        for instance in instances {
            let active = world
                .get::<StatusEffect>(instance)
                .is_some_and(|e| e.applied_to() == target && e.is_started());
            if active {
                self.raise(world, instance, &mut relayed);
            }
        }
        relayed.args
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::effects::testing::{Burning, Shielding, Warding, engine, kind};
    use crate::effects::{ResetPolicy, ServerAuthority};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Damage {
        amount: i32,
        seen_by: Vec<String>,
    }

    fn hit(amount: i32) -> Damage {
        Damage {
            amount,
            seen_by: Vec::new(),
        }
    }

    fn apply(
        effects: &mut StatusEffects<ServerAuthority>,
        world: &mut World,
        target: EntityId,
        name: &str,
    ) -> EntityId {
        effects
            .add_or_refresh(world, target, &kind(name), None, ResetPolicy::Reset)
            .unwrap()
    }

    #[test]
    fn instances_see_the_event_in_application_order() {
        let mut effects = engine();
        effects
            .bus_mut()
            .subscribe::<Burning, Relayed<Damage>, _>(|_, _, ev| {
                ev.args.amount += 2;
                ev.args.seen_by.push("burning".into());
            });
        effects
            .bus_mut()
            .subscribe::<Shielding, Relayed<Damage>, _>(|_, _, ev| {
                ev.args.amount /= 2;
                ev.args.seen_by.push("shield".into());
            });

        let mut world = World::new();
        let target = world.spawn("Kael");
        apply(&mut effects, &mut world, target, "Burning");
        apply(&mut effects, &mut world, target, "Shielded");

        let out = effects.relay(&mut world, target, hit(10));
        assert_eq!(out.amount, 6);
        assert_eq!(out.seen_by, vec!["burning", "shield"]);
    }

    #[test]
    fn later_instances_see_earlier_changes() {
        let mut effects = engine();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let first = Rc::clone(&seen);
        effects
            .bus_mut()
            .subscribe::<Burning, Relayed<Damage>, _>(move |_, _, ev| {
                first.borrow_mut().push(("burning", ev.args.amount));
            });
        effects
            .bus_mut()
            .subscribe::<Shielding, Relayed<Damage>, _>(|_, _, ev| {
                ev.args.amount -= 4;
            });
        let last = Rc::clone(&seen);
        effects
            .bus_mut()
            .subscribe::<Warding, Relayed<Damage>, _>(move |_, _, ev| {
                last.borrow_mut().push(("warded", ev.args.amount));
            });

        let mut world = World::new();
        let target = world.spawn("Kael");
        for name in ["Burning", "Shielded", "Warded"] {
            apply(&mut effects, &mut world, target, name);
        }

        let out = effects.relay(&mut world, target, hit(10));
        assert_eq!(out.amount, 6);
        assert_eq!(*seen.borrow(), vec![("burning", 10), ("warded", 6)]);

        let mut damage = hit(5);
        effects.relay_in_place(&mut world, target, &mut damage);
        assert_eq!(damage.amount, 1);
        assert_eq!(seen.borrow()[3], ("warded", 1));
    }

    #[test]
    fn waiting_effects_are_not_relayed_to() {
        let mut effects = engine();
        effects
            .bus_mut()
            .subscribe::<Burning, Relayed<Damage>, _>(|_, _, ev| {
                ev.args.amount += 2;
            });

        let mut world = World::new();
        let target = world.spawn("Kael");
        effects
            .add_or_refresh_delayed(
                &mut world,
                target,
                &kind("Burning"),
                None,
                Some(std::time::Duration::from_secs(1)),
                ResetPolicy::Reset,
            )
            .unwrap();
        assert_eq!(effects.relay(&mut world, target, hit(1)).amount, 1);

        effects.sync_clock(&crate::clock::FixedClock(crate::clock::Timestamp::from_secs(1)));
        effects.sweep(&mut world);
        assert_eq!(effects.relay(&mut world, target, hit(1)).amount, 3);
    }

    #[test]
    fn in_place_relay_writes_back() {
        let mut effects = engine();
        let modes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&modes);
        effects
            .bus_mut()
            .subscribe::<Burning, Relayed<Damage>, _>(move |_, _, ev| {
                sink.borrow_mut().push(ev.mode);
                ev.args.amount += 1;
            });

        let mut world = World::new();
        let target = world.spawn("Kael");
        apply(&mut effects, &mut world, target, "Burning");

        let mut damage = hit(1);
        effects.relay_in_place(&mut world, target, &mut damage);
        assert_eq!(damage.amount, 2);
        effects.relay(&mut world, target, hit(1));
        assert_eq!(*modes.borrow(), vec![RelayMode::ByRef, RelayMode::ByValue]);
    }

    #[test]
    fn no_effects_returns_event_unchanged() {
        let mut effects = engine();
        let mut world = World::new();
        let target = world.spawn("Kael");
        assert_eq!(effects.relay(&mut world, target, hit(7)), hit(7));
    }

    #[test]
    fn effects_removed_mid_relay_are_skipped() {
        let mut effects = engine();
        effects
            .bus_mut()
            .subscribe::<Burning, Relayed<Damage>, _>(|ctx, _, ev| {
                ev.args.seen_by.push("burning".into());
                ctx.effects
                    .try_remove(ctx.world, ev.target, &kind("Shielded"))
                    .unwrap();
            });
        effects
            .bus_mut()
            .subscribe::<Shielding, Relayed<Damage>, _>(|_, _, ev| {
                ev.args.seen_by.push("shield".into());
            });

        let mut world = World::new();
        let target = world.spawn("Kael");
        apply(&mut effects, &mut world, target, "Burning");
        apply(&mut effects, &mut world, target, "Shielded");

        let out = effects.relay(&mut world, target, hit(1));
        assert_eq!(out.seen_by, vec!["burning"]);
    }

    #[test]
    fn effects_added_mid_relay_wait_for_the_next_one() {
        let mut effects = engine();
        effects
            .bus_mut()
            .subscribe::<Burning, Relayed<Damage>, _>(|ctx, _, ev| {
                ev.args.seen_by.push("burning".into());
                ctx.effects
                    .add_or_refresh(ctx.world, ev.target, &kind("Shielded"), None, ResetPolicy::Reset)
                    .unwrap();
            });
        effects
            .bus_mut()
            .subscribe::<Shielding, Relayed<Damage>, _>(|_, _, ev| {
                ev.args.seen_by.push("shield".into());
            });

        let mut world = World::new();
        let target = world.spawn("Kael");
        apply(&mut effects, &mut world, target, "Burning");

        assert_eq!(effects.relay(&mut world, target, hit(1)).seen_by, vec!["burning"]);
        assert_eq!(
            effects.relay(&mut world, target, hit(1)).seen_by,
            vec!["burning", "shield"]
        );
    }

    #[test]
    fn relayed_events_do_not_reach_the_target() {
        let mut effects = engine();
        let hits = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&hits);
        effects
            .bus_mut()
            .subscribe_named::<Relayed<Damage>, _>("Muted", move |_, _, _| *sink.borrow_mut() += 1);

        let mut world = World::new();
        let target = world.spawn("Kael");
        apply(&mut effects, &mut world, target, "Muted");
        assert!(world.has_named(target, "Muted"));
        effects.relay(&mut world, target, hit(1));
        assert_eq!(*hits.borrow(), 0);
    }
}
