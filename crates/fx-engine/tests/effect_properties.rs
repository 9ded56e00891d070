//! Property tests for status effects.

use std::time::Duration;

use fx_core::{ComponentRegistry, EntityId, World};
use fx_engine::effects::{EntityFilter, StatusEffectContainer};
use fx_engine::{
    EffectDefinition, EffectKind, EffectRegistry, FixedClock, ResetPolicy, ServerAuthority,
    StatusEffect, StatusEffects, Timestamp,
};
use proptest::prelude::*;

const KINDS: [&str; 5] = ["Muted", "Stun", "Knockdown", "Burning", "Pacified"];

fn engine() -> StatusEffects<ServerAuthority> {
    let mut components = ComponentRegistry::new();
    for name in ["Muted", "Stunned", "KnockedDown", "Burning"] {
        components.register_marker(name);
    }
    let mut registry = EffectRegistry::new();
    for def in [
        EffectDefinition::new("Muted").granting("Muted").with_alert("muted"),
        EffectDefinition::new("Stun").granting("Stunned").with_alert("stun"),
        EffectDefinition::new("Knockdown")
            .granting("Stunned")
            .granting("KnockedDown")
            .with_alert("stun"),
        EffectDefinition::new("Burning").with_instance_component("Burning"),
        EffectDefinition::new("Pacified").with_whitelist(EntityFilter::tags(["organic"])),
    ] {
        registry.define(def).unwrap();
    }
    registry.validate(&components).unwrap();
    StatusEffects::new(registry, components)
}

fn world() -> (World, Vec<EntityId>) {
    let mut world = World::new();
    let targets = vec![
        world.spawn("Kael"),
        world.spawn_tagged("Mira", &["organic"]),
        world.spawn("Rock"),
    ];
    (world, targets)
}

#[derive(Debug, Clone)]
enum Op {
    Apply {
        target: usize,
        kind: usize,
        duration: Option<u64>,
        policy: ResetPolicy,
    },
    Remove {
        target: usize,
        kind: usize,
    },
    RemoveAll {
        target: usize,
    },
    AddTime {
        target: usize,
        kind: usize,
        secs: u64,
    },
    RemoveTime {
        target: usize,
        kind: usize,
        secs: Option<u64>,
    },
    SetTime {
        target: usize,
        kind: usize,
        secs: u64,
    },
    Step(u64),
}

fn policy() -> impl Strategy<Value = ResetPolicy> {
    prop_oneof![
        Just(ResetPolicy::Reset),
        Just(ResetPolicy::Extend),
        Just(ResetPolicy::Greatest),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    let target = 0..3usize;
    let kind = 0..KINDS.len();
    prop_oneof![
        4 => (target.clone(), kind.clone(), proptest::option::of(0..6u64), policy()).prop_map(
            |(target, kind, duration, policy)| Op::Apply {
                target,
                kind,
                duration,
                policy
            }
        ),
        2 => (target.clone(), kind.clone()).prop_map(|(target, kind)| Op::Remove { target, kind }),
        1 => target.clone().prop_map(|target| Op::RemoveAll { target }),
        1 => (target.clone(), kind.clone(), 0..4u64)
            .prop_map(|(target, kind, secs)| Op::AddTime { target, kind, secs }),
        1 => (target.clone(), kind.clone(), proptest::option::of(0..4u64))
            .prop_map(|(target, kind, secs)| Op::RemoveTime { target, kind, secs }),
        1 => (target, kind, 0..4u64).prop_map(|(target, kind, secs)| Op::SetTime { target, kind, secs }),
        3 => (0..3u64).prop_map(Op::Step),
    ]
}

fn kind(i: usize) -> EffectKind {
    EffectKind::new(KINDS[i])
}

fn run(ops: &[Op]) -> (World, StatusEffects<ServerAuthority>, Vec<EntityId>) {
    let (mut world, targets) = world();
    let mut effects = engine();
    let mut now = 0;
    for op in ops {
        match *op {
            Op::Apply {
                target,
                kind: k,
                duration,
                policy,
            } => {
                let _ = effects.add_or_refresh(
                    &mut world,
                    targets[target],
                    &kind(k),
                    duration.map(Duration::from_secs),
                    policy,
                );
            }
            Op::Remove { target, kind: k } => {
                effects.remove(&mut world, targets[target], &kind(k));
            }
            Op::RemoveAll { target } => {
                effects.remove_all(&mut world, targets[target]);
            }
            Op::AddTime { target, kind: k, secs } => {
                effects.add_time(&mut world, targets[target], &kind(k), Duration::from_secs(secs));
            }
            Op::RemoveTime { target, kind: k, secs } => {
                effects.remove_time(
                    &mut world,
                    targets[target],
                    &kind(k),
                    secs.map(Duration::from_secs),
                );
            }
            Op::SetTime { target, kind: k, secs } => {
                effects.set_time(&mut world, targets[target], &kind(k), Duration::from_secs(secs));
            }
            Op::Step(secs) => {
                now += secs;
                effects.sync_clock(&FixedClock(Timestamp::from_secs(now)));
                effects.sweep(&mut world);
            }
        }
    }
    (world, effects, targets)
}

fn check_containment(world: &World, effects: &StatusEffects<ServerAuthority>, targets: &[EntityId]) {
    // Every listed instance is alive, applied to and parented by its target.
    for &target in targets {
        let listed = effects.active_effects(world, target);
        for &instance in &listed {
            let effect = world.get::<StatusEffect>(instance).unwrap();
            assert_eq!(effect.applied_to(), target);
            assert_eq!(world.parent_of(instance), Some(target));
        }
        let mut kinds: Vec<&str> = listed
            .iter()
            .map(|i| world.prototype_of(*i).unwrap().as_str())
            .collect();
        kinds.sort_unstable();
        let before = kinds.len();
        kinds.dedup();
        assert_eq!(before, kinds.len(), "one instance per kind");
    }
    // Every live instance is listed by its target.
    for instance in world.entities_with::<StatusEffect>() {
        let target = world.get::<StatusEffect>(instance).unwrap().applied_to();
        let container = world.get::<StatusEffectContainer>(target).unwrap();
        assert!(container.contains(instance));
    }
}

fn check_grants(world: &World, effects: &StatusEffects<ServerAuthority>, targets: &[EntityId]) {
    for &target in targets {
        for component in ["Muted", "Stunned", "KnockedDown"] {
            let granting = effects
                .active_effects(world, target)
                .iter()
                .filter(|i| {
                    let kind = world.prototype_of(**i).unwrap();
                    effects
                        .registry()
                        .lookup(kind)
                        .unwrap()
                        .components
                        .iter()
                        .any(|c| c == component)
                })
                .count();
            assert_eq!(effects.grants().count(target, component) as usize, granting);
            assert_eq!(world.has_named(target, component), granting > 0);
        }
    }
}

proptest! {
    #[test]
    fn containment_holds_under_any_sequence(ops in proptest::collection::vec(op(), 0..40)) {
        let (world, effects, targets) = run(&ops);
        check_containment(&world, &effects, &targets);
    }

    #[test]
    fn grants_match_active_effects(ops in proptest::collection::vec(op(), 0..40)) {
        let (world, effects, targets) = run(&ops);
        check_grants(&world, &effects, &targets);
    }

    #[test]
    fn applying_without_duration_twice_is_idempotent(
        ops in proptest::collection::vec(op(), 0..20),
        target in 0..3usize,
        k in 0..KINDS.len(),
        policy in policy(),
    ) {
        let (mut world, mut effects, targets) = run(&ops);
        let target = targets[target];
        if let Ok(first) = effects.add_or_refresh(&mut world, target, &kind(k), None, policy) {
            let end = effects.end_time(&world, target, &kind(k));
            let count = world.entity_count();
            let second = effects.add_or_refresh(&mut world, target, &kind(k), None, policy);
            prop_assert_eq!(second, Ok(first));
            prop_assert_eq!(effects.end_time(&world, target, &kind(k)), end);
            prop_assert_eq!(world.entity_count(), count);
        }
    }

    #[test]
    fn extend_pushes_end_time_by_exactly_the_duration(
        initial in 1..10u64,
        extra in 1..10u64,
        elapsed in 0..5u64,
    ) {
        let (mut world, targets) = world();
        let mut effects = engine();
        let muted = kind(0);
        effects
            .add_or_refresh(&mut world, targets[0], &muted, Some(Duration::from_secs(initial)), ResetPolicy::Reset)
            .unwrap();
        effects.sync_clock(&FixedClock(Timestamp::from_secs(elapsed)));
        let before = effects.end_time(&world, targets[0], &muted).unwrap().unwrap();
        effects
            .add_or_refresh(&mut world, targets[0], &muted, Some(Duration::from_secs(extra)), ResetPolicy::Extend)
            .unwrap();
        let after = effects.end_time(&world, targets[0], &muted).unwrap().unwrap();
        prop_assert_eq!(after, before + Duration::from_secs(extra));
    }

    #[test]
    fn nothing_outlives_its_end_time(ops in proptest::collection::vec(op(), 0..40)) {
        let (mut world, mut effects, targets) = run(&ops);
        let latest = targets
            .iter()
            .flat_map(|t| effects.active_effects(&world, *t))
            .filter_map(|i| world.get::<StatusEffect>(i).and_then(StatusEffect::end_time))
            .max();
        if let Some(latest) = latest {
            effects.sync_clock(&FixedClock(latest));
            effects.sweep(&mut world);
            for target in &targets {
                for instance in effects.active_effects(&world, *target) {
                    prop_assert!(world.get::<StatusEffect>(instance).unwrap().is_permanent());
                }
            }
        }
    }
}
