//! Shared fixtures for unit tests.

use fx_core::{Component, ComponentRegistry};

use super::gating::EntityFilter;
use super::registry::{EffectDefinition, EffectKind, EffectRegistry};
use super::{ServerAuthority, StatusEffects};

/// Payload carried by `Burning` instances; relay handlers key off it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Burning {
    pub damage_per_tick: u32,
}

impl Component for Burning {
    const NAME: &'static str = "Burning";
}

/// Payload carried by `Shielded` instances.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shielding;

impl Component for Shielding {
    const NAME: &'static str = "Shielding";
}

/// Payload carried by `Warded` instances.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Warding;

impl Component for Warding {
    const NAME: &'static str = "Warding";
}

pub fn components() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry
        .register::<Burning>()
        .register::<Shielding>()
        .register::<Warding>()
        .register_marker("Muted")
        .register_marker("Stunned")
        .register_marker("KnockedDown");
    registry
}

pub fn registry() -> EffectRegistry {
    let mut registry = EffectRegistry::new();
    let defs = [
        EffectDefinition::new("Muted").granting("Muted").with_alert("muted"),
        EffectDefinition::new("Stun")
            .granting("Stunned")
            .with_alert("stun")
            .with_blacklist(EntityFilter::tags(["silicon"])),
        EffectDefinition::new("Knockdown")
            .granting("Stunned")
            .granting("KnockedDown")
            .with_alert("stun"),
        EffectDefinition::new("Burning").with_instance_component("Burning"),
        EffectDefinition::new("Shielded").with_instance_component("Shielding"),
        EffectDefinition::new("Warded").with_instance_component("Warding"),
        EffectDefinition::new("Pacified").with_whitelist(EntityFilter::tags(["organic"])),
    ];
    for def in defs {
        registry.define(def).unwrap();
    }
    registry.validate(&components()).unwrap();
    registry
}

pub fn engine() -> StatusEffects<ServerAuthority> {
    StatusEffects::new(registry(), components())
}

pub fn kind(name: &str) -> EffectKind {
    EffectKind::new(name)
}
