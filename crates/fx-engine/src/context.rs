use std::time::Duration;

use fx_core::{EntityId, World};

use crate::clock::{SimClock, TimeSource, Timestamp};
use crate::effects::{EffectKind, ResetPolicy, ServerAuthority, StatusEffects};
use crate::error::Denied;

/// Mutable context passed to each system during a step.
pub struct SimContext<'a> {
    /// The world being simulated.
    pub world: &'a mut World,
    /// The simulation clock.
    pub clock: &'a SimClock,
    /// The authoritative engine, clock already synced for this step.
    pub effects: &'a mut StatusEffects<ServerAuthority>,
}

impl SimContext<'_> {
    /// Index of the step being run.
    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// The current simulated time.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Shorthand for [`StatusEffects::add_or_refresh`].
    pub fn apply(
        &mut self,
        target: EntityId,
        kind: &EffectKind,
        duration: Option<Duration>,
        policy: ResetPolicy,
    ) -> Result<EntityId, Denied> {
        self.effects
            .add_or_refresh(self.world, target, kind, duration, policy)
    }

    /// Shorthand for [`StatusEffects::add_or_refresh_delayed`].
    pub fn apply_delayed(
        &mut self,
        target: EntityId,
        kind: &EffectKind,
        duration: Option<Duration>,
        delay: Duration,
        policy: ResetPolicy,
    ) -> Result<EntityId, Denied> {
        self.effects
            .add_or_refresh_delayed(self.world, target, kind, duration, Some(delay), policy)
    }

    /// Shorthand for [`StatusEffects::remove`].
    pub fn remove(&mut self, target: EntityId, kind: &EffectKind) -> bool {
        self.effects.remove(self.world, target, kind)
    }
}
