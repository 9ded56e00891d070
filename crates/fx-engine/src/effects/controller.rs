use std::sync::Arc;
use std::time::Duration;

use fx_core::{Component, CoreResult, EntityId, World};

use super::alert::AlertId;
use super::authority::{Authority, ServerAuthority};
use super::container::StatusEffectContainer;
use super::instance::{ResetPolicy, StatusEffect};
use super::notify::{BeforeEffectAdded, EffectApplied, EffectEndTimeChanged, EffectRemoved};
use super::registry::{EffectDefinition, EffectKind};
use super::StatusEffects;
use crate::clock::Timestamp;
use crate::error::{Denied, EffectError, EffectResult};
use crate::event::{EffectEvent, EffectEventKind};

impl<A: Authority> StatusEffects<A> {
    /// Apply `kind` to `target`, or refresh it if already active.
    ///
    /// An existing effect is returned as is when `duration` is `None`.
    /// Otherwise its end time follows `policy`. A new effect lasts
    /// `duration` from now, or forever if `None`.
    ///
    /// New applications go through the kind's whitelist and blacklist, then
    /// [`BeforeEffectAdded`] on the target. Nothing is changed on denial.
    pub fn add_or_refresh(
        &mut self,
        world: &mut World,
        target: EntityId,
        kind: &EffectKind,
        duration: Option<Duration>,
        policy: ResetPolicy,
    ) -> Result<EntityId, Denied> {
        self.add_or_refresh_delayed(world, target, kind, duration, None, policy)
    }

    /// [`add_or_refresh`](Self::add_or_refresh) with a start delay.
    ///
    /// A new effect given a non-zero `delay` waits in the target's container
    /// until `now + delay`, and its `duration` counts from then. Until the
    /// sweep that finds it due starts it, it grants nothing, shows no alert
    /// and is skipped by relays and component queries. [`EffectApplied`] is
    /// raised when it starts.
    ///
    /// Refreshing an effect that has not started measures `policy` from
    /// `now + delay` and moves the start earlier if that is sooner. The delay
    /// is ignored once the effect has started.
    pub fn add_or_refresh_delayed(
        &mut self,
        world: &mut World,
        target: EntityId,
        kind: &EffectKind,
        duration: Option<Duration>,
        delay: Option<Duration>,
        policy: ResetPolicy,
    ) -> Result<EntityId, Denied> {
        debug_assert!(
            self.registry.contains(kind),
            "effect kind {kind} is not registered"
        );
        let delay = delay.filter(|d| !d.is_zero());
        let registry = Arc::clone(&self.registry);
        let definition = match registry.lookup(kind) {
            Ok(def) => def,
            Err(e) => {
                tracing::error!(error = %e, authority = A::NAME, "cannot apply effect");
                return Err(self.deny(world, target, kind, Denied::UnknownKind));
            }
        };
        if !world.contains(target) {
            return Err(self.deny(world, target, kind, Denied::MissingTarget));
        }

        if let Some(instance) = self.get_instance(world, target, kind) {
            self.refresh(world, instance, duration, delay, policy);
            return Ok(instance);
        }

        if duration == Some(Duration::ZERO) {
            return Err(self.deny(world, target, kind, Denied::ZeroDuration));
        }
        if let Err(reason) = definition.gating.check(world, target) {
            return Err(self.deny(world, target, kind, reason));
        }
        let mut before = BeforeEffectAdded {
            target,
            kind: kind.clone(),
            cancelled: false,
        };
        self.raise(world, target, &mut before);
        if before.cancelled {
            return Err(self.deny(world, target, kind, Denied::Cancelled));
        }
        // Handlers may have destroyed the target or applied the kind themselves.
        if !world.contains(target) {
            return Err(self.deny(world, target, kind, Denied::MissingTarget));
        }
        if let Some(instance) = self.get_instance(world, target, kind) {
            return Ok(instance);
        }

        let start_time = delay.map(|d| self.now + d);
        let end_time = duration.map(|d| start_time.unwrap_or(self.now) + d);
        let instance = match self.spawn_instance(world, target, definition, start_time, end_time) {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(error = %e, %kind, %target, "failed to create effect instance");
                return Err(self.deny(world, target, kind, Denied::Misconfigured));
            }
        };

        match start_time {
            None => self.announce_start(world, target, instance, kind, end_time, definition.alert.as_ref()),
            Some(start_time) => {
                tracing::debug!(%kind, %target, %instance, %start_time, ?end_time, authority = A::NAME, "effect scheduled");
                self.log.push(EffectEvent::new(
                    self.now,
                    EffectEventKind::Scheduled {
                        target,
                        instance,
                        kind: kind.clone(),
                        start_time,
                        end_time,
                    },
                    format!("{kind} scheduled on {} for {start_time}", world.entity_name(target)),
                ));
            }
        }
        Ok(instance)
    }

    fn refresh(
        &mut self,
        world: &mut World,
        instance: EntityId,
        duration: Option<Duration>,
        delay: Option<Duration>,
        policy: ResetPolicy,
    ) {
        let Some(effect) = world.get::<StatusEffect>(instance) else {
            return;
        };
        let current = effect.end_time();
        let pending = effect.start_time();
        // A delay only matters while the instance is still waiting.
        let delayed = pending.and(delay).map(|d| self.now + d);

        if let Some(duration) = duration {
            let updated = policy.apply(current, delayed.unwrap_or(self.now), duration);
            if updated != current {
                self.set_end_time(world, instance, updated);
            }
        }
        if let (Some(start), Some(earlier)) = (pending, delayed)
            && earlier < start
            && let Some(effect) = world.get_mut::<StatusEffect>(instance)
        {
            effect.start_time = Some(earlier);
            tracing::debug!(%instance, start_time = %earlier, "effect start brought forward");
        }
    }

    fn announce_start(
        &mut self,
        world: &mut World,
        target: EntityId,
        instance: EntityId,
        kind: &EffectKind,
        end_time: Option<Timestamp>,
        alert: Option<&AlertId>,
    ) {
        tracing::debug!(%kind, %target, %instance, ?end_time, authority = A::NAME, "effect applied");
        self.log.push(EffectEvent::new(
            self.now,
            EffectEventKind::Applied {
                target,
                instance,
                kind: kind.clone(),
                end_time,
            },
            format!("{kind} applied to {}", world.entity_name(target)),
        ));

        let mut applied = EffectApplied {
            target,
            instance,
            kind: kind.clone(),
            end_time,
        };
        self.raise(world, target, &mut applied);
        self.raise(world, instance, &mut applied);

        if let Some(alert) = alert {
            self.alerts.refresh(world, self.now, target, alert);
        }
    }

    /// Start every delayed effect whose start time has come. Returns how
    /// many started. Runs at the head of each sweep.
    pub fn start_due(&mut self, world: &mut World) -> usize {
        let now = self.now;
        let due: Vec<EntityId> = world
            .entities_with::<StatusEffect>()
            .into_iter()
            .filter(|i| world.get::<StatusEffect>(*i).is_some_and(|e| e.is_due(now)))
            .collect();
        let mut started = 0;
        for instance in due {
            // Earlier start handlers may have removed it.
            if world.get::<StatusEffect>(instance).is_some_and(|e| e.is_due(now))
                && self.start_instance(world, instance)
            {
                started += 1;
            }
        }
        started
    }

    fn start_instance(&mut self, world: &mut World, instance: EntityId) -> bool {
        let Some(effect) = world.get::<StatusEffect>(instance).cloned() else {
            return false;
        };
        let target = effect.applied_to;
        let components = match self.registry.lookup(&effect.kind) {
            Ok(definition) => definition.components.clone(),
            Err(e) => {
                tracing::warn!(error = %e, %target, "starting effect with no definition");
                Vec::new()
            }
        };
        if let Err(e) = self.grants.grant(world, &self.components, target, &components) {
            tracing::error!(error = %e, kind = %effect.kind, %target, "cannot start delayed effect");
            self.remove_instance(world, instance);
            return false;
        }

        if let Some(started) = world.get_mut::<StatusEffect>(instance) {
            started.start_time = None;
        }
        if let Some(container) = world.get_mut::<StatusEffectContainer>(target) {
            container.mark_started(instance);
        }
        self.announce_start(world, target, instance, &effect.kind, effect.end_time, effect.alert.as_ref());
        true
    }

    fn spawn_instance(
        &mut self,
        world: &mut World,
        target: EntityId,
        definition: &EffectDefinition,
        start_time: Option<Timestamp>,
        end_time: Option<Timestamp>,
    ) -> CoreResult<EntityId> {
        let instance = world.spawn_child(target, definition.kind.clone())?;
        if let Err(e) = self.init_instance(world, target, instance, definition, start_time, end_time) {
            if let Some(container) = world.get_mut::<StatusEffectContainer>(target) {
                container.remove(instance);
            }
            let _ = world.destroy(instance);
            return Err(e);
        }
        Ok(instance)
    }

    fn init_instance(
        &mut self,
        world: &mut World,
        target: EntityId,
        instance: EntityId,
        definition: &EffectDefinition,
        start_time: Option<Timestamp>,
        end_time: Option<Timestamp>,
    ) -> CoreResult<()> {
        let kind = &definition.kind;
        world.attach(
            instance,
            StatusEffect {
                kind: kind.clone(),
                applied_to: target,
                start_time,
                end_time,
                alert: definition.alert.clone(),
            },
        )?;
        for name in &definition.instance_components {
            world.attach_boxed(instance, self.components.create(name)?)?;
        }

        if !world.has::<StatusEffectContainer>(target) {
            world.attach(target, StatusEffectContainer::default())?;
        }
        let started = start_time.is_none();
        if let Some(container) = world.get_mut::<StatusEffectContainer>(target) {
            container.insert(instance, kind.clone(), started);
        }

        if started {
            self.grants
                .grant(world, &self.components, target, &definition.components)?;
        }
        Ok(())
    }

    fn deny(&mut self, world: &World, target: EntityId, kind: &EffectKind, reason: Denied) -> Denied {
        tracing::debug!(%kind, %target, %reason, authority = A::NAME, "effect denied");
        self.log.push(EffectEvent::new(
            self.now,
            EffectEventKind::Denied {
                target,
                kind: kind.clone(),
                reason: reason.clone(),
            },
            format!("{kind} denied on {}: {reason}", world.entity_name(target)),
        ));
        reason
    }

    /// Overwrite an instance's end time and tell everyone who cares.
    pub(crate) fn set_end_time(
        &mut self,
        world: &mut World,
        instance: EntityId,
        end_time: Option<Timestamp>,
    ) -> bool {
        let Some(effect) = world.get_mut::<StatusEffect>(instance) else {
            return false;
        };
        effect.end_time = end_time;
        let target = effect.applied_to;
        let kind = effect.kind.clone();
        let alert = effect.alert.clone().filter(|_| effect.is_started());

        tracing::debug!(%kind, %target, ?end_time, "effect end time changed");
        self.log.push(EffectEvent::new(
            self.now,
            EffectEventKind::EndTimeChanged {
                target,
                instance,
                kind: kind.clone(),
                end_time,
            },
            format!("{kind} on {} now ends at {}", world.entity_name(target), describe_end(end_time)),
        ));

        let mut changed = EffectEndTimeChanged {
            target,
            instance,
            kind,
            end_time,
        };
        self.raise(world, target, &mut changed);
        self.raise(world, instance, &mut changed);
        if let Some(alert) = alert {
            self.alerts.refresh(world, self.now, target, &alert);
        }
        true
    }

    /// The active instances on `target`, in application order.
    pub fn active_effects(&self, world: &World, target: EntityId) -> Vec<EntityId> {
        world
            .get::<StatusEffectContainer>(target)
            .map(StatusEffectContainer::instances)
            .unwrap_or_default()
    }

    /// The instance of `kind` on `target`, started or not.
    pub fn get_instance(&self, world: &World, target: EntityId, kind: &EffectKind) -> Option<EntityId> {
        self.active_effects(world, target)
            .into_iter()
            .find(|i| world.prototype_of(*i) == Some(kind) && world.has::<StatusEffect>(*i))
    }

    /// Whether `target` has `kind`, including one still waiting to start.
    pub fn has(&self, world: &World, target: EntityId, kind: &EffectKind) -> bool {
        self.get_instance(world, target, kind).is_some()
    }

    /// End time of the active `kind` on `target`. The outer `None` means no
    /// such effect, the inner one a permanent effect.
    pub fn end_time(&self, world: &World, target: EntityId, kind: &EffectKind) -> Option<Option<Timestamp>> {
        let instance = self.get_instance(world, target, kind)?;
        world.get::<StatusEffect>(instance).map(StatusEffect::end_time)
    }

    /// Time left on the active `kind` on `target`; nested like
    /// [`end_time`](Self::end_time).
    pub fn get_remaining(&self, world: &World, target: EntityId, kind: &EffectKind) -> Option<Option<Duration>> {
        let instance = self.get_instance(world, target, kind)?;
        world
            .get::<StatusEffect>(instance)
            .map(|e| e.remaining(self.now))
    }

    /// Started instances on `target` whose entity carries `T`, in
    /// application order.
    pub fn query_by_component<T: Component>(&self, world: &World, target: EntityId) -> Vec<EntityId> {
        self.active_effects(world, target)
            .into_iter()
            .filter(|i| is_started(world, *i) && world.has::<T>(*i))
            .collect()
    }

    /// Whether any started instance on `target` carries `T`.
    pub fn has_effect_component<T: Component>(&self, world: &World, target: EntityId) -> bool {
        self.active_effects(world, target)
            .into_iter()
            .any(|i| is_started(world, i) && world.has::<T>(i))
    }

    /// Latest end time among the active instances carrying `T`. `None` if
    /// there are none, `Some(None)` if any of them is permanent.
    pub fn max_end_time_with<T: Component>(&self, world: &World, target: EntityId) -> Option<Option<Timestamp>> {
        let mut result: Option<Option<Timestamp>> = None;
        for instance in self.query_by_component::<T>(world, target) {
            let Some(effect) = world.get::<StatusEffect>(instance) else {
                continue;
            };
            result = match (result, effect.end_time()) {
                (_, None) | (Some(None), _) => Some(None),
                (None, Some(end)) => Some(Some(end)),
                (Some(Some(best)), Some(end)) => Some(Some(best.max(end))),
            };
        }
        result
    }

    /// Push back the end of an active timed effect by `delta`. Permanent
    /// effects are left alone. Returns whether the effect is active.
    pub fn add_time(&mut self, world: &mut World, target: EntityId, kind: &EffectKind, delta: Duration) -> bool {
        let Some(current) = self.end_time(world, target, kind) else {
            return false;
        };
        if let (Some(end), Some(instance)) = (current, self.get_instance(world, target, kind))
            && !delta.is_zero()
        {
            self.set_end_time(world, instance, Some(end + delta));
        }
        true
    }

    /// Make an active effect end `duration` from now, permanent or not.
    /// Returns whether the effect is active.
    pub fn set_time(&mut self, world: &mut World, target: EntityId, kind: &EffectKind, duration: Duration) -> bool {
        match self.get_instance(world, target, kind) {
            Some(instance) => self.set_end_time(world, instance, Some(self.now + duration)),
            None => false,
        }
    }

    /// Remove `kind` from `target` if this handle has the authority to.
    ///
    /// For code generic over the authority. A predicting handle logs and
    /// returns [`EffectError::AuthorityViolation`] without touching anything.
    pub fn try_remove(&mut self, world: &mut World, target: EntityId, kind: &EffectKind) -> EffectResult<bool> {
        if !A::CAN_REMOVE {
            let err = EffectError::AuthorityViolation { operation: "remove" };
            tracing::warn!(error = %err, %kind, %target, authority = A::NAME, "rejected effect removal");
            return Err(err);
        }
        Ok(match self.get_instance(world, target, kind) {
            Some(instance) => self.remove_instance(world, instance),
            None => false,
        })
    }

    /// The single removal path. Subscribers see [`EffectRemoved`] while the
    /// instance is still intact.
    pub(crate) fn remove_instance(&mut self, world: &mut World, instance: EntityId) -> bool {
        if self.removing.contains(&instance) {
            return false;
        }
        let Some(effect) = world.get::<StatusEffect>(instance).cloned() else {
            return false;
        };
        let target = effect.applied_to;

        self.removing.insert(instance);
        let mut removed = EffectRemoved {
            target,
            instance,
            kind: effect.kind.clone(),
        };
        self.raise(world, target, &mut removed);
        self.raise(world, instance, &mut removed);
        self.removing.remove(&instance);

        if let Some(container) = world.get_mut::<StatusEffectContainer>(target) {
            container.remove(instance);
        }
        // Gone already if a handler destroyed it or its target.
        let _ = world.destroy(instance);
        self.release(world, target, &effect.kind, effect.alert.as_ref(), effect.is_started());

        tracing::debug!(kind = %effect.kind, %target, %instance, "effect removed");
        self.log.push(EffectEvent::new(
            self.now,
            EffectEventKind::Removed {
                target,
                instance,
                kind: effect.kind.clone(),
            },
            format!("{} removed from {}", effect.kind, world.entity_name(target)),
        ));
        true
    }

    /// Undo what an instance contributed to its target. An instance that
    /// never started holds no grants.
    pub(crate) fn release(
        &mut self,
        world: &mut World,
        target: EntityId,
        kind: &EffectKind,
        alert: Option<&AlertId>,
        started: bool,
    ) {
        match self.registry.lookup(kind) {
            Ok(_) if !started => {}
            Ok(definition) => {
                let detached = self.grants.revoke(world, target, &definition.components);
                if !detached.is_empty() {
                    tracing::trace!(%target, ?detached, "granted components detached");
                }
            }
            Err(e) => tracing::warn!(error = %e, %target, "cannot revoke grants"),
        }
        if let Some(alert) = alert
            && world.contains(target)
        {
            self.alerts.refresh(world, self.now, target, alert);
        }
    }
}

impl StatusEffects<ServerAuthority> {
    /// Remove `kind` from `target`. Returns whether it was active.
    pub fn remove(&mut self, world: &mut World, target: EntityId, kind: &EffectKind) -> bool {
        match self.get_instance(world, target, kind) {
            Some(instance) => self.remove_instance(world, instance),
            None => false,
        }
    }

    /// Remove every effect on `target`. Returns how many were removed.
    pub fn remove_all(&mut self, world: &mut World, target: EntityId) -> usize {
        let mut removed = 0;
        for instance in self.active_effects(world, target) {
            if self.remove_instance(world, instance) {
                removed += 1;
            }
        }
        removed
    }

    /// Bring the end of an active timed effect forward by `delta`, or remove
    /// the effect outright when `delta` is `None`. Refuses, returning
    /// `false`, to move the end before the start of the simulation.
    pub fn remove_time(
        &mut self,
        world: &mut World,
        target: EntityId,
        kind: &EffectKind,
        delta: Option<Duration>,
    ) -> bool {
        let Some(delta) = delta else {
            return self.remove(world, target, kind);
        };
        let Some(instance) = self.get_instance(world, target, kind) else {
            return false;
        };
        let Some(current) = world.get::<StatusEffect>(instance).map(StatusEffect::end_time) else {
            return false;
        };
        match current {
            None => true,
            Some(end) => match end.checked_sub(delta) {
                Some(updated) => self.set_end_time(world, instance, Some(updated)),
                None => false,
            },
        }
    }
}

fn is_started(world: &World, instance: EntityId) -> bool {
    world
        .get::<StatusEffect>(instance)
        .is_some_and(StatusEffect::is_started)
}

fn describe_end(end_time: Option<Timestamp>) -> String {
    match end_time {
        Some(t) => t.to_string(),
        None => "never".to_string(),
    }
}
