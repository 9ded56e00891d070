//! Status effects: modifier entities attached to a target for a while.
//!
//! Each active effect is its own entity, spawned as a child of the target and
//! carrying a [`StatusEffect`] component. The target's
//! [`StatusEffectContainer`] lists them. [`StatusEffects`] is the only thing
//! that creates, edits, or destroys them.

mod alert;
mod authority;
mod container;
mod controller;
mod gating;
mod grants;
mod instance;
mod notify;
mod registry;
mod relay;
mod snapshot;
mod sweeper;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::BTreeSet;
use std::sync::Arc;

use fx_core::{ComponentRegistry, EntityId};

pub use alert::{AlertBinder, AlertCommand, AlertId, AlertSink};
pub use authority::{Authority, ClientPrediction, ServerAuthority};
pub use container::{ContainerEntry, StatusEffectContainer};
pub use gating::{EntityFilter, GatingPolicy};
pub use grants::{Grant, GrantLedger};
pub use instance::{ResetPolicy, StatusEffect};
pub use notify::{BeforeEffectAdded, EffectApplied, EffectEndTimeChanged, EffectRemoved};
pub use registry::{EffectDefinition, EffectKind, EffectRegistry};
pub use relay::{RelayMode, Relayed};
pub use snapshot::EffectRecord;
pub use sweeper::SweepReport;

use crate::bus::EventBus;
use crate::clock::{TimeSource, Timestamp};
use crate::event::EventLog;

/// The effect engine, acting for one authority.
///
/// Holds no entity state of its own beyond the grant ledger: instances and
/// containers live in the [`World`](fx_core::World) passed to each call.
/// Time is whatever the last [`sync_clock`](Self::sync_clock) reported.
#[derive(Debug, Clone)]
pub struct StatusEffects<A: Authority = ServerAuthority> {
    registry: Arc<EffectRegistry>,
    components: Arc<ComponentRegistry>,
    pub(crate) bus: EventBus<A>,
    grants: GrantLedger,
    alerts: AlertBinder,
    log: EventLog,
    now: Timestamp,
    /// Instances whose removal is in progress.
    removing: BTreeSet<EntityId>,
}

impl<A: Authority> StatusEffects<A> {
    /// An engine over `registry`, building components from `components`.
    ///
    /// The registry should already have passed
    /// [`EffectRegistry::validate`] against `components`. If it has not, the
    /// problem is logged here and applying the broken kind is denied with
    /// [`Denied::Misconfigured`](crate::Denied::Misconfigured).
    pub fn new(
        registry: impl Into<Arc<EffectRegistry>>,
        components: impl Into<Arc<ComponentRegistry>>,
    ) -> Self {
        let registry = registry.into();
        let components = components.into();
        if let Err(e) = registry.validate(&components) {
            tracing::error!(error = %e, authority = A::NAME, "effect definitions do not match the component registry");
        }
        Self {
            registry,
            components,
            bus: EventBus::new(),
            grants: GrantLedger::new(),
            alerts: AlertBinder::default(),
            log: EventLog::new(0),
            now: Timestamp::ZERO,
            removing: BTreeSet::new(),
        }
    }

    /// Bound the lifecycle log (0 = unlimited).
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.log = EventLog::new(max_events);
        self
    }

    /// Read the current time from `clock`. Call once per step before any
    /// effect operations.
    pub fn sync_clock(&mut self, clock: &impl TimeSource) {
        self.now = clock.now();
    }

    /// The time read by the last [`sync_clock`](Self::sync_clock).
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// The effect definitions this engine applies.
    pub fn registry(&self) -> &EffectRegistry {
        &self.registry
    }

    /// The factory for granted and instance components.
    pub fn component_registry(&self) -> &ComponentRegistry {
        &self.components
    }

    pub(crate) fn shared_registries(&self) -> (Arc<EffectRegistry>, Arc<ComponentRegistry>) {
        (Arc::clone(&self.registry), Arc::clone(&self.components))
    }

    /// The lifecycle event bus.
    pub fn bus(&self) -> &EventBus<A> {
        &self.bus
    }

    /// Subscribe handlers here.
    pub fn bus_mut(&mut self) -> &mut EventBus<A> {
        &mut self.bus
    }

    /// Reference counts of components granted to targets.
    pub fn grants(&self) -> &GrantLedger {
        &self.grants
    }

    /// Lifecycle history, oldest first.
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Alert commands queued since the last drain.
    pub fn pending_alerts(&self) -> &[AlertCommand] {
        self.alerts.pending()
    }

    /// Take the queued alert commands.
    pub fn drain_alerts(&mut self) -> Vec<AlertCommand> {
        self.alerts.drain()
    }

    /// Hand the queued alert commands to `sink`.
    pub fn flush_alerts(&mut self, sink: &mut dyn AlertSink) {
        self.alerts.flush(sink);
    }
}
