//! Client-side prediction of effect state.
//!
//! A [`PredictedView`] runs effect operations ahead of the authoritative
//! simulation on a forked world. New entities get predicted IDs, so they can
//! never collide with authoritative ones, and rolling back to a checkpoint
//! then replaying the same calls reproduces the same IDs.

use fx_core::World;

use crate::clock::TimeSource;
use crate::effects::{Authority, ClientPrediction, ServerAuthority, StatusEffects};

#[derive(Debug, Clone)]
struct Checkpoint {
    world: World,
    effects: StatusEffects<ClientPrediction>,
}

/// A predicted copy of the authoritative world plus a predicting engine.
#[derive(Debug)]
pub struct PredictedView {
    world: World,
    effects: StatusEffects<ClientPrediction>,
    checkpoint: Option<Checkpoint>,
}

impl PredictedView {
    /// Fork `authoritative` and index its effects. `effects` carries the
    /// client's handlers.
    pub fn new(authoritative: &World, mut effects: StatusEffects<ClientPrediction>) -> Self {
        let mut world = authoritative.fork(ClientPrediction::ORIGIN);
        effects.rebuild(&mut world);
        effects.drain_alerts();
        Self {
            world,
            effects,
            checkpoint: None,
        }
    }

    /// A predicting engine that shares `server`'s definitions but none of
    /// its handlers.
    pub fn engine_for(server: &StatusEffects<ServerAuthority>) -> StatusEffects<ClientPrediction> {
        let (registry, components) = server.shared_registries();
        StatusEffects::new(registry, components)
    }

    /// The predicted world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The predicting engine.
    pub fn effects(&self) -> &StatusEffects<ClientPrediction> {
        &self.effects
    }

    /// Both halves at once, for predicted effect calls.
    pub fn parts_mut(&mut self) -> (&mut World, &mut StatusEffects<ClientPrediction>) {
        (&mut self.world, &mut self.effects)
    }

    /// Read the current time from `clock`.
    pub fn sync_clock(&mut self, clock: &impl TimeSource) {
        self.effects.sync_clock(clock);
    }

    /// Remember the current predicted state.
    pub fn checkpoint(&mut self) {
        self.checkpoint = Some(Checkpoint {
            world: self.world.clone(),
            effects: self.effects.clone(),
        });
    }

    /// Whether a checkpoint is held.
    pub fn has_checkpoint(&self) -> bool {
        self.checkpoint.is_some()
    }

    /// Return to the last checkpoint. The checkpoint is kept, so the same
    /// span can be replayed more than once. Returns `false` if there is none.
    pub fn rollback(&mut self) -> bool {
        let Some(checkpoint) = &self.checkpoint else {
            return false;
        };
        self.world = checkpoint.world.clone();
        self.effects = checkpoint.effects.clone();
        tracing::debug!(entities = self.world.entity_count(), "prediction rolled back");
        true
    }

    /// Replace the prediction with fresh authoritative state. Drops the
    /// checkpoint and any pending alerts.
    pub fn reconcile(&mut self, authoritative: &World) {
        self.world = authoritative.fork(ClientPrediction::ORIGIN);
        self.effects.rebuild(&mut self.world);
        self.effects.drain_alerts();
        self.checkpoint = None;
        tracing::debug!(entities = self.world.entity_count(), "prediction reconciled");
    }
}
