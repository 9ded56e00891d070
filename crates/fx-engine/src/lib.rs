//! Status effect engine.
//!
//! Attaches, times out, and removes status effects on entities of an
//! [`fx_core::World`], relays events through active effects, and projects
//! effect lifecycles to UI alerts. The [`Simulation`] drives the authoritative
//! step loop; a [`PredictedView`] runs the same operations ahead on a client.

/// Directed events delivered to component subscribers.
pub mod bus;
/// Simulation clock and timestamps.
pub mod clock;
/// Configuration types for simulation runs.
pub mod config;
/// Mutable context passed to systems each step.
pub mod context;
/// Status effect definitions, instances, and the engine itself.
pub mod effects;
/// Error types for the engine crate.
pub mod error;
/// Lifecycle records and the lifecycle log.
pub mod event;
/// Client-side prediction with checkpoints.
pub mod prediction;
/// Top-level step loop.
pub mod simulation;
/// The trait that all simulation systems implement.
pub mod system;

pub use bus::{EffectCtx, EventBus};
pub use clock::{FixedClock, SimClock, TimeSource, Timestamp};
pub use config::SimConfig;
pub use context::SimContext;
pub use effects::{
    AlertCommand, AlertId, AlertSink, Authority, ClientPrediction, EffectDefinition, EffectKind,
    EffectRecord, EffectRegistry, ResetPolicy, ServerAuthority, StatusEffect, StatusEffects,
};
pub use error::{Denied, EffectError, EffectResult, SimError, SimResult};
pub use event::{EffectEvent, EffectEventKind, EventLog};
pub use prediction::PredictedView;
pub use simulation::Simulation;
pub use system::System;
