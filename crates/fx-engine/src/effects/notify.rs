//! Lifecycle events raised through the event bus.

use fx_core::EntityId;

use super::registry::EffectKind;
use crate::clock::Timestamp;

/// Raised on the target before a new effect is created. Any handler may set
/// `cancelled`; later handlers still run and see the flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeforeEffectAdded {
    /// The affected entity.
    pub target: EntityId,
    /// The effect kind.
    pub kind: EffectKind,
    /// Set to refuse the application.
    pub cancelled: bool,
}

/// Raised on the target and then on the instance once an effect is in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectApplied {
    /// The affected entity.
    pub target: EntityId,
    /// The effect instance.
    pub instance: EntityId,
    /// The effect kind.
    pub kind: EffectKind,
    /// `None` for a permanent effect.
    pub end_time: Option<Timestamp>,
}

/// Raised on the target and then on the instance when an existing effect's
/// end time changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectEndTimeChanged {
    /// The affected entity.
    pub target: EntityId,
    /// The effect instance.
    pub instance: EntityId,
    /// The effect kind.
    pub kind: EffectKind,
    /// `None` for a permanent effect.
    pub end_time: Option<Timestamp>,
}

/// Raised on the target and then on the instance just before the instance is
/// destroyed. Both entities are still intact.
///
/// If the instance was destroyed without going through the engine, this is
/// raised on the target only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectRemoved {
    /// The affected entity.
    pub target: EntityId,
    /// The effect instance.
    pub instance: EntityId,
    /// The effect kind.
    pub kind: EffectKind,
}
