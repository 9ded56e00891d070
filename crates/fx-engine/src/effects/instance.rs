use std::time::Duration;

use fx_core::{Component, EntityId};
use serde::{Deserialize, Serialize};

use super::alert::AlertId;
use super::registry::EffectKind;
use crate::clock::Timestamp;

/// How an existing effect's end time changes when the same kind is applied
/// again with a duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// End at `now + duration`, even if that is sooner. Turns a permanent
    /// effect into a timed one.
    Reset,
    /// Push the current end time back by `duration`.
    #[default]
    Extend,
    /// End at whichever is later, the current end time or `now + duration`.
    Greatest,
}

impl ResetPolicy {
    /// The end time after re-applying with `duration` at `now`.
    /// Only `Reset` can make a permanent effect finite.
    pub fn apply(
        self,
        current: Option<Timestamp>,
        now: Timestamp,
        duration: Duration,
    ) -> Option<Timestamp> {
        match self {
            Self::Reset => Some(now + duration),
            Self::Extend => current.map(|end| end + duration),
            Self::Greatest => current.map(|end| end.max(now + duration)),
        }
    }
}

/// Carried by every effect instance entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEffect {
    pub(crate) kind: EffectKind,
    pub(crate) applied_to: EntityId,
    pub(crate) end_time: Option<Timestamp>,
    /// Set while a delayed effect waits to start; cleared when it starts.
    pub(crate) start_time: Option<Timestamp>,
    pub(crate) alert: Option<AlertId>,
}

impl Component for StatusEffect {
    const NAME: &'static str = "StatusEffect";
}

impl StatusEffect {
    /// The effect kind.
    pub fn kind(&self) -> &EffectKind {
        &self.kind
    }

    /// The target this instance modifies.
    pub fn applied_to(&self) -> EntityId {
        self.applied_to
    }

    /// `None` means the effect never expires on its own.
    pub fn end_time(&self) -> Option<Timestamp> {
        self.end_time
    }

    /// When a delayed effect will start. `None` once it has started.
    pub fn start_time(&self) -> Option<Timestamp> {
        self.start_time
    }

    /// Whether the effect is in force: granted its components, shown its
    /// alert, and receiving relayed events.
    pub fn is_started(&self) -> bool {
        self.start_time.is_none()
    }

    /// Whether a delayed effect should start at `now`.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.start_time.is_some_and(|start| now >= start)
    }

    /// The alert this instance is bound to, if any.
    pub fn alert(&self) -> Option<&AlertId> {
        self.alert.as_ref()
    }

    /// Whether the effect never expires on its own.
    pub fn is_permanent(&self) -> bool {
        self.end_time.is_none()
    }

    /// Whether the end time has been reached at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.end_time.is_some_and(|end| now >= end)
    }

    /// Time left, `None` for permanent effects.
    pub fn remaining(&self, now: Timestamp) -> Option<Duration> {
        self.end_time.map(|end| now.until(end))
    }
}
