use fx_core::EntityId;
use serde::Serialize;

use crate::clock::Timestamp;
use crate::effects::EffectKind;
use crate::error::Denied;

/// What happened to an effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectEventKind {
    /// A new effect instance was created on a target.
    Applied {
        /// The affected entity.
        target: EntityId,
        /// The new instance entity.
        instance: EntityId,
        /// The effect kind.
        kind: EffectKind,
        /// When the effect expires; `None` for permanent effects.
        end_time: Option<Timestamp>,
    },
    /// A delayed instance was created and waits to start.
    Scheduled {
        /// The entity the effect will affect.
        target: EntityId,
        /// The new instance entity.
        instance: EntityId,
        /// The effect kind.
        kind: EffectKind,
        /// When the effect starts.
        start_time: Timestamp,
        /// When the effect expires; `None` for permanent effects.
        end_time: Option<Timestamp>,
    },
    /// An existing instance had its end time changed.
    EndTimeChanged {
        /// The affected entity.
        target: EntityId,
        /// The instance entity.
        instance: EntityId,
        /// The effect kind.
        kind: EffectKind,
        /// The new end time; `None` for permanent effects.
        end_time: Option<Timestamp>,
    },
    /// An instance was removed and destroyed.
    Removed {
        /// The formerly affected entity.
        target: EntityId,
        /// The destroyed instance entity.
        instance: EntityId,
        /// The effect kind.
        kind: EffectKind,
    },
    /// An application was refused.
    Denied {
        /// The entity the effect was aimed at.
        target: EntityId,
        /// The effect kind.
        kind: EffectKind,
        /// Why it was refused.
        #[serde(skip)]
        reason: Denied,
    },
}

impl EffectEventKind {
    /// Check whether a given entity is involved in this event.
    pub fn involves(&self, id: EntityId) -> bool {
        match self {
            Self::Applied {
                target, instance, ..
            }
            | Self::Scheduled {
                target, instance, ..
            }
            | Self::EndTimeChanged {
                target, instance, ..
            }
            | Self::Removed {
                target, instance, ..
            } => *target == id || *instance == id,
            Self::Denied { target, .. } => *target == id,
        }
    }

    /// The effect kind this event is about.
    pub fn kind(&self) -> &EffectKind {
        match self {
            Self::Applied { kind, .. }
            | Self::Scheduled { kind, .. }
            | Self::EndTimeChanged { kind, .. }
            | Self::Removed { kind, .. }
            | Self::Denied { kind, .. } => kind,
        }
    }
}

/// A record of a lifecycle change.
#[derive(Debug, Clone, Serialize)]
pub struct EffectEvent {
    /// Simulation time when the change happened.
    pub time: Timestamp,
    /// The specific change.
    pub kind: EffectEventKind,
    /// A human-readable description.
    pub description: String,
}

impl EffectEvent {
    /// An event at `time` with a human-readable description.
    pub fn new(time: Timestamp, kind: EffectEventKind, description: impl Into<String>) -> Self {
        Self {
            time,
            kind,
            description: description.into(),
        }
    }
}

/// Accumulates lifecycle events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<EffectEvent>,
    max_events: usize,
}

impl EventLog {
    /// Create a new event log with the given maximum capacity (0 = unlimited).
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    /// Append an event, dropping the oldest events if the log exceeds its capacity.
    pub fn push(&mut self, event: EffectEvent) {
        self.events.push(event);
        if self.max_events > 0 && self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(..drain_count);
        }
    }

    /// Retained events, oldest first.
    pub fn events(&self) -> &[EffectEvent] {
        &self.events
    }

    /// Return all events recorded at the given time.
    pub fn events_at(&self, time: Timestamp) -> Vec<&EffectEvent> {
        self.events.iter().filter(|e| e.time == time).collect()
    }

    /// Return all events involving the given entity.
    pub fn events_for_entity(&self, id: EntityId) -> Vec<&EffectEvent> {
        self.events.iter().filter(|e| e.kind.involves(id)).collect()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events are retained.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop every retained event.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
