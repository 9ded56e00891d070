use std::fmt;

use fx_core::{EntityId, World};
use serde::{Deserialize, Serialize};

use super::container::StatusEffectContainer;
use super::instance::StatusEffect;
use crate::clock::Timestamp;

/// Identifies a UI alert icon. Several effect kinds may share one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub String);

impl AlertId {
    /// Wrap an alert name.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The alert name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An instruction for the UI alert layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertCommand {
    /// Show the alert, with a cooldown window if every effect behind it is
    /// timed.
    Show {
        /// The entity the alert is shown for.
        target: EntityId,
        /// The alert to show.
        alert: AlertId,
        /// Start and end of the countdown to draw.
        cooldown: Option<(Timestamp, Timestamp)>,
    },
    /// Remove the alert.
    Clear {
        /// The entity the alert was shown for.
        target: EntityId,
        /// The alert to remove.
        alert: AlertId,
    },
}

/// Receives alert commands.
pub trait AlertSink {
    /// Act on one command.
    fn apply(&mut self, command: AlertCommand);
}

impl AlertSink for Vec<AlertCommand> {
    fn apply(&mut self, command: AlertCommand) {
        self.push(command);
    }
}

/// Projects effect lifecycle changes into alert commands, queued until the
/// owner drains them.
#[derive(Debug, Clone, Default)]
pub struct AlertBinder {
    pending: Vec<AlertCommand>,
}

impl AlertBinder {
    /// Recompute the state of `alert` on `target` from the started instances
    /// bound to it and queue the matching command.
    pub fn refresh(&mut self, world: &World, now: Timestamp, target: EntityId, alert: &AlertId) {
        let mut bound = false;
        let mut permanent = false;
        let mut latest: Option<Timestamp> = None;

        let instances = world
            .get::<StatusEffectContainer>(target)
            .map(StatusEffectContainer::instances)
            .unwrap_or_default();
        for instance in instances {
            let Some(effect) = world.get::<StatusEffect>(instance) else {
                continue;
            };
            if effect.alert() != Some(alert) || !effect.is_started() {
                continue;
            }
            bound = true;
            match effect.end_time() {
                None => permanent = true,
                Some(end) => latest = Some(latest.map_or(end, |l| l.max(end))),
            }
        }

        let command = if !bound {
            AlertCommand::Clear {
                target,
                alert: alert.clone(),
            }
        } else {
            AlertCommand::Show {
                target,
                alert: alert.clone(),
                cooldown: if permanent {
                    None
                } else {
                    latest.map(|end| (now, end))
                },
            }
        };
        self.pending.push(command);
    }

    /// Commands queued since the last drain.
    pub fn pending(&self) -> &[AlertCommand] {
        &self.pending
    }

    /// Take every queued command.
    pub fn drain(&mut self) -> Vec<AlertCommand> {
        std::mem::take(&mut self.pending)
    }

    /// Hand every queued command to `sink`, in order.
    pub fn flush(&mut self, sink: &mut dyn AlertSink) {
        for command in self.pending.drain(..) {
            sink.apply(command);
        }
    }
}
