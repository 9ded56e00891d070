use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::component::ComponentSet;

/// Which allocator produced an entity ID.
///
/// Authoritative worlds and predicted worlds allocate from disjoint ranges so
/// that a predicted entity can never collide with a confirmed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdOrigin {
    /// IDs handed out by the authoritative simulation.
    Authoritative,
    /// IDs handed out speculatively by a predicting client.
    Predicted,
}

impl IdOrigin {
    fn tag(self) -> u64 {
        match self {
            Self::Authoritative => 0,
            Self::Predicted => 1,
        }
    }
}

/// Unique identifier for every entity in the world.
///
/// Built from an `(origin, sequence)` pair, so the same allocation sequence
/// always yields the same IDs. Ordering follows origin, then creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Build the ID for the `seq`-th entity allocated by `origin`.
    pub fn from_parts(origin: IdOrigin, seq: u64) -> Self {
        Self(Uuid::from_u64_pair(origin.tag(), seq))
    }

    /// The allocator that produced this ID.
    pub fn origin(&self) -> IdOrigin {
        match self.0.as_u64_pair().0 {
            0 => IdOrigin::Authoritative,
            _ => IdOrigin::Predicted,
        }
    }

    /// The allocation sequence number within the origin.
    pub fn seq(&self) -> u64 {
        self.0.as_u64_pair().1
    }

    /// Returns true if this ID was allocated by a predicting client.
    pub fn is_predicted(&self) -> bool {
        self.origin() == IdOrigin::Predicted
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin() {
            IdOrigin::Authoritative => write!(f, "#{}", self.seq()),
            IdOrigin::Predicted => write!(f, "~{}", self.seq()),
        }
    }
}

/// Hands out sequential entity IDs for one origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    origin: IdOrigin,
    next: u64,
}

impl IdAllocator {
    /// An allocator starting at 1.
    pub fn new(origin: IdOrigin) -> Self {
        Self { origin, next: 1 }
    }

    /// Allocate the next ID.
    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId::from_parts(self.origin, self.next);
        self.next += 1;
        id
    }

    /// The origin IDs are allocated under.
    pub fn origin(&self) -> IdOrigin {
        self.origin
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(IdOrigin::Authoritative)
    }
}

/// Stable identifier of the prototype an entity was spawned from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrototypeId(pub String);

impl PrototypeId {
    /// Wrap a prototype name.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrototypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrototypeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Core entity struct. Targets, effect instances, and everything else in the
/// simulation are entities.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Unique identifier for this entity.
    pub id: EntityId,
    /// The prototype this entity was spawned from, if any.
    pub prototype: Option<PrototypeId>,
    /// Display name of the entity.
    pub name: String,
    /// User-defined tags used by whitelists and blacklists.
    pub tags: Vec<String>,
    /// Spatial parent, if attached to another entity.
    pub parent: Option<EntityId>,
    /// Children in attachment order.
    pub children: Vec<EntityId>,
    /// Components attached to this entity.
    pub components: ComponentSet,
}

impl Entity {
    /// Create a detached entity with no components.
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            prototype: None,
            name: name.into(),
            tags: Vec::new(),
            parent: None,
            children: Vec::new(),
            components: ComponentSet::default(),
        }
    }

    /// Returns true if the entity carries the given tag (case-insensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_display_shows_origin_and_seq() {
        let id = EntityId::from_parts(IdOrigin::Authoritative, 12);
        assert_eq!(id.to_string(), "#12");
        let id = EntityId::from_parts(IdOrigin::Predicted, 3);
        assert_eq!(id.to_string(), "~3");
    }

    #[test]
    fn entity_id_round_trips_parts() {
        let id = EntityId::from_parts(IdOrigin::Predicted, 99);
        assert_eq!(id.origin(), IdOrigin::Predicted);
        assert_eq!(id.seq(), 99);
        assert!(id.is_predicted());
    }

    #[test]
    fn allocator_is_deterministic() {
        let mut a = IdAllocator::default();
        let mut b = IdAllocator::default();
        let ids_a: Vec<_> = (0..5).map(|_| a.next_id()).collect();
        let ids_b: Vec<_> = (0..5).map(|_| b.next_id()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn ids_order_by_creation_within_origin() {
        let mut alloc = IdAllocator::default();
        let first = alloc.next_id();
        let second = alloc.next_id();
        assert!(first < second);
    }

    #[test]
    fn predicted_ids_sort_after_authoritative() {
        let auth = EntityId::from_parts(IdOrigin::Authoritative, u64::MAX);
        let pred = EntityId::from_parts(IdOrigin::Predicted, 1);
        assert!(auth < pred);
    }

    #[test]
    fn prototype_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PrototypeId::new("Muted")).unwrap();
        assert_eq!(json, "\"Muted\"");
        let back: PrototypeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_str(), "Muted");
    }

    #[test]
    fn has_tag_ignores_case() {
        let mut entity = Entity::new(EntityId::from_parts(IdOrigin::Authoritative, 1), "Kael");
        entity.tags.push("Silicon".to_string());
        assert!(entity.has_tag("silicon"));
        assert!(!entity.has_tag("organic"));
    }
}
