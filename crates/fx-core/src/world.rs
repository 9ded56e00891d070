use std::collections::BTreeMap;

use crate::component::{AnyComponent, Component};
use crate::entity::{Entity, EntityId, IdAllocator, IdOrigin, PrototypeId};
use crate::error::{CoreError, CoreResult};

/// The entity substrate. Owns every entity and its components, and tracks
/// parent/child attachment.
///
/// Entities are kept in ID order, which is creation order within an origin,
/// so iteration is deterministic.
#[derive(Debug, Clone, Default)]
pub struct World {
    entities: BTreeMap<EntityId, Entity>,
    ids: IdAllocator,
}

impl World {
    /// Create an empty authoritative world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone this world for speculative use. Entities spawned in the copy get
    /// IDs from `origin`, starting fresh, so replaying the same spawns yields
    /// the same IDs.
    pub fn fork(&self, origin: IdOrigin) -> Self {
        Self {
            entities: self.entities.clone(),
            ids: IdAllocator::new(origin),
        }
    }

    /// The origin new entity IDs are allocated from.
    pub fn origin(&self) -> IdOrigin {
        self.ids.origin()
    }

    // -----------------------------------------------------------------------
    // Entity lifecycle
    // -----------------------------------------------------------------------

    /// Spawn a detached entity.
    pub fn spawn(&mut self, name: impl Into<String>) -> EntityId {
        let id = self.ids.next_id();
        self.entities.insert(id, Entity::new(id, name));
        id
    }

    /// Spawn a detached entity tagged with the given tags.
    pub fn spawn_tagged(&mut self, name: impl Into<String>, tags: &[&str]) -> EntityId {
        let id = self.spawn(name);
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.tags = tags.iter().map(|t| t.to_string()).collect();
        }
        id
    }

    /// Spawn an entity from a prototype and attach it under `parent`.
    pub fn spawn_child(&mut self, parent: EntityId, prototype: PrototypeId) -> CoreResult<EntityId> {
        if !self.entities.contains_key(&parent) {
            return Err(CoreError::EntityNotFound(parent));
        }
        let id = self.ids.next_id();
        let mut entity = Entity::new(id, prototype.as_str());
        entity.prototype = Some(prototype);
        entity.parent = Some(parent);
        self.entities.insert(id, entity);
        if let Some(p) = self.entities.get_mut(&parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    /// Destroy an entity, its children (depth first), and detach it from its
    /// parent. Returns the removed entity.
    pub fn destroy(&mut self, id: EntityId) -> CoreResult<Entity> {
        let children = self
            .entities
            .get(&id)
            .map(|e| e.children.clone())
            .ok_or(CoreError::EntityNotFound(id))?;
        for child in children {
            // A child may already be gone if it was destroyed by a sibling.
            let _ = self.destroy(child);
        }

        let entity = self
            .entities
            .remove(&id)
            .ok_or(CoreError::EntityNotFound(id))?;
        if let Some(parent) = entity.parent
            && let Some(p) = self.entities.get_mut(&parent)
        {
            p.children.retain(|c| *c != id);
        }
        Ok(entity)
    }

    /// Whether `id` is alive.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Get a reference to an entity by ID.
    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Find an entity by name (case-insensitive). Returns the oldest match.
    pub fn find_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities
            .values()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Get the display name of an entity, or `"?"` if it does not exist.
    pub fn entity_name(&self, id: EntityId) -> &str {
        self.entities.get(&id).map(|e| e.name.as_str()).unwrap_or("?")
    }

    /// The prototype an entity was spawned from.
    pub fn prototype_of(&self, id: EntityId) -> Option<&PrototypeId> {
        self.entities.get(&id).and_then(|e| e.prototype.as_ref())
    }

    /// The entity `id` is attached to, if any.
    pub fn parent_of(&self, id: EntityId) -> Option<EntityId> {
        self.entities.get(&id).and_then(|e| e.parent)
    }

    /// Children of an entity in attachment order.
    pub fn children_of(&self, id: EntityId) -> &[EntityId] {
        self.entities
            .get(&id)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    // -----------------------------------------------------------------------
    // Components
    // -----------------------------------------------------------------------

    /// Attach a component, replacing any previous one of the same name.
    pub fn attach<T: Component>(&mut self, id: EntityId, component: T) -> CoreResult<()> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(CoreError::EntityNotFound(id))?;
        entity.components.insert(component);
        Ok(())
    }

    /// Attach a boxed component under its own name.
    pub fn attach_boxed(&mut self, id: EntityId, component: Box<dyn AnyComponent>) -> CoreResult<()> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(CoreError::EntityNotFound(id))?;
        entity.components.insert_boxed(component);
        Ok(())
    }

    /// Detach a typed component. Returns `None` if the entity or component
    /// does not exist.
    pub fn detach<T: Component>(&mut self, id: EntityId) -> Option<T> {
        self.entities.get_mut(&id)?.components.remove::<T>()
    }

    /// Detach a component by name.
    pub fn detach_named(&mut self, id: EntityId, name: &str) -> Option<Box<dyn AnyComponent>> {
        self.entities.get_mut(&id)?.components.remove_named(name)
    }

    /// The `T` component, if present.
    pub fn get<T: Component>(&self, id: EntityId) -> Option<&T> {
        self.entities.get(&id)?.components.get::<T>()
    }

    /// Mutable access to the `T` component, if present.
    pub fn get_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        self.entities.get_mut(&id)?.components.get_mut::<T>()
    }

    /// Like [`World::get`], but reports which piece was missing.
    pub fn require<T: Component>(&self, id: EntityId) -> CoreResult<&T> {
        let entity = self.entities.get(&id).ok_or(CoreError::EntityNotFound(id))?;
        entity
            .components
            .get::<T>()
            .ok_or_else(|| CoreError::ComponentMissing {
                entity: id,
                component: T::NAME.to_string(),
            })
    }

    /// Whether `id` carries a `T`.
    pub fn has<T: Component>(&self, id: EntityId) -> bool {
        self.entities
            .get(&id)
            .is_some_and(|e| e.components.contains::<T>())
    }

    /// Whether `id` carries a component registered as `name`.
    pub fn has_named(&self, id: EntityId, name: &str) -> bool {
        self.entities
            .get(&id)
            .is_some_and(|e| e.components.contains_named(name))
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// All entities in ID order.
    pub fn all_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// IDs of every entity carrying component `T`, in ID order.
    pub fn entities_with<T: Component>(&self) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.components.contains::<T>())
            .map(|e| e.id)
            .collect()
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}
