use std::any::Any;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// A statically typed component.
///
/// Components are stored by name, so every type must declare a unique
/// [`Component::NAME`]. Data-driven definitions refer to components by that
/// name.
pub trait Component: Any + fmt::Debug + Clone + Send + Sync {
    /// Registry name, unique per type.
    const NAME: &'static str;
}

/// Object-safe view of a component stored on an entity.
pub trait AnyComponent: Any + fmt::Debug + Send + Sync {
    /// The name the component is stored under.
    fn name(&self) -> &str;
    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
    /// Mutable [`as_any`](Self::as_any).
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Owned [`as_any`](Self::as_any).
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    /// Clone behind the box.
    fn clone_box(&self) -> Box<dyn AnyComponent>;
}

impl<T: Component> AnyComponent for T {
    fn name(&self) -> &str {
        T::NAME
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
    fn clone_box(&self) -> Box<dyn AnyComponent> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn AnyComponent> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// A data-only component identified purely by name.
///
/// Used for components declared in data files that carry no state of their
/// own, e.g. a `Stunned` flag granted by an effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    name: String,
}

impl Marker {
    /// A marker reporting `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl AnyComponent for Marker {
    fn name(&self) -> &str {
        &self.name
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
    fn clone_box(&self) -> Box<dyn AnyComponent> {
        Box::new(self.clone())
    }
}

/// The components attached to one entity, keyed by component name.
#[derive(Debug, Clone, Default)]
pub struct ComponentSet {
    items: BTreeMap<String, Box<dyn AnyComponent>>,
}

impl ComponentSet {
    /// Insert a typed component, returning the one it replaced.
    pub fn insert<T: Component>(&mut self, component: T) -> Option<Box<dyn AnyComponent>> {
        self.items.insert(T::NAME.to_string(), Box::new(component))
    }

    /// Insert a boxed component under its own name.
    pub fn insert_boxed(&mut self, component: Box<dyn AnyComponent>) -> Option<Box<dyn AnyComponent>> {
        self.items.insert(component.name().to_string(), component)
    }

    /// The component stored under `T::NAME`, if it is a `T`.
    pub fn get<T: Component>(&self) -> Option<&T> {
        self.items
            .get(T::NAME)
            .and_then(|c| c.as_any().downcast_ref::<T>())
    }

    /// Mutable access to the `T` component, if present.
    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.items
            .get_mut(T::NAME)
            .and_then(|c| c.as_any_mut().downcast_mut::<T>())
    }

    /// Remove a typed component and hand it back.
    pub fn remove<T: Component>(&mut self) -> Option<T> {
        let boxed = self.items.remove(T::NAME)?;
        boxed.into_any().downcast::<T>().ok().map(|b| *b)
    }

    /// Remove a component by name.
    pub fn remove_named(&mut self, name: &str) -> Option<Box<dyn AnyComponent>> {
        self.items.remove(name)
    }

    /// Whether a `T` is present.
    pub fn contains<T: Component>(&self) -> bool {
        self.items.contains_key(T::NAME)
    }

    /// Whether a component named `name` is present.
    pub fn contains_named(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Component names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    /// Number of components held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no components are held.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

type Constructor = fn() -> Box<dyn AnyComponent>;

/// Creates components from their names.
///
/// Definitions loaded from data only know component names; the factory maps
/// each name to a constructor for a default instance.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    constructors: HashMap<String, Constructor>,
    markers: Vec<String>,
}

impl ComponentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed component that can be built with `Default`.
    pub fn register<T: Component + Default>(&mut self) -> &mut Self {
        fn build<T: Component + Default>() -> Box<dyn AnyComponent> {
            Box::new(T::default())
        }
        self.constructors.insert(T::NAME.to_string(), build::<T>);
        self
    }

    /// Register a stateless [`Marker`] component under `name`.
    pub fn register_marker(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if !self.markers.contains(&name) && !self.constructors.contains_key(&name) {
            self.markers.push(name);
        }
        self
    }

    /// Whether `name` can be created.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name) || self.markers.iter().any(|m| m == name)
    }

    /// Build a fresh component by name.
    pub fn create(&self, name: &str) -> CoreResult<Box<dyn AnyComponent>> {
        if let Some(ctor) = self.constructors.get(name) {
            return Ok(ctor());
        }
        if self.markers.iter().any(|m| m == name) {
            return Ok(Box::new(Marker::new(name)));
        }
        Err(CoreError::UnknownComponent(name.to_string()))
    }

    /// All registered component names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .constructors
            .keys()
            .map(String::as_str)
            .chain(self.markers.iter().map(String::as_str))
            .collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Burning {
        damage_per_tick: u32,
    }

    impl Component for Burning {
        const NAME: &'static str = "Burning";
    }

    #[test]
    fn typed_insert_and_get() {
        let mut set = ComponentSet::default();
        set.insert(Burning { damage_per_tick: 3 });
        assert_eq!(set.get::<Burning>().unwrap().damage_per_tick, 3);
        assert!(set.contains_named("Burning"));
    }

    #[test]
    fn remove_returns_typed_value() {
        let mut set = ComponentSet::default();
        set.insert(Burning { damage_per_tick: 7 });
        let removed = set.remove::<Burning>().unwrap();
        assert_eq!(removed.damage_per_tick, 7);
        assert!(set.is_empty());
    }

    #[test]
    fn markers_are_keyed_by_their_name() {
        let mut set = ComponentSet::default();
        set.insert_boxed(Box::new(Marker::new("Stunned")));
        set.insert_boxed(Box::new(Marker::new("Muted")));
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["Muted", "Stunned"]);
        assert!(set.remove_named("Muted").is_some());
        assert!(!set.contains_named("Muted"));
    }

    #[test]
    fn cloned_set_is_independent() {
        let mut set = ComponentSet::default();
        set.insert(Burning { damage_per_tick: 1 });
        let mut copy = set.clone();
        copy.get_mut::<Burning>().unwrap().damage_per_tick = 9;
        assert_eq!(set.get::<Burning>().unwrap().damage_per_tick, 1);
    }

    #[test]
    fn registry_creates_typed_and_marker_components() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Burning>().register_marker("Stunned");

        let burning = registry.create("Burning").unwrap();
        assert_eq!(burning.name(), "Burning");
        let stunned = registry.create("Stunned").unwrap();
        assert_eq!(stunned.name(), "Stunned");
        assert_eq!(registry.names(), vec!["Burning", "Stunned"]);
    }

    #[test]
    fn registry_rejects_unknown_names() {
        let registry = ComponentRegistry::new();
        assert!(matches!(
            registry.create("Nope"),
            Err(CoreError::UnknownComponent(name)) if name == "Nope"
        ));
    }
}
