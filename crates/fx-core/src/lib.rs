//! Entity substrate for the status effect engine.
//!
//! Entities, name-keyed components, a component factory for data-driven
//! definitions, and the [`World`] that owns them and tracks parent/child
//! attachment. The effect engine builds on this crate but this crate knows
//! nothing about effects.

/// Components, the component set stored on each entity, and the factory.
pub mod component;
/// Entity records, identifiers, and prototype identifiers.
pub mod entity;
/// Error types used throughout the crate.
pub mod error;
/// The world that owns entities.
pub mod world;

/// Re-export component types.
pub use component::{AnyComponent, Component, ComponentRegistry, ComponentSet, Marker};
/// Re-export core entity types.
pub use entity::{Entity, EntityId, IdAllocator, IdOrigin, PrototypeId};
/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export the world.
pub use world::World;
