use crate::entity::EntityId;

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur when manipulating a world.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The requested entity ID does not exist in the world.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// No constructor is registered for a component name.
    #[error("unknown component: \"{0}\"")]
    UnknownComponent(String),

    /// The entity does not carry the requested component.
    #[error("entity {entity} has no component \"{component}\"")]
    ComponentMissing {
        /// The entity that was queried.
        entity: EntityId,
        /// The missing component name.
        component: String,
    },
}
