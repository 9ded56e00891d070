use fx_core::CoreError;

use crate::effects::EffectKind;

/// Result type for simulation steps.
pub type SimResult<T> = Result<T, SimError>;

/// Errors that stop a simulation step.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// An entity substrate operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An effect operation failed.
    #[error(transparent)]
    Effect(#[from] EffectError),

    /// A system reported a failure of its own.
    #[error("system error: {0}")]
    SystemError(String),
}

/// Convenience result type for effect operations.
pub type EffectResult<T> = Result<T, EffectError>;

/// Errors raised by the effect engine.
///
/// None of these cover the expected outcomes of the lifecycle API: a refused
/// application is a [`Denied`], and a missing effect is `false` or `None`.
#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    /// No definition is registered for the kind.
    #[error("unknown effect kind: {0}")]
    UnknownKind(EffectKind),

    /// A kind was defined twice with different contents.
    #[error("effect kind {0} is already defined differently")]
    ConflictingDefinition(EffectKind),

    /// A definition failed validation at load time.
    #[error("invalid definition for {kind}: {reason}")]
    InvalidDefinition {
        /// The offending kind.
        kind: EffectKind,
        /// Why it was rejected.
        reason: String,
    },

    /// A mutation was attempted from a handle without removal authority.
    #[error("{operation} requires server authority")]
    AuthorityViolation {
        /// The rejected operation.
        operation: &'static str,
    },

    /// Definitions could not be parsed.
    #[error("failed to load definitions: {0}")]
    Load(#[from] serde_json::Error),
}

/// Why an effect was not applied. This is a normal outcome; callers branch
/// on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Denied {
    /// The target matches the kind's blacklist.
    #[error("target is blacklisted")]
    Blacklisted,

    /// The kind has a whitelist and the target is not on it.
    #[error("target is not whitelisted")]
    NotWhitelisted,

    /// A before-add subscriber cancelled the application.
    #[error("cancelled by a before-add handler")]
    Cancelled,

    /// A new application was requested with a zero duration.
    #[error("zero duration")]
    ZeroDuration,

    /// The target entity does not exist.
    #[error("target does not exist")]
    MissingTarget,

    /// The kind is not registered. Only reachable in release builds.
    #[error("unknown effect kind")]
    UnknownKind,

    /// The definition names a component the factory cannot create.
    #[error("definition names a component that cannot be created")]
    Misconfigured,
}
