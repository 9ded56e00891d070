use fx_core::{EntityId, World};
use serde::{Deserialize, Serialize};

use crate::error::Denied;

/// Matches entities by component or tag. An entity matches if it has any of
/// the listed components or any of the listed tags. An empty filter matches
/// nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFilter {
    /// Matches entities carrying any of these components.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
    /// Matches entities with any of these tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl EntityFilter {
    /// A filter on component names.
    pub fn components<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: names.into_iter().map(Into::into).collect(),
            tags: Vec::new(),
        }
    }

    /// A filter on tags.
    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: Vec::new(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `entity` has any listed component or tag.
    pub fn matches(&self, world: &World, entity: EntityId) -> bool {
        let Some(e) = world.get_entity(entity) else {
            return false;
        };
        self.components
            .iter()
            .any(|c| e.components.contains_named(c))
            || self.tags.iter().any(|t| e.has_tag(t))
    }
}

/// Static allow/deny rules for one effect kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatingPolicy {
    /// If set, only matching targets are accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<EntityFilter>,
    /// Matching targets are refused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blacklist: Option<EntityFilter>,
}

impl GatingPolicy {
    /// Blacklist first: an entity on both lists is refused.
    pub fn check(&self, world: &World, target: EntityId) -> Result<(), Denied> {
        if let Some(blacklist) = &self.blacklist
            && blacklist.matches(world, target)
        {
            return Err(Denied::Blacklisted);
        }
        if let Some(whitelist) = &self.whitelist
            && !whitelist.matches(world, target)
        {
            return Err(Denied::NotWhitelisted);
        }
        Ok(())
    }
}
