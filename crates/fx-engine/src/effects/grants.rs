use std::collections::BTreeMap;

use fx_core::{ComponentRegistry, CoreError, CoreResult, EntityId, World};

/// How many active effects on one target grant one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    /// Active effects granting the component.
    pub count: u32,
    /// The component was attached by us rather than already present, so it
    /// goes away with the last grant.
    pub owned: bool,
}

/// Reference counts of components granted to targets by their effects.
///
/// Two effects granting the same component share it; revoking one leaves it
/// in place for the other. A component the target had before any effect
/// granted it is never removed.
#[derive(Debug, Clone, Default)]
pub struct GrantLedger {
    grants: BTreeMap<EntityId, BTreeMap<String, Grant>>,
}

impl GrantLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one reference on each named component, attaching those not yet
    /// present. Either every name is granted or, on error, none is.
    pub fn grant(
        &mut self,
        world: &mut World,
        factory: &ComponentRegistry,
        target: EntityId,
        names: &[String],
    ) -> CoreResult<()> {
        self.check_attachable(world, factory, target, names)?;
        for name in names {
            let entry = self.grants.entry(target).or_default();
            match entry.get_mut(name) {
                Some(grant) => grant.count += 1,
                None => {
                    let owned = !world.has_named(target, name);
                    if owned {
                        world.attach_boxed(target, factory.create(name)?)?;
                    }
                    entry.insert(name.clone(), Grant { count: 1, owned });
                }
            }
        }
        Ok(())
    }

    /// Take one reference on each named component, treating present
    /// components as our own. Used when rebuilding from a loaded world, where
    /// granted components were saved along with the target.
    pub fn adopt(
        &mut self,
        world: &mut World,
        factory: &ComponentRegistry,
        target: EntityId,
        names: &[String],
    ) -> CoreResult<()> {
        self.check_attachable(world, factory, target, names)?;
        for name in names {
            let entry = self.grants.entry(target).or_default();
            match entry.get_mut(name) {
                Some(grant) => grant.count += 1,
                None => {
                    if !world.has_named(target, name) {
                        world.attach_boxed(target, factory.create(name)?)?;
                    }
                    entry.insert(name.clone(), Grant { count: 1, owned: true });
                }
            }
        }
        Ok(())
    }

    /// Fail before touching anything if some name would need attaching but
    /// has no constructor, or the target is gone.
    fn check_attachable(
        &self,
        world: &World,
        factory: &ComponentRegistry,
        target: EntityId,
        names: &[String],
    ) -> CoreResult<()> {
        if !world.contains(target) {
            return Err(CoreError::EntityNotFound(target));
        }
        let held = self.grants.get(&target);
        for name in names {
            let needs_attach = !held.is_some_and(|h| h.contains_key(name))
                && !world.has_named(target, name);
            if needs_attach && !factory.contains(name) {
                return Err(CoreError::UnknownComponent(name.clone()));
            }
        }
        Ok(())
    }

    /// Drop one reference on each named component, detaching owned ones
    /// whose count reaches zero. Returns the detached names.
    pub fn revoke(&mut self, world: &mut World, target: EntityId, names: &[String]) -> Vec<String> {
        let mut detached = Vec::new();
        let Some(entry) = self.grants.get_mut(&target) else {
            return detached;
        };
        for name in names {
            let Some(grant) = entry.get_mut(name) else {
                continue;
            };
            grant.count -= 1;
            if grant.count == 0 {
                let owned = grant.owned;
                entry.remove(name);
                if owned && world.detach_named(target, name).is_some() {
                    detached.push(name.clone());
                }
            }
        }
        if entry.is_empty() {
            self.grants.remove(&target);
        }
        detached
    }

    /// The `T` component, if present.
    pub fn get(&self, target: EntityId, name: &str) -> Option<Grant> {
        self.grants.get(&target)?.get(name).copied()
    }

    /// Number of active effects granting `name` to `target`.
    pub fn count(&self, target: EntityId, name: &str) -> u32 {
        self.get(target, name).map_or(0, |g| g.count)
    }

    /// Forget targets that no longer exist.
    pub fn prune(&mut self, world: &World) -> usize {
        let before = self.grants.len();
        self.grants.retain(|target, _| world.contains(*target));
        before - self.grants.len()
    }

    /// Forget every grant without touching the world.
    pub fn clear(&mut self) {
        self.grants.clear();
    }

    /// Whether no target holds any grant.
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (World, ComponentRegistry, EntityId) {
        let mut world = World::new();
        let target = world.spawn("Kael");
        let mut factory = ComponentRegistry::new();
        factory.register_marker("Stunned");
        (world, factory, target)
    }

    fn stunned() -> Vec<String> {
        vec!["Stunned".to_string()]
    }

    #[test]
    fn shared_grant_survives_first_revoke() {
        let (mut world, factory, target) = setup();
        let mut ledger = GrantLedger::new();
        ledger.grant(&mut world, &factory, target, &stunned()).unwrap();
        ledger.grant(&mut world, &factory, target, &stunned()).unwrap();
        assert_eq!(ledger.count(target, "Stunned"), 2);

        assert!(ledger.revoke(&mut world, target, &stunned()).is_empty());
        assert!(world.has_named(target, "Stunned"));

        assert_eq!(ledger.revoke(&mut world, target, &stunned()), stunned());
        assert!(!world.has_named(target, "Stunned"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn preexisting_component_is_never_detached() {
        let (mut world, factory, target) = setup();
        world
            .attach_boxed(target, factory.create("Stunned").unwrap())
            .unwrap();
        let mut ledger = GrantLedger::new();
        ledger.grant(&mut world, &factory, target, &stunned()).unwrap();
        assert_eq!(
            ledger.get(target, "Stunned"),
            Some(Grant {
                count: 1,
                owned: false
            })
        );
        ledger.revoke(&mut world, target, &stunned());
        assert!(world.has_named(target, "Stunned"));
    }

    #[test]
    fn adopt_claims_present_components() {
        let (mut world, factory, target) = setup();
        world
            .attach_boxed(target, factory.create("Stunned").unwrap())
            .unwrap();
        let mut ledger = GrantLedger::new();
        ledger.adopt(&mut world, &factory, target, &stunned()).unwrap();
        ledger.revoke(&mut world, target, &stunned());
        assert!(!world.has_named(target, "Stunned"));
    }

    #[test]
    fn unknown_component_fails() {
        let (mut world, factory, target) = setup();
        let mut ledger = GrantLedger::new();
        assert!(
            ledger
                .grant(&mut world, &factory, target, &["Nope".to_string()])
                .is_err()
        );
    }

    #[test]
    fn failed_grant_takes_nothing() {
        let (mut world, factory, target) = setup();
        let mut ledger = GrantLedger::new();
        let names = vec!["Stunned".to_string(), "Nope".to_string()];
        assert!(ledger.grant(&mut world, &factory, target, &names).is_err());
        assert!(!world.has_named(target, "Stunned"));
        assert_eq!(ledger.count(target, "Stunned"), 0);
        assert!(ledger.is_empty());
    }

    #[test]
    fn prune_drops_dead_targets() {
        let (mut world, factory, target) = setup();
        let mut ledger = GrantLedger::new();
        ledger.grant(&mut world, &factory, target, &stunned()).unwrap();
        world.destroy(target).unwrap();
        assert_eq!(ledger.prune(&world), 1);
        assert!(ledger.is_empty());
    }
}
