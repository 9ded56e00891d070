//! Directed events: typed events raised on a single entity and delivered to
//! handlers subscribed by component.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use fx_core::{Component, EntityId, World};

use crate::effects::{Authority, StatusEffects};

/// What a handler gets to work with while an event is being dispatched.
pub struct EffectCtx<'a, A: Authority> {
    /// The world the event happens in.
    pub world: &'a mut World,
    /// The engine raising the event, for handlers that apply or remove effects.
    pub effects: &'a mut StatusEffects<A>,
}

/// A shared event handler.
pub type Handler<A, E> = Rc<dyn Fn(&mut EffectCtx<'_, A>, EntityId, &mut E)>;

#[derive(Clone)]
struct Subscription {
    /// Only entities carrying this component receive the event; `None`
    /// means every entity does.
    component: Option<String>,
    handler: Rc<dyn Any>,
}

/// Subscriptions keyed by event type, kept in registration order.
pub struct EventBus<A: Authority> {
    subscriptions: HashMap<TypeId, Vec<Subscription>>,
    _authority: PhantomData<A>,
}

impl<A: Authority> EventBus<A> {
    /// A bus with no subscriptions.
    pub fn new() -> Self {
        Self {
            subscriptions: HashMap::new(),
            _authority: PhantomData,
        }
    }

    /// Deliver `E` to entities that carry component `C`.
    pub fn subscribe<C, E, F>(&mut self, handler: F)
    where
        C: Component,
        E: 'static,
        F: Fn(&mut EffectCtx<'_, A>, EntityId, &mut E) + 'static,
    {
        self.insert::<E>(Some(C::NAME.to_string()), Rc::new(handler));
    }

    /// Deliver `E` to entities that carry the named component.
    pub fn subscribe_named<E, F>(&mut self, component: impl Into<String>, handler: F)
    where
        E: 'static,
        F: Fn(&mut EffectCtx<'_, A>, EntityId, &mut E) + 'static,
    {
        self.insert::<E>(Some(component.into()), Rc::new(handler));
    }

    /// Deliver `E` to every entity it is raised on.
    pub fn subscribe_all<E, F>(&mut self, handler: F)
    where
        E: 'static,
        F: Fn(&mut EffectCtx<'_, A>, EntityId, &mut E) + 'static,
    {
        self.insert::<E>(None, Rc::new(handler));
    }

    fn insert<E: 'static>(&mut self, component: Option<String>, handler: Handler<A, E>) {
        self.subscriptions
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Subscription {
                component,
                handler: Rc::new(handler),
            });
    }

    /// Snapshot of the handlers for `E`, in registration order.
    pub(crate) fn handlers_for<E: 'static>(&self) -> Vec<(Option<String>, Handler<A, E>)> {
        self.subscriptions
            .get(&TypeId::of::<E>())
            .map(|subs| {
                subs.iter()
                    .filter_map(|s| {
                        s.handler
                            .downcast_ref::<Handler<A, E>>()
                            .map(|h| (s.component.clone(), Rc::clone(h)))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of handlers subscribed to `E`.
    pub fn handler_count<E: 'static>(&self) -> usize {
        self.subscriptions
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }
}

impl<A: Authority> Default for EventBus<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Authority> Clone for EventBus<A> {
    fn clone(&self) -> Self {
        Self {
            subscriptions: self.subscriptions.clone(),
            _authority: PhantomData,
        }
    }
}

impl<A: Authority> fmt::Debug for EventBus<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers: usize = self.subscriptions.values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("event_types", &self.subscriptions.len())
            .field("handlers", &handlers)
            .finish()
    }
}

impl<A: Authority> StatusEffects<A> {
    /// Raise `event` on `entity`. Handlers run in registration order; each
    /// sees the mutations of the ones before it. A handler is skipped if its
    /// component is no longer on the entity by the time its turn comes.
    pub fn raise<E: 'static>(&mut self, world: &mut World, entity: EntityId, event: &mut E) {
        let handlers = self.bus.handlers_for::<E>();
        for (component, handler) in handlers {
            if !world.contains(entity) {
                break;
            }
            if let Some(name) = &component
                && !world.has_named(entity, name)
            {
                continue;
            }
            let mut ctx = EffectCtx {
                world: &mut *world,
                effects: &mut *self,
            };
            handler(&mut ctx, entity, event);
        }
    }
}
