//! The context a builder function runs under: dependency recording, handler
//! collection, per-key local state, and instance-scoped environment values.
//!
//! There is no ambient thread-local "current build"; the context is passed
//! explicitly into the builder.

use std::any::Any;
use std::rc::Rc;
use std::sync::Arc;

use ahash::AHashMap;

use crate::event::{DispatchContext, Event, Handler, HandlerId, HandlerMap};
use crate::state::{AnyState, DependencyCollector, DependencySet, State};

/// Per-key state cells that survive rebuilds, scoped to one instance.
#[derive(Default)]
pub struct LocalStateTable {
    slots: AHashMap<String, Box<dyn Any>>,
}

/// Shared values/objects a builder can look up by name.
#[derive(Default)]
pub struct EnvTable {
    slots: AHashMap<String, Rc<dyn Any>>,
}

impl EnvTable {
    pub fn insert<T: 'static>(&mut self, name: impl Into<String>, value: T) {
        self.slots.insert(name.into(), Rc::new(value));
    }

    pub fn get<T: 'static>(&self, name: &str) -> Option<Rc<T>> {
        self.slots
            .get(name)
            .cloned()
            .and_then(|slot| slot.downcast::<T>().ok())
    }
}

/// Context passed into the builder function for the duration of one build.
pub struct BuildContext<'a> {
    deps: DependencyCollector,
    handlers: HandlerMap,
    next_handler_id: &'a mut HandlerId,
    locals: &'a mut LocalStateTable,
    env: &'a EnvTable,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        next_handler_id: &'a mut HandlerId,
        locals: &'a mut LocalStateTable,
        env: &'a EnvTable,
    ) -> Self {
        Self {
            deps: DependencyCollector::default(),
            handlers: HandlerMap::new(),
            next_handler_id,
            locals,
            env,
        }
    }

    /// Register an event handler for this build and get a fresh id for it.
    /// Ids from the previous build are discarded wholesale.
    pub fn on(&mut self, handler: impl Fn(&mut DispatchContext, &Event) + 'static) -> HandlerId {
        let id = *self.next_handler_id;
        *self.next_handler_id += 1;
        self.handlers.insert(id, Rc::new(handler) as Handler);
        id
    }

    /// Per-key local state: returns the persistent cell stored under `key`,
    /// creating it with `init` on first use. A type-mismatched re-request
    /// fails soft by re-initializing the slot.
    pub fn state<T: Clone + Send + 'static>(
        &mut self,
        key: impl Into<String>,
        init: impl FnOnce() -> T,
    ) -> State<T> {
        let key = key.into();
        if let Some(slot) = self.locals.slots.get(&key) {
            if let Some(state) = slot.downcast_ref::<State<T>>() {
                return state.clone();
            }
            log::debug!("local state {key:?} re-requested with a different type; resetting");
        }
        let state = State::new(init());
        self.locals
            .slots
            .insert(key, Box::new(state.clone()) as Box<dyn Any>);
        state
    }

    /// Look up an environment value by name; absent or type-mismatched
    /// slots read as `None`.
    pub fn env<T: 'static>(&self, name: &str) -> Option<Rc<T>> {
        self.env.get::<T>(name)
    }

    pub(crate) fn record_dependency(&mut self, state: Arc<dyn AnyState>) {
        self.deps.record(state);
    }

    /// End the build: capture dependency versions as of now and subscribe
    /// `on_change` to every state that was read, yielding the replacement
    /// dependency set and the fresh handler table.
    pub fn finish(
        self,
        on_change: impl Fn() + Send + Sync + Clone + 'static,
    ) -> (DependencySet, HandlerMap) {
        (DependencySet::rebuild(self.deps, on_change), self.handlers)
    }
}

#[cfg(test)]
#[path = "tests/context_tests.rs"]
mod tests;
