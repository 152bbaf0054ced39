//! Observable state cells and the dependency set built from a rebuild.
//!
//! `State<T>` is the smallest unit of reactive data: reads during a build
//! register the cell with the build's dependency collector, writes bump a
//! monotonic version counter and synchronously notify subscribers. Writes
//! are safe from any thread; the value lock is released before callbacks
//! run so a callback may read the same state without deadlocking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use ahash::AHashSet;

use crate::context::BuildContext;

type Callback = Arc<dyn Fn() + Send + Sync>;

pub(crate) struct StateInner<T> {
    value: Mutex<T>,
    version: AtomicU64,
    subscribers: Mutex<Vec<(u64, Callback)>>,
    next_subscriber: AtomicU64,
}

/// A reactive cell. Clones share the underlying value; equality is pointer
/// equality.
pub struct State<T> {
    inner: Arc<StateInner<T>>,
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for State<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for State<T> {}

impl<T: Clone + Send + 'static> State<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(StateInner {
                value: Mutex::new(value),
                version: AtomicU64::new(1),
                subscribers: Mutex::new(Vec::new()),
                next_subscriber: AtomicU64::new(1),
            }),
        }
    }

    /// Read the value and register this cell with the active build's
    /// dependency collector.
    pub fn get(&self, ctx: &mut BuildContext<'_>) -> T {
        ctx.record_dependency(self.inner.clone() as Arc<dyn AnyState>);
        self.peek()
    }

    /// Read without registering a dependency.
    pub fn peek(&self) -> T {
        self.inner.value.lock().unwrap().clone()
    }

    /// Store a new value, bump the version, and synchronously notify all
    /// current subscribers. Safe to call from any thread.
    pub fn set(&self, value: T) {
        {
            let mut guard = self.inner.value.lock().unwrap();
            *guard = value;
        }
        self.inner.version.fetch_add(1, Ordering::Release);
        self.notify();
    }

    /// Apply a closure to the value under the lock, then bump and notify
    /// exactly like `set`.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = {
            let mut guard = self.inner.value.lock().unwrap();
            f(&mut guard)
        };
        self.inner.version.fetch_add(1, Ordering::Release);
        self.notify();
        result
    }

    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    pub fn subscribe(&self, callback: impl Fn() + Send + Sync + 'static) -> Subscription {
        let erased = self.inner.clone() as Arc<dyn AnyState>;
        let id = erased.add_subscriber(Arc::new(callback));
        Subscription {
            state: Arc::downgrade(&erased),
            id,
        }
    }

    fn notify(&self) {
        // Clone the callbacks out so neither the value lock nor the
        // subscriber list lock is held while they run.
        let callbacks: Vec<Callback> = {
            let subscribers = self.inner.subscribers.lock().unwrap();
            subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for callback in callbacks {
            callback();
        }
    }
}

impl<T: Clone + Send + fmt::Debug + 'static> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State").field("value", &self.peek()).finish()
    }
}

/// Type-erased view of a state cell held by dependency entries.
pub(crate) trait AnyState: Send + Sync {
    fn object_id(&self) -> usize;
    fn version(&self) -> u64;
    fn add_subscriber(&self, callback: Callback) -> u64;
    fn remove_subscriber(&self, id: u64);
}

impl<T: Send + 'static> AnyState for StateInner<T> {
    fn object_id(&self) -> usize {
        self as *const _ as *const () as usize
    }

    fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    fn add_subscriber(&self, callback: Callback) -> u64 {
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().unwrap().push((id, callback));
        id
    }

    fn remove_subscriber(&self, id: u64) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
    }
}

/// Guard for a registered callback; dropping it removes the callback.
pub struct Subscription {
    state: Weak<dyn AnyState>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.remove_subscriber(self.id);
        }
    }
}

/// States read during one build, deduplicated by object id.
#[derive(Default)]
pub(crate) struct DependencyCollector {
    states: Vec<Arc<dyn AnyState>>,
    seen: AHashSet<usize>,
}

impl DependencyCollector {
    pub(crate) fn record(&mut self, state: Arc<dyn AnyState>) {
        if self.seen.insert(state.object_id()) {
            self.states.push(state);
        }
    }
}

struct DependencyEntry {
    state: Arc<dyn AnyState>,
    version: u64,
    _subscription: Subscription,
}

/// The set of states the last build read, with the versions captured at the
/// end of that build. Replaced wholesale after every successful build so no
/// stale entry can leak a rebuild trigger.
#[derive(Default)]
pub struct DependencySet {
    entries: Vec<DependencyEntry>,
}

impl DependencySet {
    /// True when any tracked state's version has advanced past the value
    /// captured at the end of the previous build.
    pub fn is_stale(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.state.version() > entry.version)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the replacement set from a finished build's collector. Each
    /// entry subscribes `on_change`; versions are captured now, at the end
    /// of the build.
    pub(crate) fn rebuild(
        collector: DependencyCollector,
        on_change: impl Fn() + Send + Sync + Clone + 'static,
    ) -> Self {
        let entries = collector
            .states
            .into_iter()
            .map(|state| {
                let callback: Callback = Arc::new(on_change.clone());
                let id = state.add_subscriber(callback);
                let subscription = Subscription {
                    state: Arc::downgrade(&state),
                    id,
                };
                DependencyEntry {
                    version: state.version(),
                    state,
                    _subscription: subscription,
                }
            })
            .collect();
        Self { entries }
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
