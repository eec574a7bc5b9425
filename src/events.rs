//! Minimal publish-subscribe primitive for change notification.
//!
//! An [`EventManager`] is a cheaply cloneable handle: clones share one
//! subscriber registry, so a component can hand out registration access
//! without exposing its own internals.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Token identifying a registered callback.
///
/// Closures have no usable identity of their own, so registration hands the
/// caller a token and removal takes it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

struct Registry<T> {
    next_id: u64,
    callbacks: Vec<(u64, Callback<T>)>,
}

/// Register/unregister/trigger over a payload type `T`.
pub struct EventManager<T> {
    inner: Arc<Mutex<Registry<T>>>,
}

impl<T> EventManager<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                next_id: 0,
                callbacks: Vec::new(),
            })),
        }
    }

    /// Register a callback, returning its removal token.
    pub fn register(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let mut registry = self.inner.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.callbacks.push((id, Arc::new(callback)));
        Subscription(id)
    }

    /// Remove the callback behind `subscription`, returning whether it was
    /// still registered.
    pub fn unregister(&self, subscription: Subscription) -> bool {
        let mut registry = self.inner.lock();
        let before = registry.callbacks.len();
        registry.callbacks.retain(|(id, _)| *id != subscription.0);
        registry.callbacks.len() != before
    }

    /// Invoke every currently registered callback with `payload`.
    ///
    /// Iteration runs over a snapshot of the subscriber list taken at
    /// trigger time, so callbacks may register or unregister on this same
    /// manager. Callbacks run synchronously on the caller's thread; a
    /// panicking callback propagates to the caller.
    pub fn trigger(&self, payload: &T) {
        let snapshot: Vec<Callback<T>> = self
            .inner
            .lock()
            .callbacks
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(payload);
        }
    }

    /// Drop every subscription.
    pub fn clear(&self) {
        self.inner.lock().callbacks.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Clone for EventManager<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for EventManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("subscribers", &self.len())
            .finish()
    }
}
