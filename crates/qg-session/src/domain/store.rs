//! A minimal observer store.
//!
//! UI layers consume game state reactively; this is the framework-free
//! primitive for that: a shared value plus a registry of subscriber
//! callbacks. [`Store::subscribe`] runs the callback once with
//! the current value and again after every publish, so a late subscriber
//! still sees the latest snapshot.
//!
//! Callbacks run on the publishing thread while the subscriber registry is
//! borrowed: a callback must not subscribe, unsubscribe, or publish to the
//! same store. Reading with [`Store::get`] from inside a callback is fine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Callback<T> = Box<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    value: Mutex<T>,
    subscribers: Mutex<HashMap<u64, Callback<T>>>,
    next_id: AtomicU64,
}

/// A shared observable value.
///
/// Cloning a `Store` clones the *handle*; all clones publish to and read
/// from the same value.
pub struct Store<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Store {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> Store<T> {
    /// Creates a store holding `initial`.
    pub fn new(initial: T) -> Self {
        Store {
            inner: Arc::new(Inner {
                value: Mutex::new(initial),
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.value.lock().unwrap().clone()
    }

    /// Replaces the value and notifies all subscribers.
    pub fn set(&self, value: T) {
        {
            let mut current = self.inner.value.lock().unwrap();
            *current = value.clone();
        }
        self.notify(&value);
    }

    /// Mutates the value in place and notifies all subscribers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let snapshot = {
            let mut current = self.inner.value.lock().unwrap();
            f(&mut current);
            current.clone()
        };
        self.notify(&snapshot);
    }

    /// Registers `callback`, invoking it immediately with the current value.
    ///
    /// The registration lives as long as the returned [`Subscription`];
    /// dropping it (or calling [`Subscription::unsubscribe`]) removes the
    /// callback.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription<T> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        callback(&self.get());
        self.inner
            .subscribers
            .lock()
            .unwrap()
            .insert(id, Box::new(callback));
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn notify(&self, value: &T) {
        let subscribers = self.inner.subscribers.lock().unwrap();
        for callback in subscribers.values() {
            callback(value);
        }
    }
}

/// Handle for one subscriber registration.
///
/// The registration is removed when this handle is dropped.
pub struct Subscription<T> {
    id: u64,
    inner: Weak<Inner<T>>,
}

impl<T> Subscription<T> {
    /// Removes the registration. Equivalent to dropping the handle; the
    /// explicit name reads better at call sites.
    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.subscribers.lock().unwrap().remove(&self.id);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
