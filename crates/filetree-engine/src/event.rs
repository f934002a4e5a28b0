//! Synchronous multi-listener events.
//!
//! An [`Emitter`] delivers each fired event to every registered listener, in
//! registration order, on the caller's thread. Registering returns a
//! [`Subscription`]; dropping or disposing it removes the listener.
//!
//! # Examples
//!
//! ```
//! use filetree_engine::event::Emitter;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let emitter = Emitter::<u32>::new();
//! let total = Arc::new(AtomicUsize::new(0));
//!
//! let sink = Arc::clone(&total);
//! let subscription = emitter.subscribe(move |n| {
//!     sink.fetch_add(*n as usize, Ordering::SeqCst);
//! });
//!
//! emitter.fire(&2);
//! subscription.dispose();
//! emitter.fire(&40);
//!
//! assert_eq!(total.load(Ordering::SeqCst), 2);
//! ```

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listeners<T> {
    next_id: u64,
    entries: Vec<(u64, Listener<T>)>,
}

/// Event source with any number of listeners.
///
/// Cloning an emitter yields another handle to the same listener list.
pub struct Emitter<T> {
    listeners: Arc<Mutex<Listeners<T>>>,
}

impl<T: 'static> Emitter<T> {
    /// Creates an emitter without listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Registers a listener.
    #[must_use = "dropping the subscription removes the listener"]
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut listeners = self.listeners.lock();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<Mutex<Listeners<T>>> = Arc::downgrade(&self.listeners);
        Subscription {
            dispose: Some(Box::new(move || {
                if let Some(listeners) = weak.upgrade() {
                    listeners.lock().entries.retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    /// Delivers `event` to every listener.
    ///
    /// Listeners may subscribe, dispose or fire other events while being
    /// called; they see the listener list as it was when firing started.
    pub fn fire(&self, event: &T) {
        let snapshot: Vec<Listener<T>> = self
            .listeners
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            listener(event);
        }
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().entries.len()
    }
}

impl<T: 'static> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listeners.lock().entries.len())
            .finish()
    }
}

/// Handle of a registered listener.
///
/// The listener is removed when the subscription is disposed or dropped.
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Removes the listener now.
    pub fn dispose(mut self) {
        self.run_dispose();
    }

    fn run_dispose(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.dispose.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_listeners_called_in_order() {
        let emitter = Emitter::<&'static str>::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&log);
        let _a = emitter.subscribe(move |e| first.lock().push(format!("a:{e}")));
        let second = Arc::clone(&log);
        let _b = emitter.subscribe(move |e| second.lock().push(format!("b:{e}")));

        emitter.fire(&"x");
        assert_eq!(*log.lock(), vec!["a:x", "b:x"]);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let emitter = Emitter::<()>::new();
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&count);
        let subscription = emitter.subscribe(move |()| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(emitter.listener_count(), 1);

        drop(subscription);
        emitter.fire(&());
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn test_subscription_outlives_emitter() {
        let emitter = Emitter::<()>::new();
        let subscription = emitter.subscribe(|()| {});
        drop(emitter);
        subscription.dispose();
    }

    #[test]
    fn test_listener_can_fire_reentrantly() {
        let emitter = Emitter::<u32>::new();
        let count = Arc::new(AtomicUsize::new(0));

        let inner = emitter.clone();
        let sink = Arc::clone(&count);
        let _sub = emitter.subscribe(move |n| {
            sink.fetch_add(1, Ordering::SeqCst);
            if *n > 0 {
                inner.fire(&(n - 1));
            }
        });

        emitter.fire(&2);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
