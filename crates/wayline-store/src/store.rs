//! Reactive value store
//!
//! Holds one value behind an `Arc` and notifies listeners with
//! `(next, previous)` whenever `set_state` produces a value that is not the
//! same allocation as the current one. Notifications are queued and flushed
//! immediately, or at the end of the outermost [`Store::batch`].

use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::subscription::Subscription;

pub type Listener<T> = Arc<dyn Fn(&Arc<T>, &Arc<T>) + Send + Sync>;

/// Transform applied to every candidate value: `(previous, candidate) -> next`
pub type UpdateFn<T> = Arc<dyn Fn(&Arc<T>, Arc<T>) -> Arc<T> + Send + Sync>;

/// Synchronous hook run before notifications are queued: `(next, previous)`
pub type OnUpdate<T> = Arc<dyn Fn(&Arc<T>, &Arc<T>) + Send + Sync>;

pub struct StoreOptions<T> {
    pub update_fn: Option<UpdateFn<T>>,
    pub on_update: Option<OnUpdate<T>>,
}

impl<T> Default for StoreOptions<T> {
    fn default() -> Self {
        Self {
            update_fn: None,
            on_update: None,
        }
    }
}

impl<T> Clone for StoreOptions<T> {
    fn clone(&self) -> Self {
        Self {
            update_fn: self.update_fn.clone(),
            on_update: self.on_update.clone(),
        }
    }
}

pub struct Store<T> {
    inner: Arc<StoreInner<T>>,
}

struct StoreInner<T> {
    state: RwLock<Arc<T>>,
    listeners: Mutex<Vec<Listener<T>>>,
    /// Previous values whose notification has not fired yet
    queue: Mutex<VecDeque<Arc<T>>>,
    batch_depth: AtomicUsize,
    /// Set while a flush delivers notifications
    flushing: AtomicBool,
    options: StoreOptions<T>,
}

impl<T: Send + Sync + 'static> Store<T> {
    pub fn new(initial: T) -> Self {
        Self::with_options(initial, StoreOptions::default())
    }

    pub fn with_options(initial: T, options: StoreOptions<T>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(Arc::new(initial)),
                listeners: Mutex::new(Vec::new()),
                queue: Mutex::new(VecDeque::new()),
                batch_depth: AtomicUsize::new(0),
                flushing: AtomicBool::new(false),
                options,
            }),
        }
    }

    /// Current value
    pub fn state(&self) -> Arc<T> {
        Arc::clone(&self.inner.state.read())
    }

    /// Replace the value with the result of `updater`.
    ///
    /// Returning the same `Arc` that was passed in (or having the configured
    /// update function collapse the candidate back onto it) is a no-op.
    pub fn set_state<F>(&self, updater: F)
    where
        F: FnOnce(&Arc<T>) -> Arc<T>,
    {
        let previous = self.state();
        let candidate = updater(&previous);
        let next = match &self.inner.options.update_fn {
            Some(update_fn) => update_fn(&previous, candidate),
            None => candidate,
        };

        if Arc::ptr_eq(&next, &previous) {
            return;
        }

        *self.inner.state.write() = Arc::clone(&next);

        if let Some(on_update) = &self.inner.options.on_update {
            on_update(&next, &previous);
        }

        self.inner.queue.lock().push_back(previous);
        self.flush();
    }

    /// Run `f` with notifications deferred until it returns.
    ///
    /// Nested batches defer to the outermost one.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.batch_depth.fetch_add(1, Ordering::SeqCst);
        let result = {
            let _guard = BatchGuard { inner: &self.inner };
            f()
        };
        self.flush();
        result
    }

    pub fn is_batching(&self) -> bool {
        self.inner.batch_depth.load(Ordering::SeqCst) > 0
    }

    /// Register a listener. Registering the same `Arc` twice is a no-op.
    pub fn subscribe(&self, listener: Listener<T>) -> Subscription {
        {
            let mut listeners = self.inner.listeners.lock();
            if !listeners.iter().any(|l| same_listener(l, &listener)) {
                listeners.push(Arc::clone(&listener));
            }
        }

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .listeners
                    .lock()
                    .retain(|l| !same_listener(l, &listener));
            }
        })
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Deliver queued notifications in order. A flush started from inside a
    /// listener returns at once; the running flush picks up its task.
    fn flush(&self) {
        if self.is_batching() {
            return;
        }
        if self.inner.flushing.swap(true, Ordering::SeqCst) {
            return;
        }

        let _guard = FlushGuard { inner: &self.inner };
        loop {
            let task = self.inner.queue.lock().pop_front();
            let Some(previous) = task else {
                break;
            };

            let next = self.state();
            // Snapshot so listeners may subscribe or unsubscribe while running
            let listeners: Vec<Listener<T>> = self.inner.listeners.lock().clone();
            tracing::trace!(listeners = listeners.len(), "Flushing store notification");

            for listener in &listeners {
                listener(&next, &previous);
            }
        }
    }
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.inner.state.read())
            .field("listeners", &self.inner.listeners.lock().len())
            .finish()
    }
}

fn same_listener<T>(a: &Listener<T>, b: &Listener<T>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Releases the flush latch, dropping pending notifications if a listener
/// panicked mid-flush.
struct FlushGuard<'a, T> {
    inner: &'a StoreInner<T>,
}

impl<T> Drop for FlushGuard<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.inner.queue.lock().clear();
        }
        self.inner.flushing.store(false, Ordering::SeqCst);
    }
}

/// Closes the batch even when the batched closure panics.
struct BatchGuard<'a, T> {
    inner: &'a StoreInner<T>,
}

impl<T> Drop for BatchGuard<'_, T> {
    fn drop(&mut self) {
        self.inner.batch_depth.fetch_sub(1, Ordering::SeqCst);
        if std::thread::panicking() {
            self.inner.queue.lock().clear();
        }
    }
}
