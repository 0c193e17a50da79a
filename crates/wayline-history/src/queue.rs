//! Serialized history queue
//!
//! Mutating calls never reach the host directly. Each one is appended to a
//! FIFO and the FIFO is drained in place; once it is empty the host location
//! is re-read and listeners hear about it exactly once, however many tasks
//! the drain ran. Calls made while a drain is running only enqueue.

use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use wayline_store::Subscription;
use wayline_value::Value;

use crate::host::{same_host, HistoryLocation, HostListener, RouterHistory};
use crate::Result;

type Task = Box<dyn FnOnce(&dyn RouterHistory) -> Result<()> + Send>;

pub struct HistoryQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    host: Arc<dyn RouterHistory>,
    location: RwLock<HistoryLocation>,
    tasks: Mutex<VecDeque<Task>>,
    draining: AtomicBool,
    listeners: Mutex<Vec<HostListener>>,
    /// Attached while at least one listener is registered
    host_subscription: Mutex<Option<Subscription>>,
}

impl HistoryQueue {
    pub fn new(host: Arc<dyn RouterHistory>) -> Self {
        let location = host.location();
        Self {
            inner: Arc::new(QueueInner {
                host,
                location: RwLock::new(location),
                tasks: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
                listeners: Mutex::new(Vec::new()),
                host_subscription: Mutex::new(None),
            }),
        }
    }

    /// Last observed host location
    pub fn location(&self) -> HistoryLocation {
        self.inner.location.read().clone()
    }

    /// Whether this queue wraps the given adapter
    pub fn wraps(&self, host: &Arc<dyn RouterHistory>) -> bool {
        same_host(&self.inner.host, host)
    }

    pub fn listen(&self, listener: HostListener) -> Subscription {
        let attach = {
            let mut listeners = self.inner.listeners.lock();
            let was_empty = listeners.is_empty();
            if !listeners.iter().any(|l| same_listener(l, &listener)) {
                listeners.push(Arc::clone(&listener));
            }
            was_empty
        };

        if attach {
            self.attach_host();
        }

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let now_empty = {
                let mut listeners = inner.listeners.lock();
                listeners.retain(|l| !same_listener(l, &listener));
                listeners.is_empty()
            };
            if now_empty {
                let host_subscription = inner.host_subscription.lock().take();
                if host_subscription.is_some() {
                    tracing::debug!("Detaching host history listener");
                }
                drop(host_subscription);
            }
        })
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    pub fn push(&self, path: &str, state: Value) -> Result<()> {
        let path = path.to_string();
        self.enqueue(Box::new(move |host| host.push_state(&path, state)))
    }

    pub fn replace(&self, path: &str, state: Value) -> Result<()> {
        let path = path.to_string();
        self.enqueue(Box::new(move |host| host.replace_state(&path, state)))
    }

    pub fn go(&self, delta: isize) -> Result<()> {
        self.enqueue(Box::new(move |host| host.go(delta)))
    }

    pub fn back(&self) -> Result<()> {
        self.enqueue(Box::new(|host| host.back()))
    }

    pub fn forward(&self) -> Result<()> {
        self.enqueue(Box::new(|host| host.forward()))
    }

    pub fn create_href(&self, path: &str) -> String {
        self.inner.host.create_href(path)
    }

    /// Run `f` with every mutation it issues collected into a single drain
    /// and a single notification.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        if self.inner.draining.swap(true, Ordering::SeqCst) {
            return Ok(f());
        }
        let guard = DrainGuard { inner: &self.inner };
        let value = f();
        self.finish_drain(guard).map(|()| value)
    }

    fn attach_host(&self) {
        tracing::debug!("Attaching host history listener");
        let weak = Arc::downgrade(&self.inner);
        let subscription = self.inner.host.listen(Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                tracing::debug!("Host reported an external navigation");
                inner.refresh();
                inner.notify();
            }
        }));

        let previous = self.inner.host_subscription.lock().replace(subscription);
        drop(previous);
    }

    fn enqueue(&self, task: Task) -> Result<()> {
        self.inner.tasks.lock().push_back(task);
        self.drain()
    }

    fn drain(&self) -> Result<()> {
        if self.inner.draining.swap(true, Ordering::SeqCst) {
            // The running drain picks the task up before it notifies
            return Ok(());
        }
        let guard = DrainGuard { inner: &self.inner };
        self.finish_drain(guard)
    }

    fn finish_drain(&self, guard: DrainGuard<'_>) -> Result<()> {
        let mut ran = 0usize;
        let outcome = loop {
            let task = self.inner.tasks.lock().pop_front();
            let Some(task) = task else {
                break Ok(());
            };
            ran += 1;
            if let Err(err) = task(self.inner.host.as_ref()) {
                break Err(err);
            }
        };
        drop(guard);

        match outcome {
            Ok(()) => {
                self.inner.refresh();
                tracing::debug!(
                    tasks = ran,
                    href = %self.inner.location.read().href(),
                    "History queue drained"
                );
                self.inner.notify();
                Ok(())
            }
            Err(err) => {
                let abandoned = {
                    let mut tasks = self.inner.tasks.lock();
                    let count = tasks.len();
                    tasks.clear();
                    count
                };
                tracing::warn!(error = %err, abandoned, "History task failed");
                self.inner.refresh();
                Err(err)
            }
        }
    }
}

impl QueueInner {
    fn refresh(&self) {
        let location = self.host.location();
        *self.location.write() = location;
    }

    fn notify(&self) {
        let listeners: Vec<HostListener> = self.listeners.lock().clone();
        for listener in &listeners {
            listener();
        }
    }
}

impl Clone for HistoryQueue {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for HistoryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryQueue")
            .field("location", &self.inner.location.read().href())
            .field("pending", &self.inner.tasks.lock().len())
            .field("listeners", &self.inner.listeners.lock().len())
            .finish()
    }
}

fn same_listener(a: &HostListener, b: &HostListener) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Ends the drain even if a task panics, leaving the queue empty.
struct DrainGuard<'a> {
    inner: &'a QueueInner,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.inner.tasks.lock().clear();
        }
        self.inner.draining.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HistoryError;
    use crate::memory::MemoryHistory;
    use std::sync::atomic::AtomicUsize;

    /// Records every call the queue makes against the host
    struct RecordingHost {
        memory: MemoryHistory,
        calls: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    impl RecordingHost {
        fn new(fail_on: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                memory: MemoryHistory::new("/").unwrap(),
                calls: Mutex::new(Vec::new()),
                fail_on: fail_on.map(str::to_string),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn record(&self, call: String) -> Result<()> {
            self.calls.lock().push(call.clone());
            if self.fail_on.as_deref() == Some(call.as_str()) {
                return Err(HistoryError::Host(call));
            }
            Ok(())
        }
    }

    impl RouterHistory for RecordingHost {
        fn location(&self) -> HistoryLocation {
            self.memory.location()
        }

        fn listen(&self, listener: HostListener) -> Subscription {
            self.memory.listen(listener)
        }

        fn push_state(&self, path: &str, state: Value) -> Result<()> {
            self.record(format!("push {}", path))?;
            self.memory.push_state(path, state)
        }

        fn replace_state(&self, path: &str, state: Value) -> Result<()> {
            self.record(format!("replace {}", path))?;
            self.memory.replace_state(path, state)
        }

        fn go(&self, delta: isize) -> Result<()> {
            self.record(format!("go {}", delta))?;
            self.memory.go(delta)
        }

        fn create_href(&self, path: &str) -> String {
            format!("#{}", path)
        }
    }

    fn counter(queue: &HistoryQueue) -> (Arc<AtomicUsize>, Subscription) {
        let count = Arc::new(AtomicUsize::new(0));
        let sub = queue.listen({
            let count = Arc::clone(&count);
            Arc::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
        });
        (count, sub)
    }

    #[test]
    fn test_unbatched_calls_notify_once_each() {
        let host = RecordingHost::new(None);
        let queue = HistoryQueue::new(host.clone());
        let (count, _sub) = counter(&queue);

        queue.push("/a", Value::Null).unwrap();
        queue.replace("/b", Value::Null).unwrap();

        assert_eq!(host.calls(), vec!["push /a", "replace /b"]);
        assert_eq!(queue.location().pathname, "/b");
        // One drain per call
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_batched_calls_share_one_notification() {
        let host = RecordingHost::new(None);
        let queue = HistoryQueue::new(host.clone());
        let (count, _sub) = counter(&queue);

        queue
            .batch(|| {
                queue.push("/a", Value::Null)?;
                queue.replace("/b", Value::Null)
            })
            .unwrap()
            .unwrap();

        assert_eq!(host.calls(), vec!["push /a", "replace /b"]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(queue.location().pathname, "/b");
    }

    #[test]
    fn test_reentrant_calls_share_one_notification() {
        let host = RecordingHost::new(None);
        let queue = HistoryQueue::new(host.clone());
        let (count, _sub) = counter(&queue);

        let nested = queue.clone();
        queue
            .enqueue(Box::new(move |h| {
                h.push_state("/a", Value::Null)?;
                nested.replace("/b", Value::Null)
            }))
            .unwrap();

        assert_eq!(host.calls(), vec!["push /a", "replace /b"]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(queue.location().pathname, "/b");
    }

    #[test]
    fn test_failed_task_empties_queue() {
        let host = RecordingHost::new(Some("replace /b"));
        let queue = HistoryQueue::new(host.clone());
        let (count, _sub) = counter(&queue);

        let nested = queue.clone();
        let result = queue.enqueue(Box::new(move |h| {
            nested.replace("/b", Value::Null)?;
            nested.push("/c", Value::Null)?;
            h.push_state("/a", Value::Null)
        }));

        // Surfaces from the call that started the drain; "/c" is abandoned
        assert!(matches!(result, Err(HistoryError::Host(_))));
        assert_eq!(host.calls(), vec!["push /a", "replace /b"]);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(queue.location().pathname, "/a");

        queue.push("/d", Value::Null).unwrap();
        assert_eq!(host.calls(), vec!["push /a", "replace /b", "push /d"]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_task_propagates_to_caller() {
        let host = RecordingHost::new(Some("go -1"));
        let queue = HistoryQueue::new(host.clone());

        let result = queue.back();
        assert!(matches!(result, Err(HistoryError::Host(_))));
    }

    #[test]
    fn test_host_listener_is_reference_counted() {
        let memory = Arc::new(MemoryHistory::new("/").unwrap());
        let queue = HistoryQueue::new(memory.clone());
        assert_eq!(memory.listener_count(), 0);

        let (count, first) = counter(&queue);
        let (_, second) = counter(&queue);
        assert_eq!(memory.listener_count(), 1);
        assert_eq!(queue.listener_count(), 2);

        memory.navigate_external("/x", Value::Null).unwrap();
        assert_eq!(queue.location().pathname, "/x");
        assert_eq!(count.load(Ordering::SeqCst), 1);

        first.unsubscribe();
        assert_eq!(memory.listener_count(), 1);
        second.unsubscribe();
        assert_eq!(memory.listener_count(), 0);
    }

    #[test]
    fn test_create_href_passthrough() {
        let host = RecordingHost::new(None);
        let queue = HistoryQueue::new(host.clone());

        assert_eq!(queue.create_href("/a?b=1"), "#/a?b=1");
        assert!(host.calls().is_empty());
        assert!(queue.wraps(&(host as Arc<dyn RouterHistory>)));
    }
}
