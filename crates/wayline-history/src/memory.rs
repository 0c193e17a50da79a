//! In-memory host adapter
//!
//! Keeps an entry stack with a cursor, like a browser tab's session history.
//! Calls made through [`RouterHistory`] are silent; the `*_external` methods
//! simulate user-driven transitions and notify listeners.

use parking_lot::Mutex;
use std::sync::Arc;
use url::Url;

use wayline_store::Subscription;
use wayline_value::Value;

use crate::error::HistoryError;
use crate::host::{HistoryLocation, HostListener, RouterHistory};
use crate::Result;

const MEMORY_ORIGIN: &str = "http://localhost/";

#[derive(Debug)]
struct MemoryState {
    entries: Vec<HistoryLocation>,
    index: usize,
}

pub struct MemoryHistory {
    state: Arc<Mutex<MemoryState>>,
    listeners: Arc<Mutex<Vec<HostListener>>>,
}

impl MemoryHistory {
    pub fn new(initial_path: &str) -> Result<Self> {
        Self::with_state(initial_path, Value::Null)
    }

    pub fn with_state(initial_path: &str, state: Value) -> Result<Self> {
        let entry = parse_path(initial_path, state)?;
        Ok(Self {
            state: Arc::new(Mutex::new(MemoryState {
                entries: vec![entry],
                index: 0,
            })),
            listeners: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn entries(&self) -> Vec<HistoryLocation> {
        self.state.lock().entries.clone()
    }

    pub fn index(&self) -> usize {
        self.state.lock().index
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Simulate the user entering a new URL
    pub fn navigate_external(&self, path: &str, state: Value) -> Result<()> {
        self.push_state(path, state)?;
        self.notify();
        Ok(())
    }

    /// Simulate the back/forward buttons
    pub fn traverse_external(&self, delta: isize) -> Result<()> {
        let before = self.index();
        self.go(delta)?;
        if self.index() != before {
            self.notify();
        }
        Ok(())
    }

    fn notify(&self) {
        let listeners: Vec<HostListener> = self.listeners.lock().clone();
        for listener in &listeners {
            listener();
        }
    }
}

impl RouterHistory for MemoryHistory {
    fn location(&self) -> HistoryLocation {
        let state = self.state.lock();
        state.entries[state.index].clone()
    }

    fn listen(&self, listener: HostListener) -> Subscription {
        self.listeners.lock().push(Arc::clone(&listener));

        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners
                    .lock()
                    .retain(|l| !same_listener(l, &listener));
            }
        })
    }

    fn push_state(&self, path: &str, state: Value) -> Result<()> {
        let entry = parse_path(path, state)?;
        let mut memory = self.state.lock();
        let next = memory.index + 1;
        memory.entries.truncate(next);
        memory.entries.push(entry);
        memory.index = next;
        Ok(())
    }

    fn replace_state(&self, path: &str, state: Value) -> Result<()> {
        let entry = parse_path(path, state)?;
        let mut memory = self.state.lock();
        let index = memory.index;
        memory.entries[index] = entry;
        Ok(())
    }

    /// Out-of-range deltas clamp to the ends of the stack
    fn go(&self, delta: isize) -> Result<()> {
        let mut memory = self.state.lock();
        let last = memory.entries.len().saturating_sub(1);
        let target = memory.index.saturating_add_signed(delta).min(last);
        memory.index = target;
        Ok(())
    }

    fn create_href(&self, path: &str) -> String {
        path.to_string()
    }
}

impl std::fmt::Debug for MemoryHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryHistory")
            .field("index", &state.index)
            .field("entries", &state.entries.len())
            .finish()
    }
}

fn same_listener(a: &HostListener, b: &HostListener) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

fn parse_path(path: &str, state: Value) -> Result<HistoryLocation> {
    let origin = Url::parse(MEMORY_ORIGIN)?;
    let url = origin
        .join(path)
        .map_err(|e| HistoryError::InvalidPath(format!("{}: {}", path, e)))?;

    Ok(HistoryLocation {
        pathname: url.path().to_string(),
        search: url.query().map(|q| format!("?{}", q)).unwrap_or_default(),
        hash: url.fragment().map(|f| format!("#{}", f)).unwrap_or_default(),
        state,
    })
}
