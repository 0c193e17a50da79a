//! Host history contract
//!
//! Implemented by whatever owns the real navigation stack (a browser
//! binding, a native shell, or [`crate::MemoryHistory`]).

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use wayline_store::Subscription;
use wayline_value::Value;

use crate::Result;

pub type HostListener = Arc<dyn Fn() + Send + Sync>;

/// Raw location as the host reports it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryLocation {
    pub pathname: String,
    /// Query string including the leading `?`, or empty
    pub search: String,
    /// Fragment including the leading `#`, or empty
    pub hash: String,
    /// Opaque state stored with the entry
    pub state: Value,
}

impl HistoryLocation {
    pub fn href(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }
}

pub trait RouterHistory: Send + Sync {
    fn location(&self) -> HistoryLocation;

    /// Register for externally triggered transitions (back/forward, URL
    /// edits). Calls made through `push_state`/`replace_state`/`go` must not
    /// loop back through this listener.
    fn listen(&self, listener: HostListener) -> Subscription;

    fn push_state(&self, path: &str, state: Value) -> Result<()>;

    fn replace_state(&self, path: &str, state: Value) -> Result<()>;

    fn go(&self, delta: isize) -> Result<()>;

    fn back(&self) -> Result<()> {
        self.go(-1)
    }

    fn forward(&self) -> Result<()> {
        self.go(1)
    }

    fn create_href(&self, path: &str) -> String;
}

/// Whether two handles point at the same host adapter
pub fn same_host(a: &Arc<dyn RouterHistory>, b: &Arc<dyn RouterHistory>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
