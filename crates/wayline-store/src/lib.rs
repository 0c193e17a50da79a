//! Wayline Store
//!
//! Generic reactive container used to publish router state:
//! - `set_state` skips notification when the updater returns the same `Arc`
//! - `batch` defers notifications until the outermost batch closes
//! - listeners receive `(next, previous)` and are deduplicated by identity

mod store;
mod subscription;

pub use store::{Listener, OnUpdate, Store, StoreOptions, UpdateFn};
pub use subscription::Subscription;
