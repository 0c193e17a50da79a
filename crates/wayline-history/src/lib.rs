//! Wayline History
//!
//! Bridges the router to the host's navigation stack:
//! - [`RouterHistory`]: the adapter contract a host implements
//! - [`HistoryQueue`]: serializes push/replace/go calls and collapses each
//!   drain into one change notification
//! - [`MemoryHistory`]: in-memory adapter for tests and headless use

mod error;
mod host;
mod memory;
mod queue;

pub use error::HistoryError;
pub use host::{same_host, HistoryLocation, HostListener, RouterHistory};
pub use memory::MemoryHistory;
pub use queue::HistoryQueue;

pub type Result<T> = std::result::Result<T, HistoryError>;
