//! Wayline Router
//!
//! Keeps a typed view of the host's navigation history:
//! - [`Router`]: derives locations from the host, builds and issues
//!   navigations, commits changes into an observable store
//! - [`RouterState`] / [`ParsedLocation`]: what subscribers observe
//! - [`Config`] / [`RouterOptions`]: defaults, codec and filter hooks
//!
//! Embedders call [`init_logging`] once at startup to get the router's
//! `tracing` output on stderr, then build a [`Router`] over their host
//! adapter:
//!
//! ```no_run
//! use std::sync::Arc;
//! use wayline_router::{MemoryHistory, NavigateOptions, Router, RouterOptions, Value};
//!
//! # fn main() -> wayline_router::Result<()> {
//! wayline_router::init_logging();
//!
//! let host = Arc::new(MemoryHistory::new("/items")?);
//! let router = Router::new(RouterOptions::new().with_history(host))?;
//! router.navigate(NavigateOptions::new().search(
//!     [("page".to_string(), Value::from(2))].into_iter().collect::<wayline_router::Map>(),
//! ))?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod intent;
mod location;
mod router;

pub use config::{
    defaults_filter, generate_id, stamp_id, Config, IdGenerator, NormalizePolicy, RouterOptions,
    SearchFilter, SearchParser, SearchStringifier, SearchValidator,
};
pub use error::RouterError;
pub use intent::{LoadOptions, NavigateOptions, Updater};
pub use location::{ParsedLocation, RouterState};
pub use router::Router;

// Re-export the building blocks
pub use wayline_history::{
    HistoryError, HistoryLocation, HistoryQueue, MemoryHistory, RouterHistory,
};
pub use wayline_search::{
    parse_search, parse_search_with, stringify_search, stringify_search_with,
};
pub use wayline_store::{Listener, Store, Subscription};
pub use wayline_value::{merge_search, replace_equal_deep, Map, Search, Value};

pub type Result<T> = std::result::Result<T, RouterError>;

/// Initialize logging for an embedding application.
///
/// Filter comes from `RUST_LOG`, falling back to `info`. Panics if a global
/// subscriber is already installed.
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
