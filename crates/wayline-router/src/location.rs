//! Parsed locations and the router's observable state

use std::sync::Arc;

use wayline_value::{Search, Value};

/// A host location decoded into typed search values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLocation {
    pub href: String,
    pub pathname: String,
    pub search: Search,
    /// Search as it appears in the URL, including the leading `?`
    pub search_str: String,
    /// Fragment including the leading `#`, or empty
    pub hash: String,
    pub state: Value,
    /// History entry id read from `state`
    pub key: Option<String>,
}

impl ParsedLocation {
    /// Field-wise comparison using reference identity for `search` and
    /// container state values
    pub fn is_identical(&self, other: &ParsedLocation) -> bool {
        self.href == other.href
            && self.pathname == other.pathname
            && Arc::ptr_eq(&self.search, &other.search)
            && self.search_str == other.search_str
            && self.hash == other.hash
            && self.state.is_identical(&other.state)
            && self.key == other.key
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouterState {
    /// Most recently observed host location
    pub latest_location: Arc<ParsedLocation>,
    /// Location committed by the last load
    pub current_location: Arc<ParsedLocation>,
}

impl RouterState {
    pub fn new(location: Arc<ParsedLocation>) -> Self {
        Self {
            latest_location: Arc::clone(&location),
            current_location: location,
        }
    }
}

/// Store update function: fold `next` onto `previous`, reusing every
/// location that did not change so that an unchanged state is the same `Arc`
pub(crate) fn merge_router_state(
    previous: &Arc<RouterState>,
    next: Arc<RouterState>,
) -> Arc<RouterState> {
    let latest_location = reuse_location(&previous.latest_location, &next.latest_location);
    let current_location = reuse_location(&previous.current_location, &next.current_location);

    if Arc::ptr_eq(&latest_location, &previous.latest_location)
        && Arc::ptr_eq(&current_location, &previous.current_location)
    {
        return Arc::clone(previous);
    }

    Arc::new(RouterState {
        latest_location,
        current_location,
    })
}

fn reuse_location(
    previous: &Arc<ParsedLocation>,
    next: &Arc<ParsedLocation>,
) -> Arc<ParsedLocation> {
    if Arc::ptr_eq(previous, next) || previous.is_identical(next) {
        Arc::clone(previous)
    } else {
        Arc::clone(next)
    }
}
