//! Navigation intents

use std::sync::Arc;

use wayline_value::{Search, Value};

use crate::location::ParsedLocation;

/// How a navigation treats one field of the current location
pub enum Updater<T> {
    /// Carry the current value forward
    Keep,
    Replace(T),
    /// Derive the new value from the current one
    Apply(Box<dyn FnOnce(&T) -> T + Send>),
}

impl<T> Updater<T> {
    pub fn apply<F>(f: F) -> Self
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        Updater::Apply(Box::new(f))
    }

    pub(crate) fn resolve(self, current: &T) -> T
    where
        T: Clone,
    {
        match self {
            Updater::Keep => current.clone(),
            Updater::Replace(value) => value,
            Updater::Apply(f) => f(current),
        }
    }
}

impl<T> Default for Updater<T> {
    fn default() -> Self {
        Updater::Keep
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Updater<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Updater::Keep => f.write_str("Keep"),
            Updater::Replace(value) => f.debug_tuple("Replace").field(value).finish(),
            Updater::Apply(_) => f.write_str("Apply(..)"),
        }
    }
}

/// Target of a navigation. Every field defaults to keeping the current value.
#[derive(Debug, Default)]
pub struct NavigateOptions {
    pub search: Updater<Search>,
    pub state: Updater<Value>,
    pub hash: Updater<String>,
}

impl NavigateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, search: impl Into<Search>) -> Self {
        self.search = Updater::Replace(search.into());
        self
    }

    pub fn update_search<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Search) -> Search + Send + 'static,
    {
        self.search = Updater::apply(f);
        self
    }

    pub fn state(mut self, state: impl Into<Value>) -> Self {
        self.state = Updater::Replace(state.into());
        self
    }

    pub fn hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Updater::Replace(hash.into());
        self
    }
}

/// Options for `Router::load`
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Location to record as latest before committing
    pub next: Option<Arc<ParsedLocation>>,
}
