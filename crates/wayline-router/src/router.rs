//! Navigation orchestrator
//!
//! Owns the reactive store of [`RouterState`] and the [`HistoryQueue`] over
//! the host adapter. Navigation only ever writes to the host; the queue's
//! change notification is the single path that commits locations into the
//! store.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use wayline_history::{HistoryQueue, MemoryHistory, RouterHistory};
use wayline_store::{Listener, Store, StoreOptions, Subscription};
use wayline_value::{merge_search, replace_equal_deep, Map, Search, Value};

use crate::config::{stamp_id, Config, NormalizePolicy, RouterOptions, Settings};
use crate::intent::{LoadOptions, NavigateOptions, Updater};
use crate::location::{merge_router_state, ParsedLocation, RouterState};
use crate::Result;

const DEFAULT_PATH: &str = "/";

/// Keeps router state in sync with the host history
pub struct Router {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    settings: RwLock<Settings>,
    history: RwLock<HistoryQueue>,
    /// Listener on the current history queue
    history_subscription: Mutex<Option<Subscription>>,
    store: Store<RouterState>,
}

impl Router {
    pub fn new(options: RouterOptions) -> Result<Self> {
        let mut settings = Settings::default();
        let history = settings.overlay(options);
        settings.config.validate()?;

        let host: Arc<dyn RouterHistory> = match history {
            Some(host) => host,
            None => Arc::new(MemoryHistory::new(DEFAULT_PATH)?),
        };
        let queue = HistoryQueue::new(host);
        let initial = Arc::new(derive(&settings, &queue, &Arc::new(Map::new())));
        let store = Store::with_options(RouterState::new(initial), store_options());

        let router = Self {
            inner: Arc::new(RouterInner {
                settings: RwLock::new(settings),
                history: RwLock::new(queue),
                history_subscription: Mutex::new(None),
                store,
            }),
        };

        router.listen_to_history();
        router.load(LoadOptions::default());
        router.normalize_initial_location()?;

        tracing::info!(
            href = %router.current_location().href,
            "Router initialized"
        );
        Ok(router)
    }

    /// Overlay new options. A history adapter different from the current one
    /// replaces the history queue and re-derives the latest location from it.
    pub fn update(&self, options: RouterOptions) -> Result<()> {
        if let Some(config) = &options.config {
            config.validate()?;
        }

        let supplied = self.inner.settings.write().overlay(options);
        if let Some(host) = supplied {
            if !self.history().wraps(&host) {
                self.install_history(host);
            }
        }
        Ok(())
    }

    /// Read the host location, reusing unchanged parts of `prior_search`
    pub fn derive_location(&self, prior_search: &Search) -> ParsedLocation {
        let settings = self.settings();
        derive(&settings, &self.history(), prior_search)
    }

    /// Commit `latest_location` as `current_location`, optionally recording
    /// `options.next` as latest first. Subscribers see one notification.
    pub fn load(&self, options: LoadOptions) {
        let store = &self.inner.store;
        store.batch(|| {
            if let Some(next) = options.next {
                tracing::debug!(href = %next.href, "Loading location");
                store.set_state(|state| {
                    Arc::new(RouterState {
                        latest_location: next,
                        current_location: Arc::clone(&state.current_location),
                    })
                });
            }
            store.set_state(|state| {
                Arc::new(RouterState::new(Arc::clone(&state.latest_location)))
            });
        });
    }

    /// Compute the location `intent` would navigate to without committing it
    pub fn build_location(&self, intent: NavigateOptions) -> ParsedLocation {
        let settings = self.settings();
        let queue = self.history();
        let latest = self.latest_location();

        let baseline = settings.pre_filter(Arc::clone(&latest.search));
        let candidate = intent.search.resolve(&baseline);
        let candidate = settings.validate(settings.post_filter(candidate));
        let search = merge_search(&latest.search, &candidate);
        let search_str = (settings.stringify_search)(&search);

        let state = intent.state.resolve(&latest.state);
        let state = replace_equal_deep(&latest.state, &state);
        let hash = normalize_hash(intent.hash.resolve(&latest.hash));

        let pathname = queue.location().pathname;
        let href = queue.create_href(&format!("{}{}{}", pathname, search_str, hash));

        ParsedLocation {
            href,
            pathname,
            search,
            search_str,
            hash,
            state,
            key: latest.key.clone(),
        }
    }

    /// Replace the current history entry with the location built from
    /// `intent`. The store is updated by the resulting history notification.
    pub fn navigate(&self, intent: NavigateOptions) -> Result<()> {
        let next = self.build_location(intent);
        let generate_id = Arc::clone(&self.inner.settings.read().id_generator);
        let state = stamp_id(&next.state, generate_id());
        let path = format!("{}{}{}", next.pathname, next.search_str, next.hash);

        tracing::debug!(href = %next.href, "Navigating");
        self.history().replace(&path, state)?;
        Ok(())
    }

    pub fn state(&self) -> Arc<RouterState> {
        self.inner.store.state()
    }

    pub fn latest_location(&self) -> Arc<ParsedLocation> {
        Arc::clone(&self.state().latest_location)
    }

    pub fn current_location(&self) -> Arc<ParsedLocation> {
        Arc::clone(&self.state().current_location)
    }

    /// Search of the current location
    pub fn search(&self) -> Search {
        Arc::clone(&self.current_location().search)
    }

    pub fn history(&self) -> HistoryQueue {
        self.inner.history.read().clone()
    }

    pub fn config(&self) -> Config {
        self.inner.settings.read().config.clone()
    }

    /// Called with `(next, previous)` after each committed change
    pub fn subscribe(&self, listener: Listener<RouterState>) -> Subscription {
        self.inner.store.subscribe(listener)
    }

    fn settings(&self) -> Settings {
        self.inner.settings.read().clone()
    }

    fn install_history(&self, host: Arc<dyn RouterHistory>) {
        *self.inner.history.write() = HistoryQueue::new(host);

        let prior = Arc::clone(&self.latest_location().search);
        let latest = Arc::new(self.derive_location(&prior));
        let href = latest.href.clone();
        self.inner.store.set_state(|state| {
            Arc::new(RouterState {
                latest_location: latest,
                current_location: Arc::clone(&state.current_location),
            })
        });
        self.listen_to_history();

        tracing::info!(href = %href, "Attached history adapter");
    }

    fn listen_to_history(&self) {
        let weak = Arc::downgrade(&self.inner);
        let subscription = self.history().listen(Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                Router { inner }.handle_history_change();
            }
        }));

        let previous = self.inner.history_subscription.lock().replace(subscription);
        drop(previous);
    }

    fn handle_history_change(&self) {
        let prior = Arc::clone(&self.latest_location().search);
        let next = Arc::new(self.derive_location(&prior));
        self.load(LoadOptions { next: Some(next) });
    }

    /// Rewrite the first entry so it carries default search values and a
    /// history id
    fn normalize_initial_location(&self) -> Result<()> {
        let policy = self.inner.settings.read().config.normalize;
        if policy == NormalizePolicy::Never {
            return Ok(());
        }

        let latest = self.latest_location();
        let next = self.build_location(NavigateOptions::default());
        let differs = match policy {
            NormalizePolicy::Href => latest.href != next.href,
            NormalizePolicy::HrefOrKey => latest.href != next.href || latest.key.is_none(),
            NormalizePolicy::Never => false,
        };
        if !differs {
            return Ok(());
        }

        tracing::debug!(from = %latest.href, to = %next.href, "Normalizing initial location");
        self.navigate(NavigateOptions {
            search: Updater::Replace(next.search),
            state: Updater::Replace(next.state),
            hash: Updater::Replace(next.hash),
        })
    }
}

impl Clone for Router {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Router")
            .field("latest", &state.latest_location.href)
            .field("current", &state.current_location.href)
            .finish()
    }
}

fn derive(settings: &Settings, queue: &HistoryQueue, prior_search: &Search) -> ParsedLocation {
    let raw = queue.location();
    let decoded = settings.validate((settings.parse_search)(&raw.search));
    let search = merge_search(prior_search, &decoded);
    let key = raw.state.get("id").and_then(Value::as_str).map(str::to_string);

    ParsedLocation {
        href: raw.href(),
        pathname: raw.pathname,
        search,
        search_str: raw.search,
        hash: raw.hash,
        state: raw.state,
        key,
    }
}

fn normalize_hash(hash: String) -> String {
    if hash.is_empty() || hash.starts_with('#') {
        hash
    } else {
        format!("#{}", hash)
    }
}

fn store_options() -> StoreOptions<RouterState> {
    StoreOptions {
        update_fn: Some(Arc::new(merge_router_state)),
        on_update: Some(Arc::new(
            |next: &Arc<RouterState>, previous: &Arc<RouterState>| {
                tracing::debug!(
                    latest = %next.latest_location.href,
                    current = %next.current_location.href,
                    previous = %previous.current_location.href,
                    "Router state updated"
                );
            },
        )),
    }
}
