//! Router configuration
//!
//! [`Config`] holds the serializable settings. [`RouterOptions`] is the
//! overlay accepted by `Router::new` and `Router::update`: every field left
//! as `None` keeps its current value.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use wayline_history::RouterHistory;
use wayline_value::{Map, Search, Value};

use crate::error::RouterError;
use crate::Result;

pub type SearchParser = Arc<dyn Fn(&str) -> Search + Send + Sync>;
pub type SearchStringifier = Arc<dyn Fn(&Map) -> String + Send + Sync>;
pub type SearchValidator = Arc<dyn Fn(Search) -> Search + Send + Sync>;
pub type SearchFilter = Arc<dyn Fn(Search) -> Search + Send + Sync>;
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// When the first history entry is rewritten on construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizePolicy {
    /// Re-issue when the rebuilt href differs (default values were missing)
    #[default]
    Href,
    /// Also re-issue when the entry carries no history id
    HrefOrKey,
    /// Leave the first entry alone
    Never,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Values overlaid under every search before navigation
    pub default_search: Map,
    pub normalize: NormalizePolicy,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Null defaults never reach the query string, so they are rejected
    pub fn validate(&self) -> Result<()> {
        if let Some((key, _)) = self.default_search.iter().find(|(_, v)| v.is_null()) {
            return Err(RouterError::Config(format!(
                "default search value for `{}` is null",
                key
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RouterOptions {
    pub history: Option<Arc<dyn RouterHistory>>,
    pub config: Option<Config>,
    pub parse_search: Option<SearchParser>,
    pub stringify_search: Option<SearchStringifier>,
    pub validate_search: Option<SearchValidator>,
    pub pre_search_filters: Option<Vec<SearchFilter>>,
    pub post_search_filters: Option<Vec<SearchFilter>>,
    pub id_generator: Option<IdGenerator>,
}

impl RouterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(mut self, history: Arc<dyn RouterHistory>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Shorthand for a config that only sets default search values
    pub fn with_default_search(mut self, defaults: Map) -> Self {
        let mut config = self.config.take().unwrap_or_default();
        config.default_search = defaults;
        self.config = Some(config);
        self
    }

    pub fn with_search_codec(mut self, parse: SearchParser, stringify: SearchStringifier) -> Self {
        self.parse_search = Some(parse);
        self.stringify_search = Some(stringify);
        self
    }

    pub fn with_validate_search(mut self, validate: SearchValidator) -> Self {
        self.validate_search = Some(validate);
        self
    }

    pub fn with_pre_search_filters(mut self, filters: Vec<SearchFilter>) -> Self {
        self.pre_search_filters = Some(filters);
        self
    }

    pub fn with_post_search_filters(mut self, filters: Vec<SearchFilter>) -> Self {
        self.post_search_filters = Some(filters);
        self
    }

    pub fn with_id_generator(mut self, generator: IdGenerator) -> Self {
        self.id_generator = Some(generator);
        self
    }
}

impl std::fmt::Debug for RouterOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterOptions")
            .field("history", &self.history.is_some())
            .field("config", &self.config)
            .field("validate_search", &self.validate_search.is_some())
            .finish_non_exhaustive()
    }
}

/// Resolved configuration held by a router
#[derive(Clone)]
pub(crate) struct Settings {
    pub config: Config,
    pub parse_search: SearchParser,
    pub stringify_search: SearchStringifier,
    pub validate_search: Option<SearchValidator>,
    /// Always first in the pre-filter chain
    pub defaults_filter: SearchFilter,
    pub pre_search_filters: Vec<SearchFilter>,
    pub post_search_filters: Vec<SearchFilter>,
    pub id_generator: IdGenerator,
}

impl Settings {
    /// Apply an overlay, returning the history adapter it carried
    pub fn overlay(&mut self, options: RouterOptions) -> Option<Arc<dyn RouterHistory>> {
        if let Some(config) = options.config {
            self.defaults_filter = defaults_filter(config.default_search.clone());
            self.config = config;
        }
        if let Some(parse) = options.parse_search {
            self.parse_search = parse;
        }
        if let Some(stringify) = options.stringify_search {
            self.stringify_search = stringify;
        }
        if let Some(validate) = options.validate_search {
            self.validate_search = Some(validate);
        }
        if let Some(filters) = options.pre_search_filters {
            self.pre_search_filters = filters;
        }
        if let Some(filters) = options.post_search_filters {
            self.post_search_filters = filters;
        }
        if let Some(generator) = options.id_generator {
            self.id_generator = generator;
        }
        options.history
    }

    /// Baseline search: defaults first, then the configured pre-filters
    pub fn pre_filter(&self, search: Search) -> Search {
        let search = (self.defaults_filter)(search);
        self.pre_search_filters
            .iter()
            .fold(search, |search, filter| filter(search))
    }

    pub fn post_filter(&self, search: Search) -> Search {
        self.post_search_filters
            .iter()
            .fold(search, |search, filter| filter(search))
    }

    pub fn validate(&self, search: Search) -> Search {
        match &self.validate_search {
            Some(validate) => validate(search),
            None => search,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config: Config::default(),
            parse_search: Arc::new(wayline_search::parse_search),
            stringify_search: Arc::new(wayline_search::stringify_search),
            validate_search: None,
            defaults_filter: defaults_filter(Map::new()),
            pre_search_filters: Vec::new(),
            post_search_filters: Vec::new(),
            id_generator: Arc::new(generate_id),
        }
    }
}

/// Filter placing `defaults` under any key the search does not set
pub fn defaults_filter(defaults: Map) -> SearchFilter {
    Arc::new(move |search: Search| {
        if defaults.keys().all(|key| search.contains_key(key)) {
            return search;
        }
        let mut merged = defaults.clone();
        merged.extend(search.iter().map(|(k, v)| (k.clone(), v.clone())));
        Arc::new(merged)
    })
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// History entry id: millisecond timestamp, a process-local counter and
/// random bits
pub fn generate_id() -> String {
    let count = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let (entropy, _, _, _) = Uuid::new_v4().as_fields();
    format!(
        "{:x}-{:x}-{:08x}",
        Utc::now().timestamp_millis(),
        count,
        entropy
    )
}

/// Stamp `id` into a state value for storage in the host entry.
///
/// Object state gains an `id` key; any other non-null state is kept under
/// `state`.
pub fn stamp_id(state: &Value, id: String) -> Value {
    let mut entry = match state {
        Value::Object(map) => (**map).clone(),
        Value::Null => Map::new(),
        other => Map::from([("state".to_string(), other.clone())]),
    };
    entry.insert("id".to_string(), Value::from(id));
    Value::object(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_json() {
        let config =
            Config::from_json(r#"{"default_search": {"page": 1}, "normalize": "href_or_key"}"#)
                .unwrap();
        assert_eq!(config.default_search["page"], Value::from(1));
        assert_eq!(config.normalize, NormalizePolicy::HrefOrKey);

        let config = Config::from_json("{}").unwrap();
        assert!(config.default_search.is_empty());
        assert_eq!(config.normalize, NormalizePolicy::Href);
    }

    #[test]
    fn test_config_rejects_null_defaults() {
        let result = Config::from_json(r#"{"default_search": {"page": null}}"#);
        assert!(matches!(result, Err(RouterError::Config(_))));

        let result = Config::from_json("not json");
        assert!(matches!(result, Err(RouterError::Serialization(_))));
    }

    #[test]
    fn test_defaults_filter() {
        let filter = defaults_filter(Map::from([("page".to_string(), Value::from(1))]));

        let empty: Search = Arc::new(Map::new());
        let filled = filter(empty);
        assert_eq!(filled["page"], Value::from(1));

        let explicit: Search = Arc::new(Map::from([("page".to_string(), Value::from(3))]));
        let kept = filter(Arc::clone(&explicit));
        assert!(Arc::ptr_eq(&kept, &explicit));
    }

    #[test]
    fn test_overlay_keeps_unset_fields() {
        let mut settings = Settings::default();
        let marker: IdGenerator = Arc::new(|| "fixed".to_string());
        settings.overlay(RouterOptions::new().with_id_generator(marker));
        assert_eq!((settings.id_generator)(), "fixed");

        let history = settings.overlay(
            RouterOptions::new().with_default_search(Map::from([("q".to_string(), "x".into())])),
        );
        assert!(history.is_none());
        assert_eq!((settings.id_generator)(), "fixed");
        assert_eq!(settings.pre_filter(Arc::new(Map::new()))["q"], Value::from("x"));
    }

    #[test]
    fn test_generate_id_is_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_stamp_id() {
        let stamped = stamp_id(&Value::from_iter([("scroll", 10)]), "k1".to_string());
        assert_eq!(stamped.get("id"), Some(&Value::from("k1")));
        assert_eq!(stamped.get("scroll"), Some(&Value::from(10)));

        let stamped = stamp_id(&Value::Null, "k2".to_string());
        assert_eq!(stamped, Value::from_iter([("id", "k2")]));

        let stamped = stamp_id(&Value::from(true), "k3".to_string());
        assert_eq!(stamped.get("state"), Some(&Value::from(true)));
    }
}
