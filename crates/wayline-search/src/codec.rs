//! Search string codec
//!
//! Arrays and objects travel as embedded structured text (JSON by default)
//! inside a single query value. Decoding tries the parser on every string
//! value and keeps the raw string whenever it does not yield an array or an
//! object.

use std::sync::Arc;

use wayline_value::{Map, Search, Value};

use crate::query::{decode, encode};

/// Build a search-string decoder around a structured-text parser
pub fn parse_search_with<P>(parser: P) -> impl Fn(&str) -> Search + Send + Sync + 'static
where
    P: Fn(&str) -> Option<Value> + Send + Sync + 'static,
{
    move |search_str: &str| {
        let mut query = decode(search_str);
        for value in query.values_mut() {
            let Value::String(text) = value else {
                continue;
            };
            if let Some(parsed) = parser(text).filter(Value::is_mergeable) {
                *value = parsed;
            }
        }
        Arc::new(query)
    }
}

/// Build a search-string encoder around a structured-text serializer.
///
/// The result carries a leading `?` unless it is empty.
pub fn stringify_search_with<S>(stringify: S) -> impl Fn(&Map) -> String + Send + Sync + 'static
where
    S: Fn(&Value) -> Option<String> + Send + Sync + 'static,
{
    move |search: &Map| {
        let embedded: Map = search
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::Array(_) | Value::Object(_) => stringify(value)
                        .map(Value::String)
                        .unwrap_or_else(|| value.clone()),
                    other => other.clone(),
                };
                (key.clone(), value)
            })
            .collect();

        let query = encode(&embedded);
        if query.is_empty() {
            query
        } else {
            format!("?{}", query)
        }
    }
}

pub fn parse_json(text: &str) -> Option<Value> {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .map(Value::from)
}

pub fn stringify_json(value: &Value) -> Option<String> {
    serde_json::to_string(value).ok()
}

/// Decode with the default JSON parser
pub fn parse_search(search_str: &str) -> Search {
    parse_search_with(parse_json)(search_str)
}

/// Encode with the default JSON serializer
pub fn stringify_search(search: &Map) -> String {
    stringify_search_with(stringify_json)(search)
}
