//! Raw query string encoding
//!
//! `k=v` pairs joined by `&`, both sides percent-encoded. Repeated keys
//! collapse into an array. Decoded scalars are coerced:
//! 1. empty → `""`
//! 2. `"true"` / `"false"` → boolean
//! 3. leading `0` → kept as string (`"007"`, `"0.5"`)
//! 4. numeric → number (float when the text has `.`, `e` or `E`, integer
//!    otherwise), anything else → string

use wayline_value::{Map, Value};

/// Decode a query string (with or without the leading `?`)
pub fn decode(query: &str) -> Map {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut out = Map::new();

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(raw_key);
        let value = to_value(raw_value);

        match out.remove(&key) {
            Some(Value::Array(items)) => {
                let mut items = (*items).clone();
                items.push(value);
                out.insert(key, Value::array(items));
            }
            Some(existing) => {
                out.insert(key, Value::array(vec![existing, value]));
            }
            None => {
                out.insert(key, value);
            }
        }
    }

    out
}

/// Encode a map into `k=v&k=v` without a leading `?`.
///
/// Arrays repeat their key, `Null` and opaque values are skipped.
pub fn encode(search: &Map) -> String {
    let mut pairs = Vec::new();

    for (key, value) in search {
        let key = urlencoding::encode(key);
        match value {
            Value::Array(items) => {
                for item in items.iter() {
                    if let Some(text) = scalar_text(item) {
                        pairs.push(format!("{}={}", key, urlencoding::encode(&text)));
                    }
                }
            }
            other => {
                if let Some(text) = scalar_text(other) {
                    pairs.push(format!("{}={}", key, urlencoding::encode(&text)));
                }
            }
        }
    }

    pairs.join("&")
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Opaque(_) => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Timestamp(t) => Some(t.to_rfc3339()),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).ok(),
    }
}

fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn to_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::String(String::new());
    }

    let text = decode_component(raw);
    match text.as_str() {
        "false" => return Value::Bool(false),
        "true" => return Value::Bool(true),
        _ => {}
    }

    if text.starts_with('0') {
        return Value::String(text);
    }

    coerce_number(&text).unwrap_or(Value::String(text))
}

fn coerce_number(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let is_float = trimmed.contains(|c: char| matches!(c, '.' | 'e' | 'E'));
    if !is_float {
        if let Ok(n) = trimmed.parse::<i64>() {
            return Some(Value::from(n));
        }
    }

    // Also covers integers beyond i64
    let n: f64 = trimmed.parse().ok()?;
    n.is_finite().then(|| Value::from(n))
}
