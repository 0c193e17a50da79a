//! Structural merge
//!
//! `replace_equal_deep(previous, next)` returns a value equal to `next` that
//! reuses every subtree of `previous` which did not change. When nothing
//! changed at all the result is `previous` itself, so consumers can compare
//! by identity instead of walking the tree.

use std::sync::Arc;

use crate::value::{Map, Search, Value};

pub fn replace_equal_deep(previous: &Value, next: &Value) -> Value {
    if previous.is_identical(next) {
        return previous.clone();
    }

    match (previous, next) {
        (Value::Array(prev_items), Value::Array(next_items)) => {
            merge_arrays(prev_items, next_items)
        }
        (Value::Object(prev_map), Value::Object(next_map)) => {
            Value::Object(merge_maps(prev_map, next_map))
        }
        _ => next.clone(),
    }
}

/// Merge two search objects, keeping `previous` when nothing changed
pub fn merge_search(previous: &Search, next: &Search) -> Search {
    if Arc::ptr_eq(previous, next) {
        return Arc::clone(previous);
    }
    merge_maps(previous, next)
}

fn merge_arrays(previous: &Arc<Vec<Value>>, next: &Arc<Vec<Value>>) -> Value {
    let mut unchanged = 0;
    let merged: Vec<Value> = next
        .iter()
        .enumerate()
        .map(|(index, item)| match previous.get(index) {
            Some(prev_item) => {
                let value = replace_equal_deep(prev_item, item);
                if value.is_identical(prev_item) {
                    unchanged += 1;
                }
                value
            }
            None => item.clone(),
        })
        .collect();

    if previous.len() == next.len() && unchanged == previous.len() {
        Value::Array(Arc::clone(previous))
    } else {
        Value::array(merged)
    }
}

fn merge_maps(previous: &Arc<Map>, next: &Arc<Map>) -> Arc<Map> {
    let mut unchanged = 0;
    let merged: Map = next
        .iter()
        .map(|(key, item)| {
            let value = match previous.get(key) {
                Some(prev_item) => {
                    let value = replace_equal_deep(prev_item, item);
                    if value.is_identical(prev_item) {
                        unchanged += 1;
                    }
                    value
                }
                None => item.clone(),
            };
            (key.clone(), value)
        })
        .collect();

    if previous.len() == next.len() && unchanged == previous.len() {
        Arc::clone(previous)
    } else {
        Arc::new(merged)
    }
}
