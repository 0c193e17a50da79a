//! Wayline Search Codec
//!
//! Converts between query strings and search objects:
//! - scalars are coerced on decode (booleans, numbers, leading-zero strings)
//! - repeated keys become arrays
//! - arrays and objects are embedded as JSON text
//!
//! Malformed input never fails; unparseable fragments stay raw strings.

mod codec;
mod query;

pub use codec::{
    parse_json, parse_search, parse_search_with, stringify_json, stringify_search,
    stringify_search_with,
};
pub use query::{decode, encode};
